//! Client handlers

use super::DeleteResponse;
use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rental_core::{Client, ClientDraft, ClientId};

/// List all clients
pub async fn list_clients(State(state): State<AppState>) -> ApiResult<Json<Vec<Client>>> {
    Ok(Json(state.engine.clients().list().await?))
}

/// Get a specific client
pub async fn get_client(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Client>> {
    Ok(Json(state.engine.clients().get(ClientId::new(id)).await?))
}

/// Register a client
pub async fn create_client(
    State(state): State<AppState>,
    Json(draft): Json<ClientDraft>,
) -> ApiResult<(StatusCode, Json<Client>)> {
    let client = state.engine.clients().create(draft).await?;
    Ok((StatusCode::CREATED, Json(client)))
}

/// Replace a client's details
pub async fn update_client(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(draft): Json<ClientDraft>,
) -> ApiResult<Json<Client>> {
    let client = state
        .engine
        .clients()
        .update(ClientId::new(id), draft)
        .await?;
    Ok(Json(client))
}

/// Delete a client without contracts
pub async fn delete_client(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DeleteResponse>> {
    state.engine.clients().delete(ClientId::new(id)).await?;
    Ok(Json(DeleteResponse { id, deleted: true }))
}
