//! Contract handlers

use super::DeleteResponse;
use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rental_core::{ActivationReport, BookingRequest, Contract, ContractId, LateDeclaration};

/// List all contracts
pub async fn list_contracts(State(state): State<AppState>) -> ApiResult<Json<Vec<Contract>>> {
    Ok(Json(state.engine.contracts().list().await?))
}

/// Get a specific contract
pub async fn get_contract(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Contract>> {
    Ok(Json(state.engine.contracts().get(ContractId::new(id)).await?))
}

/// Book a vehicle
pub async fn create_contract(
    State(state): State<AppState>,
    Json(request): Json<BookingRequest>,
) -> ApiResult<(StatusCode, Json<Contract>)> {
    let contract = state.engine.contracts().create(request).await?;
    Ok((StatusCode::CREATED, Json(contract)))
}

/// Re-date or re-assign a contract
pub async fn update_contract(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(request): Json<BookingRequest>,
) -> ApiResult<Json<Contract>> {
    let contract = state
        .engine
        .contracts()
        .update(ContractId::new(id), request)
        .await?;
    Ok(Json(contract))
}

/// Delete a contract
pub async fn delete_contract(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DeleteResponse>> {
    state.engine.contracts().delete(ContractId::new(id)).await?;
    Ok(Json(DeleteResponse { id, deleted: true }))
}

/// Declare a contract late
pub async fn declare_late(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<LateDeclaration>> {
    let outcome = state
        .engine
        .contracts()
        .declare_late(ContractId::new(id))
        .await?;
    Ok(Json(outcome))
}

/// Terminate a contract
pub async fn terminate_contract(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Contract>> {
    let contract = state
        .engine
        .contracts()
        .terminate(ContractId::new(id))
        .await?;
    Ok(Json(contract))
}

/// Run the activation sweep now
pub async fn run_activation(State(state): State<AppState>) -> ApiResult<Json<ActivationReport>> {
    Ok(Json(state.activator.run_once().await?))
}
