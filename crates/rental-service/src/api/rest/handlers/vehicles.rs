//! Vehicle handlers

use super::DeleteResponse;
use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use rental_core::{NewVehicle, Vehicle, VehicleId, VehicleUpdate};

/// List the fleet
pub async fn list_vehicles(State(state): State<AppState>) -> ApiResult<Json<Vec<Vehicle>>> {
    Ok(Json(state.engine.vehicles().list().await?))
}

/// Get a specific vehicle
pub async fn get_vehicle(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vehicle>> {
    Ok(Json(state.engine.vehicles().get(VehicleId::new(id)).await?))
}

/// Register a vehicle
pub async fn create_vehicle(
    State(state): State<AppState>,
    Json(vehicle): Json<NewVehicle>,
) -> ApiResult<(StatusCode, Json<Vehicle>)> {
    let vehicle = state.engine.vehicles().create(vehicle).await?;
    Ok((StatusCode::CREATED, Json(vehicle)))
}

/// Edit a vehicle's description and price
pub async fn update_vehicle(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(changes): Json<VehicleUpdate>,
) -> ApiResult<Json<Vehicle>> {
    let vehicle = state
        .engine
        .vehicles()
        .update(VehicleId::new(id), changes)
        .await?;
    Ok(Json(vehicle))
}

/// Delete a vehicle without contracts
pub async fn delete_vehicle(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DeleteResponse>> {
    state.engine.vehicles().delete(VehicleId::new(id)).await?;
    Ok(Json(DeleteResponse { id, deleted: true }))
}

/// Declare a breakdown; pending bookings of the vehicle are cancelled
pub async fn declare_breakdown(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vehicle>> {
    let vehicle = state
        .engine
        .vehicles()
        .declare_breakdown(VehicleId::new(id))
        .await?;
    Ok(Json(vehicle))
}
