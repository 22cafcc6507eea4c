//! Demo data handlers

use crate::api::rest::state::AppState;
use crate::error::ApiResult;
use axum::{extract::State, http::StatusCode, Json};
use chrono::Local;
use rental_core::{Client, Contract, LateScenario, Vehicle};
use serde::{Deserialize, Serialize};

/// Demo vehicle response. `vehicle` is empty when the drawn plate was taken.
#[derive(Debug, Serialize, Deserialize)]
pub struct DemoVehicleResponse {
    pub vehicle: Option<Vehicle>,
}

/// Register a random client
pub async fn demo_client(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<Client>)> {
    let client = state.engine.demo().random_client().await?;
    Ok((StatusCode::CREATED, Json(client)))
}

/// Register a random vehicle
pub async fn demo_vehicle(State(state): State<AppState>) -> ApiResult<Json<DemoVehicleResponse>> {
    let today = Local::now().date_naive();
    let vehicle = state.engine.demo().random_vehicle(today).await?;
    Ok(Json(DemoVehicleResponse { vehicle }))
}

/// Book a random vehicle for a random client
pub async fn demo_contract(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<Contract>)> {
    let today = Local::now().date_naive();
    let contract = state.engine.demo().random_contract(today).await?;
    Ok((StatusCode::CREATED, Json(contract)))
}

/// Seed the late-return scenario
pub async fn demo_late_scenario(
    State(state): State<AppState>,
) -> ApiResult<(StatusCode, Json<LateScenario>)> {
    let today = Local::now().date_naive();
    let scenario = state.engine.demo().late_scenario(today).await?;
    Ok((StatusCode::CREATED, Json(scenario)))
}
