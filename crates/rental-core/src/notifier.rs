use crate::contract::ContractEngine;
use crate::error::RentalResult;
use crate::ids::VehicleId;
use async_trait::async_trait;
use std::sync::Arc;

/// Receives "vehicle broke down" notifications from the vehicle rules.
///
/// Delivery is synchronous: a breakdown declaration returns only after every
/// cascade has run.
#[async_trait]
pub trait BreakdownNotifier: Send + Sync {
    async fn vehicle_broke_down(&self, vehicle_id: VehicleId) -> RentalResult<()>;
}

/// Forwards breakdowns to the contract rules, which cancel pending bookings.
pub struct ContractCascade {
    contracts: Arc<ContractEngine>,
}

impl ContractCascade {
    pub fn new(contracts: Arc<ContractEngine>) -> Self {
        Self { contracts }
    }
}

#[async_trait]
impl BreakdownNotifier for ContractCascade {
    async fn vehicle_broke_down(&self, vehicle_id: VehicleId) -> RentalResult<()> {
        let cancelled = self.contracts.on_vehicle_broken_down(vehicle_id).await?;
        tracing::debug!(%vehicle_id, cancelled = cancelled.len(), "Breakdown cascade finished");
        Ok(())
    }
}
