//! Contract rule engine: booking, re-dating, late returns, termination,
//! breakdown cascades and automatic activation.

use crate::conflict::ConflictDetector;
use crate::error::{RentalError, RentalResult};
use crate::ids::{ContractId, VehicleId};
use crate::locks::{VehicleGuard, VehicleLocks};
use crate::period::RentalPeriod;
use crate::storage::{ChangeSet, Store};
use crate::types::{
    BookingRequest, Client, Contract, ContractState, NewContract, Vehicle, VehicleState,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of declaring a contract late.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LateDeclaration {
    pub contract: Contract,
    /// Pending contracts on the same vehicle that were cancelled.
    pub cancelled: Vec<ContractId>,
}

/// Outcome of one activation sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationReport {
    pub activated: Vec<ContractId>,
    /// Due contracts left pending because their vehicle was not available.
    pub skipped: Vec<ContractId>,
}

/// Owns every contract state transition.
pub struct ContractEngine {
    store: Arc<dyn Store>,
    conflicts: ConflictDetector,
    locks: VehicleLocks,
}

impl ContractEngine {
    pub fn new(store: Arc<dyn Store>, locks: VehicleLocks) -> Self {
        Self {
            conflicts: ConflictDetector::new(store.clone()),
            store,
            locks,
        }
    }

    /// Book a vehicle. The contract starts `PENDING`.
    pub async fn create(&self, request: BookingRequest) -> RentalResult<Contract> {
        let period = request.period()?;
        let _guard = self.locks.acquire(&[request.vehicle_id]).await;

        let (_, vehicle) = self.resolve_booking(&request, &period, None).await?;

        let contract = self
            .store
            .insert_contract(NewContract {
                client_id: request.client_id,
                vehicle_id: vehicle.id,
                period,
                state: ContractState::Pending,
                total_price_minor: period.price(vehicle.daily_price_minor),
            })
            .await?;

        info!(
            contract_id = %contract.id,
            vehicle_id = %contract.vehicle_id,
            client_id = %contract.client_id,
            start = %contract.start_date,
            end = %contract.end_date,
            "Contract created"
        );
        Ok(contract)
    }

    /// Re-date or re-assign a contract. Its state is kept.
    pub async fn update(&self, id: ContractId, request: BookingRequest) -> RentalResult<Contract> {
        let period = request.period()?;
        let (current, _guard) = self.lock_contract(id, Some(request.vehicle_id)).await?;

        let (client, vehicle) = self.resolve_booking(&request, &period, Some(id)).await?;

        let updated = Contract {
            client_id: client.id,
            vehicle_id: vehicle.id,
            start_date: period.start(),
            end_date: period.end(),
            total_price_minor: period.price(vehicle.daily_price_minor),
            ..current
        };
        self.store.update_contract(updated.clone()).await?;

        info!(contract_id = %id, vehicle_id = %updated.vehicle_id, "Contract updated");
        Ok(updated)
    }

    /// Mark a contract late and cancel every other pending booking of its vehicle.
    ///
    /// Cancellation ignores dates: until the vehicle is back, no future booking on it
    /// can be honoured.
    pub async fn declare_late(&self, id: ContractId) -> RentalResult<LateDeclaration> {
        let (mut contract, _guard) = self.lock_contract(id, None).await?;
        contract.state = ContractState::Late;

        let mut changes = ChangeSet::new().contract(contract.clone());
        let mut cancelled = Vec::new();
        for mut pending in self
            .store
            .list_contracts_for_vehicle(contract.vehicle_id, Some(ContractState::Pending))
            .await?
        {
            if pending.id == contract.id {
                continue;
            }
            pending.state = ContractState::Cancelled;
            cancelled.push(pending.id);
            changes = changes.contract(pending);
        }

        self.store.commit(changes).await?;

        info!(contract_id = %id, vehicle_id = %contract.vehicle_id, "Contract declared late");
        for cancelled_id in &cancelled {
            info!(
                contract_id = %cancelled_id,
                late_contract_id = %id,
                "Pending contract cancelled after late return"
            );
        }

        Ok(LateDeclaration {
            contract,
            cancelled,
        })
    }

    /// Complete an in-progress or late contract and release its vehicle.
    ///
    /// Returns the contract unchanged when it is in any other state. A broken-down
    /// vehicle stays broken down.
    pub async fn terminate(&self, id: ContractId) -> RentalResult<Contract> {
        let (mut contract, _guard) = self.lock_contract(id, None).await?;

        if !contract.state.can_terminate() {
            debug!(contract_id = %id, state = contract.state.as_str(), "Terminate ignored");
            return Ok(contract);
        }

        contract.state = ContractState::Completed;
        let mut changes = ChangeSet::new().contract(contract.clone());

        if let Some(mut vehicle) = self.store.get_vehicle(contract.vehicle_id).await? {
            if vehicle.state != VehicleState::BrokenDown {
                vehicle.state = VehicleState::Available;
                changes = changes.vehicle(vehicle);
            }
        }

        self.store.commit(changes).await?;
        info!(contract_id = %id, vehicle_id = %contract.vehicle_id, "Contract completed");
        Ok(contract)
    }

    /// Cancel every pending contract of a vehicle that just broke down.
    pub async fn on_vehicle_broken_down(&self, vehicle_id: VehicleId) -> RentalResult<Vec<ContractId>> {
        let _guard = self.locks.acquire(&[vehicle_id]).await;

        let pending = self
            .store
            .list_contracts_for_vehicle(vehicle_id, Some(ContractState::Pending))
            .await?;
        if pending.is_empty() {
            return Ok(Vec::new());
        }

        let mut changes = ChangeSet::new();
        let mut cancelled = Vec::with_capacity(pending.len());
        for mut contract in pending {
            contract.state = ContractState::Cancelled;
            cancelled.push(contract.id);
            changes = changes.contract(contract);
        }
        self.store.commit(changes).await?;

        for id in &cancelled {
            info!(contract_id = %id, vehicle_id = %vehicle_id, "Pending contract cancelled after breakdown");
        }
        Ok(cancelled)
    }

    /// Start every pending contract due on or before `today` whose vehicle is available.
    pub async fn auto_activate(&self, today: NaiveDate) -> RentalResult<ActivationReport> {
        let due: Vec<Contract> = self
            .store
            .list_contracts()
            .await?
            .into_iter()
            .filter(|c| is_due(c, today))
            .collect();

        let mut report = ActivationReport::default();
        for candidate in due {
            let _guard = self.locks.acquire(&[candidate.vehicle_id]).await;

            // Re-read under the lock; a cascade may have cancelled it meanwhile.
            let mut contract = match self.store.get_contract(candidate.id).await? {
                Some(c) if c.vehicle_id == candidate.vehicle_id && is_due(&c, today) => c,
                _ => continue,
            };

            let vehicle = self.store.get_vehicle(contract.vehicle_id).await?;
            let mut vehicle = match vehicle {
                Some(v) if v.state == VehicleState::Available => v,
                other => {
                    warn!(
                        contract_id = %contract.id,
                        vehicle_id = %contract.vehicle_id,
                        vehicle_state = other.map(|v| v.state.as_str()).unwrap_or("MISSING"),
                        "Contract due but vehicle not available; left pending"
                    );
                    report.skipped.push(contract.id);
                    continue;
                }
            };

            contract.state = ContractState::InProgress;
            vehicle.state = VehicleState::Rented;
            self.store
                .commit(ChangeSet::new().contract(contract.clone()).vehicle(vehicle))
                .await?;

            info!(contract_id = %contract.id, vehicle_id = %contract.vehicle_id, "Contract activated");
            report.activated.push(contract.id);
        }

        Ok(report)
    }

    pub async fn get(&self, id: ContractId) -> RentalResult<Contract> {
        self.store
            .get_contract(id)
            .await?
            .ok_or_else(|| RentalError::not_found(id))
    }

    pub async fn list(&self) -> RentalResult<Vec<Contract>> {
        Ok(self.store.list_contracts().await?)
    }

    pub async fn delete(&self, id: ContractId) -> RentalResult<()> {
        let (_, _guard) = self.lock_contract(id, None).await?;
        if !self.store.delete_contract(id).await? {
            return Err(RentalError::not_found(id));
        }
        info!(contract_id = %id, "Contract deleted");
        Ok(())
    }

    /// Load a contract while holding the lock of its vehicle (and of `also`, if given).
    ///
    /// The contract is re-read after locking. If an update moved it to another vehicle
    /// in between, the locks are released and taken again.
    async fn lock_contract(
        &self,
        id: ContractId,
        also: Option<VehicleId>,
    ) -> RentalResult<(Contract, VehicleGuard)> {
        loop {
            let seen = self.get(id).await?;
            let mut vehicles = vec![seen.vehicle_id];
            vehicles.extend(also);

            let guard = self.locks.acquire(&vehicles).await;
            let current = self.get(id).await?;
            if current.vehicle_id == seen.vehicle_id {
                return Ok((current, guard));
            }
        }
    }

    /// Checks shared by create and update, run with the vehicle lock held.
    async fn resolve_booking(
        &self,
        request: &BookingRequest,
        period: &RentalPeriod,
        excluded: Option<ContractId>,
    ) -> RentalResult<(Client, Vehicle)> {
        let vehicle = self
            .store
            .get_vehicle(request.vehicle_id)
            .await?
            .ok_or_else(|| RentalError::not_found(request.vehicle_id))?;
        let client = self
            .store
            .get_client(request.client_id)
            .await?
            .ok_or_else(|| RentalError::not_found(request.client_id))?;

        if vehicle.state == VehicleState::BrokenDown {
            return Err(RentalError::Conflict(format!(
                "{} is broken down and cannot be booked",
                vehicle.id
            )));
        }

        if self
            .conflicts
            .has_conflict(vehicle.id, period, excluded)
            .await?
        {
            return Err(RentalError::Conflict(format!(
                "{} is already booked between {} and {}",
                vehicle.id,
                period.start(),
                period.end()
            )));
        }

        Ok((client, vehicle))
    }
}

fn is_due(contract: &Contract, today: NaiveDate) -> bool {
    contract.state == ContractState::Pending && contract.start_date <= today
}
