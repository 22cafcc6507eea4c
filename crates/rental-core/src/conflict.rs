use crate::error::RentalResult;
use crate::ids::{ContractId, VehicleId};
use crate::period::RentalPeriod;
use crate::storage::Store;
use crate::types::Contract;
use std::sync::Arc;

/// Finds active contracts competing for a vehicle's calendar.
///
/// Only `PENDING` and `IN_PROGRESS` contracts hold a slot. `LATE` contracts do not,
/// even though the vehicle is physically still out.
#[derive(Clone)]
pub struct ConflictDetector {
    store: Arc<dyn Store>,
}

impl ConflictDetector {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn find_overlapping(
        &self,
        vehicle_id: VehicleId,
        period: &RentalPeriod,
    ) -> RentalResult<Vec<Contract>> {
        Ok(self.store.find_overlapping(vehicle_id, period).await?)
    }

    /// Overlapping contracts other than `excluded`, used when a contract is re-dated.
    pub async fn find_overlapping_except(
        &self,
        vehicle_id: VehicleId,
        period: &RentalPeriod,
        excluded: ContractId,
    ) -> RentalResult<Vec<Contract>> {
        let mut overlapping = self.find_overlapping(vehicle_id, period).await?;
        overlapping.retain(|contract| contract.id != excluded);
        Ok(overlapping)
    }

    pub async fn has_conflict(
        &self,
        vehicle_id: VehicleId,
        period: &RentalPeriod,
        excluded: Option<ContractId>,
    ) -> RentalResult<bool> {
        let overlapping = match excluded {
            Some(id) => self.find_overlapping_except(vehicle_id, period, id).await?,
            None => self.find_overlapping(vehicle_id, period).await?,
        };
        Ok(!overlapping.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ClientStore, ContractStore, InMemoryStore, VehicleStore};
    use crate::types::{ClientDraft, ContractState, NewContract, NewVehicle};
    use chrono::NaiveDate;

    fn date(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    fn period(start: u32, end: u32) -> RentalPeriod {
        RentalPeriod::new(date(start), date(end)).unwrap()
    }

    async fn seeded(state: ContractState) -> (ConflictDetector, Contract) {
        let store = Arc::new(InMemoryStore::new());
        let client = store
            .insert_client(ClientDraft {
                last_name: "Roux".to_string(),
                first_name: "Emma".to_string(),
                birth_date: NaiveDate::from_ymd_opt(1992, 8, 30).unwrap(),
                license_number: "PERMIS-C0NF1".to_string(),
                address: None,
                email: None,
            })
            .await
            .unwrap();
        let vehicle = store
            .insert_vehicle(NewVehicle::new("AA-001-BB", 5_000))
            .await
            .unwrap();
        assert_eq!(vehicle.id, VehicleId::new(1));

        let contract = store
            .insert_contract(NewContract {
                client_id: client.id,
                vehicle_id: vehicle.id,
                period: period(10, 15),
                state,
                total_price_minor: 0,
            })
            .await
            .unwrap();
        (ConflictDetector::new(store), contract)
    }

    #[tokio::test]
    async fn touching_end_date_conflicts() {
        let (detector, _) = seeded(ContractState::Pending).await;
        assert!(detector
            .has_conflict(VehicleId::new(1), &period(15, 20), None)
            .await
            .unwrap());
        assert!(!detector
            .has_conflict(VehicleId::new(1), &period(16, 20), None)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn late_contracts_do_not_block() {
        let (detector, _) = seeded(ContractState::Late).await;
        assert!(!detector
            .has_conflict(VehicleId::new(1), &period(12, 13), None)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn excluded_contract_is_ignored() {
        let (detector, contract) = seeded(ContractState::InProgress).await;
        assert!(!detector
            .has_conflict(VehicleId::new(1), &period(11, 14), Some(contract.id))
            .await
            .unwrap());
    }
}
