use crate::error::{RentalError, RentalResult};
use crate::ids::VehicleId;
use crate::locks::VehicleLocks;
use crate::notifier::BreakdownNotifier;
use crate::storage::Store;
use crate::types::{NewVehicle, Vehicle, VehicleState, VehicleUpdate};
use std::sync::Arc;
use tracing::{info, warn};

/// Fleet registration and the breakdown rule.
pub struct VehicleEngine {
    store: Arc<dyn Store>,
    locks: VehicleLocks,
    notifier: Arc<dyn BreakdownNotifier>,
}

impl VehicleEngine {
    pub fn new(
        store: Arc<dyn Store>,
        locks: VehicleLocks,
        notifier: Arc<dyn BreakdownNotifier>,
    ) -> Self {
        Self {
            store,
            locks,
            notifier,
        }
    }

    pub async fn create(&self, vehicle: NewVehicle) -> RentalResult<Vehicle> {
        vehicle.validate()?;
        if self.store.plate_exists(&vehicle.plate_number, None).await? {
            return Err(RentalError::Conflict(format!(
                "plate number {} already registered",
                vehicle.plate_number
            )));
        }

        let vehicle = self.store.insert_vehicle(vehicle).await?;
        info!(vehicle_id = %vehicle.id, plate = %vehicle.plate_number, "Vehicle registered");
        Ok(vehicle)
    }

    /// Mark a vehicle broken down, whatever its current state, then run the
    /// breakdown cascade before returning.
    pub async fn declare_breakdown(&self, id: VehicleId) -> RentalResult<Vehicle> {
        let vehicle = {
            let _guard = self.locks.acquire(&[id]).await;
            let mut vehicle = self.get(id).await?;
            vehicle.state = VehicleState::BrokenDown;
            self.store.update_vehicle(vehicle.clone()).await?;
            vehicle
        };
        warn!(vehicle_id = %id, "Vehicle declared broken down");

        self.notifier.vehicle_broke_down(id).await?;
        Ok(vehicle)
    }

    /// Edit descriptive fields and price. The state is left alone.
    pub async fn update(&self, id: VehicleId, changes: VehicleUpdate) -> RentalResult<Vehicle> {
        changes.validate()?;
        let _guard = self.locks.acquire(&[id]).await;

        let mut vehicle = self.get(id).await?;
        if self
            .store
            .plate_exists(&changes.plate_number, Some(id))
            .await?
        {
            return Err(RentalError::Conflict(format!(
                "plate number {} already registered",
                changes.plate_number
            )));
        }

        changes.apply_to(&mut vehicle);
        self.store.update_vehicle(vehicle.clone()).await?;
        info!(vehicle_id = %id, "Vehicle updated");
        Ok(vehicle)
    }

    /// Remove a vehicle no contract refers to.
    pub async fn delete(&self, id: VehicleId) -> RentalResult<()> {
        let _guard = self.locks.acquire(&[id]).await;
        if self.store.get_vehicle(id).await?.is_none() {
            return Err(RentalError::not_found(id));
        }
        if self.store.vehicle_has_contracts(id).await? {
            return Err(RentalError::Conflict(format!(
                "{} is referenced by contracts",
                id
            )));
        }
        if !self.store.delete_vehicle(id).await? {
            return Err(RentalError::not_found(id));
        }

        info!(vehicle_id = %id, "Vehicle deleted");
        Ok(())
    }

    pub async fn get(&self, id: VehicleId) -> RentalResult<Vehicle> {
        self.store
            .get_vehicle(id)
            .await?
            .ok_or_else(|| RentalError::not_found(id))
    }

    pub async fn list(&self) -> RentalResult<Vec<Vehicle>> {
        Ok(self.store.list_vehicles().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStore;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        seen: Mutex<Vec<VehicleId>>,
    }

    #[async_trait]
    impl BreakdownNotifier for RecordingNotifier {
        async fn vehicle_broke_down(&self, vehicle_id: VehicleId) -> RentalResult<()> {
            self.seen.lock().unwrap().push(vehicle_id);
            Ok(())
        }
    }

    fn engine() -> (VehicleEngine, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::default());
        let engine = VehicleEngine::new(
            Arc::new(InMemoryStore::new()),
            VehicleLocks::new(),
            notifier.clone(),
        );
        (engine, notifier)
    }

    fn update(plate: &str) -> VehicleUpdate {
        VehicleUpdate {
            make: "Renault".to_string(),
            model: "Clio".to_string(),
            engine_type: "Diesel".to_string(),
            color: "Gris".to_string(),
            plate_number: plate.to_string(),
            acquisition_date: None,
            daily_price_minor: 4_500,
        }
    }

    #[tokio::test]
    async fn duplicate_plate_is_a_conflict() {
        let (engine, _) = engine();
        engine.create(NewVehicle::new("AA-123-BB", 5_000)).await.unwrap();
        let err = engine
            .create(NewVehicle::new("AA-123-BB", 6_000))
            .await
            .unwrap_err();
        assert!(matches!(err, RentalError::Conflict(_)));
    }

    #[tokio::test]
    async fn breakdown_overrides_state_and_notifies() {
        let (engine, notifier) = engine();
        let vehicle = engine
            .create(NewVehicle::new("AA-123-BB", 5_000).with_state(VehicleState::Rented))
            .await
            .unwrap();

        let broken = engine.declare_breakdown(vehicle.id).await.unwrap();
        assert_eq!(broken.state, VehicleState::BrokenDown);
        assert_eq!(*notifier.seen.lock().unwrap(), vec![vehicle.id]);
    }

    #[tokio::test]
    async fn breakdown_of_unknown_vehicle_is_not_found() {
        let (engine, notifier) = engine();
        let err = engine.declare_breakdown(VehicleId::new(9)).await.unwrap_err();
        assert!(matches!(err, RentalError::NotFound(_)));
        assert!(notifier.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn update_keeps_state_and_allows_own_plate() {
        let (engine, _) = engine();
        let vehicle = engine
            .create(NewVehicle::new("AA-123-BB", 5_000).with_state(VehicleState::Rented))
            .await
            .unwrap();

        let updated = engine.update(vehicle.id, update("AA-123-BB")).await.unwrap();
        assert_eq!(updated.state, VehicleState::Rented);
        assert_eq!(updated.daily_price_minor, 4_500);
        assert_eq!(updated.make, "Renault");
    }

    #[tokio::test]
    async fn update_to_taken_plate_is_a_conflict() {
        let (engine, _) = engine();
        engine.create(NewVehicle::new("AA-111-BB", 5_000)).await.unwrap();
        let second = engine.create(NewVehicle::new("AA-222-BB", 5_000)).await.unwrap();

        let err = engine.update(second.id, update("AA-111-BB")).await.unwrap_err();
        assert!(matches!(err, RentalError::Conflict(_)));
    }

    #[tokio::test]
    async fn delete_unreferenced_vehicle() {
        let (engine, _) = engine();
        let vehicle = engine.create(NewVehicle::new("AA-123-BB", 5_000)).await.unwrap();
        engine.delete(vehicle.id).await.unwrap();
        assert!(matches!(
            engine.get(vehicle.id).await.unwrap_err(),
            RentalError::NotFound(_)
        ));
    }
}
