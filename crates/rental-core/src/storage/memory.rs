//! In-memory storage implementation

use super::traits::*;
use crate::error::StorageError;
use crate::ids::{ClientId, ContractId, VehicleId};
use crate::period::RentalPeriod;
use crate::types::{
    Client, ClientDraft, Contract, ContractState, NewContract, NewVehicle, Vehicle, VehicleState,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;

/// In-memory storage for development and testing.
///
/// Mirrors the constraints of the PostgreSQL schema (license number, client identity,
/// plate number, contract references) so both backends reject the same writes.
///
/// Collections are locked in a fixed order: contracts, clients, vehicles.
#[derive(Debug)]
pub struct InMemoryStore {
    clients: RwLock<BTreeMap<ClientId, Client>>,
    vehicles: RwLock<BTreeMap<VehicleId, Vehicle>>,
    contracts: RwLock<BTreeMap<ContractId, Contract>>,
    client_sequence: AtomicI64,
    vehicle_sequence: AtomicI64,
    contract_sequence: AtomicI64,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            clients: RwLock::new(BTreeMap::new()),
            vehicles: RwLock::new(BTreeMap::new()),
            contracts: RwLock::new(BTreeMap::new()),
            client_sequence: AtomicI64::new(0),
            vehicle_sequence: AtomicI64::new(0),
            contract_sequence: AtomicI64::new(0),
        }
    }

    fn next(sequence: &AtomicI64) -> i64 {
        sequence.fetch_add(1, Ordering::SeqCst) + 1
    }
}

fn client_conflict(
    clients: &BTreeMap<ClientId, Client>,
    candidate: &Client,
) -> Option<StorageError> {
    clients
        .values()
        .filter(|existing| existing.id != candidate.id)
        .find_map(|existing| {
            if existing.license_number == candidate.license_number {
                Some(StorageError::Conflict(format!(
                    "license number {} already registered",
                    candidate.license_number
                )))
            } else if existing.last_name == candidate.last_name
                && existing.first_name == candidate.first_name
                && existing.birth_date == candidate.birth_date
            {
                Some(StorageError::Conflict(format!(
                    "client {} {} born {} already registered",
                    candidate.first_name, candidate.last_name, candidate.birth_date
                )))
            } else {
                None
            }
        })
}

/// Foreign-key check for a contract about to be written.
fn reference_conflict(
    clients: &BTreeMap<ClientId, Client>,
    vehicles: &BTreeMap<VehicleId, Vehicle>,
    contract: &Contract,
) -> Option<StorageError> {
    if !clients.contains_key(&contract.client_id) {
        Some(StorageError::Conflict(format!(
            "referenced {} does not exist",
            contract.client_id
        )))
    } else if !vehicles.contains_key(&contract.vehicle_id) {
        Some(StorageError::Conflict(format!(
            "referenced {} does not exist",
            contract.vehicle_id
        )))
    } else {
        None
    }
}

fn plate_conflict(
    vehicles: &BTreeMap<VehicleId, Vehicle>,
    candidate: &Vehicle,
) -> Option<StorageError> {
    vehicles
        .values()
        .any(|existing| existing.id != candidate.id && existing.plate_number == candidate.plate_number)
        .then(|| {
            StorageError::Conflict(format!(
                "plate number {} already registered",
                candidate.plate_number
            ))
        })
}

#[async_trait]
impl ClientStore for InMemoryStore {
    async fn insert_client(&self, draft: ClientDraft) -> StorageResult<Client> {
        let mut clients = self.clients.write().await;
        let mut client = draft.into_client(ClientId::new(0));
        if let Some(err) = client_conflict(&clients, &client) {
            return Err(err);
        }
        client.id = ClientId::new(Self::next(&self.client_sequence));
        clients.insert(client.id, client.clone());
        Ok(client)
    }

    async fn get_client(&self, id: ClientId) -> StorageResult<Option<Client>> {
        let clients = self.clients.read().await;
        Ok(clients.get(&id).cloned())
    }

    async fn list_clients(&self) -> StorageResult<Vec<Client>> {
        let clients = self.clients.read().await;
        Ok(clients.values().cloned().collect())
    }

    async fn update_client(&self, client: Client) -> StorageResult<()> {
        let mut clients = self.clients.write().await;
        if !clients.contains_key(&client.id) {
            return Err(StorageError::NotFound(format!("{} does not exist", client.id)));
        }
        if let Some(err) = client_conflict(&clients, &client) {
            return Err(err);
        }
        clients.insert(client.id, client);
        Ok(())
    }

    async fn delete_client(&self, id: ClientId) -> StorageResult<bool> {
        let contracts = self.contracts.read().await;
        let mut clients = self.clients.write().await;
        if contracts.values().any(|c| c.client_id == id) {
            return Err(StorageError::Conflict(format!(
                "{} is referenced by contracts",
                id
            )));
        }
        Ok(clients.remove(&id).is_some())
    }

    async fn license_exists(
        &self,
        license_number: &str,
        excluding: Option<ClientId>,
    ) -> StorageResult<bool> {
        let clients = self.clients.read().await;
        Ok(clients
            .values()
            .any(|c| Some(c.id) != excluding && c.license_number == license_number))
    }

    async fn identity_exists(
        &self,
        last_name: &str,
        first_name: &str,
        birth_date: NaiveDate,
        excluding: Option<ClientId>,
    ) -> StorageResult<bool> {
        let clients = self.clients.read().await;
        Ok(clients.values().any(|c| {
            Some(c.id) != excluding
                && c.last_name == last_name
                && c.first_name == first_name
                && c.birth_date == birth_date
        }))
    }
}

#[async_trait]
impl VehicleStore for InMemoryStore {
    async fn insert_vehicle(&self, vehicle: NewVehicle) -> StorageResult<Vehicle> {
        let mut vehicles = self.vehicles.write().await;
        let mut record = Vehicle {
            id: VehicleId::new(0),
            make: vehicle.make,
            model: vehicle.model,
            engine_type: vehicle.engine_type,
            color: vehicle.color,
            plate_number: vehicle.plate_number,
            acquisition_date: vehicle.acquisition_date,
            daily_price_minor: vehicle.daily_price_minor,
            state: vehicle.state.unwrap_or(VehicleState::Available),
        };
        if let Some(err) = plate_conflict(&vehicles, &record) {
            return Err(err);
        }
        record.id = VehicleId::new(Self::next(&self.vehicle_sequence));
        vehicles.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_vehicle(&self, id: VehicleId) -> StorageResult<Option<Vehicle>> {
        let vehicles = self.vehicles.read().await;
        Ok(vehicles.get(&id).cloned())
    }

    async fn list_vehicles(&self) -> StorageResult<Vec<Vehicle>> {
        let vehicles = self.vehicles.read().await;
        Ok(vehicles.values().cloned().collect())
    }

    async fn update_vehicle(&self, vehicle: Vehicle) -> StorageResult<()> {
        let mut vehicles = self.vehicles.write().await;
        if !vehicles.contains_key(&vehicle.id) {
            return Err(StorageError::NotFound(format!("{} does not exist", vehicle.id)));
        }
        if let Some(err) = plate_conflict(&vehicles, &vehicle) {
            return Err(err);
        }
        vehicles.insert(vehicle.id, vehicle);
        Ok(())
    }

    async fn delete_vehicle(&self, id: VehicleId) -> StorageResult<bool> {
        let contracts = self.contracts.read().await;
        let mut vehicles = self.vehicles.write().await;
        if contracts.values().any(|c| c.vehicle_id == id) {
            return Err(StorageError::Conflict(format!(
                "{} is referenced by contracts",
                id
            )));
        }
        Ok(vehicles.remove(&id).is_some())
    }

    async fn plate_exists(
        &self,
        plate_number: &str,
        excluding: Option<VehicleId>,
    ) -> StorageResult<bool> {
        let vehicles = self.vehicles.read().await;
        Ok(vehicles
            .values()
            .any(|v| Some(v.id) != excluding && v.plate_number == plate_number))
    }
}

#[async_trait]
impl ContractStore for InMemoryStore {
    async fn insert_contract(&self, contract: NewContract) -> StorageResult<Contract> {
        let mut contracts = self.contracts.write().await;
        let clients = self.clients.read().await;
        let vehicles = self.vehicles.read().await;

        let mut record = contract.into_contract(ContractId::new(0));
        if let Some(err) = reference_conflict(&clients, &vehicles, &record) {
            return Err(err);
        }
        record.id = ContractId::new(Self::next(&self.contract_sequence));
        contracts.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get_contract(&self, id: ContractId) -> StorageResult<Option<Contract>> {
        let contracts = self.contracts.read().await;
        Ok(contracts.get(&id).cloned())
    }

    async fn list_contracts(&self) -> StorageResult<Vec<Contract>> {
        let contracts = self.contracts.read().await;
        Ok(contracts.values().cloned().collect())
    }

    async fn list_contracts_for_vehicle(
        &self,
        vehicle_id: VehicleId,
        state: Option<ContractState>,
    ) -> StorageResult<Vec<Contract>> {
        let contracts = self.contracts.read().await;
        Ok(contracts
            .values()
            .filter(|c| c.vehicle_id == vehicle_id)
            .filter(|c| state.map_or(true, |s| c.state == s))
            .cloned()
            .collect())
    }

    async fn find_overlapping(
        &self,
        vehicle_id: VehicleId,
        period: &RentalPeriod,
    ) -> StorageResult<Vec<Contract>> {
        let contracts = self.contracts.read().await;
        Ok(contracts
            .values()
            .filter(|c| c.vehicle_id == vehicle_id && c.state.is_active())
            .filter(|c| c.period().overlaps(period))
            .cloned()
            .collect())
    }

    async fn update_contract(&self, contract: Contract) -> StorageResult<()> {
        let mut contracts = self.contracts.write().await;
        let clients = self.clients.read().await;
        let vehicles = self.vehicles.read().await;

        if !contracts.contains_key(&contract.id) {
            return Err(StorageError::NotFound(format!("{} does not exist", contract.id)));
        }
        if let Some(err) = reference_conflict(&clients, &vehicles, &contract) {
            return Err(err);
        }
        contracts.insert(contract.id, contract);
        Ok(())
    }

    async fn delete_contract(&self, id: ContractId) -> StorageResult<bool> {
        let mut contracts = self.contracts.write().await;
        Ok(contracts.remove(&id).is_some())
    }

    async fn client_has_contracts(&self, client_id: ClientId) -> StorageResult<bool> {
        let contracts = self.contracts.read().await;
        Ok(contracts.values().any(|c| c.client_id == client_id))
    }

    async fn vehicle_has_contracts(&self, vehicle_id: VehicleId) -> StorageResult<bool> {
        let contracts = self.contracts.read().await;
        Ok(contracts.values().any(|c| c.vehicle_id == vehicle_id))
    }
}

#[async_trait]
impl Store for InMemoryStore {
    fn backend_label(&self) -> &'static str {
        "memory"
    }

    async fn commit(&self, changes: ChangeSet) -> StorageResult<()> {
        let mut contracts = self.contracts.write().await;
        let clients = self.clients.read().await;
        let mut vehicles = self.vehicles.write().await;

        if let Some(missing) = changes
            .contracts
            .iter()
            .find(|c| !contracts.contains_key(&c.id))
        {
            return Err(StorageError::NotFound(format!("{} does not exist", missing.id)));
        }
        if let Some(missing) = changes
            .vehicles
            .iter()
            .find(|v| !vehicles.contains_key(&v.id))
        {
            return Err(StorageError::NotFound(format!("{} does not exist", missing.id)));
        }

        if let Some(err) = changes
            .contracts
            .iter()
            .find_map(|c| reference_conflict(&clients, &vehicles, c))
        {
            return Err(err);
        }

        for contract in changes.contracts {
            contracts.insert(contract.id, contract);
        }
        for vehicle in changes.vehicles {
            vehicles.insert(vehicle.id, vehicle);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn draft(license: &str) -> ClientDraft {
        ClientDraft {
            last_name: "Martin".to_string(),
            first_name: "Sophie".to_string(),
            birth_date: date(1985, 4, 12),
            license_number: license.to_string(),
            address: None,
            email: None,
        }
    }

    fn booking(
        client_id: ClientId,
        vehicle_id: VehicleId,
        start: NaiveDate,
        end: NaiveDate,
    ) -> NewContract {
        NewContract {
            client_id,
            vehicle_id,
            period: RentalPeriod::new(start, end).unwrap(),
            state: ContractState::Pending,
            total_price_minor: 0,
        }
    }

    async fn seeded() -> (InMemoryStore, Client, Vehicle) {
        let store = InMemoryStore::new();
        let client = store.insert_client(draft("LIC-1")).await.unwrap();
        let vehicle = store
            .insert_vehicle(NewVehicle::new("AA-123-BB", 5_000))
            .await
            .unwrap();
        (store, client, vehicle)
    }

    #[tokio::test]
    async fn test_client_crud() {
        let store = InMemoryStore::new();

        let client = store.insert_client(draft("LIC-1")).await.unwrap();
        assert_eq!(client.id, ClientId::new(1));

        let retrieved = store.get_client(client.id).await.unwrap();
        assert_eq!(retrieved.unwrap().license_number, "LIC-1");

        assert!(store.license_exists("LIC-1", None).await.unwrap());
        assert!(!store.license_exists("LIC-1", Some(client.id)).await.unwrap());

        assert!(store.delete_client(client.id).await.unwrap());
        assert!(store.get_client(client.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_identity_rejected() {
        let store = InMemoryStore::new();
        store.insert_client(draft("LIC-1")).await.unwrap();

        let err = store.insert_client(draft("LIC-2")).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_vehicle_defaults_to_available() {
        let store = InMemoryStore::new();
        let vehicle = store
            .insert_vehicle(NewVehicle::new("AA-123-BB", 5_000))
            .await
            .unwrap();
        assert_eq!(vehicle.state, VehicleState::Available);

        let err = store
            .insert_vehicle(NewVehicle::new("AA-123-BB", 7_000))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_find_overlapping_ignores_inactive_contracts() {
        let (store, client, vehicle) = seeded().await;
        let other = store
            .insert_vehicle(NewVehicle::new("AA-456-BB", 5_000))
            .await
            .unwrap();

        let active = store
            .insert_contract(booking(client.id, vehicle.id, date(2025, 1, 10), date(2025, 1, 15)))
            .await
            .unwrap();
        let mut cancelled = store
            .insert_contract(booking(client.id, vehicle.id, date(2025, 1, 12), date(2025, 1, 13)))
            .await
            .unwrap();
        cancelled.state = ContractState::Cancelled;
        store.update_contract(cancelled).await.unwrap();
        store
            .insert_contract(booking(client.id, other.id, date(2025, 1, 10), date(2025, 1, 15)))
            .await
            .unwrap();

        let probe = RentalPeriod::new(date(2025, 1, 14), date(2025, 1, 20)).unwrap();
        let overlapping = store.find_overlapping(vehicle.id, &probe).await.unwrap();
        assert_eq!(overlapping.len(), 1);
        assert_eq!(overlapping[0].id, active.id);
    }

    #[tokio::test]
    async fn test_commit_is_all_or_nothing() {
        let (store, client, vehicle) = seeded().await;
        let contract = store
            .insert_contract(booking(client.id, vehicle.id, date(2025, 1, 10), date(2025, 1, 15)))
            .await
            .unwrap();

        let mut started = contract.clone();
        started.state = ContractState::InProgress;
        let mut ghost = vehicle.clone();
        ghost.id = VehicleId::new(99);

        let err = store
            .commit(ChangeSet::new().contract(started).vehicle(ghost))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NotFound(_)));

        let unchanged = store.get_contract(contract.id).await.unwrap().unwrap();
        assert_eq!(unchanged.state, ContractState::Pending);
    }

    #[tokio::test]
    async fn test_contract_requires_existing_client_and_vehicle() {
        let (store, client, vehicle) = seeded().await;

        let err = store
            .insert_contract(booking(ClientId::new(42), vehicle.id, date(2025, 1, 1), date(2025, 1, 2)))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));

        let err = store
            .insert_contract(booking(client.id, VehicleId::new(42), date(2025, 1, 1), date(2025, 1, 2)))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));

        assert!(store.list_contracts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_referenced_records_are_not_deleted() {
        let (store, client, vehicle) = seeded().await;

        // A contract written after the caller's own reference check still blocks the delete.
        assert!(!store.client_has_contracts(client.id).await.unwrap());
        let contract = store
            .insert_contract(booking(client.id, vehicle.id, date(2025, 1, 1), date(2025, 1, 2)))
            .await
            .unwrap();

        let err = store.delete_client(client.id).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
        let err = store.delete_vehicle(vehicle.id).await.unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
        assert!(store.get_client(client.id).await.unwrap().is_some());
        assert!(store.get_vehicle(vehicle.id).await.unwrap().is_some());

        assert!(store.delete_contract(contract.id).await.unwrap());
        assert!(store.delete_client(client.id).await.unwrap());
        assert!(store.delete_vehicle(vehicle.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_contract_cannot_be_repointed_at_deleted_client() {
        let (store, client, vehicle) = seeded().await;
        let other = store
            .insert_client(ClientDraft {
                last_name: "Petit".to_string(),
                ..draft("LIC-2")
            })
            .await
            .unwrap();
        let contract = store
            .insert_contract(booking(client.id, vehicle.id, date(2025, 1, 1), date(2025, 1, 2)))
            .await
            .unwrap();
        assert!(store.delete_client(other.id).await.unwrap());

        let err = store
            .update_contract(Contract {
                client_id: other.id,
                ..contract.clone()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Conflict(_)));
        assert_eq!(store.get_contract(contract.id).await.unwrap().unwrap(), contract);
    }
}
