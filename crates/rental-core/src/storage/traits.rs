//! Storage trait definitions

use crate::error::StorageError;
use crate::ids::{ClientId, ContractId, VehicleId};
use crate::period::RentalPeriod;
use crate::types::{Client, ClientDraft, Contract, ContractState, NewContract, NewVehicle, Vehicle};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Records rewritten together by one rule-engine transition.
///
/// A change set is applied all-or-nothing: either every record is written or none is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub contracts: Vec<Contract>,
    pub vehicles: Vec<Vehicle>,
}

impl ChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contract(mut self, contract: Contract) -> Self {
        self.contracts.push(contract);
        self
    }

    pub fn vehicle(mut self, vehicle: Vehicle) -> Self {
        self.vehicles.push(vehicle);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.contracts.is_empty() && self.vehicles.is_empty()
    }
}

/// Combined storage trait
#[async_trait]
pub trait Store: ClientStore + VehicleStore + ContractStore + Send + Sync {
    /// Short backend name for health reporting
    fn backend_label(&self) -> &'static str;

    /// Atomically persist every record in the change set
    async fn commit(&self, changes: ChangeSet) -> StorageResult<()>;
}

/// Storage for clients
#[async_trait]
pub trait ClientStore: Send + Sync {
    /// Insert a client and return it with its assigned id
    async fn insert_client(&self, draft: ClientDraft) -> StorageResult<Client>;

    /// Get a client by ID
    async fn get_client(&self, id: ClientId) -> StorageResult<Option<Client>>;

    /// List all clients ordered by id
    async fn list_clients(&self) -> StorageResult<Vec<Client>>;

    /// Overwrite an existing client
    async fn update_client(&self, client: Client) -> StorageResult<()>;

    /// Delete a client by ID. Fails with `Conflict` while any contract references it.
    async fn delete_client(&self, id: ClientId) -> StorageResult<bool>;

    /// Whether another client already holds this license number
    async fn license_exists(
        &self,
        license_number: &str,
        excluding: Option<ClientId>,
    ) -> StorageResult<bool>;

    /// Whether another client already has this name and birth date
    async fn identity_exists(
        &self,
        last_name: &str,
        first_name: &str,
        birth_date: NaiveDate,
        excluding: Option<ClientId>,
    ) -> StorageResult<bool>;
}

/// Storage for vehicles
#[async_trait]
pub trait VehicleStore: Send + Sync {
    /// Insert a vehicle and return it with its assigned id
    async fn insert_vehicle(&self, vehicle: NewVehicle) -> StorageResult<Vehicle>;

    /// Get a vehicle by ID
    async fn get_vehicle(&self, id: VehicleId) -> StorageResult<Option<Vehicle>>;

    /// List all vehicles ordered by id
    async fn list_vehicles(&self) -> StorageResult<Vec<Vehicle>>;

    /// Overwrite an existing vehicle
    async fn update_vehicle(&self, vehicle: Vehicle) -> StorageResult<()>;

    /// Delete a vehicle by ID. Fails with `Conflict` while any contract references it.
    async fn delete_vehicle(&self, id: VehicleId) -> StorageResult<bool>;

    /// Whether another vehicle already carries this plate
    async fn plate_exists(
        &self,
        plate_number: &str,
        excluding: Option<VehicleId>,
    ) -> StorageResult<bool>;
}

/// Storage for contracts
#[async_trait]
pub trait ContractStore: Send + Sync {
    /// Insert a contract and return it with its assigned id.
    /// Fails with `Conflict` when its client or vehicle does not exist.
    async fn insert_contract(&self, contract: NewContract) -> StorageResult<Contract>;

    /// Get a contract by ID
    async fn get_contract(&self, id: ContractId) -> StorageResult<Option<Contract>>;

    /// List all contracts ordered by id
    async fn list_contracts(&self) -> StorageResult<Vec<Contract>>;

    /// List a vehicle's contracts, optionally restricted to one state
    async fn list_contracts_for_vehicle(
        &self,
        vehicle_id: VehicleId,
        state: Option<ContractState>,
    ) -> StorageResult<Vec<Contract>>;

    /// Active (pending or in progress) contracts of a vehicle overlapping the period
    async fn find_overlapping(
        &self,
        vehicle_id: VehicleId,
        period: &RentalPeriod,
    ) -> StorageResult<Vec<Contract>>;

    /// Overwrite an existing contract
    async fn update_contract(&self, contract: Contract) -> StorageResult<()>;

    /// Delete a contract by ID
    async fn delete_contract(&self, id: ContractId) -> StorageResult<bool>;

    /// Whether any contract references the client
    async fn client_has_contracts(&self, client_id: ClientId) -> StorageResult<bool>;

    /// Whether any contract references the vehicle
    async fn vehicle_has_contracts(&self, vehicle_id: VehicleId) -> StorageResult<bool>;
}
