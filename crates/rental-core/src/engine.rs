use crate::client::ClientRegistry;
use crate::contract::ContractEngine;
use crate::demo::DemoGenerator;
use crate::error::RentalResult;
use crate::locks::VehicleLocks;
use crate::notifier::ContractCascade;
use crate::storage::{StorageConfig, Store};
use crate::vehicle::VehicleEngine;
use std::sync::Arc;

/// Wires the rule engines to one store and one lock table.
///
/// The vehicle engine reports breakdowns to the contract engine through a
/// [`ContractCascade`], so neither engine references the other directly.
pub struct RentalEngine {
    store: Arc<dyn Store>,
    clients: ClientRegistry,
    vehicles: VehicleEngine,
    contracts: Arc<ContractEngine>,
}

impl RentalEngine {
    /// Open the configured storage backend and build the engines on top of it.
    pub async fn bootstrap(config: &StorageConfig) -> RentalResult<Self> {
        let store = config.open().await?;
        tracing::info!(backend = store.backend_label(), "Storage opened");
        Ok(Self::with_store(store))
    }

    pub fn with_store(store: Arc<dyn Store>) -> Self {
        let locks = VehicleLocks::new();
        let contracts = Arc::new(ContractEngine::new(store.clone(), locks.clone()));
        let cascade = Arc::new(ContractCascade::new(contracts.clone()));

        Self {
            clients: ClientRegistry::new(store.clone()),
            vehicles: VehicleEngine::new(store.clone(), locks, cascade),
            contracts,
            store,
        }
    }

    pub fn clients(&self) -> &ClientRegistry {
        &self.clients
    }

    pub fn vehicles(&self) -> &VehicleEngine {
        &self.vehicles
    }

    pub fn contracts(&self) -> &ContractEngine {
        &self.contracts
    }

    pub fn store(&self) -> &Arc<dyn Store> {
        &self.store
    }

    pub fn storage_backend(&self) -> &'static str {
        self.store.backend_label()
    }

    pub fn demo(&self) -> DemoGenerator<'_> {
        DemoGenerator::new(self)
    }
}
