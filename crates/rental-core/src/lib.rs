//! Rental back-office core.
//!
//! This crate owns the business rules for a vehicle rental fleet: client and vehicle
//! registration, booking conflict detection, the contract lifecycle, and the cascades
//! triggered by breakdowns and late returns. Persistence is reached through the
//! [`Store`] traits so the same rules run against memory or PostgreSQL.

#![deny(unsafe_code)]

pub mod client;
pub mod conflict;
pub mod contract;
pub mod demo;
pub mod engine;
pub mod error;
pub mod ids;
pub mod locks;
pub mod notifier;
pub mod period;
pub mod storage;
pub mod types;
pub mod vehicle;

pub use client::ClientRegistry;
pub use conflict::ConflictDetector;
pub use contract::{ActivationReport, ContractEngine, LateDeclaration};
pub use demo::{DemoGenerator, LateScenario};
pub use engine::RentalEngine;
pub use error::{RentalError, RentalResult, StorageError};
pub use ids::{ClientId, ContractId, VehicleId};
pub use locks::{VehicleGuard, VehicleLocks};
pub use notifier::{BreakdownNotifier, ContractCascade};
pub use period::RentalPeriod;
pub use storage::{
    ChangeSet, ClientStore, ContractStore, InMemoryStore, PostgresStore, StorageConfig, Store,
    StorageResult, VehicleStore,
};
pub use types::{
    BookingRequest, Client, ClientDraft, Contract, ContractState, NewContract, NewVehicle,
    Vehicle, VehicleState, VehicleUpdate,
};
pub use vehicle::VehicleEngine;
