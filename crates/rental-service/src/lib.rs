//! Rental back-office service
//!
//! This crate hosts the rule engine behind a REST API and runs the periodic
//! activation sweep:
//! - REST API for clients, vehicles and contracts
//! - Activator promoting due contracts
//! - Configuration loading and server lifecycle

pub mod activator;
pub mod api;
pub mod config;
pub mod error;
pub mod server;

pub use activator::Activator;
pub use config::ServiceConfig;
pub use error::{ApiError, ServiceError};
pub use server::Server;
