//! Storage layer for clients, vehicles and contracts.
//!
//! The rule engines only talk to the [`Store`] traits. Two backends are provided:
//! an in-memory store for development and tests, and a PostgreSQL store.

mod memory;
mod postgres;
mod traits;

pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use traits::{ChangeSet, ClientStore, ContractStore, StorageResult, Store, VehicleStore};

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Storage backend configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StorageConfig {
    /// Keep all records in process memory
    Memory,

    /// PostgreSQL storage
    Postgres {
        /// Connection URL
        url: String,

        /// Maximum connections in pool
        #[serde(default = "default_pool_size")]
        max_connections: u32,

        /// Connection timeout in seconds
        #[serde(default = "default_connection_timeout")]
        connect_timeout_secs: u64,
    },
}

impl StorageConfig {
    pub fn memory() -> Self {
        Self::Memory
    }

    pub fn postgres(url: impl Into<String>, max_connections: u32) -> Self {
        Self::Postgres {
            url: url.into(),
            max_connections,
            connect_timeout_secs: default_connection_timeout(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Postgres { .. } => "postgres",
        }
    }

    /// Open the configured backend. PostgreSQL schemas are created on first use.
    pub async fn open(&self) -> StorageResult<Arc<dyn Store>> {
        match self {
            Self::Memory => Ok(Arc::new(InMemoryStore::new())),
            Self::Postgres {
                url,
                max_connections,
                connect_timeout_secs,
            } => {
                let store =
                    PostgresStore::connect(url, *max_connections, *connect_timeout_secs).await?;
                Ok(Arc::new(store))
            }
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self::Memory
    }
}

fn default_pool_size() -> u32 {
    10
}

fn default_connection_timeout() -> u64 {
    5
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postgres_config_fills_defaults() {
        let config: StorageConfig =
            serde_json::from_str(r#"{"type":"postgres","url":"postgres://localhost/rental"}"#)
                .unwrap();
        assert_eq!(
            config,
            StorageConfig::Postgres {
                url: "postgres://localhost/rental".to_string(),
                max_connections: 10,
                connect_timeout_secs: 5,
            }
        );
        assert_eq!(config.label(), "postgres");
    }

    #[tokio::test]
    async fn memory_config_opens_memory_store() {
        let store = StorageConfig::memory().open().await.unwrap();
        assert_eq!(store.backend_label(), "memory");
    }
}
