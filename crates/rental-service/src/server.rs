//! Server setup and lifecycle management

use crate::activator::Activator;
use crate::api::create_router;
use crate::api::rest::state::AppState;
use crate::config::ServiceConfig;
use crate::error::{ServiceError, ServiceResult};
use rental_core::RentalEngine;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Rental back-office server
pub struct Server {
    config: ServiceConfig,
    engine: Arc<RentalEngine>,
    activator: Arc<Activator>,
}

impl Server {
    /// Open storage and build the engines for the given configuration
    pub async fn new(config: ServiceConfig) -> ServiceResult<Self> {
        let engine = Arc::new(RentalEngine::bootstrap(&config.storage).await?);
        let activator = Activator::new(config.activation.clone(), engine.clone());

        Ok(Self {
            config,
            engine,
            activator,
        })
    }

    /// Run the server until a shutdown signal arrives
    pub async fn run(self) -> ServiceResult<()> {
        let addr = self.config.server.listen_addr;

        let state = AppState::new(self.engine.clone(), self.activator.clone());
        let app = create_router(state, self.config.server.enable_cors);

        let listener = TcpListener::bind(addr).await?;

        tracing::info!("rentald listening on {}", addr);
        tracing::info!("Storage backend: {}", self.engine.storage_backend());

        if self.config.activation.enabled {
            tokio::spawn(self.activator.clone().start());
        } else {
            tracing::warn!("Activation sweep disabled; contracts start only via /activation/run");
        }

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServiceError::Server(e.to_string()))?;

        tracing::info!("rentald shutting down");

        self.activator.stop().await;

        Ok(())
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
