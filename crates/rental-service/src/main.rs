//! rentald - Rental back-office daemon
//!
//! Serves the REST API for clients, vehicles and contracts and runs the
//! periodic activation sweep.

use clap::Parser;
use rental_core::StorageConfig;
use rental_service::error::{ServiceError, ServiceResult};
use rental_service::{Server, ServiceConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// rentald CLI
#[derive(Parser)]
#[command(name = "rentald")]
#[command(about = "Rental back office - bookings, returns and breakdowns", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "RENTAL_CONFIG")]
    config: Option<String>,

    /// Listen address
    #[arg(short, long, env = "RENTAL_LISTEN_ADDR")]
    listen: Option<String>,

    /// PostgreSQL URL; in-memory storage is used when absent
    #[arg(long, env = "RENTAL_DATABASE_URL")]
    database_url: Option<String>,

    /// Maximum PostgreSQL connections
    #[arg(long, env = "RENTAL_DATABASE_MAX_CONNECTIONS", default_value_t = 10)]
    max_connections: u32,

    /// Log level
    #[arg(long, env = "RENTAL_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "RENTAL_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> ServiceResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = ServiceConfig::load(cli.config.as_deref())
        .map_err(|e| ServiceError::Config(e.to_string()))?;

    // Override with CLI args
    if let Some(listen) = &cli.listen {
        config.server.listen_addr = listen
            .parse()
            .map_err(|e| ServiceError::Config(format!("Invalid listen address: {}", e)))?;
    }
    if let Some(url) = &cli.database_url {
        config.storage = StorageConfig::postgres(url, cli.max_connections);
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    config.logging.json |= cli.json;

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        listen = %config.server.listen_addr,
        storage = config.storage.label(),
        activation_interval_secs = config.activation.interval_secs,
        "Starting rentald"
    );

    let server = Server::new(config).await?;
    server.run().await
}
