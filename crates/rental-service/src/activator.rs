//! Periodic activation sweep

use crate::config::ActivationConfig;
use chrono::Local;
use rental_core::{ActivationReport, RentalEngine, RentalResult};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Promotes due contracts on a fixed interval.
pub struct Activator {
    config: ActivationConfig,
    engine: Arc<RentalEngine>,
    running: Arc<RwLock<bool>>,
}

impl Activator {
    pub fn new(config: ActivationConfig, engine: Arc<RentalEngine>) -> Arc<Self> {
        Arc::new(Self {
            config,
            engine,
            running: Arc::new(RwLock::new(false)),
        })
    }

    /// Run the sweep loop until [`Activator::stop`] is called.
    ///
    /// A failed sweep is logged and the loop keeps going.
    pub async fn start(self: Arc<Self>) {
        {
            let mut running = self.running.write().await;
            *running = true;
        }

        let period = Duration::from_secs(self.config.interval_secs.max(1));
        tracing::info!(interval_secs = period.as_secs(), "Activator started");

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            let running = self.running.read().await;
            if !*running {
                break;
            }
            drop(running);

            if let Err(e) = self.run_once().await {
                tracing::error!(error = %e, "Activation sweep failed");
            }
        }

        tracing::info!("Activator stopped");
    }

    /// Stop the sweep loop after the current tick.
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Sweep once using today's local date.
    pub async fn run_once(&self) -> RentalResult<ActivationReport> {
        let today = Local::now().date_naive();
        let report = self.engine.contracts().auto_activate(today).await?;

        if report.activated.is_empty() && report.skipped.is_empty() {
            tracing::debug!(%today, "No contracts due");
        } else {
            tracing::info!(
                %today,
                activated = report.activated.len(),
                skipped = report.skipped.len(),
                "Activation sweep finished"
            );
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rental_core::{
        BookingRequest, ClientDraft, ContractState, InMemoryStore, NewVehicle, VehicleState,
    };

    async fn engine_with_contract_due_today() -> (Arc<RentalEngine>, rental_core::ContractId) {
        let engine = Arc::new(RentalEngine::with_store(Arc::new(InMemoryStore::new())));
        let client = engine
            .clients()
            .create(ClientDraft {
                last_name: "Dupont".to_string(),
                first_name: "Jean".to_string(),
                birth_date: chrono::NaiveDate::from_ymd_opt(1975, 3, 8).unwrap(),
                license_number: "PERMIS-ACT00001".to_string(),
                address: None,
                email: None,
            })
            .await
            .unwrap();
        let vehicle = engine
            .vehicles()
            .create(NewVehicle::new("AA-555-BB", 5_000))
            .await
            .unwrap();
        let today = Local::now().date_naive();
        let contract = engine
            .contracts()
            .create(BookingRequest::new(client.id, vehicle.id, today, today))
            .await
            .unwrap();
        (engine, contract.id)
    }

    #[tokio::test]
    async fn run_once_activates_contracts_starting_today() {
        let (engine, contract_id) = engine_with_contract_due_today().await;
        let activator = Activator::new(ActivationConfig::default(), engine.clone());

        let report = activator.run_once().await.unwrap();
        assert_eq!(report.activated, vec![contract_id]);

        let contract = engine.contracts().get(contract_id).await.unwrap();
        assert_eq!(contract.state, ContractState::InProgress);
        let vehicle = engine.vehicles().get(contract.vehicle_id).await.unwrap();
        assert_eq!(vehicle.state, VehicleState::Rented);
    }

    #[tokio::test]
    async fn loop_sweeps_until_stopped() {
        let (engine, contract_id) = engine_with_contract_due_today().await;
        let activator = Activator::new(
            ActivationConfig {
                enabled: true,
                interval_secs: 1,
            },
            engine.clone(),
        );

        let handle = tokio::spawn(activator.clone().start());

        // The first tick fires immediately.
        let mut activated = false;
        for _ in 0..50 {
            let contract = engine.contracts().get(contract_id).await.unwrap();
            if contract.state == ContractState::InProgress {
                activated = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(activated);
        assert!(activator.is_running().await);

        activator.stop().await;
        tokio::time::timeout(Duration::from_secs(3), handle)
            .await
            .unwrap()
            .unwrap();
        assert!(!activator.is_running().await);
    }
}
