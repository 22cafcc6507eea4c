//! Demo data for exercising the back office by hand.

use crate::engine::RentalEngine;
use crate::error::{RentalError, RentalResult};
use crate::period::RentalPeriod;
use crate::types::{
    BookingRequest, Client, ClientDraft, Contract, ContractState, NewContract, NewVehicle,
    Vehicle, VehicleState,
};
use chrono::{Days, NaiveDate};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

const LAST_NAMES: &[&str] = &["Dupont", "Martin", "Durand", "Lefebvre", "Moreau", "Dubois", "Garcia"];
const FIRST_NAMES: &[&str] = &["Jean", "Paul", "Marie", "Sophie", "Pierre", "Thomas", "Lucas"];
const MAKES: &[&str] = &["Peugeot", "Renault", "Citroen", "Toyota", "Tesla", "BMW"];
const MODELS: &[&str] = &["208", "Clio", "C3", "Yaris", "Model 3", "Serie 1"];
const COLORS: &[&str] = &["Blanc", "Noir", "Gris", "Bleu", "Rouge"];
const ENGINES: &[&str] = &["Essence", "Diesel", "Electrique", "Hybride"];

/// Daily price of the late-return test vehicle, in minor units.
const SCENARIO_DAILY_PRICE: u64 = 5_000;
const PLATE_ATTEMPTS: usize = 5;

/// Records seeded by [`DemoGenerator::late_scenario`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LateScenario {
    pub vehicle: Vehicle,
    pub client: Client,
    /// Contract A: should have ended yesterday and is still out.
    pub overdue: Contract,
    /// Contract B: next booking of the same vehicle, starting tomorrow.
    pub upcoming: Contract,
}

pub struct DemoGenerator<'a> {
    engine: &'a RentalEngine,
}

impl<'a> DemoGenerator<'a> {
    pub fn new(engine: &'a RentalEngine) -> Self {
        Self { engine }
    }

    pub async fn random_client(&self) -> RentalResult<Client> {
        let draft = {
            let mut rng = StdRng::from_entropy();
            let birth_date = NaiveDate::from_ymd_opt(
                1970 + rng.gen_range(0..30),
                rng.gen_range(1..=12),
                rng.gen_range(1..=28),
            )
            .ok_or_else(|| RentalError::Validation("generated birth date out of range".into()))?;
            let license: String = Uuid::new_v4().simple().to_string()[..8].to_uppercase();

            ClientDraft {
                last_name: pick(&mut rng, LAST_NAMES),
                first_name: pick(&mut rng, FIRST_NAMES),
                birth_date,
                license_number: format!("PERMIS-{}", license),
                address: Some(format!("Rue de Paris {}", rng.gen_range(0..100))),
                email: None,
            }
        };
        self.engine.clients().create(draft).await
    }

    /// Register a random vehicle. Returns `None` when the drawn plate is already taken.
    pub async fn random_vehicle(&self, today: NaiveDate) -> RentalResult<Option<Vehicle>> {
        let vehicle = {
            let mut rng = StdRng::from_entropy();
            let plate = format!("AA-{}-BB", rng.gen_range(100..999));
            let acquired = today
                .checked_sub_days(Days::new(rng.gen_range(0..1000)))
                .unwrap_or(today);
            let mut vehicle = NewVehicle::new(plate, rng.gen_range(6..=24) * 500)
                .with_description(
                    pick(&mut rng, MAKES),
                    pick(&mut rng, MODELS),
                    pick(&mut rng, ENGINES),
                    pick(&mut rng, COLORS),
                )
                .with_state(VehicleState::Available);
            vehicle.acquisition_date = Some(acquired);
            vehicle
        };

        if self
            .engine
            .store()
            .plate_exists(&vehicle.plate_number, None)
            .await?
        {
            info!(plate = %vehicle.plate_number, "Random plate already taken; skipped");
            return Ok(None);
        }
        self.engine.vehicles().create(vehicle).await.map(Some)
    }

    /// Book a random vehicle for a random client through the contract rules, so
    /// conflicts are rejected exactly as for a real booking.
    pub async fn random_contract(&self, today: NaiveDate) -> RentalResult<Contract> {
        let clients = self.engine.clients().list().await?;
        let vehicles = self.engine.vehicles().list().await?;
        if clients.is_empty() || vehicles.is_empty() {
            return Err(RentalError::Validation(
                "at least one client and one vehicle are needed to generate a contract".into(),
            ));
        }

        let request = {
            let mut rng = StdRng::from_entropy();
            let client = &clients[rng.gen_range(0..clients.len())];
            let vehicle = &vehicles[rng.gen_range(0..vehicles.len())];
            let start = add_days(today, rng.gen_range(0..30))?;
            let end = add_days(start, rng.gen_range(1..=10))?;
            BookingRequest::new(client.id, vehicle.id, start, end)
        };
        self.engine.contracts().create(request).await
    }

    /// Seed a rented vehicle with an overdue contract and a booking starting tomorrow.
    ///
    /// Records are written straight to the store; declaring the overdue contract
    /// late should then cancel the upcoming one.
    pub async fn late_scenario(&self, today: NaiveDate) -> RentalResult<LateScenario> {
        let store = self.engine.store();

        let mut vehicle = None;
        for _ in 0..PLATE_ATTEMPTS {
            let plate = format!("LATE-{:04}", StdRng::from_entropy().gen_range(0..10_000));
            if store.plate_exists(&plate, None).await? {
                continue;
            }
            let mut draft = NewVehicle::new(plate, SCENARIO_DAILY_PRICE)
                .with_description("TEST-CAR", "Late-Return", "Essence", "Rouge")
                .with_state(VehicleState::Rented);
            draft.acquisition_date = today.checked_sub_days(Days::new(365));
            vehicle = Some(store.insert_vehicle(draft).await?);
            break;
        }
        let vehicle = vehicle.ok_or_else(|| {
            RentalError::Conflict("no free plate for the late-return test vehicle".into())
        })?;

        let client = match store.list_clients().await?.into_iter().next() {
            Some(client) => client,
            None => {
                store
                    .insert_client(ClientDraft {
                        last_name: "TestUser".to_string(),
                        first_name: "Demo".to_string(),
                        birth_date: NaiveDate::from_ymd_opt(1990, 1, 1).unwrap_or(today),
                        license_number: "DEMO-LICENSE".to_string(),
                        address: None,
                        email: None,
                    })
                    .await?
            }
        };

        let overdue_period = RentalPeriod::new(sub_days(today, 5)?, sub_days(today, 1)?)?;
        let overdue = store
            .insert_contract(NewContract {
                client_id: client.id,
                vehicle_id: vehicle.id,
                period: overdue_period,
                state: ContractState::InProgress,
                total_price_minor: overdue_period.price(vehicle.daily_price_minor),
            })
            .await?;

        let upcoming_period = RentalPeriod::new(add_days(today, 1)?, add_days(today, 4)?)?;
        let upcoming = store
            .insert_contract(NewContract {
                client_id: client.id,
                vehicle_id: vehicle.id,
                period: upcoming_period,
                state: ContractState::Pending,
                total_price_minor: upcoming_period.price(vehicle.daily_price_minor),
            })
            .await?;

        info!(
            vehicle_id = %vehicle.id,
            overdue_id = %overdue.id,
            upcoming_id = %upcoming.id,
            "Late-return scenario seeded"
        );

        Ok(LateScenario {
            vehicle,
            client,
            overdue,
            upcoming,
        })
    }
}

fn pick(rng: &mut StdRng, values: &[&str]) -> String {
    values.choose(rng).copied().unwrap_or_default().to_string()
}

fn add_days(date: NaiveDate, days: u64) -> RentalResult<NaiveDate> {
    date.checked_add_days(Days::new(days))
        .ok_or_else(|| RentalError::Validation(format!("{} + {} days is out of range", date, days)))
}

fn sub_days(date: NaiveDate, days: u64) -> RentalResult<NaiveDate> {
    date.checked_sub_days(Days::new(days))
        .ok_or_else(|| RentalError::Validation(format!("{} - {} days is out of range", date, days)))
}
