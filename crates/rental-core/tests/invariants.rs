//! Property tests for the booking calendar.

use chrono::{Days, NaiveDate};
use proptest::prelude::*;
use rental_core::{
    BookingRequest, ClientDraft, InMemoryStore, NewVehicle, RentalEngine, RentalError, VehicleId,
};
use std::sync::Arc;

#[derive(Debug, Clone)]
enum Op {
    Book { vehicle: usize, offset: u64, length: u64 },
    Redate { contract: usize, offset: u64, length: u64 },
    Activate { offset: u64 },
    Late { contract: usize },
    Terminate { contract: usize },
    Breakdown { vehicle: usize },
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (0usize..3, 0u64..40, 0u64..8)
            .prop_map(|(vehicle, offset, length)| Op::Book { vehicle, offset, length }),
        2 => (0usize..16, 0u64..40, 0u64..8)
            .prop_map(|(contract, offset, length)| Op::Redate { contract, offset, length }),
        1 => (0u64..40).prop_map(|offset| Op::Activate { offset }),
        1 => (0usize..16).prop_map(|contract| Op::Late { contract }),
        1 => (0usize..16).prop_map(|contract| Op::Terminate { contract }),
        1 => (0usize..3).prop_map(|vehicle| Op::Breakdown { vehicle }),
    ]
}

fn day(offset: u64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1)
        .unwrap()
        .checked_add_days(Days::new(offset))
        .unwrap()
}

async fn run(ops: Vec<Op>) -> Result<(), TestCaseError> {
    let engine = RentalEngine::with_store(Arc::new(InMemoryStore::new()));
    let client = engine
        .clients()
        .create(ClientDraft {
            last_name: "Garcia".to_string(),
            first_name: "Lucas".to_string(),
            birth_date: NaiveDate::from_ymd_opt(1985, 5, 5).unwrap(),
            license_number: "PERMIS-PROPTEST".to_string(),
            address: None,
            email: None,
        })
        .await
        .unwrap();

    let mut vehicles: Vec<VehicleId> = Vec::new();
    for i in 0..3 {
        let vehicle = engine
            .vehicles()
            .create(NewVehicle::new(format!("AA-{}00-BB", i + 1), 5_000))
            .await
            .unwrap();
        vehicles.push(vehicle.id);
    }

    let mut contracts = Vec::new();
    for op in ops {
        let result = match op {
            Op::Book { vehicle, offset, length } => {
                let request = BookingRequest::new(
                    client.id,
                    vehicles[vehicle],
                    day(offset),
                    day(offset + length),
                );
                engine.contracts().create(request).await.map(|c| contracts.push(c.id))
            }
            Op::Redate { contract, offset, length } => match contracts.get(contract) {
                Some(id) => {
                    let current = engine.contracts().get(*id).await.unwrap();
                    let request = BookingRequest::new(
                        client.id,
                        current.vehicle_id,
                        day(offset),
                        day(offset + length),
                    );
                    engine.contracts().update(*id, request).await.map(|_| ())
                }
                None => Ok(()),
            },
            Op::Activate { offset } => engine
                .contracts()
                .auto_activate(day(offset))
                .await
                .map(|_| ()),
            Op::Late { contract } => match contracts.get(contract) {
                Some(id) => engine.contracts().declare_late(*id).await.map(|_| ()),
                None => Ok(()),
            },
            Op::Terminate { contract } => match contracts.get(contract) {
                Some(id) => engine.contracts().terminate(*id).await.map(|_| ()),
                None => Ok(()),
            },
            Op::Breakdown { vehicle } => engine
                .vehicles()
                .declare_breakdown(vehicles[vehicle])
                .await
                .map(|_| ()),
        };

        match result {
            Ok(()) | Err(RentalError::Conflict(_)) => {}
            Err(other) => return Err(TestCaseError::fail(format!("unexpected error: {other}"))),
        }
    }

    let all = engine.contracts().list().await.unwrap();
    let active: Vec<_> = all.iter().filter(|c| c.state.is_active()).collect();
    for (i, a) in active.iter().enumerate() {
        for b in &active[i + 1..] {
            if a.vehicle_id == b.vehicle_id {
                prop_assert!(
                    !a.period().overlaps(&b.period()),
                    "{} and {} overlap on {}",
                    a.id,
                    b.id,
                    a.vehicle_id
                );
            }
        }
    }

    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Active contracts of one vehicle never overlap, whatever the operation sequence.
    #[test]
    fn active_contracts_never_overlap(ops in prop::collection::vec(arb_op(), 1..40)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(run(ops))?;
    }
}
