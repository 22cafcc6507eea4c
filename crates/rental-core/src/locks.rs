//! Per-vehicle serialization.
//!
//! Every rule that reads a vehicle's calendar and then writes to it (booking, update,
//! activation, breakdown, late declaration, termination) runs while holding that
//! vehicle's lock, so check-then-write sequences cannot interleave.

use crate::ids::VehicleId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type LockTable = HashMap<VehicleId, Arc<AsyncMutex<()>>>;

/// Lock table keyed by vehicle.
///
/// An entry lives only while some caller holds or waits for it, so the table never
/// outgrows the number of vehicles currently in use.
#[derive(Debug, Default, Clone)]
pub struct VehicleLocks {
    inner: Arc<Mutex<LockTable>>,
}

/// Held locks for one or more vehicles. Released on drop.
#[derive(Debug)]
pub struct VehicleGuard {
    table: Arc<Mutex<LockTable>>,
    vehicles: Vec<VehicleId>,
    guards: Vec<OwnedMutexGuard<()>>,
}

impl Drop for VehicleGuard {
    fn drop(&mut self) {
        self.guards.clear();

        let mut table = lock_table(&self.table);
        for id in &self.vehicles {
            // The table's own handle is the last one: nobody holds or awaits this lock.
            if table
                .get(id)
                .is_some_and(|mutex| Arc::strong_count(mutex) == 1)
            {
                table.remove(id);
            }
        }
    }
}

impl VehicleLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock every listed vehicle.
    ///
    /// Ids are deduplicated and locked in ascending order so that two callers
    /// locking overlapping sets never deadlock.
    pub async fn acquire(&self, vehicles: &[VehicleId]) -> VehicleGuard {
        let mut ids = vehicles.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let mutexes: Vec<Arc<AsyncMutex<()>>> = {
            let mut table = lock_table(&self.inner);
            ids.iter()
                .map(|id| table.entry(*id).or_default().clone())
                .collect()
        };

        // Built before awaiting so a cancelled acquire still cleans up its entries.
        let mut guard = VehicleGuard {
            table: self.inner.clone(),
            vehicles: ids,
            guards: Vec::with_capacity(mutexes.len()),
        };
        for mutex in mutexes {
            guard.guards.push(mutex.lock_owned().await);
        }
        guard
    }

    #[cfg(test)]
    pub(crate) fn tracked(&self) -> usize {
        lock_table(&self.inner).len()
    }
}

// The table is only touched in short, panic-free sections; a poisoned lock still
// holds a consistent map.
fn lock_table(table: &Mutex<LockTable>) -> MutexGuard<'_, LockTable> {
    table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn acquire_dedups_repeated_ids() {
        let locks = VehicleLocks::new();
        let guard = locks
            .acquire(&[VehicleId::new(3), VehicleId::new(1), VehicleId::new(3)])
            .await;
        assert_eq!(locks.tracked(), 2);

        drop(guard);
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn second_holder_waits_for_release() {
        let locks = VehicleLocks::new();
        let guard = locks.acquire(&[VehicleId::new(1)]).await;

        let contender = locks.clone();
        let waiting = tokio::spawn(async move {
            let _guard = contender.acquire(&[VehicleId::new(1)]).await;
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiting.is_finished());

        // The waiter keeps the entry alive after the first holder releases it.
        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiting)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn distinct_vehicles_do_not_block() {
        let locks = VehicleLocks::new();
        let _first = locks.acquire(&[VehicleId::new(1)]).await;
        let second = tokio::time::timeout(
            Duration::from_millis(100),
            locks.acquire(&[VehicleId::new(2)]),
        )
        .await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn table_stays_empty_after_many_short_locks() {
        let locks = VehicleLocks::new();
        for id in 1_000..1_500 {
            drop(locks.acquire(&[VehicleId::new(id)]).await);
        }
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn cancelled_acquire_releases_its_entry() {
        let locks = VehicleLocks::new();
        let held = locks.acquire(&[VehicleId::new(1)]).await;

        let pending = tokio::time::timeout(
            Duration::from_millis(20),
            locks.acquire(&[VehicleId::new(1)]),
        )
        .await;
        assert!(pending.is_err());

        drop(held);
        assert_eq!(locks.tracked(), 0);
    }
}
