use crate::error::{RentalError, RentalResult};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Inclusive rental date range. `end` is never before `start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RentalPeriod {
    start: NaiveDate,
    end: NaiveDate,
}

impl RentalPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> RentalResult<Self> {
        if end < start {
            return Err(RentalError::Validation(format!(
                "end date {} is before start date {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// Rebuild a period from persisted dates, which were validated on the way in.
    pub(crate) fn from_stored(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            start: start.min(end),
            end: end.max(start),
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Inclusive overlap: `[s1, e1]` and `[s2, e2]` overlap iff `s1 <= e2 && e1 >= s2`.
    pub fn overlaps(&self, other: &RentalPeriod) -> bool {
        self.start <= other.end && self.end >= other.start
    }

    /// Days charged for the period. A same-day rental is one day.
    pub fn billable_days(&self) -> u64 {
        let days = (self.end - self.start).num_days();
        days.max(1) as u64
    }

    pub fn price(&self, daily_price_minor: u64) -> u64 {
        daily_price_minor.saturating_mul(self.billable_days())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn rejects_end_before_start() {
        let err = RentalPeriod::new(date(2025, 1, 10), date(2025, 1, 9)).unwrap_err();
        assert!(matches!(err, RentalError::Validation(_)));
    }

    #[test]
    fn touching_boundaries_overlap() {
        let first = RentalPeriod::new(date(2025, 1, 10), date(2025, 1, 15)).unwrap();
        let touching = RentalPeriod::new(date(2025, 1, 15), date(2025, 1, 20)).unwrap();
        let after = RentalPeriod::new(date(2025, 1, 16), date(2025, 1, 20)).unwrap();

        assert!(first.overlaps(&touching));
        assert!(touching.overlaps(&first));
        assert!(!first.overlaps(&after));
        assert!(!after.overlaps(&first));
    }

    #[test]
    fn same_day_rental_charges_one_day() {
        let period = RentalPeriod::new(date(2025, 3, 1), date(2025, 3, 1)).unwrap();
        assert_eq!(period.billable_days(), 1);
        assert_eq!(period.price(5_000), 5_000);
    }

    #[test]
    fn multi_day_rental_charges_date_difference() {
        let period = RentalPeriod::new(date(2025, 1, 10), date(2025, 1, 15)).unwrap();
        assert_eq!(period.billable_days(), 5);
        assert_eq!(period.price(5_000), 25_000);
    }
}
