//! Shift pair model.
//!
//! A [`ShiftPair`] is built in report scope by pairing consecutive entries
//! of one employee's log. It is derived, never persisted.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How the report builder treats a log that does not alternate `in`/`out`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingMode {
    /// Only an `in` at an even index starts a pair, and only an `out` at the
    /// following odd index finishes it. An `out` at an even index is dropped
    /// together with its partner slot.
    #[default]
    Strict,
    /// Every even-indexed entry starts a pair whatever its direction. A pair
    /// started by an `out` records only its start time.
    Lenient,
}

/// A (start, finish) pair of clock events for one employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftPair {
    /// When the shift started.
    pub start: DateTime<Utc>,
    /// When the shift finished; absent if the log ends on an unmatched start.
    pub finish: Option<DateTime<Utc>>,
}

impl ShiftPair {
    /// Returns true if the pair has no finish.
    pub fn is_open(&self) -> bool {
        self.finish.is_none()
    }

    /// Calculates the hours between start and finish, rounded to 2 decimal places.
    ///
    /// Returns `None` for an open pair.
    ///
    /// # Examples
    ///
    /// ```
    /// use bundy_engine::models::ShiftPair;
    /// use chrono::{TimeZone, Utc};
    /// use rust_decimal::Decimal;
    ///
    /// let pair = ShiftPair {
    ///     start: Utc.with_ymd_and_hms(2024, 1, 4, 22, 0, 0).unwrap(),
    ///     finish: Some(Utc.with_ymd_and_hms(2024, 1, 5, 6, 30, 0).unwrap()),
    /// };
    /// assert_eq!(pair.worked_hours(), Some(Decimal::new(850, 2))); // 8.5 hours
    /// ```
    pub fn worked_hours(&self) -> Option<Decimal> {
        let finish = self.finish?;
        let minutes = (finish - self.start).num_minutes();
        let mut hours = (Decimal::new(minutes, 0) / Decimal::new(60, 0)).round_dp(2);
        hours.rescale(2);
        Some(hours)
    }
}
