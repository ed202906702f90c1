//! Time entry model.
//!
//! A [`TimeEntry`] is one immutable clock event in the append-only log.
//! Entries are created by a clock toggle or by the auto clock-out sweep and
//! are never updated or deleted by the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The direction of a clock event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Clocking in.
    In,
    /// Clocking out.
    Out,
}

impl Direction {
    /// Returns the other direction.
    ///
    /// ```
    /// use bundy_engine::models::Direction;
    ///
    /// assert_eq!(Direction::In.opposite(), Direction::Out);
    /// assert_eq!(Direction::Out.opposite(), Direction::In);
    /// ```
    pub fn opposite(self) -> Self {
        match self {
            Direction::In => Direction::Out,
            Direction::Out => Direction::In,
        }
    }

    /// Returns the wire form, `"in"` or `"out"`.
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored clock event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeEntry {
    /// Store-assigned sequence number. Strictly increasing in insertion order.
    pub id: u64,
    /// The employee this event belongs to.
    pub employee_id: String,
    /// Whether this is a clock-in or clock-out.
    pub direction: Direction,
    /// When the event happened (an instant, not local wall time).
    pub created_at: DateTime<Utc>,
}

impl TimeEntry {
    /// Ordering key used wherever entries are sorted by time.
    ///
    /// Equal timestamps fall back to the sequence number so that sorting is
    /// deterministic regardless of store order.
    pub fn sort_key(&self) -> (DateTime<Utc>, u64) {
        (self.created_at, self.id)
    }
}

/// An entry about to be appended to the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewTimeEntry {
    /// The employee this event belongs to.
    pub employee_id: String,
    /// Whether this is a clock-in or clock-out.
    pub direction: Direction,
    /// When the event happened.
    pub created_at: DateTime<Utc>,
}

impl NewTimeEntry {
    /// Creates a new entry for the given employee.
    pub fn new(
        employee_id: impl Into<String>,
        direction: Direction,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            employee_id: employee_id.into(),
            direction,
            created_at,
        }
    }
}
