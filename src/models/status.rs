//! Derived clock status.
//!
//! Status is never stored; it is recomputed from the event log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Direction;

/// Whether an employee is currently clocked in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockStatus {
    /// The latest event is a clock-in.
    In,
    /// The latest event is a clock-out, or there are no events.
    #[default]
    Out,
}

impl ClockStatus {
    /// Returns the direction of the entry a toggle from this status would write.
    pub fn toggle_direction(self) -> Direction {
        match self {
            ClockStatus::In => Direction::Out,
            ClockStatus::Out => Direction::In,
        }
    }
}

impl From<Direction> for ClockStatus {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::In => ClockStatus::In,
            Direction::Out => ClockStatus::Out,
        }
    }
}

/// The derived status of one employee.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeStatus {
    /// Current clock state.
    pub status: ClockStatus,
    /// Timestamp of the most recent entry, if any.
    pub last_entry_at: Option<DateTime<Utc>>,
}
