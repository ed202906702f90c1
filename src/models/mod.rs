//! Core data models for the bundy attendance engine.
//!
//! This module contains all the domain models used throughout the engine.

mod employee;
mod report;
mod shift_pair;
mod status;
mod time_entry;

pub use employee::Employee;
pub use report::{EmployeeSummary, Report};
pub use shift_pair::{PairingMode, ShiftPair};
pub use status::{ClockStatus, EmployeeStatus};
pub use time_entry::{Direction, NewTimeEntry, TimeEntry};
