//! Attendance engine.
//!
//! This module contains the rules that turn an append-only log of clock
//! events into something people can use:
//!
//! - **Status derivation**: each employee's current in/out state.
//! - **Toggle**: the optimistic clock in/out state machine with a cooldown.
//! - **Auto clock-out**: the once-a-day sweep that clocks out everyone still in.
//! - **Reports**: shift pairing and the date-columned attendance grid.
//!
//! All calendar decisions use the configured zone through [`time_zone`].

pub mod pairing;
pub mod report;
pub mod scheduler;
pub mod status;
pub mod time_zone;
pub mod toggle;

pub use pairing::{group_by_date, pair_entries};
pub use report::{ReportExport, ReportRequest, ReportSettings, build_report, export_report};
pub use scheduler::{AutoClockout, FireTime, SchedulerState, SweepOutcome, TriggerWindow};
pub use status::{derive_status, derive_statuses, search_employees};
pub use time_zone::{date_key, date_label, day_bounds, format_hhmm, last_action_label, local_date};
pub use toggle::{
    ClockToggle, DEFAULT_TOGGLE_COOLDOWN_SECS, TogglePhase, ToggleOutcome, lock_toggle,
    toggle_employee,
};
