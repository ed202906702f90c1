//! Application state for the kiosk API.
//!
//! This module defines the shared application state that is available
//! to all request handlers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use crate::attendance::{ClockToggle, lock_toggle};
use crate::clock::Clock;
use crate::config::KioskConfig;
use crate::models::ClockStatus;
use crate::store::{EmployeeDirectory, EventStore};

/// Shared application state.
///
/// Contains the validated configuration, the storage collaborators, the
/// clock, and one [`ClockToggle`] per employee that has been toggled through
/// this process.
#[derive(Clone)]
pub struct AppState {
    config: Arc<KioskConfig>,
    store: Arc<dyn EventStore>,
    directory: Arc<dyn EmployeeDirectory>,
    clock: Arc<dyn Clock>,
    toggles: Arc<Mutex<HashMap<String, Arc<Mutex<ClockToggle>>>>>,
}

impl AppState {
    /// Creates a new application state.
    pub fn new(
        config: KioskConfig,
        store: Arc<dyn EventStore>,
        directory: Arc<dyn EmployeeDirectory>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            directory,
            clock,
            toggles: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns the kiosk configuration.
    pub fn config(&self) -> &KioskConfig {
        &self.config
    }

    /// Returns the event store.
    pub fn store(&self) -> &dyn EventStore {
        self.store.as_ref()
    }

    /// Returns the employee directory.
    pub fn directory(&self) -> &dyn EmployeeDirectory {
        self.directory.as_ref()
    }

    /// Returns the clock.
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Returns the toggle state machine for an employee, creating it on first use.
    ///
    /// The confirmed status starts as `out`; every toggle re-derives it from
    /// the store before writing.
    pub fn toggle_for(&self, employee_id: &str) -> Arc<Mutex<ClockToggle>> {
        let mut toggles = self.toggles.lock().unwrap_or_else(PoisonError::into_inner);
        toggles
            .entry(employee_id.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(ClockToggle::new(
                    employee_id,
                    ClockStatus::Out,
                    self.config.cooldown(),
                )))
            })
            .clone()
    }

    /// Returns the optimistic status of every employee with a toggle write
    /// in flight.
    pub fn pending_statuses(&self) -> HashMap<String, ClockStatus> {
        let toggles = self.toggles.lock().unwrap_or_else(PoisonError::into_inner);
        toggles
            .iter()
            .filter_map(|(id, toggle)| {
                lock_toggle(toggle)
                    .pending_status()
                    .map(|status| (id.clone(), status))
            })
            .collect()
    }
}
