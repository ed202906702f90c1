//! Clock in/out toggle.
//!
//! A toggle reads the employee's derived status, writes an entry in the
//! opposite direction and reports the new status immediately, before the
//! write is confirmed. [`ClockToggle`] is the per-employee state machine
//! that keeps that optimistic status honest:
//!
//! ```text
//!            begin()               confirm()
//!   Idle ───────────────▶ OptimisticPending ───────────▶ Idle (+cooldown)
//!    ▲                            │
//!    │ acknowledge_revert()       │ fail()
//!    └──────────── Reverting ◀────┘
//! ```
//!
//! The visible status is the pending override while a write is in flight,
//! otherwise the last confirmed status.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::Clock;
use crate::error::{BundyError, BundyResult};
use crate::models::{ClockStatus, Direction, NewTimeEntry, TimeEntry};
use crate::store::{EntryQuery, EventStore};

use super::status::derive_status;

/// Default window after a successful toggle during which toggles are refused.
pub const DEFAULT_TOGGLE_COOLDOWN_SECS: i64 = 2;

/// The phase of a [`ClockToggle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TogglePhase {
    /// No write in flight.
    Idle,
    /// A write was issued and its optimistic status is being shown.
    OptimisticPending,
    /// The last write failed; the confirmed status is shown again.
    Reverting,
}

/// Per-employee toggle state.
#[derive(Debug, Clone)]
pub struct ClockToggle {
    employee_id: String,
    confirmed: ClockStatus,
    pending: Option<ClockStatus>,
    phase: TogglePhase,
    cooldown: Duration,
    cooldown_until: Option<DateTime<Utc>>,
}

impl ClockToggle {
    /// Creates an idle toggle whose confirmed status is `confirmed`.
    pub fn new(employee_id: impl Into<String>, confirmed: ClockStatus, cooldown: Duration) -> Self {
        Self {
            employee_id: employee_id.into(),
            confirmed,
            pending: None,
            phase: TogglePhase::Idle,
            cooldown,
            cooldown_until: None,
        }
    }

    /// Returns the employee this toggle belongs to.
    pub fn employee_id(&self) -> &str {
        &self.employee_id
    }

    /// Returns the current phase.
    pub fn phase(&self) -> TogglePhase {
        self.phase
    }

    /// Returns the last status confirmed by the store.
    pub fn confirmed(&self) -> ClockStatus {
        self.confirmed
    }

    /// Returns the status to show: the optimistic one while pending.
    pub fn visible_status(&self) -> ClockStatus {
        self.pending.unwrap_or(self.confirmed)
    }

    /// Returns the time left in the cooldown window, if any.
    pub fn cooldown_remaining(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.cooldown_until
            .filter(|until| *until > now)
            .map(|until| until - now)
    }

    /// Checks that a toggle could begin at `now` without changing anything.
    ///
    /// # Errors
    ///
    /// Same as [`ClockToggle::begin`].
    pub fn ensure_ready(&self, now: DateTime<Utc>) -> BundyResult<()> {
        if self.phase == TogglePhase::OptimisticPending {
            return Err(BundyError::ToggleInFlight {
                employee_id: self.employee_id.clone(),
            });
        }
        if let Some(remaining) = self.cooldown_remaining(now) {
            return Err(BundyError::CooldownActive {
                employee_id: self.employee_id.clone(),
                remaining_ms: remaining.num_milliseconds(),
            });
        }
        Ok(())
    }

    /// Returns the optimistic status while a write is in flight.
    pub fn pending_status(&self) -> Option<ClockStatus> {
        (self.phase == TogglePhase::OptimisticPending)
            .then_some(self.pending)
            .flatten()
    }

    /// Starts a toggle, switching the visible status optimistically.
    ///
    /// Returns the direction of the entry the caller must write.
    ///
    /// # Errors
    ///
    /// - `ToggleInFlight` if a previous toggle is still pending
    /// - `CooldownActive` if called within the cooldown window
    pub fn begin(&mut self, now: DateTime<Utc>) -> BundyResult<Direction> {
        self.ensure_ready(now)?;

        let direction = self.confirmed.toggle_direction();
        self.pending = Some(ClockStatus::from(direction));
        self.phase = TogglePhase::OptimisticPending;
        Ok(direction)
    }

    /// Marks the pending write as stored and starts the cooldown.
    pub fn confirm(&mut self, now: DateTime<Utc>) {
        if let Some(status) = self.pending.take() {
            self.confirmed = status;
        }
        self.phase = TogglePhase::Idle;
        self.cooldown_until = Some(now + self.cooldown);
    }

    /// Drops the optimistic status after a failed write.
    pub fn fail(&mut self) {
        self.pending = None;
        self.phase = TogglePhase::Reverting;
    }

    /// Clears the revert once the failure has been shown to the user.
    pub fn acknowledge_revert(&mut self) {
        if self.phase == TogglePhase::Reverting {
            self.phase = TogglePhase::Idle;
        }
    }

    /// Replaces the confirmed status with a freshly derived one.
    ///
    /// Ignored while a write is pending; the pending write's own outcome
    /// decides the next confirmed status.
    pub fn sync(&mut self, confirmed: ClockStatus) {
        if self.phase != TogglePhase::OptimisticPending {
            self.confirmed = confirmed;
        }
    }
}

/// The result of a successful toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    /// The entry that was written.
    pub entry: TimeEntry,
    /// The employee's status after the write.
    pub status: ClockStatus,
}

/// Locks a toggle. The machine holds no invariant a panicking holder could
/// break halfway, so a poisoned lock is still usable.
pub fn lock_toggle(toggle: &Mutex<ClockToggle>) -> MutexGuard<'_, ClockToggle> {
    toggle.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Reverts a begun toggle if its write never settles, e.g. when the caller
/// is dropped while the insert is awaited.
struct PendingWrite<'a> {
    toggle: &'a Mutex<ClockToggle>,
    settled: bool,
}

impl PendingWrite<'_> {
    fn settle(mut self, result: &BundyResult<TimeEntry>, now: DateTime<Utc>) {
        let mut toggle = lock_toggle(self.toggle);
        match result {
            Ok(_) => toggle.confirm(now),
            Err(_) => toggle.fail(),
        }
        self.settled = true;
    }
}

impl Drop for PendingWrite<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut toggle = lock_toggle(self.toggle);
        warn!(
            employee_id = %toggle.employee_id(),
            "Toggle abandoned before its write finished, reverting"
        );
        toggle.fail();
        toggle.acknowledge_revert();
    }
}

/// Runs one toggle end to end against the store.
///
/// Re-reads the employee's latest entry, begins the toggle, writes the entry
/// and confirms or reverts. A failed read leaves the toggle untouched; a
/// failed write reverts it and returns the (retryable) store error. If the
/// returned future is dropped mid-write the toggle reverts to idle, so the
/// employee is never left stuck in flight.
///
/// The lock on `toggle` is only held between awaits, so readers can see the
/// optimistic status while the write is pending.
pub async fn toggle_employee(
    store: &dyn EventStore,
    toggle: &Mutex<ClockToggle>,
    clock: &dyn Clock,
) -> BundyResult<ToggleOutcome> {
    let employee_id = lock_toggle(toggle).employee_id().to_string();

    let latest = store
        .query(&EntryQuery::latest_for(vec![employee_id.clone()]))
        .await?;
    let derived = derive_status(&employee_id, &latest).status;

    let now = clock.now();
    let direction = {
        let mut toggle = lock_toggle(toggle);
        // A toggle that finished while we were reading wins over our stale read.
        toggle.ensure_ready(now)?;
        toggle.sync(derived);
        toggle.begin(now)?
    };
    let pending = PendingWrite {
        toggle,
        settled: false,
    };
    debug!(
        employee_id = %employee_id,
        direction = %direction,
        "Toggle started"
    );

    let result = store
        .insert(NewTimeEntry::new(employee_id.clone(), direction, now))
        .await;
    pending.settle(&result, clock.now());

    match result {
        Ok(entry) => Ok(ToggleOutcome {
            entry,
            status: lock_toggle(toggle).confirmed(),
        }),
        Err(err) => {
            warn!(
                employee_id = %employee_id,
                error = %err,
                "Toggle write failed, reverting"
            );
            Err(err)
        }
    }
}
