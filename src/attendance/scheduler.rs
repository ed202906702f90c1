//! Auto clock-out scheduler.
//!
//! Once per local calendar day, at the configured fire time, every employee
//! still clocked in gets a synthetic `out` entry. The only guard against a
//! second sweep on the same day is the durable "last fired date" key held in
//! a [`FlagStore`]; it is written at the end of every completed sweep, even
//! one that found nobody to clock out.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, NaiveTime, Timelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::KioskConfig;
use crate::error::BundyResult;
use crate::models::{ClockStatus, Direction, NewTimeEntry};
use crate::store::{EmployeeDirectory, EntryQuery, EventStore, FlagStore};

use super::status::derive_statuses;
use super::time_zone::{date_key, local_date};

/// A local wall-clock time of day with minute precision.
///
/// ```
/// use bundy_engine::attendance::FireTime;
///
/// let fire: FireTime = "23:00".parse().unwrap();
/// assert_eq!(fire.hour(), 23);
/// assert_eq!(fire.to_string(), "23:00");
/// assert!("24:00".parse::<FireTime>().is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FireTime {
    hour: u32,
    minute: u32,
}

impl FireTime {
    /// Creates a fire time, or `None` if out of range.
    pub fn new(hour: u32, minute: u32) -> Option<Self> {
        (hour < 24 && minute < 60).then_some(Self { hour, minute })
    }

    /// Returns the hour (0-23).
    pub fn hour(&self) -> u32 {
        self.hour
    }

    /// Returns the minute (0-59).
    pub fn minute(&self) -> u32 {
        self.minute
    }
}

impl Default for FireTime {
    fn default() -> Self {
        Self {
            hour: 23,
            minute: 0,
        }
    }
}

impl FromStr for FireTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hour, minute) = s
            .trim()
            .split_once(':')
            .ok_or_else(|| format!("expected HH:MM, got '{}'", s))?;
        let hour: u32 = hour
            .parse()
            .map_err(|_| format!("invalid hour in '{}'", s))?;
        let minute: u32 = minute
            .parse()
            .map_err(|_| format!("invalid minute in '{}'", s))?;
        Self::new(hour, minute).ok_or_else(|| format!("'{}' is not a valid time of day", s))
    }
}

impl std::fmt::Display for FireTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Which local times count as "at the fire time".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerWindow {
    /// Hour and minute must both match. Needs ticks more often than once a
    /// minute, since delayed ticks drift and a 60s cadence can step over the
    /// fire minute.
    ExactMinute,
    /// Any minute of the fire hour matches. Used with coarser ticks, which
    /// must still come more often than once an hour.
    WholeHour,
}

impl TriggerWindow {
    /// Picks the narrowest window a tick interval can reliably hit.
    pub fn for_poll_interval(poll_interval: StdDuration) -> Self {
        if poll_interval < StdDuration::from_secs(60) {
            TriggerWindow::ExactMinute
        } else {
            TriggerWindow::WholeHour
        }
    }

    /// Returns true if `local` falls inside the window around `fire_time`.
    pub fn contains(self, fire_time: FireTime, local: NaiveTime) -> bool {
        match self {
            TriggerWindow::ExactMinute => {
                local.hour() == fire_time.hour() && local.minute() == fire_time.minute()
            }
            TriggerWindow::WholeHour => local.hour() == fire_time.hour(),
        }
    }
}

/// The scheduler's state, published through [`AutoClockout::subscribe_state`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// Waiting for the next eligible tick.
    Idle,
    /// A sweep is running.
    Firing,
}

/// What one sweep did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepOutcome {
    /// The local date the sweep ran for, `YYYY-MM-DD`.
    pub date_key: String,
    /// Employees found clocked in.
    pub attempted: u32,
    /// Synthetic `out` entries written.
    pub clocked_out: u32,
    /// Writes that failed. Not retried within this sweep.
    pub failed: u32,
}

/// The daily auto clock-out sweep.
pub struct AutoClockout {
    store: Arc<dyn EventStore>,
    directory: Arc<dyn EmployeeDirectory>,
    flags: Arc<dyn FlagStore>,
    time_zone: Tz,
    fire_time: FireTime,
    window: TriggerWindow,
    state: watch::Sender<SchedulerState>,
}

impl AutoClockout {
    /// Creates a scheduler that fires at `fire_time` in `time_zone`.
    ///
    /// The trigger window defaults to [`TriggerWindow::ExactMinute`].
    pub fn new(
        store: Arc<dyn EventStore>,
        directory: Arc<dyn EmployeeDirectory>,
        flags: Arc<dyn FlagStore>,
        time_zone: Tz,
        fire_time: FireTime,
    ) -> Self {
        Self {
            store,
            directory,
            flags,
            time_zone,
            fire_time,
            window: TriggerWindow::ExactMinute,
            state: watch::channel(SchedulerState::Idle).0,
        }
    }

    /// Creates a scheduler from the kiosk configuration.
    pub fn from_config(
        config: &KioskConfig,
        store: Arc<dyn EventStore>,
        directory: Arc<dyn EmployeeDirectory>,
        flags: Arc<dyn FlagStore>,
    ) -> Self {
        Self::new(store, directory, flags, config.time_zone(), config.fire_time())
            .with_trigger_window(config.trigger_window())
    }

    /// Sets the trigger window.
    pub fn with_trigger_window(mut self, window: TriggerWindow) -> Self {
        self.window = window;
        self
    }

    /// Returns the current state.
    pub fn state(&self) -> SchedulerState {
        *self.state.borrow()
    }

    /// Watches state changes, e.g. to see a sweep in progress from another task.
    pub fn subscribe_state(&self) -> watch::Receiver<SchedulerState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: SchedulerState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            debug!(from = ?previous, to = ?state, "Auto clock-out state changed");
        }
    }

    /// Handles one timer tick.
    ///
    /// Returns `Ok(Some(outcome))` if a sweep ran, `Ok(None)` if the tick was
    /// outside the window or today's sweep already happened.
    ///
    /// # Errors
    ///
    /// - the flag could not be read: the tick is skipped
    /// - the clocked-in snapshot could not be read: the sweep is abandoned
    ///   without recording the date, so a later tick in the window retries
    /// - the flag could not be written after the sweep
    pub async fn tick(&mut self, now: DateTime<Utc>) -> BundyResult<Option<SweepOutcome>> {
        let local = now.with_timezone(&self.time_zone);
        if !self.window.contains(self.fire_time, local.time()) {
            return Ok(None);
        }

        let today = date_key(local_date(now, self.time_zone));
        if self.flags.last_fired_date().await?.as_deref() == Some(today.as_str()) {
            debug!(date_key = %today, "Auto clock-out already ran today");
            return Ok(None);
        }

        info!(date_key = %today, fire_time = %self.fire_time, "Running auto clock-out");
        self.set_state(SchedulerState::Firing);
        let result = self.sweep(now, &today).await;
        self.set_state(SchedulerState::Idle);
        let outcome = result?;

        self.flags.set_last_fired_date(&today).await?;
        info!(
            date_key = %outcome.date_key,
            attempted = outcome.attempted,
            clocked_out = outcome.clocked_out,
            failed = outcome.failed,
            "Auto clock-out complete"
        );
        Ok(Some(outcome))
    }

    async fn sweep(&self, now: DateTime<Utc>, today: &str) -> BundyResult<SweepOutcome> {
        let employees = self.directory.list_employees(true).await?;
        let entries = if employees.is_empty() {
            Vec::new()
        } else {
            let ids = employees.iter().map(|e| e.id.clone()).collect();
            self.store.query(&EntryQuery::latest_for(ids)).await?
        };
        let statuses = derive_statuses(&employees, &entries);

        let clocked_in: Vec<&str> = employees
            .iter()
            .filter(|e| statuses.get(&e.id).map(|s| s.status) == Some(ClockStatus::In))
            .map(|e| e.id.as_str())
            .collect();

        let mut outcome = SweepOutcome {
            date_key: today.to_string(),
            attempted: clocked_in.len() as u32,
            clocked_out: 0,
            failed: 0,
        };

        for employee_id in clocked_in {
            match self
                .store
                .insert(NewTimeEntry::new(employee_id, Direction::Out, now))
                .await
            {
                Ok(_) => {
                    debug!(employee_id = %employee_id, "Auto clocked out");
                    outcome.clocked_out += 1;
                }
                Err(err) => {
                    warn!(
                        employee_id = %employee_id,
                        error = %err,
                        "Auto clock-out write failed"
                    );
                    outcome.failed += 1;
                }
            }
        }

        Ok(outcome)
    }

    /// Ticks every `poll_interval` until `shutdown` turns true.
    ///
    /// Tick errors are logged and never stop the loop.
    pub async fn run(
        mut self,
        clock: Arc<dyn Clock>,
        poll_interval: StdDuration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        debug!(
            poll_interval_ms = poll_interval.as_millis() as u64,
            window = ?self.window,
            "Starting auto clock-out scheduler"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.tick(clock.now()).await {
                        warn!(error = %err, "Auto clock-out tick failed");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        debug!("Auto clock-out scheduler received shutdown signal");
                        break;
                    }
                }
            }
        }

        debug!("Auto clock-out scheduler stopped");
    }
}
