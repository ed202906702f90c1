//! Configuration types for the kiosk.
//!
//! This module contains the raw structures deserialized from the YAML
//! configuration file, and the validated [`KioskConfig`] built from them.

use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;
use serde::Deserialize;

use crate::attendance::{FireTime, TriggerWindow};
use crate::models::PairingMode;

/// Organization scope for directory lookups.
#[derive(Debug, Clone, Deserialize)]
pub struct OrganizationConfig {
    /// The organization whose employees this kiosk serves.
    #[serde(default)]
    pub org_id: String,
}

/// Auto clock-out scheduler settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AutoClockoutConfig {
    /// Whether the daily sweep runs at all.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Local wall-clock fire time in `HH:MM` form.
    #[serde(default = "default_fire_time")]
    pub fire_time: String,
    /// Seconds between scheduler ticks.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for AutoClockoutConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            fire_time: default_fire_time(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

/// Clock toggle settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ToggleConfig {
    /// Seconds after a successful toggle during which further toggles are refused.
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: u64,
}

impl Default for ToggleConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: default_cooldown_secs(),
        }
    }
}

/// Report export settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportConfig {
    /// How misaligned in/out sequences are paired.
    #[serde(default)]
    pub pairing_mode: PairingMode,
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Socket address the API listens on.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

/// Location of the durable "last fired date" record.
#[derive(Debug, Clone, Deserialize)]
pub struct FlagStoreConfig {
    /// Path of the JSON file holding the scheduler flag.
    #[serde(default = "default_flag_path")]
    pub path: PathBuf,
}

impl Default for FlagStoreConfig {
    fn default() -> Self {
        Self {
            path: default_flag_path(),
        }
    }
}

/// The configuration file as written on disk.
#[derive(Debug, Clone, Deserialize)]
pub struct KioskConfigFile {
    /// Organization scope.
    pub organization: OrganizationConfig,
    /// IANA time zone used for every calendar-date decision.
    #[serde(default = "default_time_zone")]
    pub time_zone: String,
    /// Auto clock-out scheduler.
    #[serde(default)]
    pub auto_clockout: AutoClockoutConfig,
    /// Clock toggle.
    #[serde(default)]
    pub toggle: ToggleConfig,
    /// Report export.
    #[serde(default)]
    pub report: ReportConfig,
    /// HTTP server.
    #[serde(default)]
    pub server: ServerConfig,
    /// Scheduler flag persistence.
    #[serde(default)]
    pub flag_store: FlagStoreConfig,
}

fn default_enabled() -> bool {
    true
}

fn default_fire_time() -> String {
    "23:00".to_string()
}

fn default_poll_interval_secs() -> u64 {
    1
}

fn default_cooldown_secs() -> u64 {
    2
}

fn default_bind_address() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_flag_path() -> PathBuf {
    PathBuf::from("state/last_auto_clockout.json")
}

fn default_time_zone() -> String {
    "Australia/Sydney".to_string()
}

/// The validated kiosk configuration.
///
/// Built by [`ConfigLoader`](super::ConfigLoader) from a [`KioskConfigFile`];
/// every field here has already been checked, so consumers never re-validate.
#[derive(Debug, Clone)]
pub struct KioskConfig {
    org_id: String,
    time_zone: Tz,
    scheduler_enabled: bool,
    fire_time: FireTime,
    poll_interval: Duration,
    cooldown: chrono::Duration,
    pairing_mode: PairingMode,
    bind_address: String,
    flag_path: PathBuf,
}

impl KioskConfig {
    /// Creates a new KioskConfig from already-validated parts.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        org_id: String,
        time_zone: Tz,
        scheduler_enabled: bool,
        fire_time: FireTime,
        poll_interval: Duration,
        cooldown: chrono::Duration,
        pairing_mode: PairingMode,
        bind_address: String,
        flag_path: PathBuf,
    ) -> Self {
        Self {
            org_id,
            time_zone,
            scheduler_enabled,
            fire_time,
            poll_interval,
            cooldown,
            pairing_mode,
            bind_address,
            flag_path,
        }
    }

    /// Returns the organization id.
    pub fn org_id(&self) -> &str {
        &self.org_id
    }

    /// Returns the configured time zone.
    pub fn time_zone(&self) -> Tz {
        self.time_zone
    }

    /// Returns true if the daily sweep should run.
    pub fn scheduler_enabled(&self) -> bool {
        self.scheduler_enabled
    }

    /// Returns the local fire time of the daily sweep.
    pub fn fire_time(&self) -> FireTime {
        self.fire_time
    }

    /// Returns the scheduler tick interval.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Returns the trigger window implied by the poll interval.
    pub fn trigger_window(&self) -> TriggerWindow {
        TriggerWindow::for_poll_interval(self.poll_interval)
    }

    /// Returns the toggle cooldown.
    pub fn cooldown(&self) -> chrono::Duration {
        self.cooldown
    }

    /// Returns the report pairing mode.
    pub fn pairing_mode(&self) -> PairingMode {
        self.pairing_mode
    }

    /// Returns the API bind address.
    pub fn bind_address(&self) -> &str {
        &self.bind_address
    }

    /// Returns the scheduler flag file path.
    pub fn flag_path(&self) -> &PathBuf {
        &self.flag_path
    }

    /// Returns a copy with a different bind address.
    pub fn with_bind_address(mut self, bind_address: impl Into<String>) -> Self {
        self.bind_address = bind_address.into();
        self
    }
}
