//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading the kiosk
//! configuration from a YAML file and validating it.

use std::fs;
use std::path::Path;
use std::time::Duration;

use chrono_tz::Tz;

use crate::attendance::FireTime;
use crate::error::{BundyError, BundyResult};

use super::types::{KioskConfig, KioskConfigFile};

/// Ticks must land inside every fire hour, so they have to come more often
/// than once an hour.
pub const MAX_POLL_INTERVAL_SECS: u64 = 3600;

/// Upper bound on the toggle cooldown (one hour).
pub const MAX_COOLDOWN_SECS: i64 = 3600;

/// Loads and validates kiosk configuration.
///
/// # File Layout
///
/// ```text
/// organization:
///   org_id: wslr
/// time_zone: Australia/Sydney
/// auto_clockout:
///   enabled: true
///   fire_time: "23:00"
///   poll_interval_secs: 1
/// toggle:
///   cooldown_secs: 2
/// report:
///   pairing_mode: strict
/// server:
///   bind_address: 127.0.0.1:8080
/// flag_store:
///   path: state/last_auto_clockout.json
/// ```
///
/// Only `organization.org_id` is required; every other section has a default.
///
/// # Example
///
/// ```no_run
/// use bundy_engine::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config/kiosk.yaml")?;
/// println!("Serving org {}", loader.config().org_id());
/// # Ok::<(), bundy_engine::error::BundyError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config: KioskConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified YAML file.
    ///
    /// # Errors
    ///
    /// - `ConfigNotFound` if the file cannot be read
    /// - `ConfigParseError` if the file is not valid YAML for [`KioskConfigFile`]
    /// - `InvalidConfig` / `InvalidTimeZone` if a value fails validation
    pub fn load<P: AsRef<Path>>(path: P) -> BundyResult<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| BundyError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        Self::from_yaml_str(&content, &path_str)
    }

    /// Parses and validates configuration from YAML text.
    ///
    /// `source` names the origin of the text in error messages.
    pub fn from_yaml_str(content: &str, source: &str) -> BundyResult<Self> {
        let file: KioskConfigFile =
            serde_yaml::from_str(content).map_err(|e| BundyError::ConfigParseError {
                path: source.to_string(),
                message: e.to_string(),
            })?;

        let config = Self::validate(file)?;
        Ok(Self { config })
    }

    fn validate(file: KioskConfigFile) -> BundyResult<KioskConfig> {
        let org_id = file.organization.org_id.trim().to_string();
        if org_id.is_empty() {
            return Err(BundyError::InvalidConfig {
                field: "organization.org_id".to_string(),
                message: "must not be empty".to_string(),
            });
        }

        let time_zone: Tz = file
            .time_zone
            .parse()
            .map_err(|_| BundyError::InvalidTimeZone {
                name: file.time_zone.clone(),
            })?;

        let fire_time: FireTime = file
            .auto_clockout
            .fire_time
            .parse()
            .map_err(|message| BundyError::InvalidConfig {
                field: "auto_clockout.fire_time".to_string(),
                message,
            })?;

        let poll_interval_secs = file.auto_clockout.poll_interval_secs;
        if poll_interval_secs == 0 || poll_interval_secs >= MAX_POLL_INTERVAL_SECS {
            return Err(BundyError::InvalidConfig {
                field: "auto_clockout.poll_interval_secs".to_string(),
                message: format!("must be between 1 and {}", MAX_POLL_INTERVAL_SECS - 1),
            });
        }

        let cooldown = i64::try_from(file.toggle.cooldown_secs)
            .ok()
            .filter(|secs| *secs <= MAX_COOLDOWN_SECS)
            .and_then(chrono::Duration::try_seconds)
            .ok_or_else(|| BundyError::InvalidConfig {
                field: "toggle.cooldown_secs".to_string(),
                message: format!("must be at most {}", MAX_COOLDOWN_SECS),
            })?;

        Ok(KioskConfig::new(
            org_id,
            time_zone,
            file.auto_clockout.enabled,
            fire_time,
            Duration::from_secs(poll_interval_secs),
            cooldown,
            file.report.pairing_mode,
            file.server.bind_address,
            file.flag_store.path,
        ))
    }

    /// Returns the validated configuration.
    pub fn config(&self) -> &KioskConfig {
        &self.config
    }

    /// Consumes the loader, returning the validated configuration.
    pub fn into_config(self) -> KioskConfig {
        self.config
    }
}
