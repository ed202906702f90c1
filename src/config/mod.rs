//! Configuration loading and management for the bundy kiosk.
//!
//! This module loads the kiosk configuration from a YAML file: organization
//! scope, the time zone used for all calendar decisions, the auto clock-out
//! schedule, toggle cooldown, report pairing mode and server settings.
//!
//! # Example
//!
//! ```no_run
//! use bundy_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config/kiosk.yaml").unwrap().into_config();
//! println!("Time zone: {}", config.time_zone());
//! ```

mod loader;
mod types;

pub use loader::{ConfigLoader, MAX_COOLDOWN_SECS, MAX_POLL_INTERVAL_SECS};
pub use types::{
    AutoClockoutConfig, FlagStoreConfig, KioskConfig, KioskConfigFile, OrganizationConfig,
    ReportConfig, ServerConfig, ToggleConfig,
};
