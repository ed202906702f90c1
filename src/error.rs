//! Error types for the bundy attendance engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for every failure the engine can surface: configuration problems at
//! startup, transient event store failures, and toggle rejections.

use chrono::NaiveDate;
use thiserror::Error;

/// The main error type for the bundy attendance engine.
///
/// # Example
///
/// ```
/// use bundy_engine::error::BundyError;
///
/// let error = BundyError::ConfigNotFound {
///     path: "/missing/kiosk.yaml".to_string(),
/// };
/// assert_eq!(error.to_string(), "Configuration file not found: /missing/kiosk.yaml");
/// ```
#[derive(Debug, Error)]
pub enum BundyError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// A required configuration value was missing or invalid.
    #[error("Invalid configuration '{field}': {message}")]
    InvalidConfig {
        /// The offending configuration field.
        field: String,
        /// What was wrong with it.
        message: String,
    },

    /// A time zone name could not be resolved.
    #[error("Unknown time zone: {name}")]
    InvalidTimeZone {
        /// The name that failed to resolve.
        name: String,
    },

    /// A read or write against the event store or directory failed.
    #[error("Store {operation} failed: {message}")]
    Store {
        /// The operation that failed (e.g. "insert", "query").
        operation: String,
        /// The underlying failure.
        message: String,
    },

    /// The durable scheduler flag could not be read or written.
    #[error("Scheduler flag store error: {message}")]
    FlagStore {
        /// The underlying failure.
        message: String,
    },

    /// The employee is not known to the directory.
    #[error("Employee not found: {employee_id}")]
    EmployeeNotFound {
        /// The requested employee id.
        employee_id: String,
    },

    /// A toggle was attempted inside the cooldown window.
    #[error("Toggle for '{employee_id}' is cooling down ({remaining_ms} ms remaining)")]
    CooldownActive {
        /// The employee being toggled.
        employee_id: String,
        /// Milliseconds until toggling is allowed again.
        remaining_ms: i64,
    },

    /// A toggle was attempted while a previous one is still unconfirmed.
    #[error("Toggle for '{employee_id}' is already in flight")]
    ToggleInFlight {
        /// The employee being toggled.
        employee_id: String,
    },

    /// The report grid could not be rendered as CSV.
    #[error("Failed to render report: {message}")]
    ReportRender {
        /// The underlying failure.
        message: String,
    },

    /// The report date range is empty or reversed.
    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange {
        /// The requested start date.
        start: NaiveDate,
        /// The requested end date.
        end: NaiveDate,
    },
}

impl BundyError {
    /// Creates a store error for the given operation.
    pub fn store(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Store {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Returns true if retrying the same operation may succeed.
    ///
    /// Store failures are transient by contract; toggle rejections clear
    /// once the cooldown or the in-flight write completes.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BundyError::Store { .. }
                | BundyError::FlagStore { .. }
                | BundyError::CooldownActive { .. }
                | BundyError::ToggleInFlight { .. }
        )
    }
}

/// A type alias for Results that return BundyError.
pub type BundyResult<T> = Result<T, BundyError>;
