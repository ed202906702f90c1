//! Response types for the kiosk API.
//!
//! This module defines the success bodies, the error response structure, and
//! the mapping from [`BundyError`] to HTTP status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attendance::ReportExport;
use crate::error::BundyError;
use crate::models::{ClockStatus, Direction, EmployeeSummary};

/// One card on the kiosk screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeStatusResponse {
    /// The employee id.
    pub employee_id: String,
    /// Display name.
    pub name: String,
    /// Current derived status.
    pub status: ClockStatus,
    /// Timestamp of the latest entry, if any.
    pub last_entry_at: Option<DateTime<Utc>>,
    /// Caption such as `Last action: 9:05 am`.
    pub last_action: Option<String>,
}

/// Body returned by a successful toggle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToggleResponse {
    /// The employee id.
    pub employee_id: String,
    /// Direction of the entry that was written.
    pub direction: Direction,
    /// Status after the write.
    pub status: ClockStatus,
    /// Timestamp of the written entry.
    pub created_at: DateTime<Utc>,
    /// Caption for the kiosk card.
    pub last_action: String,
}

/// Body returned by `POST /export`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportResponse {
    /// Suggested download file name.
    pub file_name: String,
    /// The two header rows.
    pub header: Vec<Vec<String>>,
    /// One row per employee.
    pub rows: Vec<Vec<String>>,
    /// Per-employee totals.
    pub summaries: Vec<EmployeeSummary>,
}

impl From<ReportExport> for ExportResponse {
    fn from(export: ReportExport) -> Self {
        Self {
            file_name: export.file_name,
            header: export.report.header,
            rows: export.report.rows,
            summaries: export.summaries,
        }
    }
}

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Creates a validation error response.
    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new("VALIDATION_ERROR", message)
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }
}

/// API error with HTTP status code.
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl ApiErrorResponse {
    /// Creates a 400 response.
    pub fn bad_request(error: ApiError) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error,
        }
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

impl From<BundyError> for ApiErrorResponse {
    fn from(error: BundyError) -> Self {
        match error {
            BundyError::ConfigNotFound { .. }
            | BundyError::ConfigParseError { .. }
            | BundyError::InvalidConfig { .. }
            | BundyError::InvalidTimeZone { .. } => ApiErrorResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: ApiError::with_details(
                    "CONFIG_ERROR",
                    "Configuration error",
                    error.to_string(),
                ),
            },
            BundyError::Store { .. } | BundyError::FlagStore { .. } => ApiErrorResponse {
                status: StatusCode::SERVICE_UNAVAILABLE,
                error: ApiError::with_details(
                    "STORE_UNAVAILABLE",
                    "Something went wrong, please try again",
                    error.to_string(),
                ),
            },
            BundyError::EmployeeNotFound { employee_id } => ApiErrorResponse {
                status: StatusCode::NOT_FOUND,
                error: ApiError::new(
                    "EMPLOYEE_NOT_FOUND",
                    format!("Employee not found: {}", employee_id),
                ),
            },
            BundyError::CooldownActive {
                employee_id,
                remaining_ms,
            } => ApiErrorResponse {
                status: StatusCode::TOO_MANY_REQUESTS,
                error: ApiError::with_details(
                    "COOLDOWN_ACTIVE",
                    format!("Please wait before toggling '{}' again", employee_id),
                    format!("{} ms remaining", remaining_ms),
                ),
            },
            BundyError::ToggleInFlight { employee_id } => ApiErrorResponse {
                status: StatusCode::CONFLICT,
                error: ApiError::new(
                    "TOGGLE_IN_FLIGHT",
                    format!("A toggle for '{}' is already in progress", employee_id),
                ),
            },
            BundyError::ReportRender { .. } => ApiErrorResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: ApiError::with_details(
                    "REPORT_RENDER_ERROR",
                    "The report could not be rendered",
                    error.to_string(),
                ),
            },
            BundyError::InvalidDateRange { start, end } => ApiErrorResponse {
                status: StatusCode::BAD_REQUEST,
                error: ApiError::with_details(
                    "INVALID_DATE_RANGE",
                    format!("Invalid date range: {} is after {}", start, end),
                    "The start date must be on or before the end date",
                ),
            },
        }
    }
}
