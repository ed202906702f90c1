//! Request types for the kiosk API.
//!
//! This module defines the query strings and JSON bodies accepted by the
//! status and export endpoints.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::attendance::ReportRequest;

/// Query string for `GET /statuses`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatusQuery {
    /// Case-insensitive name filter. Blank matches everyone.
    #[serde(default)]
    pub search: Option<String>,
}

/// Query string for `GET /export`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExportQuery {
    /// First date, `YYYY-MM-DD`.
    pub start: NaiveDate,
    /// Last date, `YYYY-MM-DD`, inclusive.
    pub end: NaiveDate,
}

impl From<ExportQuery> for ReportRequest {
    fn from(query: ExportQuery) -> Self {
        ReportRequest::new(query.start, query.end)
    }
}

/// Request body for `POST /export`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExportRequest {
    /// First date, `YYYY-MM-DD`.
    pub start_date: NaiveDate,
    /// Last date, `YYYY-MM-DD`, inclusive.
    pub end_date: NaiveDate,
}

impl From<ExportRequest> for ReportRequest {
    fn from(request: ExportRequest) -> Self {
        ReportRequest::new(request.start_date, request.end_date)
    }
}
