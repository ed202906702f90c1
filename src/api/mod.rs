//! HTTP API module for the bundy kiosk.
//!
//! This module provides the REST endpoints for listing statuses, toggling an
//! employee in or out, and exporting attendance reports.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{ExportQuery, ExportRequest, StatusQuery};
pub use response::{ApiError, ApiErrorResponse, EmployeeStatusResponse, ExportResponse, ToggleResponse};
pub use state::AppState;
