//! HTTP request handlers for the kiosk API.
//!
//! This module contains the handler functions for all API endpoints.

use std::time::Instant;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::attendance::{
    derive_statuses, export_report, last_action_label, lock_toggle, search_employees,
    toggle_employee, ReportRequest, ReportSettings, ToggleOutcome,
};
use crate::error::{BundyError, BundyResult};
use crate::models::Employee;
use crate::store::EntryQuery;

use super::request::{ExportQuery, ExportRequest, StatusQuery};
use super::response::{
    ApiError, ApiErrorResponse, EmployeeStatusResponse, ExportResponse, ToggleResponse,
};
use super::state::AppState;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/statuses", get(statuses_handler))
        .route("/employees/:employee_id/toggle", post(toggle_handler))
        .route("/export", get(export_csv_handler).post(export_json_handler))
        .with_state(state)
}

fn json_ok<T: Serialize>(body: T) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/json")],
        Json(body),
    )
        .into_response()
}

fn error_response(error: impl Into<ApiErrorResponse>) -> Response {
    let api_error: ApiErrorResponse = error.into();
    (
        api_error.status,
        [(header::CONTENT_TYPE, "application/json")],
        Json(api_error.error),
    )
        .into_response()
}

/// Handler for GET /health.
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Handler for GET /statuses.
///
/// Lists active employees sorted by name with their derived status,
/// optionally filtered by `?search=`.
async fn statuses_handler(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Response {
    let correlation_id = Uuid::new_v4();

    match load_statuses(&state, query.search.as_deref()).await {
        Ok(statuses) => {
            info!(
                correlation_id = %correlation_id,
                employees = statuses.len(),
                "Listed employee statuses"
            );
            json_ok(statuses)
        }
        Err(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "Failed to list employee statuses"
            );
            error_response(err)
        }
    }
}

async fn load_statuses(
    state: &AppState,
    search: Option<&str>,
) -> BundyResult<Vec<EmployeeStatusResponse>> {
    let employees = state.directory().list_employees(true).await?;
    let entries = if employees.is_empty() {
        Vec::new()
    } else {
        let ids = employees.iter().map(|e| e.id.clone()).collect();
        state.store().query(&EntryQuery::latest_for(ids)).await?
    };
    let statuses = derive_statuses(&employees, &entries);
    // Writes still in flight show their optimistic status.
    let pending = state.pending_statuses();

    let now = state.clock().now();
    let zone = state.config().time_zone();
    Ok(search_employees(&employees, search.unwrap_or_default())
        .into_iter()
        .map(|employee| {
            let status = statuses.get(&employee.id).copied().unwrap_or_default();
            EmployeeStatusResponse {
                employee_id: employee.id.clone(),
                name: employee.name.clone(),
                status: pending.get(&employee.id).copied().unwrap_or(status.status),
                last_entry_at: status.last_entry_at,
                last_action: status
                    .last_entry_at
                    .map(|at| last_action_label(at, now, zone)),
            }
        })
        .collect())
}

/// Handler for POST /employees/:employee_id/toggle.
///
/// Clocks the employee in if they are out, and out if they are in.
async fn toggle_handler(
    State(state): State<AppState>,
    Path(employee_id): Path<String>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(
        correlation_id = %correlation_id,
        employee_id = %employee_id,
        "Processing toggle request"
    );

    match run_toggle(&state, &employee_id).await {
        Ok(outcome) => {
            info!(
                correlation_id = %correlation_id,
                employee_id = %employee_id,
                direction = %outcome.entry.direction,
                entry_id = outcome.entry.id,
                "Toggle completed"
            );
            let last_action = last_action_label(
                outcome.entry.created_at,
                state.clock().now(),
                state.config().time_zone(),
            );
            json_ok(ToggleResponse {
                employee_id,
                direction: outcome.entry.direction,
                status: outcome.status,
                created_at: outcome.entry.created_at,
                last_action,
            })
        }
        Err(err) => {
            warn!(
                correlation_id = %correlation_id,
                employee_id = %employee_id,
                error = %err,
                retryable = err.is_retryable(),
                "Toggle rejected"
            );
            error_response(err)
        }
    }
}

async fn run_toggle(state: &AppState, employee_id: &str) -> BundyResult<ToggleOutcome> {
    let employee = state
        .directory()
        .get_employee(employee_id)
        .await?
        .filter(Employee::is_reportable)
        .ok_or_else(|| BundyError::EmployeeNotFound {
            employee_id: employee_id.to_string(),
        })?;

    let toggle = state.toggle_for(&employee.id);
    let result = toggle_employee(state.store(), &toggle, state.clock()).await;
    if result.is_err() {
        // The error response is the revert notice.
        lock_toggle(&toggle).acknowledge_revert();
    }
    result
}

/// Handler for GET /export?start=YYYY-MM-DD&end=YYYY-MM-DD.
///
/// Returns the report as a CSV attachment.
async fn export_csv_handler(
    State(state): State<AppState>,
    query: Result<Query<ExportQuery>, QueryRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();

    let request: ReportRequest = match query {
        Ok(Query(query)) => query.into(),
        Err(rejection) => {
            warn!(
                correlation_id = %correlation_id,
                error = %rejection.body_text(),
                "Invalid export query"
            );
            return error_response(ApiErrorResponse::bad_request(ApiError::validation_error(
                rejection.body_text(),
            )));
        }
    };

    let start_time = Instant::now();
    match export_report(
        state.directory(),
        state.store(),
        &request,
        ReportSettings::from(state.config()),
    )
    .await
    {
        Ok(export) => {
            let body = match export.report.to_csv() {
                Ok(body) => body,
                Err(err) => {
                    warn!(
                        correlation_id = %correlation_id,
                        error = %err,
                        "CSV rendering failed"
                    );
                    return error_response(err);
                }
            };
            info!(
                correlation_id = %correlation_id,
                file_name = %export.file_name,
                rows = export.report.rows.len(),
                duration_us = start_time.elapsed().as_micros(),
                "CSV export completed"
            );
            let disposition = format!("attachment; filename=\"{}\"", export.file_name);
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                body,
            )
                .into_response()
        }
        Err(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "CSV export failed"
            );
            error_response(err)
        }
    }
}

/// Handler for POST /export.
///
/// Accepts `{start_date, end_date}` and returns the report grid as JSON.
async fn export_json_handler(
    State(state): State<AppState>,
    payload: Result<Json<ExportRequest>, JsonRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    info!(correlation_id = %correlation_id, "Processing export request");

    let request: ReportRequest = match payload {
        Ok(Json(req)) => req.into(),
        Err(rejection) => {
            let error = match rejection {
                JsonRejection::JsonDataError(err) => {
                    let body_text = err.body_text();
                    warn!(
                        correlation_id = %correlation_id,
                        error = %body_text,
                        "JSON data error"
                    );
                    ApiError::validation_error(body_text)
                }
                JsonRejection::JsonSyntaxError(err) => {
                    warn!(
                        correlation_id = %correlation_id,
                        error = %err,
                        "JSON syntax error"
                    );
                    ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
                }
                JsonRejection::MissingJsonContentType(_) => {
                    ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
                }
                _ => ApiError::malformed_json("Failed to parse request body"),
            };
            return error_response(ApiErrorResponse::bad_request(error));
        }
    };

    let start_time = Instant::now();
    match export_report(
        state.directory(),
        state.store(),
        &request,
        ReportSettings::from(state.config()),
    )
    .await
    {
        Ok(export) => {
            info!(
                correlation_id = %correlation_id,
                file_name = %export.file_name,
                rows = export.report.rows.len(),
                duration_us = start_time.elapsed().as_micros(),
                "Export completed"
            );
            json_ok(ExportResponse::from(export))
        }
        Err(err) => {
            warn!(
                correlation_id = %correlation_id,
                error = %err,
                "Export failed"
            );
            error_response(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use tower::ServiceExt;

    use crate::clock::FixedClock;
    use crate::config::ConfigLoader;
    use crate::models::{ClockStatus, Direction, NewTimeEntry, TimeEntry};
    use crate::store::{EventStore, InMemoryStore};

    const TEST_CONFIG: &str = r#"
organization:
  org_id: wslr
time_zone: UTC
toggle:
  cooldown_secs: 2
"#;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 5, 12, 0, 0).unwrap()
    }

    struct TestApp {
        state: AppState,
        store: Arc<InMemoryStore>,
        clock: Arc<FixedClock>,
    }

    fn create_test_app() -> TestApp {
        let config = ConfigLoader::from_yaml_str(TEST_CONFIG, "test")
            .unwrap()
            .into_config();
        let store = Arc::new(InMemoryStore::new("wslr"));
        store
            .upsert_employee(Employee::new("emp_001", "Jane Doe", "wslr"))
            .unwrap();
        store
            .upsert_employee(Employee::new("emp_002", "Ada Lovelace", "wslr"))
            .unwrap();
        let clock = Arc::new(FixedClock::new(noon()));
        let state = AppState::new(config, store.clone(), store.clone(), clock.clone());
        TestApp {
            state,
            store,
            clock,
        }
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Vec<u8>, Option<String>) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let content_type = response
            .headers()
            .get("content-type")
            .map(|v| v.to_str().unwrap().to_string());
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, body.to_vec(), content_type)
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn toggle_request(employee_id: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(format!("/employees/{}/toggle", employee_id))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_returns_ok() {
        let app = create_test_app();
        let (status, body, _) = send(create_router(app.state), get_request("/health")).await;

        assert_eq!(status, StatusCode::OK);
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
    }

    #[tokio::test]
    async fn test_statuses_sorted_by_name_with_last_action() {
        let app = create_test_app();
        app.store
            .insert(NewTimeEntry::new(
                "emp_001",
                Direction::In,
                noon() - Duration::hours(3),
            ))
            .await
            .unwrap();

        let (status, body, content_type) =
            send(create_router(app.state), get_request("/statuses")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(content_type.as_deref(), Some("application/json"));
        let statuses: Vec<EmployeeStatusResponse> = serde_json::from_slice(&body).unwrap();
        assert_eq!(statuses.len(), 2);
        assert_eq!(statuses[0].name, "Ada Lovelace");
        assert_eq!(statuses[0].status, ClockStatus::Out);
        assert_eq!(statuses[0].last_action, None);
        assert_eq!(statuses[1].name, "Jane Doe");
        assert_eq!(statuses[1].status, ClockStatus::In);
        assert_eq!(
            statuses[1].last_action.as_deref(),
            Some("Last action: 9:00 am")
        );
    }

    #[tokio::test]
    async fn test_statuses_search_filters_by_name() {
        let app = create_test_app();
        let (status, body, _) =
            send(create_router(app.state), get_request("/statuses?search=jane")).await;

        assert_eq!(status, StatusCode::OK);
        let statuses: Vec<EmployeeStatusResponse> = serde_json::from_slice(&body).unwrap();
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].employee_id, "emp_001");
    }

    #[tokio::test]
    async fn test_toggle_then_cooldown_then_toggle_back() {
        let app = create_test_app();
        let router = create_router(app.state.clone());

        let (status, body, _) = send(router.clone(), toggle_request("emp_001")).await;
        assert_eq!(status, StatusCode::OK);
        let toggled: ToggleResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(toggled.direction, Direction::In);
        assert_eq!(toggled.status, ClockStatus::In);
        assert_eq!(toggled.created_at, noon());
        assert_eq!(toggled.last_action, "Last action: 12:00 pm");

        let (status, body, _) = send(router.clone(), toggle_request("emp_001")).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "COOLDOWN_ACTIVE");

        app.clock.advance(Duration::seconds(3));
        let (status, body, _) = send(router, toggle_request("emp_001")).await;
        assert_eq!(status, StatusCode::OK);
        let toggled: ToggleResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(toggled.direction, Direction::Out);
        assert_eq!(toggled.status, ClockStatus::Out);

        assert_eq!(app.store.snapshot().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_toggle_unknown_employee_returns_404() {
        let app = create_test_app();
        let (status, body, _) = send(create_router(app.state), toggle_request("emp_404")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "EMPLOYEE_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_toggle_inactive_employee_returns_404() {
        let app = create_test_app();
        let mut inactive = Employee::new("emp_003", "Gone", "wslr");
        inactive.active = false;
        app.store.upsert_employee(inactive).unwrap();

        let (status, _, _) = send(create_router(app.state), toggle_request("emp_003")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    struct ReadOnlyStore(Arc<InMemoryStore>);

    #[async_trait]
    impl EventStore for ReadOnlyStore {
        async fn insert(&self, _entry: NewTimeEntry) -> BundyResult<TimeEntry> {
            Err(BundyError::store("insert", "read-only replica"))
        }

        async fn query(&self, query: &EntryQuery) -> BundyResult<Vec<TimeEntry>> {
            self.0.query(query).await
        }
    }

    #[tokio::test]
    async fn test_toggle_write_failure_is_retryable_503() {
        let app = create_test_app();
        let state = AppState::new(
            app.state.config().clone(),
            Arc::new(ReadOnlyStore(app.store.clone())),
            app.store.clone(),
            app.clock.clone(),
        );
        let router = create_router(state);

        let (status, body, _) = send(router.clone(), toggle_request("emp_001")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "STORE_UNAVAILABLE");

        // The revert is acknowledged, so a retry reaches the store again
        // instead of being refused as in flight or cooling down.
        let (status, _, _) = send(router, toggle_request("emp_001")).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(app.store.snapshot().unwrap().is_empty());
    }

    /// Holds inserts until released, signalling when one arrives.
    struct GatedStore {
        inner: Arc<InMemoryStore>,
        entered: tokio::sync::Notify,
        release: tokio::sync::Notify,
    }

    #[async_trait]
    impl EventStore for GatedStore {
        async fn insert(&self, entry: NewTimeEntry) -> BundyResult<TimeEntry> {
            self.entered.notify_one();
            self.release.notified().await;
            self.inner.insert(entry).await
        }

        async fn query(&self, query: &EntryQuery) -> BundyResult<Vec<TimeEntry>> {
            self.inner.query(query).await
        }
    }

    #[tokio::test]
    async fn test_statuses_show_optimistic_status_while_write_pending() {
        let app = create_test_app();
        let gated = Arc::new(GatedStore {
            inner: app.store.clone(),
            entered: tokio::sync::Notify::new(),
            release: tokio::sync::Notify::new(),
        });
        let state = AppState::new(
            app.state.config().clone(),
            gated.clone(),
            app.store.clone(),
            app.clock.clone(),
        );
        let router = create_router(state);

        let in_flight = tokio::spawn(send(router.clone(), toggle_request("emp_001")));
        gated.entered.notified().await;

        // Nothing is stored yet, but the kiosk already shows the employee in.
        assert!(app.store.snapshot().unwrap().is_empty());
        let (status, body, _) = send(router.clone(), get_request("/statuses?search=jane")).await;
        assert_eq!(status, StatusCode::OK);
        let statuses: Vec<EmployeeStatusResponse> = serde_json::from_slice(&body).unwrap();
        assert_eq!(statuses[0].status, ClockStatus::In);

        let (status, body, _) = send(router.clone(), toggle_request("emp_001")).await;
        assert_eq!(status, StatusCode::CONFLICT);
        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "TOGGLE_IN_FLIGHT");

        gated.release.notify_one();
        let (status, _, _) = in_flight.await.unwrap();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(app.store.snapshot().unwrap().len(), 1);

        let (_, body, _) = send(router, get_request("/statuses?search=jane")).await;
        let statuses: Vec<EmployeeStatusResponse> = serde_json::from_slice(&body).unwrap();
        assert_eq!(statuses[0].status, ClockStatus::In);
    }

    #[tokio::test]
    async fn test_dropped_toggle_request_does_not_block_the_employee() {
        let app = create_test_app();
        let gated = Arc::new(GatedStore {
            inner: app.store.clone(),
            entered: tokio::sync::Notify::new(),
            release: tokio::sync::Notify::new(),
        });
        let state = AppState::new(
            app.state.config().clone(),
            gated.clone(),
            app.store.clone(),
            app.clock.clone(),
        );
        let router = create_router(state.clone());

        // The client goes away while the write is pending.
        let abandoned = tokio::spawn(send(router.clone(), toggle_request("emp_001")));
        gated.entered.notified().await;
        abandoned.abort();
        assert!(abandoned.await.unwrap_err().is_cancelled());
        assert!(state.pending_statuses().is_empty());

        // The next attempt goes through instead of being refused as in flight.
        gated.release.notify_one();
        let (status, body, _) = send(router, toggle_request("emp_001")).await;
        assert_eq!(status, StatusCode::OK);
        let toggled: ToggleResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(toggled.status, ClockStatus::In);
        assert_eq!(app.store.snapshot().unwrap().len(), 1);
    }

    async fn seed_shifts(store: &InMemoryStore) {
        let at = |d, h, m| Utc.with_ymd_and_hms(2024, 1, d, h, m, 0).unwrap();
        for (direction, instant) in [
            (Direction::In, at(5, 9, 0)),
            (Direction::Out, at(5, 17, 0)),
            (Direction::In, at(6, 9, 15)),
        ] {
            store
                .insert(NewTimeEntry::new("emp_001", direction, instant))
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_export_csv_attachment() {
        let app = create_test_app();
        seed_shifts(&app.store).await;

        let response = create_router(app.state)
            .oneshot(get_request("/export?start=2024-01-05&end=2024-01-06"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("content-type").unwrap(),
            "text/csv; charset=utf-8"
        );
        assert_eq!(
            response.headers().get("content-disposition").unwrap(),
            "attachment; filename=\"bundy-export-2024-01-05-to-2024-01-06.csv\""
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(
            String::from_utf8(body.to_vec()).unwrap(),
            "employee_name,05/01/2024,,06/01/2024,\n\
             ,In,Out,In,Out\n\
             Ada Lovelace,,,,\n\
             Jane Doe,0900,1700,0915,"
        );
    }

    #[tokio::test]
    async fn test_export_inverted_range_returns_400() {
        let app = create_test_app();
        let (status, body, _) = send(
            create_router(app.state),
            get_request("/export?start=2024-02-01&end=2024-01-01"),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "INVALID_DATE_RANGE");
    }

    #[tokio::test]
    async fn test_export_missing_query_returns_400() {
        let app = create_test_app();
        let (status, body, _) =
            send(create_router(app.state), get_request("/export?start=2024-01-01")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_export_json_returns_grid_and_summaries() {
        let app = create_test_app();
        seed_shifts(&app.store).await;

        let request = Request::builder()
            .method("POST")
            .uri("/export")
            .header("Content-Type", "application/json")
            .body(Body::from(
                r#"{"start_date": "2024-01-05", "end_date": "2024-01-06"}"#,
            ))
            .unwrap();
        let (status, body, _) = send(create_router(app.state), request).await;

        assert_eq!(status, StatusCode::OK);
        let export: ExportResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(export.file_name, "bundy-export-2024-01-05-to-2024-01-06.csv");
        assert_eq!(export.header.len(), 2);
        assert_eq!(export.rows.len(), 2);
        assert_eq!(export.summaries[1].employee_id, "emp_001");
        assert_eq!(export.summaries[1].shifts, 2);
        assert_eq!(export.summaries[1].open_shifts, 1);
    }

    #[tokio::test]
    async fn test_export_malformed_json_returns_400() {
        let app = create_test_app();
        let request = Request::builder()
            .method("POST")
            .uri("/export")
            .header("Content-Type", "application/json")
            .body(Body::from("{invalid json"))
            .unwrap();
        let (status, body, _) = send(create_router(app.state), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let error: ApiError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.code, "MALFORMED_JSON");
    }
}
