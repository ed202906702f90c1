//! Attendance report builder.
//!
//! Turns employees and their time entries over an inclusive date range into a
//! rectangular [`Report`] grid:
//!
//! ```text
//! employee_name, 05/01/2024, "",  06/01/2024, ""
//! "",            In,         Out, In,         Out
//! Ada,           0900,       1700, 0915,      ""
//! ```
//!
//! Each date occupies as many `(In, Out)` column pairs as the busiest employee
//! has shifts starting on that date. Shorter rows are padded with empty cells.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::KioskConfig;
use crate::error::{BundyError, BundyResult};
use crate::models::{Employee, EmployeeSummary, PairingMode, Report, ShiftPair, TimeEntry};
use crate::store::{EmployeeDirectory, EntryQuery, EventStore};

use super::pairing::{group_by_date, pair_entries};
use super::time_zone::{date_key, date_label, day_bounds, format_hhmm};

/// An export request over inclusive local calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRequest {
    /// First date in the report.
    pub start_date: NaiveDate,
    /// Last date in the report, inclusive.
    pub end_date: NaiveDate,
}

impl ReportRequest {
    /// Creates a request for `[start_date, end_date]`.
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
        }
    }

    /// Rejects a range whose start is after its end.
    pub fn validate(&self) -> BundyResult<()> {
        if self.start_date > self.end_date {
            return Err(BundyError::InvalidDateRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        Ok(())
    }

    /// Returns the download file name, `bundy-export-<start>-to-<end>.csv`.
    ///
    /// ```
    /// use bundy_engine::attendance::ReportRequest;
    /// use chrono::NaiveDate;
    ///
    /// let request = ReportRequest::new(
    ///     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
    ///     NaiveDate::from_ymd_opt(2024, 1, 14).unwrap(),
    /// );
    /// assert_eq!(request.file_name(), "bundy-export-2024-01-01-to-2024-01-14.csv");
    /// ```
    pub fn file_name(&self) -> String {
        format!(
            "bundy-export-{}-to-{}.csv",
            date_key(self.start_date),
            date_key(self.end_date)
        )
    }
}

/// Calendar and pairing settings for a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportSettings {
    /// Zone used for date grouping and `HHMM` rendering.
    pub time_zone: Tz,
    /// How malformed sequences are paired.
    pub pairing_mode: PairingMode,
}

impl From<&KioskConfig> for ReportSettings {
    fn from(config: &KioskConfig) -> Self {
        Self {
            time_zone: config.time_zone(),
            pairing_mode: config.pairing_mode(),
        }
    }
}

/// A finished export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportExport {
    /// Suggested download file name.
    pub file_name: String,
    /// The grid.
    pub report: Report,
    /// Per-employee totals, in report row order.
    pub summaries: Vec<EmployeeSummary>,
}

/// One employee's shifts within the range.
struct EmployeeShifts<'a> {
    employee: &'a Employee,
    pairs: Vec<ShiftPair>,
}

/// Reportable employees sorted by name, each with their paired shifts in
/// `[start, end]`.
fn collect_shifts<'a>(
    employees: &'a [Employee],
    entries: &[TimeEntry],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    mode: PairingMode,
) -> Vec<EmployeeShifts<'a>> {
    let mut reportable: Vec<&Employee> = employees.iter().filter(|e| e.is_reportable()).collect();
    reportable.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });

    reportable
        .into_iter()
        .map(|employee| {
            let own: Vec<TimeEntry> = entries
                .iter()
                .filter(|e| e.employee_id == employee.id)
                .filter(|e| e.created_at >= start && e.created_at <= end)
                .cloned()
                .collect();
            EmployeeShifts {
                employee,
                pairs: pair_entries(&own, mode),
            }
        })
        .collect()
}

/// Builds the report grid.
///
/// Only active, non-deleted employees appear, one row each, sorted by name.
/// Entries outside `[start, end]` are ignored.
///
/// # Example
///
/// ```
/// use bundy_engine::attendance::build_report;
/// use bundy_engine::models::{Direction, Employee, PairingMode, TimeEntry};
/// use chrono::{TimeZone, Utc};
///
/// let employees = vec![Employee::new("emp_001", "Ada", "wslr")];
/// let at = |d, h, m| Utc.with_ymd_and_hms(2024, 1, d, h, m, 0).unwrap();
/// let entry = |id, direction, created_at| TimeEntry {
///     id,
///     employee_id: "emp_001".to_string(),
///     direction,
///     created_at,
/// };
/// let entries = vec![
///     entry(1, Direction::In, at(5, 9, 0)),
///     entry(2, Direction::Out, at(5, 17, 0)),
/// ];
///
/// let report = build_report(
///     &employees,
///     &entries,
///     at(5, 0, 0),
///     at(5, 23, 59),
///     chrono_tz::UTC,
///     PairingMode::Strict,
/// );
/// assert_eq!(report.header[0], vec!["employee_name", "05/01/2024", ""]);
/// assert_eq!(report.header[1], vec!["", "In", "Out"]);
/// assert_eq!(report.rows[0], vec!["Ada", "0900", "1700"]);
/// ```
pub fn build_report(
    employees: &[Employee],
    entries: &[TimeEntry],
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    zone: Tz,
    mode: PairingMode,
) -> Report {
    let shifts = collect_shifts(employees, entries, start, end, mode);
    render(&shifts, zone)
}

fn render(shifts: &[EmployeeShifts<'_>], zone: Tz) -> Report {
    let grouped: Vec<(&Employee, BTreeMap<NaiveDate, Vec<ShiftPair>>)> = shifts
        .iter()
        .map(|s| (s.employee, group_by_date(s.pairs.clone(), zone)))
        .collect();

    // BTreeMap keeps dates in calendar order.
    let mut widths: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for (_, by_date) in &grouped {
        for (date, pairs) in by_date {
            let width = widths.entry(*date).or_insert(0);
            *width = (*width).max(pairs.len());
        }
    }

    let mut dates_row = vec!["employee_name".to_string()];
    let mut labels_row = vec![String::new()];
    for (date, width) in &widths {
        for _ in 0..*width {
            dates_row.push(date_label(*date));
            dates_row.push(String::new());
            labels_row.push("In".to_string());
            labels_row.push("Out".to_string());
        }
    }

    let rows = grouped
        .iter()
        .map(|(employee, by_date)| {
            let mut row = vec![employee.name.clone()];
            for (date, width) in &widths {
                let pairs = by_date.get(date).map(Vec::as_slice).unwrap_or(&[]);
                for slot in 0..*width {
                    match pairs.get(slot) {
                        Some(pair) => {
                            row.push(format_hhmm(pair.start, zone));
                            row.push(
                                pair.finish
                                    .map(|finish| format_hhmm(finish, zone))
                                    .unwrap_or_default(),
                            );
                        }
                        None => {
                            row.push(String::new());
                            row.push(String::new());
                        }
                    }
                }
            }
            row
        })
        .collect();

    Report {
        header: vec![dates_row, labels_row],
        rows,
    }
}

fn summarize(shifts: &[EmployeeShifts<'_>]) -> Vec<EmployeeSummary> {
    shifts
        .iter()
        .map(|s| EmployeeSummary {
            employee_id: s.employee.id.clone(),
            name: s.employee.name.clone(),
            shifts: s.pairs.len() as u32,
            open_shifts: s.pairs.iter().filter(|p| p.is_open()).count() as u32,
            worked_hours: s
                .pairs
                .iter()
                .filter_map(ShiftPair::worked_hours)
                .sum::<Decimal>(),
        })
        .collect()
}

/// Fetches everything a report needs and builds it.
///
/// Active employees come from the directory; entries are fetched with one
/// ranged query per employee. Any fetch error aborts the whole export.
///
/// # Errors
///
/// - [`BundyError::InvalidDateRange`] if the request is inverted
/// - any directory or store error, unchanged
pub async fn export_report(
    directory: &dyn EmployeeDirectory,
    store: &dyn EventStore,
    request: &ReportRequest,
    settings: ReportSettings,
) -> BundyResult<ReportExport> {
    request.validate()?;
    let (start, end) = day_bounds(request.start_date, request.end_date, settings.time_zone);

    let employees = directory.list_employees(true).await?;
    let mut entries = Vec::new();
    for employee in &employees {
        let fetched = store
            .query(&EntryQuery::range_for(&employee.id, start, end))
            .await?;
        debug!(employee_id = %employee.id, entries = fetched.len(), "Fetched report entries");
        entries.extend(fetched);
    }

    let shifts = collect_shifts(&employees, &entries, start, end, settings.pairing_mode);
    let report = render(&shifts, settings.time_zone);
    let summaries = summarize(&shifts);

    info!(
        start_date = %request.start_date,
        end_date = %request.end_date,
        employees = report.rows.len(),
        columns = report.width(),
        "Built attendance report"
    );

    Ok(ReportExport {
        file_name: request.file_name(),
        report,
        summaries,
    })
}
