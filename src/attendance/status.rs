//! Status derivation.
//!
//! An employee's clock status is a pure function of the event log: the
//! direction of their most recent entry, or `out` when they have none.

use std::collections::{HashMap, HashSet};

use crate::models::{ClockStatus, Employee, EmployeeStatus, TimeEntry};

/// Derives the current status of every employee from a log snapshot.
///
/// Entries for employees not in `employees` are ignored. The most recent
/// entry is chosen by timestamp, with the higher sequence id winning a tie,
/// so the result does not depend on the order of `entries`.
///
/// # Example
///
/// ```
/// use bundy_engine::attendance::derive_statuses;
/// use bundy_engine::models::{ClockStatus, Direction, Employee, TimeEntry};
/// use chrono::{TimeZone, Utc};
///
/// let employees = vec![Employee::new("emp_001", "Ada", "wslr")];
/// let entries = vec![
///     TimeEntry {
///         id: 1,
///         employee_id: "emp_001".to_string(),
///         direction: Direction::In,
///         created_at: Utc.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap(),
///     },
///     TimeEntry {
///         id: 2,
///         employee_id: "emp_001".to_string(),
///         direction: Direction::Out,
///         created_at: Utc.with_ymd_and_hms(2024, 1, 5, 17, 0, 0).unwrap(),
///     },
/// ];
///
/// let statuses = derive_statuses(&employees, &entries);
/// assert_eq!(statuses["emp_001"].status, ClockStatus::Out);
/// ```
pub fn derive_statuses(
    employees: &[Employee],
    entries: &[TimeEntry],
) -> HashMap<String, EmployeeStatus> {
    let known: HashSet<&str> = employees.iter().map(|e| e.id.as_str()).collect();
    let mut latest: HashMap<&str, &TimeEntry> = HashMap::new();

    for entry in entries {
        if !known.contains(entry.employee_id.as_str()) {
            continue;
        }
        latest
            .entry(entry.employee_id.as_str())
            .and_modify(|current| {
                if entry.sort_key() > current.sort_key() {
                    *current = entry;
                }
            })
            .or_insert(entry);
    }

    employees
        .iter()
        .map(|employee| {
            let status = latest
                .get(employee.id.as_str())
                .map(|entry| EmployeeStatus {
                    status: ClockStatus::from(entry.direction),
                    last_entry_at: Some(entry.created_at),
                })
                .unwrap_or_default();
            (employee.id.clone(), status)
        })
        .collect()
}

/// Derives the status of a single employee.
pub fn derive_status(employee_id: &str, entries: &[TimeEntry]) -> EmployeeStatus {
    entries
        .iter()
        .filter(|entry| entry.employee_id == employee_id)
        .max_by_key(|entry| entry.sort_key())
        .map(|entry| EmployeeStatus {
            status: ClockStatus::from(entry.direction),
            last_entry_at: Some(entry.created_at),
        })
        .unwrap_or_default()
}

/// Filters employees whose name contains `term`, ignoring case.
///
/// An empty or whitespace-only term matches everyone.
pub fn search_employees<'a>(employees: &'a [Employee], term: &str) -> Vec<&'a Employee> {
    let needle = term.trim().to_lowercase();
    employees
        .iter()
        .filter(|employee| needle.is_empty() || employee.name.to_lowercase().contains(&needle))
        .collect()
}
