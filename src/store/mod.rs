//! Storage collaborators.
//!
//! The engine treats persistence as opaque. It consumes three seams:
//!
//! - [`EventStore`]: the append-only time entry log,
//! - [`EmployeeDirectory`]: the list of employees,
//! - [`FlagStore`]: the durable "last fired date" of the auto clock-out sweep.
//!
//! [`InMemoryStore`] implements the first two for the kiosk binary and tests.
//! [`FileFlagStore`] persists the flag across restarts; [`MemoryFlagStore`]
//! is the in-process fake.

mod flag;
mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BundyResult;
use crate::models::{Employee, NewTimeEntry, TimeEntry};

pub use flag::{FileFlagStore, MemoryFlagStore};
pub use memory::InMemoryStore;

/// Sort order for entry queries, by timestamp.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Oldest first.
    #[default]
    Ascending,
    /// Newest first.
    Descending,
}

/// A filter over the time entry log.
///
/// Filtering is pushed down to the store so that callers only ever hold
/// bounded per-employee slices in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryQuery {
    /// Restrict to these employees. `None` means all employees.
    pub employee_ids: Option<Vec<String>>,
    /// Restrict to `[start, end]`, inclusive at both ends.
    pub range: Option<(DateTime<Utc>, DateTime<Utc>)>,
    /// Result order by timestamp.
    pub order: SortOrder,
}

impl EntryQuery {
    /// Entries for a set of employees, newest first.
    pub fn latest_for(employee_ids: Vec<String>) -> Self {
        Self {
            employee_ids: Some(employee_ids),
            range: None,
            order: SortOrder::Descending,
        }
    }

    /// Entries for one employee within `[start, end]`, oldest first.
    pub fn range_for(employee_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            employee_ids: Some(vec![employee_id.to_string()]),
            range: Some((start, end)),
            order: SortOrder::Ascending,
        }
    }

    /// Returns true if the entry passes the filter.
    pub fn matches(&self, entry: &TimeEntry) -> bool {
        let employee_ok = self
            .employee_ids
            .as_ref()
            .is_none_or(|ids| ids.iter().any(|id| *id == entry.employee_id));
        let range_ok = self
            .range
            .is_none_or(|(start, end)| entry.created_at >= start && entry.created_at <= end);
        employee_ok && range_ok
    }
}

/// The append-only time entry log.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends an entry, returning it with its assigned sequence id.
    async fn insert(&self, entry: NewTimeEntry) -> BundyResult<TimeEntry>;

    /// Returns the entries matching the query in the requested order.
    async fn query(&self, query: &EntryQuery) -> BundyResult<Vec<TimeEntry>>;
}

/// Read access to the employee directory.
#[async_trait]
pub trait EmployeeDirectory: Send + Sync {
    /// Lists employees in the configured organization, ordered by name.
    ///
    /// With `active_only`, inactive and soft-deleted employees are omitted.
    async fn list_employees(&self, active_only: bool) -> BundyResult<Vec<Employee>>;

    /// Looks up a single employee by id.
    async fn get_employee(&self, employee_id: &str) -> BundyResult<Option<Employee>> {
        Ok(self
            .list_employees(false)
            .await?
            .into_iter()
            .find(|employee| employee.id == employee_id))
    }
}

/// Durable storage for the auto clock-out "last fired date" key.
#[async_trait]
pub trait FlagStore: Send + Sync {
    /// Returns the stored `YYYY-MM-DD` key, if any.
    async fn last_fired_date(&self) -> BundyResult<Option<String>>;

    /// Replaces the stored key.
    async fn set_last_fired_date(&self, date_key: &str) -> BundyResult<()>;
}
