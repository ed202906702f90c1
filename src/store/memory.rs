//! In-memory event store and directory.

use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;

use crate::error::{BundyError, BundyResult};
use crate::models::{Employee, NewTimeEntry, TimeEntry};

use super::{EmployeeDirectory, EntryQuery, EventStore, SortOrder};

/// An in-memory, organization-scoped store.
///
/// Holds the employee directory and the time entry log behind `RwLock`s.
/// Locks are never held across an await point.
#[derive(Debug)]
pub struct InMemoryStore {
    org_id: String,
    employees: RwLock<Vec<Employee>>,
    entries: RwLock<Vec<TimeEntry>>,
    next_id: AtomicU64,
}

impl InMemoryStore {
    /// Creates an empty store scoped to an organization.
    pub fn new(org_id: impl Into<String>) -> Self {
        Self {
            org_id: org_id.into(),
            employees: RwLock::new(Vec::new()),
            entries: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Returns the organization this store is scoped to.
    pub fn org_id(&self) -> &str {
        &self.org_id
    }

    /// Adds or replaces an employee in the directory.
    pub fn upsert_employee(&self, employee: Employee) -> BundyResult<()> {
        let mut employees = self
            .employees
            .write()
            .map_err(|_| BundyError::store("upsert_employee", "directory lock poisoned"))?;
        match employees.iter_mut().find(|e| e.id == employee.id) {
            Some(existing) => *existing = employee,
            None => employees.push(employee),
        }
        Ok(())
    }

    /// Returns a copy of the whole log in insertion order.
    pub fn snapshot(&self) -> BundyResult<Vec<TimeEntry>> {
        self.entries
            .read()
            .map(|entries| entries.clone())
            .map_err(|_| BundyError::store("snapshot", "entry log lock poisoned"))
    }
}

#[async_trait]
impl EventStore for InMemoryStore {
    async fn insert(&self, entry: NewTimeEntry) -> BundyResult<TimeEntry> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| BundyError::store("insert", "entry log lock poisoned"))?;

        let stored = TimeEntry {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            employee_id: entry.employee_id,
            direction: entry.direction,
            created_at: entry.created_at,
        };
        entries.push(stored.clone());
        Ok(stored)
    }

    async fn query(&self, query: &EntryQuery) -> BundyResult<Vec<TimeEntry>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| BundyError::store("query", "entry log lock poisoned"))?;

        let mut matched: Vec<TimeEntry> = entries
            .iter()
            .filter(|entry| query.matches(entry))
            .cloned()
            .collect();

        match query.order {
            SortOrder::Ascending => matched.sort_by_key(TimeEntry::sort_key),
            SortOrder::Descending => {
                matched.sort_by_key(|entry| std::cmp::Reverse(entry.sort_key()))
            }
        }
        Ok(matched)
    }
}

#[async_trait]
impl EmployeeDirectory for InMemoryStore {
    async fn list_employees(&self, active_only: bool) -> BundyResult<Vec<Employee>> {
        let employees = self
            .employees
            .read()
            .map_err(|_| BundyError::store("list_employees", "directory lock poisoned"))?;

        let mut listed: Vec<Employee> = employees
            .iter()
            .filter(|e| e.org_id == self.org_id)
            .filter(|e| !active_only || e.is_reportable())
            .cloned()
            .collect();
        listed.sort_by(|a, b| {
            a.name
                .to_lowercase()
                .cmp(&b.name.to_lowercase())
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(listed)
    }
}
