//! Employee model.
//!
//! Employees are owned by the directory collaborator; the engine only reads
//! them and refers to them by id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Represents an employee as listed by the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    /// Opaque unique identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Whether the employee is currently active.
    #[serde(default = "default_active")]
    pub active: bool,
    /// Soft-delete marker; set when the employee was removed.
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
    /// The organization this employee belongs to.
    pub org_id: String,
}

fn default_active() -> bool {
    true
}

impl Employee {
    /// Creates an active, non-deleted employee.
    pub fn new(id: impl Into<String>, name: impl Into<String>, org_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            active: true,
            deleted_at: None,
            org_id: org_id.into(),
        }
    }

    /// Returns true if the employee is active and not soft-deleted.
    ///
    /// Only such employees appear on the kiosk and in reports.
    ///
    /// # Examples
    ///
    /// ```
    /// use bundy_engine::models::Employee;
    ///
    /// let mut employee = Employee::new("emp_001", "Ada", "wslr");
    /// assert!(employee.is_reportable());
    ///
    /// employee.active = false;
    /// assert!(!employee.is_reportable());
    /// ```
    pub fn is_reportable(&self) -> bool {
        self.active && self.deleted_at.is_none()
    }
}
