//! Report output models.
//!
//! This module contains the [`Report`] grid produced by the report builder
//! and the per-employee [`EmployeeSummary`] used by the JSON export.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{BundyError, BundyResult};

/// A tabular attendance report: a two-row header plus one row per employee.
///
/// Every row, header and data alike, has the same number of cells.
///
/// # Example
///
/// ```
/// use bundy_engine::models::Report;
///
/// let report = Report {
///     header: vec![
///         vec!["employee_name".into(), "05/01/2024".into(), "".into()],
///         vec!["".into(), "In".into(), "Out".into()],
///     ],
///     rows: vec![vec!["Ada".into(), "0900".into(), "1700".into()]],
/// };
/// assert_eq!(report.width(), 3);
/// assert_eq!(
///     report.to_csv()?,
///     "employee_name,05/01/2024,\n,In,Out\nAda,0900,1700"
/// );
/// # Ok::<(), bundy_engine::error::BundyError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Header rows: dates, then `In`/`Out` labels.
    pub header: Vec<Vec<String>>,
    /// One row per employee.
    pub rows: Vec<Vec<String>>,
}

impl Report {
    /// Returns the number of columns in the grid.
    pub fn width(&self) -> usize {
        self.header.first().map(Vec::len).unwrap_or(0)
    }

    /// Returns true if every row has the same width as the header.
    pub fn is_rectangular(&self) -> bool {
        let width = self.width();
        self.header
            .iter()
            .chain(self.rows.iter())
            .all(|row| row.len() == width)
    }

    /// Renders the report as comma-separated text.
    ///
    /// Rows are separated by `\n` with no trailing newline. Cells are quoted
    /// only when they need it.
    ///
    /// # Errors
    ///
    /// `ReportRender` if the grid is not rectangular.
    pub fn to_csv(&self) -> BundyResult<String> {
        let mut writer = csv::WriterBuilder::new()
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        for row in self.header.iter().chain(self.rows.iter()) {
            writer.write_record(row).map_err(render_error)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|err| render_error(err.into_error()))?;
        let mut text = String::from_utf8(bytes).map_err(render_error)?;
        if text.ends_with('\n') {
            text.pop();
        }
        Ok(text)
    }
}

fn render_error(err: impl std::fmt::Display) -> BundyError {
    BundyError::ReportRender {
        message: err.to_string(),
    }
}

/// Per-employee totals over the report range.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeSummary {
    /// The employee id.
    pub employee_id: String,
    /// The employee display name.
    pub name: String,
    /// Number of shift pairs in range.
    pub shifts: u32,
    /// Number of those pairs with no finish.
    pub open_shifts: u32,
    /// Hours across closed pairs.
    pub worked_hours: Decimal,
}
