//! Spreadsheet port: Trait for an optional workbook engine.
//!
//! When no engine is present, or the engine fails, spreadsheet renders
//! degrade to CSV.

use crate::domain::ReportTable;

/// Error raised by a spreadsheet engine.
#[derive(Debug, Clone, thiserror::Error)]
#[error("Spreadsheet engine failed: {0}")]
pub struct SpreadsheetError(pub String);

/// Trait for writing a table as a single-sheet workbook.
pub trait SpreadsheetEngine: Send + Sync {
    /// Engine name for status displays.
    fn name(&self) -> &'static str;

    /// Write `table` as one sheet named `sheet_name` and return the workbook bytes.
    ///
    /// # Errors
    /// Returns `SpreadsheetError` if the workbook cannot be produced.
    fn write_table(&self, sheet_name: &str, table: &ReportTable) -> Result<Vec<u8>, SpreadsheetError>;
}
