//! Report renderer: fields or tables into PDF, XLSX or CSV bytes.
//!
//! Rendering never fails outright. A spreadsheet request without a working
//! engine, or a document that cannot be produced, degrades to CSV with the
//! same content and is tagged `degraded`.

use crate::adapters::pdf::{write_document, Typeface};
use crate::adapters::spreadsheet::to_csv;
use crate::domain::{OutputFormat, RenderedReport, ReportFields, ReportFormat, ReportTable};
use crate::ports::SpreadsheetEngine;

pub const REPORT_TITLE: &str = "Heart Disease Risk Report";
pub const HISTORY_TITLE: &str = "Heart Disease Risk History";

const REPORT_SHEET: &str = "Heart Report";
const HISTORY_SHEET: &str = "History";

/// Renders report projections in the requested format.
pub struct ReportRenderer {
    typeface: Typeface,
    spreadsheet: Option<Box<dyn SpreadsheetEngine>>,
}

impl ReportRenderer {
    #[must_use]
    pub fn new(typeface: Typeface, spreadsheet: Option<Box<dyn SpreadsheetEngine>>) -> Self {
        Self {
            typeface,
            spreadsheet,
        }
    }

    /// Renderer with the spreadsheet engine compiled into this build, if any.
    #[must_use]
    pub fn with_default_engine(typeface: Typeface) -> Self {
        #[cfg(feature = "xlsx")]
        let engine: Option<Box<dyn SpreadsheetEngine>> =
            Some(Box::new(crate::adapters::spreadsheet::XlsxEngine));
        #[cfg(not(feature = "xlsx"))]
        let engine: Option<Box<dyn SpreadsheetEngine>> = None;

        Self::new(typeface, engine)
    }

    #[must_use]
    pub fn typeface(&self) -> &Typeface {
        &self.typeface
    }

    /// Name of the spreadsheet engine, if one is present.
    #[must_use]
    pub fn spreadsheet_engine(&self) -> Option<&'static str> {
        self.spreadsheet.as_ref().map(|e| e.name())
    }

    /// Render one analysis.
    #[must_use]
    pub fn render(&self, fields: &ReportFields, format: ReportFormat) -> RenderedReport {
        let table = ReportTable::from_fields(fields);
        match format {
            ReportFormat::Document => {
                self.document(REPORT_TITLE, std::slice::from_ref(fields), &table)
            }
            ReportFormat::Spreadsheet => self.spreadsheet(REPORT_SHEET, &table),
            ReportFormat::TabularFallback => csv(&table, false),
        }
    }

    /// Render a multi-record table: one document block, or one spreadsheet
    /// row, per record.
    #[must_use]
    pub fn render_table(&self, table: &ReportTable, format: ReportFormat) -> RenderedReport {
        match format {
            ReportFormat::Document => {
                let blocks: Vec<ReportFields> = table
                    .rows
                    .iter()
                    .map(|row| {
                        let mut fields = ReportFields::new();
                        for (label, value) in table.columns.iter().zip(row) {
                            fields.push(label.as_str(), value.as_str());
                        }
                        fields
                    })
                    .collect();
                self.document(HISTORY_TITLE, &blocks, table)
            }
            ReportFormat::Spreadsheet => self.spreadsheet(HISTORY_SHEET, table),
            ReportFormat::TabularFallback => csv(table, false),
        }
    }

    fn document(&self, title: &str, blocks: &[ReportFields], table: &ReportTable) -> RenderedReport {
        match write_document(title, blocks, &self.typeface) {
            Ok(bytes) => RenderedReport {
                format: OutputFormat::Pdf,
                bytes,
                degraded: false,
            },
            Err(e) => {
                tracing::warn!("Document rendering failed, falling back to CSV: {e}");
                csv(table, true)
            }
        }
    }

    fn spreadsheet(&self, sheet_name: &str, table: &ReportTable) -> RenderedReport {
        let Some(engine) = &self.spreadsheet else {
            tracing::info!("No spreadsheet engine in this build; writing CSV");
            return csv(table, true);
        };

        match engine.write_table(sheet_name, table) {
            Ok(bytes) => RenderedReport {
                format: OutputFormat::Xlsx,
                bytes,
                degraded: false,
            },
            Err(e) => {
                tracing::warn!("{} failed, falling back to CSV: {e}", engine.name());
                csv(table, true)
            }
        }
    }
}

fn csv(table: &ReportTable, degraded: bool) -> RenderedReport {
    RenderedReport {
        format: OutputFormat::Csv,
        bytes: to_csv(table),
        degraded,
    }
}
