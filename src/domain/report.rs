//! Report projections: the label/value pairs and tables that renderers consume.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::patient::{PatientIdentity, PatientInput, FEATURE_LABELS};
use super::record::{HistoryRecord, RecordId};

/// Label used for the record identifier column.
pub const RECORD_ID_LABEL: &str = "Record ID";

const UNSAVED_RECORD: &str = "not saved";

/// Requested output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    /// Paginated PDF document
    Document,
    /// Single-sheet XLSX workbook
    Spreadsheet,
    /// Plain CSV, always available
    TabularFallback,
}

/// Format actually produced by a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    Pdf,
    Xlsx,
    Csv,
}

impl OutputFormat {
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Xlsx => "xlsx",
            Self::Csv => "csv",
        }
    }

    #[must_use]
    pub fn mime_type(self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Csv => "text/csv",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.extension())
    }
}

/// Bytes produced by a render, tagged with the format they are in.
///
/// A fallback render is still a successful render; `degraded` only records
/// that the requested format could not be produced as asked.
#[derive(Debug, Clone)]
pub struct RenderedReport {
    pub format: OutputFormat,
    pub bytes: Vec<u8>,
    pub degraded: bool,
}

impl RenderedReport {
    /// File name for this report, e.g. `heart_report.pdf`.
    #[must_use]
    pub fn file_name(&self, stem: &str) -> String {
        format!("{stem}.{}", self.format.extension())
    }
}

/// Ordered label to display-value mapping for a single analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFields {
    entries: Vec<(String, String)>,
}

impl ReportFields {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, label: impl Into<String>, value: impl Into<String>) {
        self.entries.push((label.into(), value.into()));
    }

    /// Fields for one analysis, in report order.
    #[must_use]
    pub fn for_analysis(
        record_id: Option<RecordId>,
        identity: &PatientIdentity,
        input: &PatientInput,
        result_text: &str,
        risk_percent: u8,
        created_at: &DateTime<Utc>,
    ) -> Self {
        let mut fields = Self::new();
        fields.push(
            RECORD_ID_LABEL,
            record_id.map_or_else(|| UNSAVED_RECORD.to_string(), |id| id.to_string()),
        );
        fields.push("Patient ID", identity.patient_ref.clone().unwrap_or_default());
        fields.push("Patient Name", identity.name.clone().unwrap_or_default());

        for (label, value) in FEATURE_LABELS.iter().zip(input.display_values()) {
            fields.push(*label, value);
        }

        fields.push("Result", result_text);
        fields.push("Risk (%)", risk_percent.to_string());
        fields.push(
            "Analyzed At",
            created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
        );
        fields
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(l, v)| (l.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn get(&self, label: &str) -> Option<&str> {
        self.iter().find(|(l, _)| *l == label).map(|(_, v)| v)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl From<&HistoryRecord> for ReportFields {
    fn from(record: &HistoryRecord) -> Self {
        Self::for_analysis(
            Some(record.id),
            &record.identity,
            &record.input,
            &record.result_text,
            record.risk_percent,
            &record.created_at,
        )
    }
}

/// Labelled columns with one row per record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    /// One-record table: labels become the header, values the single row.
    #[must_use]
    pub fn from_fields(fields: &ReportFields) -> Self {
        if fields.is_empty() {
            return Self::default();
        }
        Self {
            columns: fields.iter().map(|(l, _)| l.to_string()).collect(),
            rows: vec![fields.iter().map(|(_, v)| v.to_string()).collect()],
        }
    }

    /// History table, one row per record in the given order.
    #[must_use]
    pub fn from_records(records: &[HistoryRecord]) -> Self {
        let mut table = Self::default();
        for record in records {
            let fields = ReportFields::from(record);
            if table.columns.is_empty() {
                table.columns = fields.iter().map(|(l, _)| l.to_string()).collect();
            }
            table.rows.push(fields.iter().map(|(_, v)| v.to_string()).collect());
        }
        table
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() && self.rows.is_empty()
    }
}
