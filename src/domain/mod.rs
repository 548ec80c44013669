//! Domain layer: Core business types and logic.
//!
//! This module contains plain Rust types with no I/O.
//! All types are serializable and implement strict validation.

mod patient;
mod prediction;
mod record;
mod report;

pub use patient::{
    FeatureVector, PatientIdentity, PatientInput, Sex, ValidationError, FEATURE_COUNT,
    FEATURE_LABELS, FEATURE_NAMES, IDENTITY_MAX_CHARS,
};
pub use prediction::{
    risk_percent, Label, PredictionResult, ProbabilitySource, RiskLevel,
    FALLBACK_PROBABILITY_ABSENT, FALLBACK_PROBABILITY_PRESENT,
};
pub use record::{HistoryRecord, RecordId};
pub use report::{OutputFormat, RenderedReport, ReportFields, ReportFormat, ReportTable};
