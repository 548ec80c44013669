//! # Heartwise
//!
//! Local heart disease risk screening.
//!
//! This crate provides:
//! - Range-validated intake of 13 clinical vitals and their fixed-order feature vector
//! - Scoring against a pre-trained linear classifier with a documented probability fallback
//! - An append-only SQLite history of every analysis
//! - PDF / spreadsheet / CSV report rendering and e-mail delivery
//! - Terminal UI for local-only use
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (PatientInput, PredictionResult, HistoryRecord, report projections)
//! - `ports`: Trait definitions for external collaborators (classifier, store, dispatcher, spreadsheet engine)
//! - `adapters`: Concrete implementations (JSON linear model, SQLite, printpdf, rust_xlsxwriter, lettre)
//! - `application`: Use cases orchestrating domain and ports
//! - `tui`: Terminal user interface

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
pub mod tui;

pub use domain::{HistoryRecord, Label, PatientInput, PredictionResult, RiskLevel};

/// Result type for Heartwise operations
pub type Result<T> = std::result::Result<T, HeartwiseError>;

/// Main error type for Heartwise
#[derive(Debug, thiserror::Error)]
pub enum HeartwiseError {
    #[error("Invalid patient data: {0}")]
    Validation(#[from] domain::ValidationError),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(#[from] ports::ModelError),

    #[error("Could not save analysis: {0}")]
    StoreWrite(adapters::StoreError),

    #[error("Could not read history: {0}")]
    StoreRead(adapters::StoreError),

    #[error("Report not sent: {0}")]
    Dispatch(#[from] ports::DispatchError),

    #[error("Export failed: {0}")]
    Export(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HeartwiseError {
    /// Human-readable failure category, distinct per error class.
    #[must_use]
    pub fn category(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Input error",
            Self::ModelUnavailable(_) => "Model unavailable",
            Self::StoreWrite(_) => "Storage write error",
            Self::StoreRead(_) => "Storage read error",
            Self::Dispatch(_) => "Delivery error",
            Self::Export(_) => "Export error",
            Self::Io(_) => "I/O error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_are_distinct() {
        let errors = [
            HeartwiseError::Validation(domain::ValidationError::single("Age 0 out of range [1, 120]")),
            HeartwiseError::ModelUnavailable(ports::ModelError::NotFound("heart_model.json".into())),
            HeartwiseError::StoreWrite(adapters::StoreError::Poisoned),
            HeartwiseError::StoreRead(adapters::StoreError::Poisoned),
            HeartwiseError::Dispatch(ports::DispatchError::Unavailable),
            HeartwiseError::Export("disk full".into()),
            HeartwiseError::Io(std::io::Error::other("boom")),
        ];

        let mut categories: Vec<&str> = errors.iter().map(HeartwiseError::category).collect();
        categories.sort_unstable();
        categories.dedup();
        assert_eq!(categories.len(), errors.len());
    }
}
