//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the actual integration with external libraries:
//! - `model`: JSON linear model artifact (serde_json, sha2)
//! - `sqlite`: SQLite for the analysis history
//! - `pdf`: printpdf documents, with reqwest for the one-off font fetch
//! - `spreadsheet`: rust_xlsxwriter workbooks and the CSV fallback
//! - `smtp`: lettre mail delivery
//! - `sanitize`: contact and credential filtering for logs

pub mod model;
pub mod pdf;
pub mod sanitize;
pub mod smtp;
pub mod spreadsheet;
pub mod sqlite;

pub use sqlite::StoreError;
