//! Ports layer: Trait definitions for external collaborators.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the application and external systems (model artifact, storage,
//! spreadsheet engine, mail relay).

mod classifier;
mod dispatcher;
mod spreadsheet;
mod storage;

pub use classifier::{ModelError, RiskClassifier};
pub use dispatcher::{Attachment, DispatchError, OutboundMessage, ReportDispatcher};
pub use spreadsheet::{SpreadsheetEngine, SpreadsheetError};
pub use storage::{HistoryPage, PredictionStore, SortDirection};
