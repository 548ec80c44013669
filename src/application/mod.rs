//! Application layer: Use cases orchestrating domain and ports.

pub mod analysis;
pub mod renderer;
pub mod report;

pub use analysis::{classify, Analysis, AnalysisService};
pub use renderer::ReportRenderer;
pub use report::{ExportOutcome, ReportService};
