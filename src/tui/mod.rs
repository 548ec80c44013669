//! TUI module: Terminal User Interface using Ratatui.
//!
//! Screens:
//! - Dashboard with model, typeface, export and mail status
//! - Patient intake form
//! - Analysis result with export and e-mail actions
//! - Paged analysis history

mod app;
mod styles;
mod ui;

pub use app::{App, Services};
pub use styles::MedicalTheme;
