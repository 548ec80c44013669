//! Heartwise: local heart disease risk screening.
//!
//! Main entry point for the terminal application.

use anyhow::{Context, Result};
use std::io::IsTerminal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use heartwise::adapters::sanitize::SanitizingMakeWriter;
use heartwise::config::AppConfig;
use heartwise::tui::App;

fn main() -> Result<()> {
    // Logs written to the terminal would corrupt the TUI's alternate screen:
    // - interactive TTY: log to a file
    // - non-interactive: log to stdout
    let log_mode = std::env::var("HEARTWISE_LOG_MODE").unwrap_or_else(|_| "auto".to_string());

    let interactive = std::io::stdout().is_terminal();
    let use_file = match log_mode.as_str() {
        "file" => true,
        "stdout" => false,
        // auto
        _ => interactive,
    };

    let (writer, _guard) = if use_file {
        let log_file =
            std::env::var("HEARTWISE_LOG_FILE").unwrap_or_else(|_| "heartwise.log".to_string());

        if let Some(parent) = std::path::Path::new(&log_file).parent() {
            // Best-effort; open() below reports the real failure.
            let _ = std::fs::create_dir_all(parent);
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .with_context(|| format!("opening log file {log_file}"))?;
        tracing_appender::non_blocking(file)
    } else {
        tracing_appender::non_blocking(std::io::stdout())
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(SanitizingMakeWriter::new(writer)))
        .init();

    tracing::info!("Starting Heartwise...");

    let config = AppConfig::from_env().context("reading configuration")?;
    tracing::debug!("Configuration: {config:?}");

    // The classifier artifact is required; a missing or tampered model stops startup here.
    let mut app = App::new(&config)?;
    app.run()?;

    tracing::info!("Heartwise shutdown complete.");
    Ok(())
}
