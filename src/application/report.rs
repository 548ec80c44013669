//! Report service: exports to disk and e-mail delivery.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::adapters::smtp::validate_address;
use crate::domain::{HistoryRecord, OutputFormat, RenderedReport, ReportFormat, ReportTable};
use crate::ports::{Attachment, OutboundMessage, ReportDispatcher};
use crate::HeartwiseError;

use super::analysis::Analysis;
use super::renderer::ReportRenderer;

pub const EMAIL_SUBJECT: &str = "Heart Disease Risk Report";

const ANALYSIS_STEM: &str = "heart_report";
const HISTORY_STEM: &str = "all_history";

/// A report written to the export directory.
#[derive(Debug, Clone)]
pub struct ExportOutcome {
    pub path: PathBuf,
    pub format: OutputFormat,
    /// The requested format could not be produced; CSV was written instead
    pub degraded: bool,
}

/// Export and delivery of rendered reports.
pub struct ReportService {
    renderer: ReportRenderer,
    dispatcher: Arc<dyn ReportDispatcher>,
    export_dir: PathBuf,
}

impl ReportService {
    pub fn new(
        renderer: ReportRenderer,
        dispatcher: Arc<dyn ReportDispatcher>,
        export_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            renderer,
            dispatcher,
            export_dir: export_dir.into(),
        }
    }

    #[must_use]
    pub fn renderer(&self) -> &ReportRenderer {
        &self.renderer
    }

    #[must_use]
    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }

    #[must_use]
    pub fn mail_configured(&self) -> bool {
        self.dispatcher.is_configured()
    }

    /// Write one analysis as `heart_report.<ext>`.
    ///
    /// # Errors
    /// Returns `HeartwiseError::Export` if the file cannot be written.
    pub fn export_analysis(
        &self,
        analysis: &Analysis,
        format: ReportFormat,
    ) -> Result<ExportOutcome, HeartwiseError> {
        let report = self.renderer.render(&analysis.fields(), format);
        self.write(ANALYSIS_STEM, &report)
    }

    /// Write the whole history as `all_history.<ext>`, one row per record.
    ///
    /// # Errors
    /// Returns `HeartwiseError::Export` if the file cannot be written.
    pub fn export_history(
        &self,
        records: &[HistoryRecord],
        format: ReportFormat,
    ) -> Result<ExportOutcome, HeartwiseError> {
        let table = ReportTable::from_records(records);
        let report = self.renderer.render_table(&table, format);
        self.write(HISTORY_STEM, &report)
    }

    fn write(&self, stem: &str, report: &RenderedReport) -> Result<ExportOutcome, HeartwiseError> {
        std::fs::create_dir_all(&self.export_dir).map_err(|e| {
            HeartwiseError::Export(format!("cannot create {}: {e}", self.export_dir.display()))
        })?;

        let path = self.export_dir.join(report.file_name(stem));
        std::fs::write(&path, &report.bytes)
            .map_err(|e| HeartwiseError::Export(format!("cannot write {}: {e}", path.display())))?;

        tracing::info!(
            "Exported {} ({} bytes{})",
            path.display(),
            report.bytes.len(),
            if report.degraded { ", degraded" } else { "" }
        );
        Ok(ExportOutcome {
            path,
            format: report.format,
            degraded: report.degraded,
        })
    }

    /// Compose the report e-mail for an analysis, with the document attached.
    #[must_use]
    pub fn compose_message(&self, to: &str, analysis: &Analysis) -> OutboundMessage {
        let report = self.renderer.render(&analysis.fields(), ReportFormat::Document);
        let body = format!(
            "Heart disease risk screening result\n\n\
             Result: {}\n\
             Estimated risk: {}%\n\n\
             The full report is attached.\n",
            analysis.result.result_text(),
            analysis.result.risk_percent,
        );

        OutboundMessage {
            to: to.to_string(),
            subject: EMAIL_SUBJECT.to_string(),
            body,
            attachment: Some(Attachment {
                filename: report.file_name(ANALYSIS_STEM),
                content_type: report.format.mime_type().to_string(),
                bytes: report.bytes,
            }),
        }
    }

    /// Send the report for an analysis to `to`.
    ///
    /// The dispatcher's failure is returned as is; nothing is retried.
    ///
    /// # Errors
    /// Returns `HeartwiseError::Dispatch` for an invalid address or a failed send.
    pub fn email_report(&self, to: &str, analysis: &Analysis) -> Result<(), HeartwiseError> {
        let to = to.trim();
        validate_address(to)?;

        let message = self.compose_message(to, analysis);
        self.dispatcher.send(&message)?;

        tracing::info!("Report e-mailed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::pdf::Typeface;
    use crate::adapters::sqlite::SqliteStore;
    use crate::application::analysis::tests::StubClassifier;
    use crate::application::analysis::AnalysisService;
    use crate::domain::{Label, PatientIdentity, PatientInput};
    use crate::ports::{DispatchError, SortDirection};
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Dispatcher recording messages, optionally failing every send.
    #[derive(Default)]
    struct RecordingDispatcher {
        sent: Mutex<Vec<OutboundMessage>>,
        fail_with: Option<DispatchError>,
    }

    impl ReportDispatcher for RecordingDispatcher {
        fn send(&self, message: &OutboundMessage) -> Result<(), DispatchError> {
            if let Some(e) = &self.fail_with {
                return Err(e.clone());
            }
            self.sent.lock().expect("lock").push(message.clone());
            Ok(())
        }

        fn is_configured(&self) -> bool {
            true
        }
    }

    fn analysis_service() -> AnalysisService<StubClassifier, SqliteStore> {
        AnalysisService::new(
            Arc::new(StubClassifier {
                label: Label::Present,
                probability: Some(0.82),
            }),
            Arc::new(SqliteStore::in_memory().expect("Should create db")),
        )
    }

    fn analysis() -> Analysis {
        analysis_service()
            .analyze(PatientIdentity::new("P-1", "Ada"), PatientInput::sample())
            .expect("Should analyze")
    }

    fn service(dispatcher: Arc<dyn ReportDispatcher>, dir: &Path) -> ReportService {
        ReportService::new(ReportRenderer::new(Typeface::Builtin, None), dispatcher, dir)
    }

    #[test]
    fn test_export_analysis_file_names() {
        let temp = tempdir().expect("tempdir");
        let service = service(Arc::new(RecordingDispatcher::default()), &temp.path().join("out"));
        let analysis = analysis();

        let pdf = service
            .export_analysis(&analysis, ReportFormat::Document)
            .expect("Should export");
        assert_eq!(pdf.path, temp.path().join("out/heart_report.pdf"));
        assert!(pdf.path.exists());

        // No engine in this renderer: spreadsheet degrades to CSV.
        let sheet = service
            .export_analysis(&analysis, ReportFormat::Spreadsheet)
            .expect("Should export");
        assert_eq!(sheet.path, temp.path().join("out/heart_report.csv"));
        assert!(sheet.degraded);
    }

    #[test]
    fn test_export_history() {
        let temp = tempdir().expect("tempdir");
        let analyses = analysis_service();
        for _ in 0..3 {
            analyses
                .analyze(PatientIdentity::default(), PatientInput::sample())
                .expect("Should analyze");
        }
        let records = analyses.history(SortDirection::Descending).expect("Should list");

        let service = service(Arc::new(RecordingDispatcher::default()), temp.path());
        let outcome = service
            .export_history(&records, ReportFormat::TabularFallback)
            .expect("Should export");

        assert_eq!(outcome.path, temp.path().join("all_history.csv"));
        let text = std::fs::read_to_string(&outcome.path).expect("read");
        assert_eq!(text.lines().count(), 4);
    }

    #[test]
    fn test_email_composes_report() {
        let temp = tempdir().expect("tempdir");
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let service = service(dispatcher.clone(), temp.path());

        service
            .email_report("  doctor@example.com ", &analysis())
            .expect("Should send");

        let sent = dispatcher.sent.lock().expect("lock");
        assert_eq!(sent.len(), 1);
        let message = &sent[0];
        assert_eq!(message.to, "doctor@example.com");
        assert_eq!(message.subject, "Heart Disease Risk Report");
        assert!(message.body.contains("82%"));
        assert!(message.body.contains("High risk"));

        let attachment = message.attachment.as_ref().expect("attachment");
        assert_eq!(attachment.filename, "heart_report.pdf");
        assert_eq!(attachment.content_type, "application/pdf");
        assert!(attachment.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_invalid_address_not_sent() {
        let temp = tempdir().expect("tempdir");
        let dispatcher = Arc::new(RecordingDispatcher::default());
        let service = service(dispatcher.clone(), temp.path());

        let err = service
            .email_report("not-an-address", &analysis())
            .expect_err("Should reject");
        assert!(matches!(
            err,
            HeartwiseError::Dispatch(DispatchError::InvalidAddress(_))
        ));
        assert!(dispatcher.sent.lock().expect("lock").is_empty());
    }

    #[test]
    fn test_dispatch_failure_surfaced() {
        let temp = tempdir().expect("tempdir");
        let dispatcher = Arc::new(RecordingDispatcher {
            fail_with: Some(DispatchError::Transport("535 authentication failed".into())),
            ..RecordingDispatcher::default()
        });
        let service = service(dispatcher, temp.path());

        let err = service
            .email_report("doctor@example.com", &analysis())
            .expect_err("Should fail");
        assert_eq!(err.category(), "Delivery error");
        assert!(err.to_string().contains("535 authentication failed"));
    }
}
