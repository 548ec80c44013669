//! Main TUI application state machine.
//!
//! Handles:
//! - Screen navigation
//! - Input event handling
//! - Service integration (every action runs synchronously on the UI thread)

use std::io;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Terminal,
};

use crate::adapters::model::LinearModel;
use crate::adapters::pdf::provision_typeface;
use crate::adapters::sqlite::SqliteStore;
use crate::application::{AnalysisService, ExportOutcome, ReportRenderer, ReportService};
use crate::config::AppConfig;
use crate::domain::ReportFormat;
use crate::ports::{ReportDispatcher, RiskClassifier, SortDirection};
use crate::HeartwiseError;

use super::ui::{
    dashboard::{render_dashboard, DashboardState, RecentSummary},
    history::{render_history, HistoryState, PAGE_SIZE},
    patient::{render_patient_form, PatientFormState},
    render_disclaimer,
    result::{render_result, ResultMode, ResultState},
    StatusLine,
};

/// Records summarized on the dashboard.
const RECENT_WINDOW: usize = 10;

/// Current screen/view in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Dashboard,
    PatientForm,
    Result,
    History,
}

/// Services the UI drives.
pub struct Services {
    pub analysis: AnalysisService<dyn RiskClassifier, SqliteStore>,
    pub reports: ReportService,
}

impl Services {
    /// Build every adapter from configuration.
    ///
    /// # Errors
    /// Fails if the model artifact cannot be loaded or the store cannot be opened.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let model = LinearModel::load(&config.model_path, config.model_sha256.as_deref())
            .with_context(|| format!("loading model from {}", config.model_path.display()))?;
        tracing::info!("Loaded {}", model.describe());

        let store = SqliteStore::open(&config.db_path)
            .with_context(|| format!("opening history at {}", config.db_path.display()))?;

        let typeface = provision_typeface(&config.font_path, config.font_url.as_deref());
        tracing::info!("Report typeface: {}", typeface.describe());
        let renderer = ReportRenderer::with_default_engine(typeface);

        #[cfg(feature = "smtp")]
        let dispatcher: Arc<dyn ReportDispatcher> =
            Arc::new(crate::adapters::smtp::SmtpDispatcher::new(config.smtp.clone()));
        #[cfg(not(feature = "smtp"))]
        let dispatcher: Arc<dyn ReportDispatcher> =
            Arc::new(crate::adapters::smtp::DisabledDispatcher);

        let classifier: Arc<dyn RiskClassifier> = Arc::new(model);
        Ok(Self {
            analysis: AnalysisService::new(classifier, Arc::new(store)),
            reports: ReportService::new(renderer, dispatcher, config.export_dir.clone()),
        })
    }
}

/// Main application state
pub struct App {
    /// Current screen
    screen: Screen,

    /// Whether the app should quit
    should_quit: bool,

    services: Services,

    dashboard_state: DashboardState,

    patient_form_state: PatientFormState,

    /// Present while the result screen is reachable
    result_state: Option<ResultState>,

    history_state: HistoryState,
}

impl App {
    /// Create a new application instance from configuration.
    ///
    /// # Errors
    /// Returns error if services cannot be initialized.
    pub fn new(config: &AppConfig) -> Result<Self> {
        Ok(Self::with_dependencies(Services::from_config(config)?))
    }

    /// Create application with injected services (Composition Root pattern).
    #[must_use]
    pub fn with_dependencies(services: Services) -> Self {
        Self {
            screen: Screen::Dashboard,
            should_quit: false,
            services,
            dashboard_state: DashboardState::default(),
            patient_form_state: PatientFormState::default(),
            result_state: None,
            history_state: HistoryState::default(),
        }
    }

    /// Run the main application loop.
    ///
    /// # Errors
    /// Returns error if terminal operations fail.
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        self.update_dashboard_state();

        let result = self.main_loop(&mut terminal);

        // Restore terminal
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        result
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Min(0), Constraint::Length(3)])
                    .split(f.area());

                let content_area = chunks[0];
                match (self.screen, &self.result_state) {
                    (Screen::PatientForm, _) => {
                        render_patient_form(f, content_area, &self.patient_form_state);
                    }
                    (Screen::Result, Some(state)) => render_result(f, content_area, state),
                    (Screen::History, _) => render_history(f, content_area, &self.history_state),
                    (Screen::Dashboard | Screen::Result, _) => {
                        render_dashboard(f, content_area, &self.dashboard_state);
                    }
                }

                render_disclaimer(f, chunks[1]);
            })?;

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code, key.modifiers);
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        // Global quit handling
        if key == KeyCode::Char('q') && modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match self.screen {
            Screen::Dashboard => self.handle_dashboard_key(key),
            Screen::PatientForm => self.handle_patient_form_key(key),
            Screen::Result => self.handle_result_key(key),
            Screen::History => self.handle_history_key(key),
        }
    }

    fn handle_dashboard_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('n' | 'N') => self.open_patient_form(),
            KeyCode::Char('h' | 'H') => self.open_history(),
            KeyCode::Char('q' | 'Q') => {
                self.should_quit = true;
            }
            _ => {}
        }
    }

    fn handle_patient_form_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => self.open_dashboard(),
            KeyCode::Up | KeyCode::BackTab => self.patient_form_state.prev_field(),
            KeyCode::Down | KeyCode::Tab => self.patient_form_state.next_field(),
            KeyCode::F(2) => self.patient_form_state.load_sample_data(),
            KeyCode::Char(c) => self.patient_form_state.input_char(c),
            KeyCode::Backspace => self.patient_form_state.delete_char(),
            KeyCode::Delete => self.patient_form_state.clear_field(),
            KeyCode::Enter => self.submit_patient_form(),
            _ => {}
        }
    }

    fn handle_result_key(&mut self, key: KeyCode) {
        let Some(state) = self.result_state.as_mut() else {
            self.open_dashboard();
            return;
        };

        if matches!(state.mode, ResultMode::EmailEntry { .. }) {
            match key {
                KeyCode::Esc => state.cancel_email(),
                KeyCode::Enter => self.send_email(),
                KeyCode::Backspace => state.address_backspace(),
                KeyCode::Char(c) => state.address_input(c),
                _ => {}
            }
            return;
        }

        match key {
            KeyCode::Char('p' | 'P') => self.export_result(ReportFormat::Document),
            KeyCode::Char('x' | 'X') => self.export_result(ReportFormat::Spreadsheet),
            KeyCode::Char('e' | 'E') => {
                state.status = None;
                state.begin_email();
            }
            KeyCode::Char('r' | 'R') => self.retry_save(),
            KeyCode::Char('n' | 'N') => self.open_patient_form(),
            KeyCode::Esc | KeyCode::Enter => self.open_dashboard(),
            _ => {}
        }
    }

    fn handle_history_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => self.open_dashboard(),
            KeyCode::Up => self.history_state.select_prev(),
            KeyCode::Down => self.history_state.select_next(),
            KeyCode::Left | KeyCode::PageUp => {
                if let Some(offset) = self.history_state.prev_offset() {
                    self.load_history_page(offset);
                }
            }
            KeyCode::Right | KeyCode::PageDown => {
                if let Some(offset) = self.history_state.next_offset() {
                    self.load_history_page(offset);
                }
            }
            KeyCode::Char('p' | 'P') => self.export_history(ReportFormat::Document),
            KeyCode::Char('x' | 'X') => self.export_history(ReportFormat::Spreadsheet),
            _ => {}
        }
    }

    fn open_dashboard(&mut self) {
        self.update_dashboard_state();
        self.screen = Screen::Dashboard;
    }

    fn open_patient_form(&mut self) {
        self.patient_form_state = PatientFormState::default();
        self.screen = Screen::PatientForm;
    }

    fn open_history(&mut self) {
        self.history_state = HistoryState::default();
        self.load_history_page(0);
        self.screen = Screen::History;
    }

    fn submit_patient_form(&mut self) {
        let form = &mut self.patient_form_state;
        let outcome = form
            .to_patient_input()
            .map_err(HeartwiseError::from)
            .and_then(|input| self.services.analysis.analyze(form.identity(), input));

        match outcome {
            Ok(analysis) => {
                form.clear_sensitive();
                self.result_state = Some(ResultState::new(analysis));
                self.screen = Screen::Result;
            }
            Err(e) => {
                form.error_message = Some(StatusLine::from_error(&e).message);
            }
        }
    }

    fn export_result(&mut self, format: ReportFormat) {
        let Some(state) = self.result_state.as_mut() else {
            return;
        };
        let outcome = self.services.reports.export_analysis(&state.analysis, format);
        state.status = Some(export_status(outcome));
    }

    fn retry_save(&mut self) {
        let Some(state) = self.result_state.as_mut() else {
            return;
        };
        state.status = Some(match self.services.analysis.retry_persist(&mut state.analysis) {
            Ok(id) => StatusLine::ok(format!("Saved as record #{id}")),
            Err(e) => StatusLine::from_error(e),
        });
    }

    fn send_email(&mut self) {
        let Some(state) = self.result_state.as_mut() else {
            return;
        };
        let Some(address) = state.take_address() else {
            return;
        };
        state.status = Some(match self.services.reports.email_report(&address, &state.analysis) {
            Ok(()) => StatusLine::ok(format!("Report sent to {}", address.trim())),
            Err(e) => StatusLine::from_error(&e),
        });
    }

    fn load_history_page(&mut self, offset: usize) {
        match self.services.analysis.history_page(offset, PAGE_SIZE) {
            Ok(page) => {
                self.history_state.set_page(page);
                self.history_state.status = None;
            }
            Err(e) => {
                self.history_state.page = None;
                self.history_state.status = Some(StatusLine::from_error(&e));
            }
        }
    }

    fn export_history(&mut self, format: ReportFormat) {
        let outcome = self
            .services
            .analysis
            .history(SortDirection::Ascending)
            .and_then(|records| self.services.reports.export_history(&records, format));
        self.history_state.status = Some(export_status(outcome));
    }

    fn update_dashboard_state(&mut self) {
        let classifier = self.services.analysis.classifier();
        let renderer = self.services.reports.renderer();

        let recent = match self.services.analysis.history_page(0, RECENT_WINDOW) {
            Ok(page) => RecentSummary::from_records(&page.items),
            Err(e) => {
                tracing::warn!("Dashboard could not read recent analyses: {e}");
                RecentSummary::default()
            }
        };

        self.dashboard_state = DashboardState {
            model: classifier.describe(),
            probability_support: classifier.supports_probability(),
            typeface: renderer.typeface().describe(),
            external_typeface: renderer.typeface().is_external(),
            spreadsheet_engine: renderer.spreadsheet_engine(),
            mail_configured: self.services.reports.mail_configured(),
            export_dir: self.services.reports.export_dir().display().to_string(),
            record_count: self.services.analysis.record_count().ok(),
            recent,
        };
    }
}

fn export_status(outcome: Result<ExportOutcome, HeartwiseError>) -> StatusLine {
    match outcome {
        Ok(export) if export.degraded => StatusLine {
            ok: false,
            message: format!(
                "Requested format unavailable; wrote {} ({})",
                export.path.display(),
                export.format
            ),
        },
        Ok(export) => StatusLine::ok(format!("Wrote {} ({})", export.path.display(), export.format)),
        Err(e) => StatusLine::from_error(&e),
    }
}
