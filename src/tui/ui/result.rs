//! Analysis result view with export and e-mail actions.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};

use crate::application::Analysis;
use crate::tui::styles::MedicalTheme;

use super::{key_hints, StatusLine};

/// Longest address accepted by the input line.
const ADDRESS_MAX_CHARS: usize = 254;

/// What the result view's footer is doing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ResultMode {
    #[default]
    Actions,
    /// Typing the destination address for the report e-mail
    EmailEntry { address: String },
}

/// Result view state: owns the analysis until the user leaves the screen.
#[derive(Debug)]
pub struct ResultState {
    pub analysis: Analysis,
    pub mode: ResultMode,
    pub status: Option<StatusLine>,
}

impl ResultState {
    pub fn new(analysis: Analysis) -> Self {
        let status = analysis.stored.as_ref().err().map(StatusLine::from_error);
        Self {
            analysis,
            mode: ResultMode::Actions,
            status,
        }
    }

    pub fn begin_email(&mut self) {
        self.mode = ResultMode::EmailEntry {
            address: String::new(),
        };
    }

    pub fn cancel_email(&mut self) {
        self.mode = ResultMode::Actions;
    }

    pub fn address_input(&mut self, c: char) {
        if let ResultMode::EmailEntry { address } = &mut self.mode {
            if !c.is_control() && address.chars().count() < ADDRESS_MAX_CHARS {
                address.push(c);
            }
        }
    }

    pub fn address_backspace(&mut self) {
        if let ResultMode::EmailEntry { address } = &mut self.mode {
            address.pop();
        }
    }

    /// Leave address entry, returning what was typed.
    pub fn take_address(&mut self) -> Option<String> {
        match std::mem::take(&mut self.mode) {
            ResultMode::EmailEntry { address } => Some(address),
            ResultMode::Actions => None,
        }
    }
}

/// Render the result view
pub fn render_result(f: &mut Frame, area: Rect, state: &ResultState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(4), // Footer
        ])
        .split(area);

    render_result_header(f, chunks[0]);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(chunks[1]);
    render_outcome(f, columns[0], state);
    render_details(f, columns[1], state);

    render_result_footer(f, chunks[2], state);
}

fn render_result_header(f: &mut Frame, area: Rect) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", MedicalTheme::text()),
        Span::styled("Analysis Result", MedicalTheme::title()),
        Span::styled(" │ Heart Disease Risk", MedicalTheme::text_secondary()),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(header, area);
}

fn render_outcome(f: &mut Frame, area: Rect, state: &ResultState) {
    let result = &state.analysis.result;

    let block = Block::default()
        .title(Span::styled(" Result ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border_focused());

    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Result text
            Constraint::Length(3), // Gauge
            Constraint::Length(2), // Probability source
            Constraint::Min(0),    // Persistence
        ])
        .margin(1)
        .split(inner);

    let risk_style = MedicalTheme::risk_level(result.risk_level);
    let headline = Paragraph::new(vec![
        Line::from(Span::styled(
            result.result_text(),
            risk_style.add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            result.risk_level.description(),
            MedicalTheme::text_secondary(),
        )),
    ])
    .alignment(Alignment::Center);
    f.render_widget(headline, chunks[0]);

    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(Span::styled(" Estimated Risk ", MedicalTheme::text_secondary()))
                .borders(Borders::ALL)
                .border_style(MedicalTheme::border()),
        )
        .gauge_style(MedicalTheme::risk_gauge(result.risk_percent))
        .percent(u16::from(result.risk_percent))
        .label(format!("{}%", result.risk_percent));
    f.render_widget(gauge, chunks[1]);

    let source = if result.is_fallback() {
        Line::from(vec![
            Span::styled("! ", MedicalTheme::warning()),
            Span::styled(
                "Model gave no probability; estimate derived from the label",
                MedicalTheme::warning(),
            ),
        ])
    } else {
        Line::from(Span::styled(
            "Probability reported by the model",
            MedicalTheme::text_muted(),
        ))
    };
    f.render_widget(Paragraph::new(source).alignment(Alignment::Center), chunks[2]);

    let persistence = match &state.analysis.stored {
        Ok(id) => Line::from(vec![
            Span::styled("OK ", MedicalTheme::success()),
            Span::styled(format!("Saved as record #{id}"), MedicalTheme::text()),
        ]),
        Err(_) => Line::from(vec![
            Span::styled("! ", MedicalTheme::danger()),
            Span::styled("Not saved. Press [R] to retry.", MedicalTheme::danger()),
        ]),
    };
    f.render_widget(Paragraph::new(persistence).alignment(Alignment::Center), chunks[3]);
}

fn render_details(f: &mut Frame, area: Rect, state: &ResultState) {
    let fields = state.analysis.fields();
    let lines: Vec<Line> = fields
        .iter()
        .map(|(label, value)| {
            Line::from(vec![
                Span::styled(format!(" {label}: "), MedicalTheme::text_secondary()),
                Span::styled(value.to_string(), MedicalTheme::text()),
            ])
        })
        .collect();

    let block = Block::default()
        .title(Span::styled(" Report ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_result_footer(f: &mut Frame, area: Rect, state: &ResultState) {
    let mut lines = Vec::with_capacity(2);

    match &state.mode {
        ResultMode::EmailEntry { address } => {
            lines.push(Line::from(vec![
                Span::styled("Send to: ", MedicalTheme::focused()),
                Span::styled(address.as_str(), MedicalTheme::text()),
                Span::styled("▌", MedicalTheme::cursor()),
            ]));
            lines.push(key_hints(&[("Enter", "Send"), ("Esc", "Cancel")]));
        }
        ResultMode::Actions => {
            if let Some(status) = &state.status {
                lines.push(status.to_line());
            }
            let mut hints = vec![("P", "Export PDF"), ("X", "Export Spreadsheet"), ("E", "E-mail")];
            if state.analysis.stored.is_err() {
                hints.push(("R", "Retry Save"));
            }
            hints.extend([("N", "New"), ("Esc", "Dashboard")]);
            lines.push(key_hints(&hints));
        }
    }

    let footer = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::StoreError;
    use crate::domain::{Label, PatientIdentity, PatientInput, PredictionResult, RecordId};
    use crate::HeartwiseError;

    fn analysis(stored: Result<RecordId, HeartwiseError>) -> Analysis {
        Analysis {
            identity: PatientIdentity::default(),
            input: PatientInput::sample(),
            result: PredictionResult::from_probability(Label::Present, 0.82),
            stored,
        }
    }

    #[test]
    fn test_store_failure_shown_on_open() {
        let state = ResultState::new(analysis(Err(HeartwiseError::StoreWrite(StoreError::Poisoned))));
        let status = state.status.expect("status");
        assert!(!status.ok);
        assert!(status.message.starts_with("Storage write error"));

        let state = ResultState::new(analysis(Ok(RecordId(3))));
        assert!(state.status.is_none());
    }

    #[test]
    fn test_address_entry() {
        let mut state = ResultState::new(analysis(Ok(RecordId(1))));
        state.address_input('x');
        assert_eq!(state.take_address(), None);

        state.begin_email();
        for c in "ab@example.orgg".chars() {
            state.address_input(c);
        }
        state.address_backspace();
        assert_eq!(state.take_address().as_deref(), Some("ab@example.org"));
        assert_eq!(state.mode, ResultMode::Actions);
    }
}
