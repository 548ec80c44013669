//! Dashboard view: Main overview screen.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::domain::{HistoryRecord, RiskLevel};
use crate::tui::styles::{MedicalTheme, LOGO_SMALL};

/// Risk buckets of the most recent analyses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RecentSummary {
    pub total: usize,
    pub low: u32,
    pub moderate: u32,
    pub high: u32,
}

impl RecentSummary {
    pub fn from_records(records: &[HistoryRecord]) -> Self {
        let mut summary = Self {
            total: records.len(),
            ..Self::default()
        };
        for record in records {
            match record.risk_level() {
                RiskLevel::Low => summary.low += 1,
                RiskLevel::Moderate => summary.moderate += 1,
                RiskLevel::High => summary.high += 1,
            }
        }
        summary
    }
}

/// Dashboard state for rendering.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub model: String,
    pub probability_support: bool,
    pub typeface: String,
    pub external_typeface: bool,
    pub spreadsheet_engine: Option<&'static str>,
    pub mail_configured: bool,
    pub export_dir: String,
    /// `None` if the history could not be read
    pub record_count: Option<usize>,
    pub recent: RecentSummary,
}

/// Render the main dashboard view.
pub fn render_dashboard(f: &mut Frame, area: Rect, state: &DashboardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Main content
        ])
        .split(area);

    render_header(f, chunks[0]);
    render_main_content(f, chunks[1], state);
}

fn render_header(f: &mut Frame, area: Rect) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", MedicalTheme::text()),
        Span::styled(LOGO_SMALL, MedicalTheme::title()),
        Span::styled(" │ ", MedicalTheme::text_muted()),
        Span::styled("Heart Disease Risk Screening", MedicalTheme::text_secondary()),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(header, area);
}

fn render_main_content(f: &mut Frame, area: Rect, state: &DashboardState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    render_status_panels(f, chunks[0], state);
    render_recent_summary(f, chunks[1], state);
}

fn render_status_panels(f: &mut Frame, area: Rect, state: &DashboardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(9), // System status
            Constraint::Min(0),    // Quick actions
        ])
        .margin(1)
        .split(area);

    let records = match state.record_count {
        Some(n) => Span::styled(n.to_string(), MedicalTheme::text()),
        None => Span::styled("unreadable", MedicalTheme::danger()),
    };

    let status_items = vec![
        Line::from(vec![
            Span::styled("  Model: ", MedicalTheme::text_secondary()),
            Span::styled(state.model.clone(), MedicalTheme::text()),
        ]),
        format_status_item(
            if state.probability_support {
                "Probability output"
            } else {
                "Probability output (fallback in use)"
            },
            state.probability_support,
        ),
        Line::from(vec![
            Span::styled("  Typeface: ", MedicalTheme::text_secondary()),
            Span::styled(
                state.typeface.clone(),
                if state.external_typeface {
                    MedicalTheme::text()
                } else {
                    MedicalTheme::warning()
                },
            ),
        ]),
        match state.spreadsheet_engine {
            Some(engine) => Line::from(vec![
                Span::styled("  OK ", MedicalTheme::success()),
                Span::styled(format!("Spreadsheet: {engine}"), MedicalTheme::text()),
            ]),
            None => Line::from(vec![
                Span::styled("  -- ", MedicalTheme::warning()),
                Span::styled("Spreadsheet: CSV only", MedicalTheme::text()),
            ]),
        },
        format_status_item("E-mail delivery", state.mail_configured),
        Line::from(vec![
            Span::styled("  Exports: ", MedicalTheme::text_secondary()),
            Span::styled(state.export_dir.clone(), MedicalTheme::text_muted()),
        ]),
        Line::from(vec![
            Span::styled("  Analyses: ", MedicalTheme::text_secondary()),
            records,
        ]),
    ];

    let status_block = Block::default()
        .title(Span::styled(" System Status ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());

    f.render_widget(Paragraph::new(status_items).block(status_block), chunks[0]);

    let actions = vec![
        Line::from(vec![
            Span::styled("[N] ", MedicalTheme::key_hint()),
            Span::styled("New Analysis", MedicalTheme::key_desc()),
        ]),
        Line::from(vec![
            Span::styled("[H] ", MedicalTheme::key_hint()),
            Span::styled("History", MedicalTheme::key_desc()),
        ]),
        Line::from(vec![
            Span::styled("[Q] ", MedicalTheme::key_hint()),
            Span::styled("Quit", MedicalTheme::key_desc()),
        ]),
    ];

    let actions_block = Block::default()
        .title(Span::styled(" Quick Actions ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());

    f.render_widget(Paragraph::new(actions).block(actions_block), chunks[1]);
}

fn format_status_item(label: &str, ok: bool) -> Line<'static> {
    let (icon, style) = if ok {
        ("OK", MedicalTheme::success())
    } else {
        ("--", MedicalTheme::warning())
    };

    Line::from(vec![
        Span::styled(format!("  {icon} "), style),
        Span::styled(label.to_string(), MedicalTheme::text()),
    ])
}

fn render_recent_summary(f: &mut Frame, area: Rect, state: &DashboardState) {
    let block = Block::default()
        .title(Span::styled(" Recent Analyses ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());

    let recent = state.recent;
    if recent.total == 0 {
        let empty_msg = Paragraph::new(Line::from(vec![Span::styled(
            "No analyses yet. Press [N] to start.",
            MedicalTheme::text_muted(),
        )]))
        .block(block);
        f.render_widget(empty_msg, area);
        return;
    }

    let lines = vec![
        Line::from(vec![
            Span::styled("Last ", MedicalTheme::text_secondary()),
            Span::styled(recent.total.to_string(), MedicalTheme::text()),
            Span::styled(" analyses", MedicalTheme::text_secondary()),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("Low: ", MedicalTheme::text_secondary()),
            Span::styled(recent.low.to_string(), MedicalTheme::risk_level(RiskLevel::Low)),
            Span::styled("  Moderate: ", MedicalTheme::text_secondary()),
            Span::styled(
                recent.moderate.to_string(),
                MedicalTheme::risk_level(RiskLevel::Moderate),
            ),
            Span::styled("  High: ", MedicalTheme::text_secondary()),
            Span::styled(recent.high.to_string(), MedicalTheme::risk_level(RiskLevel::High)),
        ]),
        Line::from(""),
        Line::from(vec![Span::styled(
            "Open [H] History for details and exports.",
            MedicalTheme::text_muted(),
        )]),
    ];

    f.render_widget(Paragraph::new(lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PatientIdentity, PatientInput, RecordId};
    use chrono::Utc;

    fn record(id: i64, risk_percent: u8) -> HistoryRecord {
        HistoryRecord {
            id: RecordId(id),
            identity: PatientIdentity::default(),
            input: PatientInput::sample(),
            result_text: "Low risk".into(),
            risk_percent,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_recent_summary_buckets() {
        let summary = RecentSummary::from_records(&[record(1, 15), record(2, 29), record(3, 30), record(4, 82)]);
        assert_eq!(
            summary,
            RecentSummary {
                total: 4,
                low: 2,
                moderate: 1,
                high: 1,
            }
        );
    }
}
