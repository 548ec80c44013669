//! History view: paged analysis records, newest first.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

use crate::domain::HistoryRecord;
use crate::ports::HistoryPage;
use crate::tui::styles::MedicalTheme;

use super::{key_hints, StatusLine};

pub const PAGE_SIZE: usize = 15;

/// History view state
#[derive(Debug, Default)]
pub struct HistoryState {
    pub page: Option<HistoryPage>,
    pub offset: usize,
    pub selected: usize,
    pub status: Option<StatusLine>,
}

impl HistoryState {
    /// Install a freshly read page, keeping the selection in range.
    pub fn set_page(&mut self, page: HistoryPage) {
        self.offset = page.offset;
        self.selected = self.selected.min(page.items.len().saturating_sub(1));
        self.page = Some(page);
    }

    pub fn next_offset(&self) -> Option<usize> {
        self.page.as_ref().and_then(HistoryPage::next_offset)
    }

    pub fn prev_offset(&self) -> Option<usize> {
        self.page.as_ref().and_then(HistoryPage::prev_offset)
    }

    pub fn select_next(&mut self) {
        let len = self.page.as_ref().map_or(0, |p| p.items.len());
        if self.selected + 1 < len {
            self.selected += 1;
        }
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }
}

/// Render the history view
pub fn render_history(f: &mut Frame, area: Rect, state: &HistoryState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Table
            Constraint::Length(4), // Footer
        ])
        .split(area);

    render_history_header(f, chunks[0], state);
    render_table(f, chunks[1], state);
    render_history_footer(f, chunks[2], state);
}

fn render_history_header(f: &mut Frame, area: Rect, state: &HistoryState) {
    let position = match &state.page {
        Some(page) if page.total_count > 0 => format!(
            " │ {}-{} of {}",
            page.offset + 1,
            page.offset + page.items.len(),
            page.total_count
        ),
        _ => String::new(),
    };

    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", MedicalTheme::text()),
        Span::styled("Analysis History", MedicalTheme::title()),
        Span::styled(position, MedicalTheme::text_secondary()),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(header, area);
}

fn record_row(record: &HistoryRecord, selected: bool) -> Row<'static> {
    let identity = &record.identity;
    let row = Row::new(vec![
        Cell::from(record.id.to_string()),
        Cell::from(record.created_at.format("%Y-%m-%d %H:%M").to_string()),
        Cell::from(identity.patient_ref.clone().unwrap_or_default()),
        Cell::from(identity.name.clone().unwrap_or_default()),
        Cell::from(format!("{} / {}", record.input.age, record.input.sex)),
        Cell::from(record.result_text.clone()),
        Cell::from(Span::styled(
            format!("{}%", record.risk_percent),
            MedicalTheme::risk_level(record.risk_level()),
        )),
    ]);

    if selected {
        row.style(MedicalTheme::selected())
    } else {
        row.style(MedicalTheme::text())
    }
}

fn render_table(f: &mut Frame, area: Rect, state: &HistoryState) {
    let block = Block::default()
        .title(Span::styled(" Records (newest first) ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());

    let Some(page) = state.page.as_ref().filter(|p| !p.items.is_empty()) else {
        let message = if state.page.is_some() {
            "No analyses recorded yet."
        } else {
            "History unavailable."
        };
        f.render_widget(
            Paragraph::new(Span::styled(message, MedicalTheme::text_muted())).block(block),
            area,
        );
        return;
    };

    let rows: Vec<Row> = page
        .items
        .iter()
        .enumerate()
        .map(|(i, record)| record_row(record, i == state.selected))
        .collect();

    let widths = [
        Constraint::Length(6),
        Constraint::Length(17),
        Constraint::Length(12),
        Constraint::Min(12),
        Constraint::Length(12),
        Constraint::Length(10),
        Constraint::Length(6),
    ];

    let table = Table::new(rows, widths)
        .header(
            Row::new(vec!["#", "Created (UTC)", "Ref", "Name", "Age / Sex", "Result", "Risk"])
                .style(MedicalTheme::header()),
        )
        .block(block);

    f.render_widget(table, area);
}

fn render_history_footer(f: &mut Frame, area: Rect, state: &HistoryState) {
    let mut lines = Vec::with_capacity(2);
    if let Some(status) = &state.status {
        lines.push(status.to_line());
    }
    lines.push(key_hints(&[
        ("↑↓", "Select"),
        ("←→", "Page"),
        ("P", "Export All PDF"),
        ("X", "Export All Spreadsheet"),
        ("Esc", "Dashboard"),
    ]));

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
    use crate::domain::{PatientIdentity, PatientInput, RecordId};
    use chrono::Utc;

    fn page(count: usize, total: usize, offset: usize) -> HistoryPage {
        let items = (0..count)
            .map(|i| HistoryRecord {
                id: RecordId(i as i64 + 1),
                identity: PatientIdentity::default(),
                input: PatientInput::sample(),
                result_text: "Low risk".into(),
                risk_percent: 15,
                created_at: Utc::now(),
            })
            .collect();
        HistoryPage::new(items, total, offset, PAGE_SIZE)
    }

    #[test]
    fn test_selection_clamped_to_page() {
        let mut state = HistoryState::default();
        state.set_page(page(PAGE_SIZE, 20, 0));
        for _ in 0..30 {
            state.select_next();
        }
        assert_eq!(state.selected, PAGE_SIZE - 1);
        assert_eq!(state.next_offset(), Some(PAGE_SIZE));

        state.set_page(page(5, 20, PAGE_SIZE));
        assert_eq!(state.selected, 4);
        assert_eq!(state.next_offset(), None);
        assert_eq!(state.prev_offset(), Some(0));
    }

    #[test]
    fn test_empty_page() {
        let mut state = HistoryState::default();
        state.set_page(page(0, 0, 0));
        state.select_next();
        assert_eq!(state.selected, 0);
        assert_eq!(state.next_offset(), None);
    }
}
