//! UI module: View components for the TUI.

pub mod dashboard;
pub mod history;
pub mod patient;
pub mod result;

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::tui::styles::MedicalTheme;
use crate::HeartwiseError;

/// Outcome of the last user action, shown in a view's footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub ok: bool,
    pub message: String,
}

impl StatusLine {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    /// Failure line prefixed with the error's category.
    pub fn from_error(err: &HeartwiseError) -> Self {
        Self {
            ok: false,
            message: format!("{}: {err}", err.category()),
        }
    }

    pub fn to_line(&self) -> Line<'_> {
        let (icon, style) = if self.ok {
            ("OK ", MedicalTheme::success())
        } else {
            ("! ", MedicalTheme::danger())
        };
        Line::from(vec![
            Span::styled(icon, style),
            Span::styled(self.message.as_str(), MedicalTheme::outcome(self.ok)),
        ])
    }
}

/// Key hint spans: `[K] Desc ` pairs.
pub fn key_hints(hints: &[(&'static str, &'static str)]) -> Line<'static> {
    let spans: Vec<Span<'static>> = hints
        .iter()
        .flat_map(|(key, desc)| {
            [
                Span::styled(format!("[{key}] "), MedicalTheme::key_hint()),
                Span::styled(format!("{desc} "), MedicalTheme::key_desc()),
            ]
        })
        .collect();
    Line::from(spans)
}

pub fn render_disclaimer(f: &mut Frame, area: Rect) {
    let text = vec![
        Line::from(vec![Span::styled(
            "DISCLAIMER: This tool provides indicative estimates and does not replace professional medical evaluation.",
            MedicalTheme::text_muted(),
        )]),
        Line::from(vec![Span::styled(
            "Screening only. Confirm any result with a clinician.",
            MedicalTheme::text_muted(),
        )]),
    ];

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(MedicalTheme::border());

    let p = Paragraph::new(text).block(block).wrap(Wrap { trim: true });

    f.render_widget(p, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::DispatchError;

    #[test]
    fn test_status_line_carries_category() {
        let err = HeartwiseError::Dispatch(DispatchError::Unavailable);
        let status = StatusLine::from_error(&err);
        assert!(!status.ok);
        assert!(status.message.starts_with("Delivery error: "));
    }

    #[test]
    fn test_key_hints_layout() {
        let line = key_hints(&[("P", "PDF"), ("Esc", "Back")]);
        assert_eq!(line.spans.len(), 4);
        assert_eq!(line.spans[0].content, "[P] ");
        assert_eq!(line.spans[3].content, "Back ");
    }
}
