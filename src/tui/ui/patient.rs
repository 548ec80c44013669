//! Patient data input form.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use zeroize::Zeroize;

use crate::domain::{
    PatientIdentity, PatientInput, ValidationError, FEATURE_COUNT, FEATURE_LABELS,
    IDENTITY_MAX_CHARS,
};
use crate::tui::styles::MedicalTheme;

use super::key_hints;

const VITAL_MAX_CHARS: usize = 16;

/// Leading identity fields before the vitals.
const IDENTITY_FIELDS: usize = 2;

const VITAL_HINTS: [&str; FEATURE_COUNT] = [
    "years (1-120)",
    "male / female",
    "0-3",
    "mmHg (50-250)",
    "mg/dl (80-600)",
    "1=yes, 0=no",
    "0-2",
    "bpm (60-250)",
    "1=yes, 0=no",
    "mm (0.0-10.0)",
    "0-2",
    "0-4",
    "0-3",
];

/// Form field definition
#[derive(Debug, Clone)]
pub struct FormField {
    pub label: &'static str,
    pub hint: &'static str,
    pub value: String,
    /// Free text (identity) rather than a vital
    pub free_text: bool,
}

impl FormField {
    fn max_chars(&self) -> usize {
        if self.free_text {
            IDENTITY_MAX_CHARS
        } else {
            VITAL_MAX_CHARS
        }
    }
}

/// Patient form state
pub struct PatientFormState {
    pub fields: Vec<FormField>,
    pub selected_field: usize,
    pub error_message: Option<String>,
}

impl Default for PatientFormState {
    fn default() -> Self {
        let identity = [("Patient Ref", "optional"), ("Name", "optional")]
            .into_iter()
            .map(|(label, hint)| FormField {
                label,
                hint,
                value: String::new(),
                free_text: true,
            });
        let vitals = FEATURE_LABELS
            .into_iter()
            .zip(VITAL_HINTS)
            .map(|(label, hint)| FormField {
                label,
                hint,
                value: String::new(),
                free_text: false,
            });

        Self {
            fields: identity.chain(vitals).collect(),
            selected_field: 0,
            error_message: None,
        }
    }
}

impl PatientFormState {
    /// Move to the next field
    pub fn next_field(&mut self) {
        self.selected_field = (self.selected_field + 1) % self.fields.len();
    }

    /// Move to the previous field
    pub fn prev_field(&mut self) {
        if self.selected_field == 0 {
            self.selected_field = self.fields.len() - 1;
        } else {
            self.selected_field -= 1;
        }
    }

    /// Add a character to the current field
    pub fn input_char(&mut self, c: char) {
        let field = &mut self.fields[self.selected_field];
        let accepted = if field.free_text {
            !c.is_control()
        } else {
            c.is_ascii_alphanumeric() || c == '.' || c == '-'
        };
        if accepted && field.value.chars().count() < field.max_chars() {
            field.value.push(c);
            self.error_message = None;
        }
    }

    /// Delete the last character
    pub fn delete_char(&mut self) {
        self.fields[self.selected_field].value.pop();
    }

    /// Clear the current field
    pub fn clear_field(&mut self) {
        self.fields[self.selected_field].value.clear();
    }

    /// Wipe all field buffers once the analysis has been taken over by the result view.
    pub fn clear_sensitive(&mut self) {
        for field in &mut self.fields {
            field.value.zeroize();
        }
        self.error_message = None;
        self.selected_field = 0;
    }

    /// Fill the vitals with a typical screening patient.
    pub fn load_sample_data(&mut self) {
        let sample = PatientInput::sample().form_values();
        for (field, value) in self.fields[IDENTITY_FIELDS..].iter_mut().zip(sample) {
            field.value = value;
        }
        self.error_message = None;
    }

    pub fn identity(&self) -> PatientIdentity {
        PatientIdentity::new(&self.fields[0].value, &self.fields[1].value)
    }

    /// Parse the vitals. Range checks happen in the analysis pipeline.
    ///
    /// # Errors
    /// Returns a `ValidationError` naming every field that failed to parse.
    pub fn to_patient_input(&self) -> Result<PatientInput, ValidationError> {
        let vitals = &self.fields[IDENTITY_FIELDS..];
        let raw: [&str; FEATURE_COUNT] = std::array::from_fn(|i| vitals[i].value.as_str());
        PatientInput::parse_form(&raw)
    }
}

/// Render the patient data input form
pub fn render_patient_form(f: &mut Frame, area: Rect, state: &PatientFormState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Form
            Constraint::Length(3), // Footer/error
        ])
        .split(area);

    render_form_header(f, chunks[0]);
    render_form_fields(f, chunks[1], state);
    render_form_footer(f, chunks[2], state);
}

fn render_form_header(f: &mut Frame, area: Rect) {
    let header = Paragraph::new(Line::from(vec![
        Span::styled(" ", MedicalTheme::text()),
        Span::styled("Patient Data Entry", MedicalTheme::title()),
        Span::styled(" │ 13 Clinical Features", MedicalTheme::text_secondary()),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(header, area);
}

fn render_form_fields(f: &mut Frame, area: Rect, state: &PatientFormState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .margin(1)
        .split(area);

    let mid = state.fields.len().div_ceil(2);

    render_field_column(f, columns[0], &state.fields[..mid], 0, state.selected_field);
    render_field_column(
        f,
        columns[1],
        &state.fields[mid..],
        mid,
        state.selected_field,
    );
}

fn render_field_column(
    f: &mut Frame,
    area: Rect,
    fields: &[FormField],
    offset: usize,
    selected: usize,
) {
    let field_height = 3;
    let constraints: Vec<Constraint> = fields
        .iter()
        .map(|_| Constraint::Length(field_height))
        .chain(std::iter::once(Constraint::Min(0)))
        .collect();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (i, field) in fields.iter().enumerate() {
        let is_selected = offset + i == selected;
        let border_style = if is_selected {
            MedicalTheme::border_focused()
        } else {
            MedicalTheme::border()
        };

        let title_style = if is_selected {
            MedicalTheme::focused()
        } else {
            MedicalTheme::text_secondary()
        };

        let block = Block::default()
            .title(Span::styled(format!(" {} ", field.label), title_style))
            .borders(Borders::ALL)
            .border_style(border_style);

        let value_display = if field.value.is_empty() {
            Span::styled(field.hint, MedicalTheme::text_muted())
        } else {
            Span::styled(field.value.as_str(), MedicalTheme::text())
        };

        let content = Paragraph::new(Line::from(vec![
            Span::raw(" "),
            value_display,
            if is_selected {
                Span::styled("▌", MedicalTheme::cursor())
            } else {
                Span::raw("")
            },
        ]))
        .block(block);

        f.render_widget(content, chunks[i]);
    }
}

fn render_form_footer(f: &mut Frame, area: Rect, state: &PatientFormState) {
    let content = if let Some(err) = &state.error_message {
        Line::from(vec![
            Span::styled("! ", MedicalTheme::danger()),
            Span::styled(err.as_str(), MedicalTheme::danger()),
        ])
    } else {
        key_hints(&[
            ("↑↓", "Navigate"),
            ("Enter", "Analyze"),
            ("F2", "Sample Data"),
            ("Del", "Clear Field"),
            ("Esc", "Cancel"),
        ])
    };

    let footer = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(MedicalTheme::border()),
    );

    f.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Sex;

    fn type_text(state: &mut PatientFormState, text: &str) {
        for c in text.chars() {
            state.input_char(c);
        }
    }

    #[test]
    fn test_form_has_identity_and_all_vitals() {
        let state = PatientFormState::default();
        assert_eq!(state.fields.len(), IDENTITY_FIELDS + FEATURE_COUNT);
        assert_eq!(state.fields[IDENTITY_FIELDS].label, "Age");
        assert_eq!(state.fields[IDENTITY_FIELDS + 12].label, "Thalassemia");
    }

    #[test]
    fn test_sample_data_parses() {
        let mut state = PatientFormState::default();
        state.load_sample_data();
        let input = state.to_patient_input().expect("Should parse");
        assert_eq!(input, PatientInput::sample());
        assert!(state.identity().is_empty());
    }

    #[test]
    fn test_vital_fields_reject_spaces() {
        let mut state = PatientFormState::default();
        state.selected_field = IDENTITY_FIELDS + 1;
        type_text(&mut state, "fe male");
        assert_eq!(state.fields[IDENTITY_FIELDS + 1].value, "female");
    }

    #[test]
    fn test_identity_accepts_free_text() {
        let mut state = PatientFormState::default();
        state.next_field();
        type_text(&mut state, "Jane O'Neil");
        state.load_sample_data();
        state.selected_field = IDENTITY_FIELDS + 1;
        state.clear_field();
        type_text(&mut state, "F");

        assert_eq!(state.identity().name.as_deref(), Some("Jane O'Neil"));
        assert_eq!(state.to_patient_input().expect("Should parse").sex, Sex::Female);
    }

    #[test]
    fn test_empty_form_reports_every_field() {
        let state = PatientFormState::default();
        let err = state.to_patient_input().expect_err("Should fail");
        assert_eq!(err.violations.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_clear_sensitive_wipes_values() {
        let mut state = PatientFormState::default();
        state.load_sample_data();
        state.selected_field = 4;
        state.clear_sensitive();
        assert!(state.fields.iter().all(|f| f.value.is_empty()));
        assert_eq!(state.selected_field, 0);
    }

    #[test]
    fn test_navigation_wraps() {
        let mut state = PatientFormState::default();
        state.prev_field();
        assert_eq!(state.selected_field, state.fields.len() - 1);
        state.next_field();
        assert_eq!(state.selected_field, 0);
    }
}
