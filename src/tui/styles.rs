//! Terminal palette and the few styles the screens share.
//!
//! Risk colors are fixed per bucket: green low, amber moderate, rose high.

use ratatui::style::{Color, Modifier, Style};

use crate::domain::RiskLevel;

const TEAL: Color = Color::Rgb(13, 148, 136);
const TEAL_LIGHT: Color = Color::Rgb(45, 212, 191);
const TEAL_DARK: Color = Color::Rgb(15, 118, 110);
const SLATE: Color = Color::Rgb(148, 163, 184);
const SLATE_DARK: Color = Color::Rgb(100, 116, 139);
const INK: Color = Color::Rgb(15, 23, 42);
const PAPER: Color = Color::Rgb(248, 250, 252);

const GREEN: Color = Color::Rgb(16, 185, 129);
const AMBER: Color = Color::Rgb(251, 191, 36);
const ROSE: Color = Color::Rgb(244, 63, 94);

/// Inline product name used in headers
pub const LOGO_SMALL: &str = "Heartwise";

/// Style presets used by every view.
pub struct MedicalTheme;

impl MedicalTheme {
    #[must_use]
    pub fn title() -> Style {
        Self::text().add_modifier(Modifier::BOLD)
    }

    /// Panel titles and focused field labels.
    #[must_use]
    pub fn subtitle() -> Style {
        Style::default().fg(TEAL_LIGHT).add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn focused() -> Style {
        Self::subtitle()
    }

    #[must_use]
    pub fn key_hint() -> Style {
        Self::subtitle()
    }

    #[must_use]
    pub fn text() -> Style {
        Style::default().fg(PAPER)
    }

    #[must_use]
    pub fn text_secondary() -> Style {
        Style::default().fg(SLATE)
    }

    #[must_use]
    pub fn key_desc() -> Style {
        Self::text_secondary()
    }

    #[must_use]
    pub fn text_muted() -> Style {
        Style::default().fg(SLATE_DARK)
    }

    #[must_use]
    pub fn success() -> Style {
        Style::default().fg(GREEN)
    }

    #[must_use]
    pub fn warning() -> Style {
        Style::default().fg(AMBER)
    }

    #[must_use]
    pub fn danger() -> Style {
        Style::default().fg(ROSE)
    }

    /// Highlighted table row.
    #[must_use]
    pub fn selected() -> Style {
        Style::default().fg(INK).bg(TEAL).add_modifier(Modifier::BOLD)
    }

    /// Table header row.
    #[must_use]
    pub fn header() -> Style {
        Self::title().bg(TEAL_DARK)
    }

    #[must_use]
    pub fn border() -> Style {
        Style::default().fg(SLATE)
    }

    #[must_use]
    pub fn border_focused() -> Style {
        Style::default().fg(TEAL)
    }

    #[must_use]
    pub fn cursor() -> Style {
        Style::default().fg(TEAL_LIGHT)
    }

    #[must_use]
    pub fn risk_level(level: RiskLevel) -> Style {
        match level {
            RiskLevel::Low => Self::success(),
            RiskLevel::Moderate => Self::warning(),
            RiskLevel::High => Self::danger(),
        }
    }

    /// Gauge style for a risk percentage; higher is worse.
    #[must_use]
    pub fn risk_gauge(percent: u8) -> Style {
        Self::risk_level(RiskLevel::from_percent(percent))
    }

    /// Status line style for an action outcome.
    #[must_use]
    pub fn outcome(ok: bool) -> Style {
        if ok {
            Self::success()
        } else {
            Self::danger()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_risk_gauge_follows_buckets() {
        assert_eq!(MedicalTheme::risk_gauge(15), MedicalTheme::success());
        assert_eq!(MedicalTheme::risk_gauge(30), MedicalTheme::warning());
        assert_eq!(MedicalTheme::risk_gauge(82), MedicalTheme::danger());
    }

    #[test]
    fn test_outcome_colors() {
        assert_eq!(MedicalTheme::outcome(true), MedicalTheme::success());
        assert_eq!(MedicalTheme::outcome(false), MedicalTheme::danger());
    }
}
