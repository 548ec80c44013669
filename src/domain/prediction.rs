//! Prediction result types.
//!
//! Represents the output of the heart disease classifier.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Probability substituted when the classifier reports `Present` but cannot
/// provide a probability.
pub const FALLBACK_PROBABILITY_PRESENT: f64 = 0.85;

/// Probability substituted when the classifier reports `Absent` but cannot
/// provide a probability.
pub const FALLBACK_PROBABILITY_ABSENT: f64 = 0.15;

/// Binary classifier output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    /// Heart disease likely present
    Present,
    /// Heart disease likely absent
    Absent,
}

impl Label {
    /// Result text shown to the user. Derived from the label only.
    #[must_use]
    pub fn result_text(self) -> &'static str {
        match self {
            Self::Present => "High risk",
            Self::Absent => "Low risk",
        }
    }

    /// Documented fallback probability for this label.
    #[must_use]
    pub fn fallback_probability(self) -> f64 {
        match self {
            Self::Present => FALLBACK_PROBABILITY_PRESENT,
            Self::Absent => FALLBACK_PROBABILITY_ABSENT,
        }
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Present => write!(f, "PRESENT"),
            Self::Absent => write!(f, "ABSENT"),
        }
    }
}

/// Where the probability of a result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProbabilitySource {
    /// Reported by the classifier
    Model,
    /// Substituted from the label (see [`Label::fallback_probability`])
    Fallback,
}

/// Risk bucket for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    /// Low risk of heart disease
    Low,
    /// Moderate risk, monitoring recommended
    Moderate,
    /// High risk, intervention recommended
    High,
}

impl RiskLevel {
    /// Bucket a probability by its displayed percentage, so a result and
    /// its history record always agree.
    #[must_use]
    pub fn from_probability(probability: f64) -> Self {
        Self::from_percent(risk_percent(probability))
    }

    /// Bucket a percentage: below 30 is low, below 70 moderate, otherwise high.
    #[must_use]
    pub fn from_percent(percent: u8) -> Self {
        match percent {
            0..=29 => Self::Low,
            30..=69 => Self::Moderate,
            _ => Self::High,
        }
    }

    /// Get a human-readable description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Low => "Low risk - No significant indicators",
            Self::Moderate => "Moderate risk - Follow-up recommended",
            Self::High => "High risk - Prompt consultation advised",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Low => write!(f, "LOW"),
            Self::Moderate => write!(f, "MODERATE"),
            Self::High => write!(f, "HIGH"),
        }
    }
}

/// Convert a probability to a whole percentage.
///
/// Ties round half away from zero (`f64::round`) on the `probability * 100.0`
/// product: 0.125 yields 13, 0.375 yields 38. The result is clamped to [0, 100].
#[must_use]
pub fn risk_percent(probability: f64) -> u8 {
    (probability * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Result of one analysis. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Binary prediction
    pub label: Label,

    /// Probability of disease present (0.0 to 1.0)
    pub probability: f64,

    /// Whether `probability` came from the model or the fallback table
    pub probability_source: ProbabilitySource,

    /// `probability` as a whole percentage
    pub risk_percent: u8,

    /// Risk classification
    pub risk_level: RiskLevel,

    /// Timestamp of the analysis
    pub created_at: DateTime<Utc>,
}

impl PredictionResult {
    /// Create a result from a classifier probability.
    ///
    /// A probability outside [0, 1] or non-finite is not trusted; the
    /// label's fallback is used instead.
    #[must_use]
    pub fn from_probability(label: Label, probability: f64) -> Self {
        if !(0.0..=1.0).contains(&probability) {
            return Self::fallback(label);
        }
        Self::build(label, probability, ProbabilitySource::Model)
    }

    /// Create a result for a classifier that only reported a label.
    #[must_use]
    pub fn fallback(label: Label) -> Self {
        Self::build(label, label.fallback_probability(), ProbabilitySource::Fallback)
    }

    fn build(label: Label, probability: f64, probability_source: ProbabilitySource) -> Self {
        let risk_percent = risk_percent(probability);
        Self {
            label,
            probability,
            probability_source,
            risk_percent,
            risk_level: RiskLevel::from_percent(risk_percent),
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn result_text(&self) -> &'static str {
        self.label.result_text()
    }

    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.probability_source == ProbabilitySource::Fallback
    }
}
