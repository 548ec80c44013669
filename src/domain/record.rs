//! Persisted history records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::patient::{PatientIdentity, PatientInput};
use super::prediction::RiskLevel;

/// Store-assigned record identifier. Strictly increasing in assignment order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub i64);

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One row of the analysis history: the submitted vitals plus the outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: RecordId,

    /// Optional patient reference and name
    pub identity: PatientIdentity,

    /// Vitals as submitted
    pub input: PatientInput,

    /// "High risk" / "Low risk"
    pub result_text: String,

    /// Probability of disease as a whole percentage
    pub risk_percent: u8,

    /// Timestamp of the analysis
    pub created_at: DateTime<Utc>,
}

impl HistoryRecord {
    #[must_use]
    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_percent(self.risk_percent)
    }
}
