//! Classifier port: Trait for the pre-trained risk model.
//!
//! The model is consumed, not built, by this crate. Only a hard label is
//! required; probability output is optional.

use crate::domain::{FeatureVector, Label};

/// Errors that can occur when obtaining or querying the classifier.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ModelError {
    #[error("Model artifact not found: {0}")]
    NotFound(String),

    #[error("Model artifact is invalid: {0}")]
    Invalid(String),

    #[error("Model artifact digest mismatch")]
    DigestMismatch,

    #[error("Model does not provide probability output")]
    ProbabilityUnsupported,

    #[error("Prediction failed: {0}")]
    Prediction(String),
}

/// Trait for a binary heart disease classifier.
///
/// Implementations receive an already validated, fixed-order feature vector.
pub trait RiskClassifier: Send + Sync {
    /// Predict the hard label.
    ///
    /// # Errors
    /// Returns `ModelError::Prediction` if the model cannot score the vector.
    fn predict_label(&self, features: &FeatureVector) -> Result<Label, ModelError>;

    /// Predict the probability of disease present, in [0, 1].
    ///
    /// The default implementation reports that probability output is
    /// unsupported; callers substitute the documented fallback.
    ///
    /// # Errors
    /// Returns `ModelError::ProbabilityUnsupported` or `ModelError::Prediction`.
    fn predict_probability(&self, _features: &FeatureVector) -> Result<f64, ModelError> {
        Err(ModelError::ProbabilityUnsupported)
    }

    /// Whether `predict_probability` is expected to succeed.
    fn supports_probability(&self) -> bool {
        false
    }

    /// Short description for status displays.
    fn describe(&self) -> String;
}
