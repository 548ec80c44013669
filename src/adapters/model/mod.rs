//! Linear model adapter: Implementation of RiskClassifier.
//!
//! Loads a pre-trained linear classifier exported as JSON:
//!
//! ```json
//! {
//!   "kind": "logistic",
//!   "version": "2024.1",
//!   "feature_names": ["age", "sex", ...],
//!   "coefficients": [...],
//!   "intercept": -0.1,
//!   "scaler_mean": [...],
//!   "scaler_scale": [...],
//!   "threshold": 0.5
//! }
//! ```
//!
//! Features are standardized with the stored scaler before the dot product.
//! A `logistic` model reports probabilities; a `linear_svm` model only
//! reports a hard label, so callers substitute the fallback probability.
//!
//! # Integrity
//!
//! When a SHA-256 digest is pinned (`HEARTWISE_MODEL_SHA256`), the artifact
//! bytes are hashed before parsing and compared in constant time.

use std::path::Path;

use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::domain::{FeatureVector, Label, FEATURE_COUNT, FEATURE_NAMES};
use crate::ports::{ModelError, RiskClassifier};

/// Largest artifact accepted. A linear model over 13 features is a few KiB.
const MAX_ARTIFACT_BYTES: u64 = 1024 * 1024;

/// Model family stored in the artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    /// Logistic regression: sigmoid of the decision value
    Logistic,
    /// Linear SVM: sign of the decision value only
    LinearSvm,
}

#[derive(Debug, Deserialize)]
struct ModelArtifact {
    kind: ModelKind,
    #[serde(default)]
    version: Option<String>,
    feature_names: Vec<String>,
    coefficients: Vec<f64>,
    intercept: f64,
    scaler_mean: Vec<f64>,
    scaler_scale: Vec<f64>,
    #[serde(default = "default_threshold")]
    threshold: f64,
}

fn default_threshold() -> f64 {
    0.5
}

/// A standardized linear classifier over the 13 heart features.
#[derive(Debug, Clone)]
pub struct LinearModel {
    kind: ModelKind,
    version: Option<String>,
    coefficients: [f64; FEATURE_COUNT],
    intercept: f64,
    scaler_mean: [f64; FEATURE_COUNT],
    scaler_scale: [f64; FEATURE_COUNT],
    threshold: f64,
}

impl LinearModel {
    /// Load and validate an artifact from disk.
    ///
    /// # Errors
    /// - `ModelError::NotFound` if the file does not exist
    /// - `ModelError::DigestMismatch` if `expected_sha256` is set and differs
    /// - `ModelError::Invalid` for unreadable, oversized or malformed artifacts
    pub fn load(path: &Path, expected_sha256: Option<&str>) -> Result<Self, ModelError> {
        let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ModelError::NotFound(path.display().to_string()),
            _ => ModelError::Invalid(format!("{}: {e}", path.display())),
        })?;
        if metadata.len() > MAX_ARTIFACT_BYTES {
            return Err(ModelError::Invalid(format!(
                "artifact is {} bytes, max {MAX_ARTIFACT_BYTES}",
                metadata.len()
            )));
        }

        let bytes = std::fs::read(path)
            .map_err(|e| ModelError::Invalid(format!("{}: {e}", path.display())))?;

        if let Some(expected) = expected_sha256 {
            let actual = sha256_hex(&bytes);
            if !constant_time_eq_str(&actual, &expected.trim().to_ascii_lowercase()) {
                return Err(ModelError::DigestMismatch);
            }
        }

        let model = Self::from_json(&bytes)?;
        tracing::info!(
            "Loaded {:?} model (version={}, n_features={FEATURE_COUNT})",
            model.kind,
            model.version.as_deref().unwrap_or("unversioned"),
        );
        Ok(model)
    }

    /// Parse and validate artifact bytes.
    ///
    /// # Errors
    /// Returns `ModelError::Invalid` if the JSON is malformed or inconsistent.
    pub fn from_json(bytes: &[u8]) -> Result<Self, ModelError> {
        let artifact: ModelArtifact =
            serde_json::from_slice(bytes).map_err(|e| ModelError::Invalid(e.to_string()))?;

        if artifact.feature_names.len() != FEATURE_COUNT
            || artifact
                .feature_names
                .iter()
                .zip(FEATURE_NAMES.iter())
                .any(|(got, want)| got != want)
        {
            return Err(ModelError::Invalid(format!(
                "feature_names must be exactly {FEATURE_NAMES:?}"
            )));
        }

        let coefficients = fixed_len("coefficients", &artifact.coefficients)?;
        let scaler_mean = fixed_len("scaler_mean", &artifact.scaler_mean)?;
        let scaler_scale = fixed_len("scaler_scale", &artifact.scaler_scale)?;

        if scaler_scale.iter().any(|s| *s <= 0.0) {
            return Err(ModelError::Invalid("scaler_scale entries must be positive".into()));
        }
        if !artifact.intercept.is_finite() {
            return Err(ModelError::Invalid("intercept must be finite".into()));
        }
        if !(artifact.threshold > 0.0 && artifact.threshold < 1.0) {
            return Err(ModelError::Invalid("threshold must be in (0, 1)".into()));
        }

        Ok(Self {
            kind: artifact.kind,
            version: artifact.version,
            coefficients,
            intercept: artifact.intercept,
            scaler_mean,
            scaler_scale,
            threshold: artifact.threshold,
        })
    }

    #[must_use]
    pub fn kind(&self) -> ModelKind {
        self.kind
    }

    /// Signed distance from the decision boundary.
    fn decision_value(&self, features: &FeatureVector) -> f64 {
        features
            .as_slice()
            .iter()
            .enumerate()
            .map(|(i, x)| self.coefficients[i] * (x - self.scaler_mean[i]) / self.scaler_scale[i])
            .sum::<f64>()
            + self.intercept
    }
}

impl RiskClassifier for LinearModel {
    fn predict_label(&self, features: &FeatureVector) -> Result<Label, ModelError> {
        let z = self.decision_value(features);
        if !z.is_finite() {
            return Err(ModelError::Prediction("non-finite decision value".into()));
        }
        let present = match self.kind {
            ModelKind::Logistic => sigmoid(z) >= self.threshold,
            ModelKind::LinearSvm => z >= 0.0,
        };
        Ok(if present { Label::Present } else { Label::Absent })
    }

    fn predict_probability(&self, features: &FeatureVector) -> Result<f64, ModelError> {
        match self.kind {
            ModelKind::Logistic => {
                let p = sigmoid(self.decision_value(features));
                if p.is_finite() {
                    Ok(p)
                } else {
                    Err(ModelError::Prediction("non-finite probability".into()))
                }
            }
            ModelKind::LinearSvm => Err(ModelError::ProbabilityUnsupported),
        }
    }

    fn supports_probability(&self) -> bool {
        self.kind == ModelKind::Logistic
    }

    fn describe(&self) -> String {
        let kind = match self.kind {
            ModelKind::Logistic => "Logistic regression",
            ModelKind::LinearSvm => "Linear SVM",
        };
        match &self.version {
            Some(v) => format!("{kind} v{v}"),
            None => kind.to_string(),
        }
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

fn fixed_len(name: &str, values: &[f64]) -> Result<[f64; FEATURE_COUNT], ModelError> {
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ModelError::Invalid(format!("{name} contains non-finite values")));
    }
    values.try_into().map_err(|_| {
        ModelError::Invalid(format!(
            "{name} has {} entries, expected {FEATURE_COUNT}",
            values.len()
        ))
    })
}

fn sha256_hex(bytes: &[u8]) -> String {
    Sha256::digest(bytes).iter().map(|b| format!("{b:02x}")).collect()
}

// Constant-time compare for ASCII strings (used for SHA-256 hex digests).
fn constant_time_eq_str(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.as_bytes().iter().zip(b.as_bytes().iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
