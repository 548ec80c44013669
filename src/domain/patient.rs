//! Patient vitals and the fixed-order feature vector fed to the classifier.
//!
//! Feature layout follows the Cleveland heart disease dataset
//! (age, sex, cp, trestbps, chol, fbs, restecg, thalach, exang, oldpeak, slope, ca, thal).

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

/// Number of features expected by the classifier.
pub const FEATURE_COUNT: usize = 13;

/// Feature names in classifier order.
/// The order is frozen by the trained model and must never change.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "age", "sex", "cp", "trestbps", "chol", "fbs", "restecg", "thalach", "exang", "oldpeak",
    "slope", "ca", "thal",
];

/// Human-readable labels, same order as [`FEATURE_NAMES`].
pub const FEATURE_LABELS: [&str; FEATURE_COUNT] = [
    "Age",
    "Sex",
    "Chest Pain Type",
    "Resting Blood Pressure",
    "Cholesterol",
    "Fasting Blood Sugar > 120 mg/dl",
    "Resting ECG",
    "Max Heart Rate",
    "Exercise Induced Angina",
    "ST Depression",
    "ST Slope",
    "Major Vessels",
    "Thalassemia",
];

/// Maximum length (in characters) of free-text identity fields.
pub const IDENTITY_MAX_CHARS: usize = 100;

const AGE: RangeInclusive<i64> = 1..=120;
const CHEST_PAIN_TYPE: RangeInclusive<i64> = 0..=3;
const RESTING_BP: RangeInclusive<i64> = 50..=250;
const CHOLESTEROL: RangeInclusive<i64> = 80..=600;
const RESTING_ECG: RangeInclusive<i64> = 0..=2;
const MAX_HEART_RATE: RangeInclusive<i64> = 60..=250;
const ST_DEPRESSION: RangeInclusive<f64> = 0.0..=10.0;
const ST_SLOPE: RangeInclusive<i64> = 0..=2;
const MAJOR_VESSELS: RangeInclusive<i64> = 0..=4;
// 0 = unknown, 1 = normal, 2 = fixed defect, 3 = reversible defect
const THALASSEMIA: RangeInclusive<i64> = 0..=3;

/// One or more fields failed parsing or range validation.
///
/// Validation is all-or-nothing: every violated field is reported and no
/// feature vector is produced.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", .violations.join("; "))]
pub struct ValidationError {
    pub violations: Vec<String>,
}

impl ValidationError {
    #[must_use]
    pub fn single(message: impl Into<String>) -> Self {
        Self {
            violations: vec![message.into()],
        }
    }
}

/// Biological sex as captured by the form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    /// Numeric encoding used by the classifier.
    #[must_use]
    pub fn encode(self) -> f64 {
        match self {
            Self::Male => 1.0,
            Self::Female => 0.0,
        }
    }

    /// Display label, also the persisted representation.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
        }
    }

    /// Parse a form or stored value (`male`/`m`/`1`, `female`/`f`/`0`).
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_lowercase().as_str() {
            "male" | "m" | "1" => Some(Self::Male),
            "female" | "f" | "0" => Some(Self::Female),
            _ => None,
        }
    }
}

impl std::fmt::Display for Sex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Optional identifying details printed on reports. Never fed to the model.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientIdentity {
    /// Caller-assigned patient reference
    pub patient_ref: Option<String>,

    /// Patient display name
    pub name: Option<String>,
}

impl PatientIdentity {
    /// Build an identity from raw form text. Blank values become `None`,
    /// longer values are cut at [`IDENTITY_MAX_CHARS`].
    #[must_use]
    pub fn new(patient_ref: &str, name: &str) -> Self {
        Self {
            patient_ref: normalize_identity_text(patient_ref),
            name: normalize_identity_text(name),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patient_ref.is_none() && self.name.is_none()
    }
}

fn normalize_identity_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.chars().take(IDENTITY_MAX_CHARS).collect())
    }
}

/// One clinical observation submitted for scoring.
///
/// Values are held as entered; nothing is trusted until [`FeatureVector::build`]
/// has validated every field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatientInput {
    /// Age in years [1, 120]
    pub age: i64,

    pub sex: Sex,

    /// Chest pain type [0, 3]
    pub chest_pain_type: i64,

    /// Resting blood pressure in mmHg [50, 250]
    pub resting_bp: i64,

    /// Serum cholesterol in mg/dl [80, 600]
    pub cholesterol: i64,

    /// Fasting blood sugar > 120 mg/dl
    pub fasting_sugar_high: bool,

    /// Resting ECG result [0, 2]
    pub resting_ecg: i64,

    /// Maximum heart rate achieved [60, 250]
    pub max_heart_rate: i64,

    /// Exercise induced angina
    pub exercise_angina: bool,

    /// ST depression induced by exercise relative to rest [0.0, 10.0]
    pub st_depression: f64,

    /// Slope of the peak exercise ST segment [0, 2]
    pub st_slope: i64,

    /// Number of major vessels colored by fluoroscopy [0, 4]
    pub major_vessels: i64,

    /// Thalassemia [0, 3]
    pub thalassemia: i64,
}

impl PatientInput {
    /// Parse raw form text, one entry per feature in [`FEATURE_NAMES`] order.
    ///
    /// Only syntax is checked here; ranges are checked by [`FeatureVector::build`].
    ///
    /// # Errors
    /// Returns a `ValidationError` naming every field that could not be parsed.
    pub fn parse_form(raw: &[&str; FEATURE_COUNT]) -> Result<Self, ValidationError> {
        let mut violations = Vec::new();

        let mut int = |idx: usize| -> i64 {
            raw[idx].trim().parse::<i64>().unwrap_or_else(|_| {
                violations.push(format!("{}: invalid whole number", FEATURE_LABELS[idx]));
                0
            })
        };

        let age = int(0);
        let chest_pain_type = int(2);
        let resting_bp = int(3);
        let cholesterol = int(4);
        let resting_ecg = int(6);
        let max_heart_rate = int(7);
        let st_slope = int(10);
        let major_vessels = int(11);
        let thalassemia = int(12);

        let sex = Sex::parse(raw[1]).unwrap_or_else(|| {
            violations.push(format!("{}: expected male or female", FEATURE_LABELS[1]));
            Sex::Female
        });
        let fasting_sugar_high = parse_flag(raw[5]).unwrap_or_else(|| {
            violations.push(format!("{}: expected yes/no or 1/0", FEATURE_LABELS[5]));
            false
        });
        let exercise_angina = parse_flag(raw[8]).unwrap_or_else(|| {
            violations.push(format!("{}: expected yes/no or 1/0", FEATURE_LABELS[8]));
            false
        });
        let st_depression = raw[9].trim().parse::<f64>().unwrap_or_else(|_| {
            violations.push(format!("{}: invalid number", FEATURE_LABELS[9]));
            0.0
        });

        if !violations.is_empty() {
            return Err(ValidationError { violations });
        }

        Ok(Self {
            age,
            sex,
            chest_pain_type,
            resting_bp,
            cholesterol,
            fasting_sugar_high,
            resting_ecg,
            max_heart_rate,
            exercise_angina,
            st_depression,
            st_slope,
            major_vessels,
            thalassemia,
        })
    }

    /// Validate that all features are within their declared domains.
    ///
    /// # Errors
    /// Returns every violated field at once.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut violations = Vec::new();

        let mut check = |label: &str, value: i64, range: &RangeInclusive<i64>| {
            if !range.contains(&value) {
                violations.push(format!(
                    "{label} {value} out of range [{}, {}]",
                    range.start(),
                    range.end()
                ));
            }
        };

        check(FEATURE_LABELS[0], self.age, &AGE);
        check(FEATURE_LABELS[2], self.chest_pain_type, &CHEST_PAIN_TYPE);
        check(FEATURE_LABELS[3], self.resting_bp, &RESTING_BP);
        check(FEATURE_LABELS[4], self.cholesterol, &CHOLESTEROL);
        check(FEATURE_LABELS[6], self.resting_ecg, &RESTING_ECG);
        check(FEATURE_LABELS[7], self.max_heart_rate, &MAX_HEART_RATE);
        check(FEATURE_LABELS[10], self.st_slope, &ST_SLOPE);
        check(FEATURE_LABELS[11], self.major_vessels, &MAJOR_VESSELS);
        check(FEATURE_LABELS[12], self.thalassemia, &THALASSEMIA);

        // NaN fails `contains`, so non-finite input is rejected here too.
        if !ST_DEPRESSION.contains(&self.st_depression) {
            violations.push(format!(
                "{} {} out of range [{:.1}, {:.1}]",
                FEATURE_LABELS[9],
                self.st_depression,
                ST_DEPRESSION.start(),
                ST_DEPRESSION.end()
            ));
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { violations })
        }
    }

    /// Display values in [`FEATURE_LABELS`] order, as shown on reports and history.
    #[must_use]
    pub fn display_values(&self) -> [String; FEATURE_COUNT] {
        [
            self.age.to_string(),
            self.sex.label().to_string(),
            self.chest_pain_type.to_string(),
            self.resting_bp.to_string(),
            self.cholesterol.to_string(),
            yes_no(self.fasting_sugar_high).to_string(),
            self.resting_ecg.to_string(),
            self.max_heart_rate.to_string(),
            yes_no(self.exercise_angina).to_string(),
            self.st_depression.to_string(),
            self.st_slope.to_string(),
            self.major_vessels.to_string(),
            self.thalassemia.to_string(),
        ]
    }

    /// Form text for each field, suitable for [`PatientInput::parse_form`].
    #[must_use]
    pub fn form_values(&self) -> [String; FEATURE_COUNT] {
        let mut values = self.display_values();
        values[5] = flag_text(self.fasting_sugar_high).to_string();
        values[8] = flag_text(self.exercise_angina).to_string();
        values
    }

    /// Typical screening patient, used for the form's sample data.
    #[must_use]
    pub fn sample() -> Self {
        Self {
            age: 45,
            sex: Sex::Male,
            chest_pain_type: 2,
            resting_bp: 120,
            cholesterol: 230,
            fasting_sugar_high: false,
            resting_ecg: 1,
            max_heart_rate: 150,
            exercise_angina: false,
            st_depression: 1.0,
            st_slope: 1,
            major_vessels: 0,
            thalassemia: 2,
        }
    }
}

fn parse_flag(input: &str) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "1" | "yes" | "y" | "true" => Some(true),
        "0" | "no" | "n" | "false" => Some(false),
        _ => None,
    }
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

fn flag_text(flag: bool) -> &'static str {
    if flag {
        "1"
    } else {
        "0"
    }
}

/// Validated, fixed-order numeric vector expected by the classifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    /// Validate `input` and encode it in [`FEATURE_NAMES`] order.
    ///
    /// Sex is encoded male=1 / female=0, booleans 1/0; everything else passes
    /// through unchanged.
    ///
    /// # Errors
    /// Returns `ValidationError` if any field is outside its domain.
    pub fn build(input: &PatientInput) -> Result<Self, ValidationError> {
        input.validate()?;

        Ok(Self([
            input.age as f64,
            input.sex.encode(),
            input.chest_pain_type as f64,
            input.resting_bp as f64,
            input.cholesterol as f64,
            bool_feature(input.fasting_sugar_high),
            input.resting_ecg as f64,
            input.max_heart_rate as f64,
            bool_feature(input.exercise_angina),
            input.st_depression,
            input.st_slope as f64,
            input.major_vessels as f64,
            input.thalassemia as f64,
        ]))
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }
}

fn bool_feature(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}
