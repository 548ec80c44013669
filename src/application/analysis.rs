//! Analysis service: validate, classify and persist one screening.
//!
//! The pipeline is synchronous and strictly ordered:
//! 1. Build the feature vector (validation)
//! 2. Classify (label, then probability or fallback)
//! 3. Append to the history store
//!
//! Validation and classifier failures stop the pipeline before anything is
//! stored. A store failure does not discard the computed result: the
//! returned [`Analysis`] carries both, so the save can be retried and the
//! report exported or sent regardless.

use std::sync::Arc;

use crate::adapters::StoreError;
use crate::domain::{
    FeatureVector, HistoryRecord, PatientIdentity, PatientInput, PredictionResult, RecordId,
    ReportFields,
};
use crate::ports::{HistoryPage, ModelError, PredictionStore, RiskClassifier, SortDirection};
use crate::HeartwiseError;

/// Outcome of one analysis.
#[derive(Debug)]
pub struct Analysis {
    pub identity: PatientIdentity,
    pub input: PatientInput,
    pub result: PredictionResult,
    /// Record id, or the store failure that prevented saving
    pub stored: Result<RecordId, HeartwiseError>,
}

impl Analysis {
    #[must_use]
    pub fn record_id(&self) -> Option<RecordId> {
        self.stored.as_ref().ok().copied()
    }

    /// Report projection of this analysis.
    #[must_use]
    pub fn fields(&self) -> ReportFields {
        ReportFields::for_analysis(
            self.record_id(),
            &self.identity,
            &self.input,
            self.result.result_text(),
            self.result.risk_percent,
            &self.result.created_at,
        )
    }
}

/// Classify a validated feature vector.
///
/// The label is required. The probability comes from the classifier when it
/// provides a valid one, otherwise from the label's documented fallback.
///
/// # Errors
/// Returns `HeartwiseError::ModelUnavailable` if the classifier cannot produce a label.
pub fn classify<C>(classifier: &C, features: &FeatureVector) -> Result<PredictionResult, HeartwiseError>
where
    C: RiskClassifier + ?Sized,
{
    let label = classifier.predict_label(features)?;

    let result = match classifier.predict_probability(features) {
        Ok(p) => {
            let result = PredictionResult::from_probability(label, p);
            if result.is_fallback() {
                tracing::warn!("Classifier returned unusable probability {p}; using fallback");
            }
            result
        }
        Err(ModelError::ProbabilityUnsupported) => {
            tracing::debug!("Classifier is label-only; using fallback probability");
            PredictionResult::fallback(label)
        }
        Err(e) => {
            tracing::warn!("Probability unavailable ({e}); using fallback");
            PredictionResult::fallback(label)
        }
    };

    tracing::debug!(
        "Classified: label={}, risk={}%, source={:?}",
        result.label,
        result.risk_percent,
        result.probability_source
    );
    Ok(result)
}

/// Service running analyses and serving history reads.
pub struct AnalysisService<C, S>
where
    C: RiskClassifier + ?Sized,
    S: PredictionStore,
{
    classifier: Arc<C>,
    store: Arc<S>,
}

impl<C, S> AnalysisService<C, S>
where
    C: RiskClassifier + ?Sized,
    S: PredictionStore,
    S::Error: Into<StoreError>,
{
    /// Create a new analysis service.
    pub fn new(classifier: Arc<C>, store: Arc<S>) -> Self {
        Self { classifier, store }
    }

    /// The classifier in use.
    #[must_use]
    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    /// Validate, classify and persist one set of vitals.
    ///
    /// # Errors
    /// Returns `Validation` or `ModelUnavailable`; nothing is stored in either
    /// case. Store failures are reported inside the returned [`Analysis`].
    pub fn analyze(
        &self,
        identity: PatientIdentity,
        input: PatientInput,
    ) -> Result<Analysis, HeartwiseError> {
        let features = FeatureVector::build(&input)?;
        let result = classify(self.classifier.as_ref(), &features)?;
        let stored = self.persist(&identity, &input, &result);

        match &stored {
            Ok(id) => tracing::info!("Analysis stored as record {id} ({}%)", result.risk_percent),
            Err(e) => tracing::warn!("Analysis computed but not stored: {e}"),
        }

        Ok(Analysis {
            identity,
            input,
            result,
            stored,
        })
    }

    /// Retry saving an analysis whose append failed. A saved analysis is left as is.
    pub fn retry_persist<'a>(&self, analysis: &'a mut Analysis) -> &'a Result<RecordId, HeartwiseError> {
        if analysis.stored.is_err() {
            analysis.stored = self.persist(&analysis.identity, &analysis.input, &analysis.result);
            if let Ok(id) = &analysis.stored {
                tracing::info!("Analysis stored as record {id} on retry");
            }
        }
        &analysis.stored
    }

    fn persist(
        &self,
        identity: &PatientIdentity,
        input: &PatientInput,
        result: &PredictionResult,
    ) -> Result<RecordId, HeartwiseError> {
        self.store
            .append(identity, input, result)
            .map_err(|e| HeartwiseError::StoreWrite(e.into()))
    }

    /// All history records.
    ///
    /// # Errors
    /// Returns `HeartwiseError::StoreRead`; no partial list is returned.
    pub fn history(&self, direction: SortDirection) -> Result<Vec<HistoryRecord>, HeartwiseError> {
        self.store
            .list_all(direction)
            .map_err(|e| HeartwiseError::StoreRead(e.into()))
    }

    /// One page of history, newest first.
    ///
    /// # Errors
    /// Returns `HeartwiseError::StoreRead` if the page cannot be read.
    pub fn history_page(&self, offset: usize, limit: usize) -> Result<HistoryPage, HeartwiseError> {
        self.store
            .list_page(offset, limit)
            .map_err(|e| HeartwiseError::StoreRead(e.into()))
    }

    /// Number of stored analyses.
    ///
    /// # Errors
    /// Returns `HeartwiseError::StoreRead` if the count cannot be read.
    pub fn record_count(&self) -> Result<usize, HeartwiseError> {
        self.store
            .count()
            .map_err(|e| HeartwiseError::StoreRead(e.into()))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::adapters::sqlite::SqliteStore;
    use crate::domain::{Label, ProbabilitySource, Sex, FALLBACK_PROBABILITY_ABSENT};
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Classifier returning a fixed label and, optionally, a fixed probability.
    pub(crate) struct StubClassifier {
        pub label: Label,
        pub probability: Option<f64>,
    }

    impl RiskClassifier for StubClassifier {
        fn predict_label(&self, _features: &FeatureVector) -> Result<Label, ModelError> {
            Ok(self.label)
        }

        fn predict_probability(&self, _features: &FeatureVector) -> Result<f64, ModelError> {
            self.probability.ok_or(ModelError::ProbabilityUnsupported)
        }

        fn supports_probability(&self) -> bool {
            self.probability.is_some()
        }

        fn describe(&self) -> String {
            "stub".into()
        }
    }

    struct BrokenClassifier;

    impl RiskClassifier for BrokenClassifier {
        fn predict_label(&self, _features: &FeatureVector) -> Result<Label, ModelError> {
            Err(ModelError::Prediction("weights missing".into()))
        }

        fn describe(&self) -> String {
            "broken".into()
        }
    }

    /// Store whose appends fail until `healthy` is set.
    struct FlakyStore {
        inner: SqliteStore,
        healthy: AtomicBool,
    }

    impl PredictionStore for FlakyStore {
        type Error = StoreError;

        fn append(
            &self,
            identity: &PatientIdentity,
            input: &PatientInput,
            result: &PredictionResult,
        ) -> Result<RecordId, StoreError> {
            if self.healthy.load(Ordering::SeqCst) {
                self.inner.append(identity, input, result)
            } else {
                Err(StoreError::Poisoned)
            }
        }

        fn list_all(&self, direction: SortDirection) -> Result<Vec<HistoryRecord>, StoreError> {
            self.inner.list_all(direction)
        }

        fn list_page(&self, offset: usize, limit: usize) -> Result<HistoryPage, StoreError> {
            self.inner.list_page(offset, limit)
        }

        fn count(&self) -> Result<usize, StoreError> {
            self.inner.count()
        }
    }

    fn service(label: Label, probability: Option<f64>) -> AnalysisService<StubClassifier, SqliteStore> {
        AnalysisService::new(
            Arc::new(StubClassifier { label, probability }),
            Arc::new(SqliteStore::in_memory().expect("Should create db")),
        )
    }

    #[test]
    fn test_high_risk_scenario() {
        let service = service(Label::Present, Some(0.82));
        let earlier = service
            .analyze(PatientIdentity::default(), PatientInput::sample())
            .expect("Should analyze")
            .record_id()
            .expect("stored");

        let input = PatientInput {
            age: 45,
            sex: Sex::Male,
            ..PatientInput::sample()
        };
        let analysis = service
            .analyze(PatientIdentity::new("P-9", "John Doe"), input.clone())
            .expect("Should analyze");

        assert_eq!(analysis.result.risk_percent, 82);
        assert_eq!(analysis.result.result_text(), "High risk");
        assert_eq!(analysis.result.probability_source, ProbabilitySource::Model);
        let id = analysis.record_id().expect("stored");
        assert!(id > earlier);

        let history = service.history(SortDirection::Descending).expect("Should list");
        assert_eq!(history[0].id, id);
        assert_eq!(history[0].input, input);
        assert_eq!(history[0].risk_percent, 82);
        assert_eq!(service.record_count().expect("count"), 2);
    }

    #[test]
    fn test_label_only_classifier_uses_fallback() {
        let service = service(Label::Absent, None);
        let analysis = service
            .analyze(PatientIdentity::default(), PatientInput::sample())
            .expect("Should analyze");

        assert_eq!(analysis.result.probability, FALLBACK_PROBABILITY_ABSENT);
        assert_eq!(analysis.result.risk_percent, 15);
        assert_eq!(analysis.result.result_text(), "Low risk");
        assert!(analysis.result.is_fallback());
    }

    #[test]
    fn test_out_of_range_probability_uses_fallback() {
        let classifier = StubClassifier {
            label: Label::Present,
            probability: Some(f64::INFINITY),
        };
        let features = FeatureVector::build(&PatientInput::sample()).expect("valid");
        let result = classify(&classifier, &features).expect("Should classify");
        assert_eq!(result.risk_percent, 85);
        assert!(result.is_fallback());
    }

    #[test]
    fn test_invalid_input_stores_nothing() {
        let service = service(Label::Present, Some(0.5));
        let input = PatientInput {
            resting_bp: 400,
            ..PatientInput::sample()
        };

        let err = service
            .analyze(PatientIdentity::default(), input)
            .expect_err("Should reject");
        assert!(matches!(err, HeartwiseError::Validation(_)));
        assert_eq!(service.record_count().expect("count"), 0);
    }

    #[test]
    fn test_classifier_failure_stores_nothing() {
        let store = Arc::new(SqliteStore::in_memory().expect("Should create db"));
        let service = AnalysisService::new(Arc::new(BrokenClassifier), Arc::clone(&store));

        let err = service
            .analyze(PatientIdentity::default(), PatientInput::sample())
            .expect_err("Should fail");
        assert!(matches!(err, HeartwiseError::ModelUnavailable(_)));
        assert_eq!(store.count().expect("count"), 0);
    }

    #[test]
    fn test_store_failure_keeps_result_and_retry_saves() {
        let store = Arc::new(FlakyStore {
            inner: SqliteStore::in_memory().expect("Should create db"),
            healthy: AtomicBool::new(false),
        });
        let service = AnalysisService::new(
            Arc::new(StubClassifier {
                label: Label::Present,
                probability: Some(0.82),
            }),
            Arc::clone(&store),
        );

        let mut analysis = service
            .analyze(PatientIdentity::default(), PatientInput::sample())
            .expect("Should analyze");
        assert!(matches!(analysis.stored, Err(HeartwiseError::StoreWrite(_))));
        assert_eq!(analysis.result.risk_percent, 82);
        assert_eq!(analysis.fields().get("Record ID"), Some("not saved"));

        store.healthy.store(true, Ordering::SeqCst);
        let id = *service
            .retry_persist(&mut analysis)
            .as_ref()
            .expect("Should save on retry");
        assert_eq!(analysis.record_id(), Some(id));
        assert_eq!(service.record_count().expect("count"), 1);

        // A second retry does not append again.
        service.retry_persist(&mut analysis);
        assert_eq!(service.record_count().expect("count"), 1);
    }
}
