//! End-to-end scenarios through the Predictor with in-memory models.

#![allow(clippy::unwrap_used, clippy::panic)]

use gradecast_core::{
    FeatureVector, InMemoryRecordSource, Interpretation, Model, ModelMetadata, ModelRegistry,
    ModelVariant, ModelVariantKey, PipelineConfig, PredictError, PredictResult, PredictionResponse,
    Predictor, SharedModel, Stage, StaticModelProvider, StudentRecord, Variant,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

// =============================================================================
// TEST HELPERS
// =============================================================================

/// Linear model over named weights that counts its invocations.
struct CountingModel {
    meta: ModelMetadata,
    intercept: f64,
    weights: Vec<f64>,
    calls: Arc<AtomicUsize>,
}

impl Model for CountingModel {
    fn metadata(&self) -> &ModelMetadata {
        &self.meta
    }

    fn predict(&self, features: &FeatureVector) -> PredictResult<f64> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let sum: f64 = features
            .values()
            .iter()
            .zip(&self.weights)
            .map(|(v, w)| if v.is_nan() { 0.0 } else { v * w })
            .sum();
        Ok(self.intercept + sum)
    }
}

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn variant_features() -> Vec<String> {
    names(&[
        "quiz_avg",
        "assignment_avg",
        "midterm",
        "study_hours",
        "sleep_hours",
        "teacher_quality",
        "attendance",
        "motivation",
        "quiz_imputed",
        "midterm_imputed",
    ])
}

fn linear(
    name: &str,
    expected: Vec<String>,
    tolerates_missing: bool,
    intercept: f64,
    calls: &Arc<AtomicUsize>,
) -> SharedModel {
    let mut weights = vec![0.0; expected.len()];
    // Only the first three inputs carry weight.
    for w in weights.iter_mut().take(3) {
        *w = 1.0 / 3.0;
    }
    Arc::new(CountingModel {
        meta: ModelMetadata {
            name: name.to_string(),
            expected_features: expected,
            all_features: None,
            tolerates_missing,
        },
        intercept,
        weights,
        calls: Arc::clone(calls),
    })
}

fn variant_predictor(calls: &Arc<AtomicUsize>) -> Predictor {
    let mut provider = StaticModelProvider::new();
    for subject in ["WEB101", "MATH201", "DATA301"] {
        for variant in [Variant::Full, Variant::NullQuiz1, Variant::NullMidterm] {
            let key = ModelVariantKey::new(subject, ModelVariant::Variant(variant));
            let name = format!("{}_{}_enhanced", subject, variant.as_str());
            provider = provider.with_model(key, linear(&name, variant_features(), false, 0.0, calls));
        }
    }
    Predictor::new(PipelineConfig::default(), Arc::new(ModelRegistry::new(provider))).unwrap()
}

fn complete_record() -> StudentRecord {
    StudentRecord::new()
        .with("quiz1", 80.0)
        .with("quiz2", 90.0)
        .with("assignment1", 85.0)
        .with("assignment2", 95.0)
        .with("midterm", 88.0)
        .with("study_hours", 12.0)
        .with("sleep_hours", 8.0)
        .with("teacher_quality", "excellent")
        .with("attendance", 95.0)
        .with("motivation", "high")
}

// =============================================================================
// SCENARIOS
// =============================================================================

#[test]
fn sparse_math_record_uses_null_midterm_at_floor_confidence() {
    let calls = Arc::new(AtomicUsize::new(0));
    let predictor = variant_predictor(&calls);

    let raw = StudentRecord::new()
        .with("Subject_Code", "MATH201")
        .with("quiz2", 80.0)
        .with("Hours Studied", 10.0)
        .with("sleep_hours", 7.0)
        .with("teacher_quality", "good")
        .with("attendance", 90.0)
        .with("Motivation_Level", "medium");

    let result = predictor.predict(&raw, None, None).unwrap();

    assert_eq!(result.variant, ModelVariant::Variant(Variant::NullMidterm));
    assert_eq!(result.artifact, "MATH201_null_midterm_enhanced");
    // (80 + 0 + 60) / 3
    assert_eq!(result.predicted_grade, 46.67);
    assert_eq!(result.interpretation, Interpretation::NeedsImprovement);
    assert_eq!(result.confidence, 0.5);
    assert_eq!(
        result.imputed_fields,
        names(&["quiz1", "assignment1", "assignment2", "midterm"])
    );
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn complete_web_record_gets_full_confidence() {
    let calls = Arc::new(AtomicUsize::new(0));
    let predictor = variant_predictor(&calls);

    let result = predictor
        .predict(&complete_record(), Some("WEB101"), None)
        .unwrap();

    assert_eq!(result.variant, ModelVariant::Variant(Variant::Full));
    assert_eq!(result.confidence, 0.9);
    assert!(result.imputed_fields.is_empty());
    // (85 + 90 + 88) / 3
    assert_eq!(result.predicted_grade, 87.67);
    assert_eq!(result.interpretation, Interpretation::Excellent);
}

#[test]
fn unknown_subject_never_reaches_a_model() {
    let calls = Arc::new(AtomicUsize::new(0));
    let predictor = variant_predictor(&calls);

    let result = predictor.predict(&complete_record(), Some("CHEM999"), None);

    match result {
        Err(PredictError::UnknownSubject { subject, expected }) => {
            assert_eq!(subject, "CHEM999");
            assert!(expected.contains("MATH201"));
        }
        other => panic!("expected UnknownSubject, got {:?}", other),
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert_eq!(predictor.registry().stats().loads, 0);
}

#[test]
fn unknown_category_value_is_rejected() {
    let calls = Arc::new(AtomicUsize::new(0));
    let predictor = variant_predictor(&calls);

    let raw = complete_record().with("teacher_quality", "mediocre");
    let result = predictor.predict(&raw, Some("DATA301"), None);

    assert_eq!(
        result,
        Err(PredictError::UnknownCategoryValue {
            field: "teacher_quality".to_string(),
            value: "mediocre".to_string(),
        })
    );
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn models_load_once_across_requests() {
    let calls = Arc::new(AtomicUsize::new(0));
    let predictor = variant_predictor(&calls);

    for _ in 0..5 {
        predictor.predict(&complete_record(), Some("WEB101"), None).unwrap();
    }
    let stats = predictor.registry().stats();
    assert_eq!(stats.loads, 1);
    assert_eq!(stats.hits, 4);
    assert_eq!(calls.load(Ordering::SeqCst), 5);
}

#[test]
fn enrollment_lookup_feeds_the_pipeline() {
    let calls = Arc::new(AtomicUsize::new(0));
    let predictor = variant_predictor(&calls);

    let mut records = InMemoryRecordSource::new();
    records.insert("E-1", complete_record().with("subject", "DATA301"));

    let ok = predictor.predict_enrollment(&records, "E-1").unwrap();
    assert_eq!(ok.subject, "DATA301");

    let missing = predictor.predict_enrollment(&records, "E-404");
    assert!(matches!(missing, Err(PredictError::RecordNotFound { .. })));
}

#[test]
fn staged_deployment_tolerates_gaps() {
    let calls = Arc::new(AtomicUsize::new(0));
    let full = PipelineConfig::staged();
    let mut provider = StaticModelProvider::new();
    for stage in Stage::ALL {
        let expected = full.stages.required(stage).to_vec();
        let key = ModelVariantKey::new("Hard", ModelVariant::Stage(stage));
        let name = format!("Hard_{}_enhanced", stage.as_str());
        provider = provider.with_model(key, linear(&name, expected, true, 10.0, &calls));
    }
    let predictor = Predictor::new(full, Arc::new(ModelRegistry::new(provider))).unwrap();

    let raw = StudentRecord::new()
        .with("quiz1", 60.0)
        .with("quiz2", 30.0)
        .with("midterm", 45.0)
        .with("attendance", 80.0);

    let result = predictor.predict(&raw, Some("Hard"), None).unwrap();

    assert_eq!(result.variant, ModelVariant::Stage(Stage::Mid));
    assert_eq!(result.artifact, "Hard_mid_enhanced");
    // 10 + (60 + 30 + 45) / 3
    assert_eq!(result.predicted_grade, 55.0);
    assert_eq!(result.imputed_fields, names(&["assignment1"]));
    assert_eq!(result.confidence, 0.75);
}

#[test]
fn response_envelope_wraps_both_outcomes() {
    let calls = Arc::new(AtomicUsize::new(0));
    let predictor = variant_predictor(&calls);

    let ok = PredictionResponse::from(predictor.predict(&complete_record(), Some("WEB101"), None));
    assert!(ok.is_ok());

    let err = PredictionResponse::from(predictor.predict(&complete_record(), None, None));
    assert!(err.to_text().contains("missing_required_feature"));
}
