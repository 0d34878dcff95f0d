//! # Prediction Orchestrator
//!
//! One request in, one [`PredictionResult`] or one [`PredictError`] out.
//!
//! ```text
//! raw fields -> normalize -> subject check -> select -> registry
//!            -> build vector -> model -> confidence + band
//! ```
//!
//! Every step is a pure transform over the request's own data except the
//! registry lookup, which only ever adds fully loaded models to its cache.
//! Abandoning a request midway leaves nothing behind.

use crate::confidence::{Interpretation, confidence, round_to};
use crate::config::PipelineConfig;
use crate::error::{PredictError, PredictResult};
use crate::features::{BuildContext, BuiltFeatures, FeatureVectorBuilder};
use crate::normalize::FieldNormalizer;
use crate::record::{StudentRecord, StudentRecordSource};
use crate::registry::{ModelRegistry, SharedModel};
use crate::schema;
use crate::selector::{ModelSelector, ModelVariant, Selection};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

// =============================================================================
// RESULT
// =============================================================================

/// Outcome of a successful prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub subject: String,
    /// Grade rounded to two decimals.
    pub predicted_grade: f64,
    /// Stage or variant used.
    pub variant: ModelVariant,
    /// Name of the artifact consulted.
    pub artifact: String,
    /// Heuristic confidence in [floor, base].
    pub confidence: f64,
    pub interpretation: Interpretation,
    /// Fields that were imputed rather than read.
    pub imputed_fields: Vec<String>,
}

/// A prepared request: everything up to, but excluding, model invocation.
#[derive(Debug, Clone)]
pub struct PreparedRequest {
    pub subject: String,
    pub record: StudentRecord,
    pub selection: Selection,
}

// =============================================================================
// PREDICTOR
// =============================================================================

/// Composes normalizer, selector, registry, builder and estimator.
#[derive(Debug, Clone)]
pub struct Predictor {
    normalizer: FieldNormalizer,
    selector: ModelSelector,
    registry: Arc<ModelRegistry>,
}

impl Predictor {
    /// Create a predictor. The registry is injected so it can be shared.
    pub fn new(config: PipelineConfig, registry: Arc<ModelRegistry>) -> PredictResult<Self> {
        Ok(Self {
            normalizer: FieldNormalizer::new(),
            selector: ModelSelector::new(config)?,
            registry,
        })
    }

    /// Replace the field normalizer.
    #[must_use]
    pub fn with_normalizer(mut self, normalizer: FieldNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        self.selector.config()
    }

    /// The shared model registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Normalize, resolve the subject and select the artifact.
    ///
    /// `subject_hint` and `stage_hint` take precedence over the record's own
    /// `subject` and `stage` fields.
    pub fn prepare(
        &self,
        raw: &StudentRecord,
        subject_hint: Option<&str>,
        stage_hint: Option<&str>,
    ) -> PredictResult<PreparedRequest> {
        let record = self.normalizer.normalize(raw);

        let subject = subject_hint
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| record.text(schema::SUBJECT))
            .ok_or_else(|| PredictError::missing(schema::SUBJECT))?
            .to_string();

        let stage = stage_hint
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .or_else(|| record.text(schema::STAGE))
            .map(str::to_string);

        let selection = self.selector.select(&subject, &record, stage.as_deref())?;

        Ok(PreparedRequest {
            subject,
            record,
            selection,
        })
    }

    /// Build the feature vector for a prepared request against its model.
    pub fn assemble(&self, prepared: &PreparedRequest, model: &SharedModel) -> PredictResult<BuiltFeatures> {
        let meta = model.metadata();
        let ctx = BuildContext {
            subject: &prepared.subject,
            missing: &prepared.selection.missing,
            tolerates_missing: meta.tolerates_missing,
        };
        FeatureVectorBuilder::new(self.config()).build(&prepared.record, ctx, &meta.expected_features)
    }

    /// Run the full pipeline over raw fields.
    pub fn predict(
        &self,
        raw: &StudentRecord,
        subject_hint: Option<&str>,
        stage_hint: Option<&str>,
    ) -> PredictResult<PredictionResult> {
        let outcome = self.run(raw, subject_hint, stage_hint);
        if let Err(err) = &outcome {
            warn!(kind = err.kind(), error = %err, "prediction rejected");
        }
        outcome
    }

    /// Fetch a record from a source and predict on it.
    pub fn predict_enrollment(
        &self,
        records: &dyn StudentRecordSource,
        enrollment_id: &str,
    ) -> PredictResult<PredictionResult> {
        let record = records.get(enrollment_id).inspect_err(|err| {
            warn!(enrollment_id, error = %err, "record lookup failed");
        })?;
        debug!(enrollment_id, fields = record.len(), "record fetched");
        self.predict(&record, None, None)
    }

    fn run(
        &self,
        raw: &StudentRecord,
        subject_hint: Option<&str>,
        stage_hint: Option<&str>,
    ) -> PredictResult<PredictionResult> {
        let prepared = self.prepare(raw, subject_hint, stage_hint)?;
        let model = self.registry.get(&prepared.selection.key)?;
        let built = self.assemble(&prepared, &model)?;

        let meta = model.metadata();
        let input = match &meta.all_features {
            Some(all) => built.vector.widen(all),
            None => built.vector.clone(),
        };

        let raw_grade = model.predict(&input)?;
        if !raw_grade.is_finite() {
            return Err(PredictError::ModelFailure {
                artifact: meta.name.clone(),
                reason: format!("non-finite output {}", raw_grade),
            });
        }

        let predicted_grade = round_to(raw_grade, 2);
        let result = PredictionResult {
            subject: prepared.subject,
            predicted_grade,
            variant: prepared.selection.key.variant,
            artifact: prepared.selection.artifact,
            confidence: confidence(&self.config().confidence, built.imputed.len()),
            interpretation: Interpretation::from_grade(predicted_grade),
            imputed_fields: built.imputed,
        };

        info!(
            subject = %result.subject,
            variant = %result.variant,
            grade = result.predicted_grade,
            confidence = result.confidence,
            "prediction served"
        );
        Ok(result)
    }
}

// =============================================================================
// TESTS
// =============================================================================
