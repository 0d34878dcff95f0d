//! # File Model Provider
//!
//! Loads trained artifacts from a directory of JSON files.
//!
//! Each artifact is a linear model exported by the training pipeline:
//!
//! ```json
//! {
//!   "expected_features": ["quiz_avg", "midterm", "attendance"],
//!   "all_features": null,
//!   "tolerates_missing": false,
//!   "intercept": 12.5,
//!   "weights": { "quiz_avg": 0.4, "midterm": 0.35, "attendance": 10.0 },
//!   "fill_values": {}
//! }
//! ```
//!
//! The file name is the configured artifact name plus `.json`. A missing
//! sentinel in the input is replaced by the feature's fill value (the
//! training-set imputation); a sentinel with no fill value is a model failure.

use gradecast_core::{
    FeatureVector, Model, ModelMetadata, ModelProvider, ModelVariantKey, PipelineConfig,
    PredictError, PredictResult, SharedModel,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

// =============================================================================
// ARTIFACT FORMAT
// =============================================================================

/// On-disk form of a linear artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearArtifact {
    pub expected_features: Vec<String>,
    #[serde(default)]
    pub all_features: Option<Vec<String>>,
    #[serde(default)]
    pub tolerates_missing: bool,
    #[serde(default)]
    pub intercept: f64,
    pub weights: BTreeMap<String, f64>,
    #[serde(default)]
    pub fill_values: BTreeMap<String, f64>,
    /// Outputs are clamped into this range when present.
    #[serde(default)]
    pub output_range: Option<(f64, f64)>,
}

/// A loaded linear model.
#[derive(Debug, Clone)]
pub struct LinearModel {
    meta: ModelMetadata,
    intercept: f64,
    weights: BTreeMap<String, f64>,
    fill_values: BTreeMap<String, f64>,
    output_range: Option<(f64, f64)>,
}

impl LinearModel {
    /// Build a model from its artifact, checking the weights fit the layout.
    pub fn from_artifact(name: impl Into<String>, artifact: LinearArtifact) -> PredictResult<Self> {
        let meta = ModelMetadata {
            name: name.into(),
            expected_features: artifact.expected_features,
            all_features: artifact.all_features,
            tolerates_missing: artifact.tolerates_missing,
        };
        meta.validate()?;

        let invalid = |reason: String| PredictError::InvalidArtifact {
            artifact: meta.name.clone(),
            reason,
        };

        let inputs: BTreeSet<&str> = meta
            .all_features
            .as_ref()
            .unwrap_or(&meta.expected_features)
            .iter()
            .map(String::as_str)
            .collect();

        if let Some(stray) = artifact.weights.keys().find(|k| !inputs.contains(k.as_str())) {
            return Err(invalid(format!("weight for unknown input '{}'", stray)));
        }
        if let Some((name, _)) = artifact
            .weights
            .iter()
            .chain(artifact.fill_values.iter())
            .find(|(_, v)| !v.is_finite())
        {
            return Err(invalid(format!("non-finite coefficient for '{}'", name)));
        }
        if !artifact.intercept.is_finite() {
            return Err(invalid("non-finite intercept".into()));
        }
        if let Some((lo, hi)) = artifact.output_range
            && lo > hi
        {
            return Err(invalid(format!("empty output range {}..{}", lo, hi)));
        }

        Ok(Self {
            meta,
            intercept: artifact.intercept,
            weights: artifact.weights,
            fill_values: artifact.fill_values,
            output_range: artifact.output_range,
        })
    }
}

impl Model for LinearModel {
    fn metadata(&self) -> &ModelMetadata {
        &self.meta
    }

    fn predict(&self, features: &FeatureVector) -> PredictResult<f64> {
        let mut total = self.intercept;
        for (name, value) in features.iter() {
            let value = if value.is_nan() {
                match self.fill_values.get(name) {
                    Some(fill) => *fill,
                    None => {
                        return Err(PredictError::ModelFailure {
                            artifact: self.meta.name.clone(),
                            reason: format!("no fill value for missing '{}'", name),
                        });
                    }
                }
            } else {
                value
            };
            total += self.weights.get(name).copied().unwrap_or(0.0) * value;
        }

        Ok(match self.output_range {
            Some((lo, hi)) => total.clamp(lo, hi),
            None => total,
        })
    }
}

// =============================================================================
// PROVIDER
// =============================================================================

/// Resolves keys to `<dir>/<artifact name>.json`.
#[derive(Debug, Clone)]
pub struct FileModelProvider {
    dir: PathBuf,
    config: PipelineConfig,
}

impl FileModelProvider {
    /// Create a provider rooted at `dir`, naming artifacts per `config`.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, config: PipelineConfig) -> Self {
        Self {
            dir: dir.into(),
            config,
        }
    }

    /// Directory artifacts are read from.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file backing a key.
    #[must_use]
    pub fn path_for(&self, key: &ModelVariantKey) -> PathBuf {
        let name = self.config.artifact_name(&key.subject, key.variant.as_str());
        self.dir.join(format!("{}.json", name))
    }
}

impl ModelProvider for FileModelProvider {
    fn load(&self, key: &ModelVariantKey) -> PredictResult<SharedModel> {
        if self.config.subject(&key.subject).is_none() {
            return Err(PredictError::UnknownSubject {
                subject: key.subject.clone(),
                expected: self.config.subject_list(),
            });
        }

        let name = self.config.artifact_name(&key.subject, key.variant.as_str());
        let path = self.path_for(key);
        debug!(path = %path.display(), "reading artifact");

        let content = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => PredictError::ArtifactNotFound {
                artifact: name.clone(),
            },
            _ => PredictError::InvalidArtifact {
                artifact: name.clone(),
                reason: e.to_string(),
            },
        })?;

        let artifact: LinearArtifact =
            serde_json::from_str(&content).map_err(|e| PredictError::InvalidArtifact {
                artifact: name.clone(),
                reason: e.to_string(),
            })?;

        let model = LinearModel::from_artifact(name, artifact)?;
        info!(
            artifact = %model.meta.name,
            features = model.meta.expected_features.len(),
            "artifact loaded"
        );
        Ok(Arc::new(model))
    }
}

// =============================================================================
// TESTS
// =============================================================================
