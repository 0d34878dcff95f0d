//! # Model Selector
//!
//! Maps (subject, record) to the key of the trained artifact to use.
//!
//! The subject is validated first; only then is the stage or variant
//! resolved, through whichever policy the configuration names.

use crate::config::{PipelineConfig, SelectionPolicy};
use crate::error::{PredictError, PredictResult};
use crate::record::StudentRecord;
use crate::schema;
use crate::stage::{Stage, StageClassifier, StageDecision, StageReason};
use crate::variant::{MissingFieldSet, Variant, VariantDecision, resolve_variant};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

// =============================================================================
// MODEL VARIANT KEY
// =============================================================================

/// Stage or missing-field variant of an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelVariant {
    Stage(Stage),
    Variant(Variant),
}

impl ModelVariant {
    /// Wire name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stage(s) => s.as_str(),
            Self::Variant(v) => v.as_str(),
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one trained artifact.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ModelVariantKey {
    pub subject: String,
    pub variant: ModelVariant,
}

impl ModelVariantKey {
    /// Create a key.
    #[must_use]
    pub fn new(subject: impl Into<String>, variant: ModelVariant) -> Self {
        Self {
            subject: subject.into(),
            variant,
        }
    }
}

impl fmt::Display for ModelVariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.subject, self.variant)
    }
}

// =============================================================================
// SELECTION
// =============================================================================

/// How the variant was decided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum SelectionBasis {
    Staged(StageDecision),
    MissingField(VariantDecision),
    /// Caller named the variant directly.
    Explicit,
}

/// The selector's answer for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub key: ModelVariantKey,
    /// Artifact name rendered from the configured pattern.
    pub artifact: String,
    /// Tracked fields absent from the record; drives imputation.
    pub missing: MissingFieldSet,
    pub basis: SelectionBasis,
}

/// Chooses artifacts under a fixed configuration.
#[derive(Debug, Clone)]
pub struct ModelSelector {
    config: PipelineConfig,
    classifier: StageClassifier,
}

impl ModelSelector {
    /// Create a selector, validating the configuration.
    pub fn new(config: PipelineConfig) -> PredictResult<Self> {
        config.validate()?;
        let classifier = StageClassifier::new(
            config.stages.clone(),
            config.stage_priority.clone(),
            config.min_evidence,
        );
        Ok(Self { config, classifier })
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// The stage classifier in use.
    #[must_use]
    pub fn classifier(&self) -> &StageClassifier {
        &self.classifier
    }

    /// Fail with `UnknownSubject` unless the code is configured.
    pub fn validate_subject(&self, subject: &str) -> PredictResult<()> {
        if self.config.subject(subject).is_some() {
            Ok(())
        } else {
            Err(PredictError::UnknownSubject {
                subject: subject.to_string(),
                expected: self.config.subject_list(),
            })
        }
    }

    /// Parse a caller-named stage or variant under the active policy.
    pub fn parse_hint(&self, hint: &str) -> PredictResult<ModelVariant> {
        match self.config.policy {
            SelectionPolicy::Staged => hint.parse::<Stage>().map(ModelVariant::Stage),
            SelectionPolicy::MissingField => hint.parse::<Variant>().map(ModelVariant::Variant),
        }
    }

    /// Select the artifact for a normalized record.
    ///
    /// `hint` overrides automatic detection but must name a member of the
    /// active policy's set.
    pub fn select(
        &self,
        subject: &str,
        record: &StudentRecord,
        hint: Option<&str>,
    ) -> PredictResult<Selection> {
        self.validate_subject(subject)?;

        let missing = MissingFieldSet::detect(record, &self.config.tracked_fields);

        let (variant, basis) = match (self.config.policy, hint) {
            (SelectionPolicy::Staged, hint) => {
                let present = present_features(record);
                let decision = self.classifier.resolve(hint, &present)?;
                let stage = ModelVariant::Stage(decision.stage);
                if decision.reason == StageReason::Explicit {
                    (stage, SelectionBasis::Explicit)
                } else {
                    (stage, SelectionBasis::Staged(decision))
                }
            }
            (SelectionPolicy::MissingField, Some(name)) => {
                (self.parse_hint(name)?, SelectionBasis::Explicit)
            }
            (SelectionPolicy::MissingField, None) => {
                let decision = resolve_variant(&missing, &self.config.variant_precedence);
                (
                    ModelVariant::Variant(decision.variant),
                    SelectionBasis::MissingField(decision),
                )
            }
        };

        let key = ModelVariantKey::new(subject, variant);
        let artifact = self.config.artifact_name(subject, variant.as_str());
        tracing::debug!(key = %key, artifact = %artifact, missing = missing.len(), "artifact selected");

        Ok(Selection {
            key,
            artifact,
            missing,
            basis,
        })
    }
}

/// Every key a configuration can select, subject-major.
#[must_use]
pub fn all_keys(config: &PipelineConfig) -> Vec<ModelVariantKey> {
    let variants: Vec<ModelVariant> = match config.policy {
        SelectionPolicy::Staged => Stage::ALL.into_iter().map(ModelVariant::Stage).collect(),
        SelectionPolicy::MissingField => Variant::ALL.into_iter().map(ModelVariant::Variant).collect(),
    };
    config
        .subjects
        .iter()
        .flat_map(|s| variants.iter().map(|v| ModelVariantKey::new(s.code.clone(), *v)))
        .collect()
}

/// Present canonical features, excluding out-of-band selectors.
#[must_use]
pub fn present_features(record: &StudentRecord) -> BTreeSet<String> {
    record
        .present_names()
        .filter(|name| !schema::is_out_of_band(name))
        .map(str::to_string)
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
