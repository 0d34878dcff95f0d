//! # Error Module
//!
//! The single error type of the prediction core.
//!
//! Every component returns `Result<_, PredictError>` and the orchestrator is
//! the only place that aggregates them. Nothing in the core panics on bad
//! input: each failure is a value the request boundary can render.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type PredictResult<T> = Result<T, PredictError>;

/// Errors from the prediction pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PredictError {
    /// Subject code is not among the configured subjects.
    #[error("unknown subject '{subject}' (expected one of: {expected})")]
    UnknownSubject { subject: String, expected: String },

    /// Stage name is not in the recognized stage set.
    #[error("unknown stage '{stage}' (expected one of: {expected})")]
    UnknownStage { stage: String, expected: String },

    /// Variant name is not in the recognized variant set.
    #[error("unknown variant '{variant}' (expected one of: {expected})")]
    UnknownVariant { variant: String, expected: String },

    /// Categorical value outside the fixed vocabulary of its field.
    #[error("unknown value '{value}' for categorical field '{field}'")]
    UnknownCategoryValue { field: String, value: String },

    /// A feature the model needs is absent and no imputation rule applies.
    #[error("missing required feature '{feature}'")]
    MissingRequiredFeature { feature: String },

    /// Supplied value cannot be read as a finite number.
    #[error("invalid numeric value '{value}' for field '{field}'")]
    InvalidNumericValue { field: String, value: String },

    /// The model provider has no artifact for the key.
    #[error("model artifact not found: {artifact}")]
    ArtifactNotFound { artifact: String },

    /// The record source has no record for the enrollment.
    #[error("student record not found: {enrollment_id}")]
    RecordNotFound { enrollment_id: String },

    /// Artifact metadata is inconsistent.
    #[error("invalid model artifact {artifact}: {reason}")]
    InvalidArtifact { artifact: String, reason: String },

    /// The model ran but produced no usable value.
    #[error("model {artifact} failed: {reason}")]
    ModelFailure { artifact: String, reason: String },

    /// Pipeline configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl PredictError {
    /// Stable machine-readable kind, used by response envelopes.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::UnknownSubject { .. } => "unknown_subject",
            Self::UnknownStage { .. } => "unknown_stage",
            Self::UnknownVariant { .. } => "unknown_variant",
            Self::UnknownCategoryValue { .. } => "unknown_category_value",
            Self::MissingRequiredFeature { .. } => "missing_required_feature",
            Self::InvalidNumericValue { .. } => "invalid_numeric_value",
            Self::ArtifactNotFound { .. } => "artifact_not_found",
            Self::RecordNotFound { .. } => "record_not_found",
            Self::InvalidArtifact { .. } => "invalid_artifact",
            Self::ModelFailure { .. } => "model_failure",
            Self::InvalidConfig(_) => "invalid_config",
        }
    }

    /// True when the request itself was at fault (as opposed to the deployment).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnknownSubject { .. }
                | Self::UnknownStage { .. }
                | Self::UnknownVariant { .. }
                | Self::UnknownCategoryValue { .. }
                | Self::MissingRequiredFeature { .. }
                | Self::InvalidNumericValue { .. }
        )
    }

    /// True when a looked-up entity does not exist.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::ArtifactNotFound { .. } | Self::RecordNotFound { .. }
        )
    }

    pub(crate) fn missing(feature: impl Into<String>) -> Self {
        Self::MissingRequiredFeature {
            feature: feature.into(),
        }
    }

    pub(crate) fn invalid_number(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidNumericValue {
            field: field.into(),
            value: value.into(),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_are_stable() {
        assert_eq!(
            PredictError::missing("midterm").kind(),
            "missing_required_feature"
        );
        assert_eq!(
            PredictError::invalid_number("quiz1", "abc").kind(),
            "invalid_numeric_value"
        );
        assert_eq!(
            PredictError::InvalidConfig(String::new()).kind(),
            "invalid_config"
        );
    }

    #[test]
    fn message_names_the_field() {
        let err = PredictError::UnknownCategoryValue {
            field: "teacher_quality".to_string(),
            value: "mediocre".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("teacher_quality"));
        assert!(text.contains("mediocre"));
    }

    #[test]
    fn classification_helpers() {
        let subject = PredictError::UnknownSubject {
            subject: "CHEM999".to_string(),
            expected: "WEB101".to_string(),
        };
        assert!(subject.is_client_error());
        assert!(!subject.is_not_found());

        let artifact = PredictError::ArtifactNotFound {
            artifact: "x".to_string(),
        };
        assert!(!artifact.is_client_error());
        assert!(artifact.is_not_found());
    }
}
