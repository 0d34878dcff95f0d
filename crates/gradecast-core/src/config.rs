//! # Pipeline Configuration
//!
//! Fixed tables the pipeline reads for the whole process lifetime: which
//! selection policy is active, the subject list, stage requirements,
//! precedence order and the confidence constants.
//!
//! Two deployments are provided:
//! - [`PipelineConfig::default`]: missing-field variants (`full`,
//!   `null_quiz1`, `null_midterm`) over subjects WEB101, MATH201, DATA301
//! - [`PipelineConfig::staged`]: completeness stages (`early`, `mid`,
//!   `full`) over subjects Easy, Medium, Hard

use crate::error::{PredictError, PredictResult};
use crate::schema;
use crate::stage::{Stage, StageDefinitions};
use crate::variant::{PrecedenceRule, Variant};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// CONSTANTS
// =============================================================================

/// Confidence when nothing was imputed.
pub const DEFAULT_BASE_CONFIDENCE: f64 = 0.9;

/// Confidence lost per imputed field.
pub const DEFAULT_CONFIDENCE_PENALTY: f64 = 0.15;

/// Confidence never drops below this.
pub const DEFAULT_CONFIDENCE_FLOOR: f64 = 0.5;

/// A smaller stage needs at least this many matched features.
pub const DEFAULT_MIN_EVIDENCE: usize = 2;

/// Midterm substitute for subjects without a configured average.
pub const DEFAULT_MIDTERM_AVERAGE: f64 = 60.0;

/// Artifact naming pattern.
pub const DEFAULT_ARTIFACT_PATTERN: &str = "{subject}_{variant}_enhanced";

// =============================================================================
// POLICY
// =============================================================================

/// Which formulation chooses the model variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// Completeness stages chosen by the stage classifier.
    Staged,
    /// Variants chosen from absent tracked fields.
    MissingField,
}

/// A configured subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectConfig {
    /// Subject code as callers send it.
    pub code: String,
    /// Historical midterm average used when the midterm is imputed.
    pub midterm_average: f64,
}

impl SubjectConfig {
    /// Create a subject entry.
    #[must_use]
    pub fn new(code: impl Into<String>, midterm_average: f64) -> Self {
        Self {
            code: code.into(),
            midterm_average,
        }
    }
}

/// Confidence heuristic constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceConfig {
    pub base: f64,
    pub penalty_per_field: f64,
    pub floor: f64,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            base: DEFAULT_BASE_CONFIDENCE,
            penalty_per_field: DEFAULT_CONFIDENCE_PENALTY,
            floor: DEFAULT_CONFIDENCE_FLOOR,
        }
    }
}

// =============================================================================
// PIPELINE CONFIG
// =============================================================================

/// Complete configuration of the prediction pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub policy: SelectionPolicy,
    pub subjects: Vec<SubjectConfig>,
    /// Midterm substitute for a subject with no configured average.
    pub default_midterm_average: f64,
    pub stages: StageDefinitions,
    /// Non-full stages in tie-break order, most preferred first.
    pub stage_priority: Vec<Stage>,
    pub min_evidence: usize,
    /// Fields whose absence forms the missing-field set.
    pub tracked_fields: Vec<String>,
    /// Ordered variant rules; first match wins.
    pub variant_precedence: Vec<PrecedenceRule>,
    /// Indicator feature name to the field it flags.
    pub indicators: BTreeMap<String, String>,
    pub confidence: ConfidenceConfig,
    /// Pattern with `{subject}` and `{variant}` placeholders.
    pub artifact_pattern: String,
}

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn stage_definitions() -> StageDefinitions {
    let mut required = BTreeMap::new();
    required.insert(
        Stage::Early,
        names(&[schema::QUIZ1, schema::QUIZ2, schema::GENDER, schema::MOTIVATION]),
    );
    required.insert(
        Stage::Mid,
        names(&[
            schema::QUIZ1,
            schema::QUIZ2,
            schema::MIDTERM,
            schema::ASSIGNMENT1,
            schema::ATTENDANCE,
        ]),
    );
    required.insert(
        Stage::Full,
        names(&[
            schema::QUIZ1,
            schema::QUIZ2,
            schema::MIDTERM,
            schema::ASSIGNMENT1,
            schema::ASSIGNMENT2,
            schema::STUDY_HOURS,
            schema::ATTENDANCE,
            schema::SLEEP_HOURS,
            schema::GENDER,
            schema::PEER_INFLUENCE,
            schema::MOTIVATION,
            schema::TEACHER_QUALITY,
            schema::EXTRACURRICULAR,
            schema::PHYSICAL_ACTIVITY,
        ]),
    );
    StageDefinitions { required }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let mut indicators = BTreeMap::new();
        indicators.insert("quiz_imputed".to_string(), schema::QUIZ1.to_string());
        indicators.insert("midterm_imputed".to_string(), schema::MIDTERM.to_string());

        Self {
            policy: SelectionPolicy::MissingField,
            subjects: vec![
                SubjectConfig::new("WEB101", 65.0),
                SubjectConfig::new("MATH201", 60.0),
                SubjectConfig::new("DATA301", 55.0),
            ],
            default_midterm_average: DEFAULT_MIDTERM_AVERAGE,
            stages: stage_definitions(),
            stage_priority: vec![Stage::Mid, Stage::Early],
            min_evidence: DEFAULT_MIN_EVIDENCE,
            tracked_fields: names(&[
                schema::QUIZ1,
                schema::QUIZ2,
                schema::ASSIGNMENT1,
                schema::ASSIGNMENT2,
                schema::MIDTERM,
            ]),
            variant_precedence: vec![
                PrecedenceRule::new(schema::MIDTERM, Variant::NullMidterm),
                PrecedenceRule::new(schema::QUIZ1, Variant::NullQuiz1),
                PrecedenceRule::new(schema::ASSIGNMENT2, Variant::NullQuiz1),
            ],
            indicators,
            confidence: ConfidenceConfig::default(),
            artifact_pattern: DEFAULT_ARTIFACT_PATTERN.to_string(),
        }
    }
}

impl PipelineConfig {
    /// The completeness-stage deployment.
    ///
    /// Its artifacts carry their own imputer, so nothing is tracked for the
    /// missing-field set: absent features become the missing sentinel.
    #[must_use]
    pub fn staged() -> Self {
        Self {
            policy: SelectionPolicy::Staged,
            subjects: vec![
                SubjectConfig::new("Easy", DEFAULT_MIDTERM_AVERAGE),
                SubjectConfig::new("Medium", DEFAULT_MIDTERM_AVERAGE),
                SubjectConfig::new("Hard", DEFAULT_MIDTERM_AVERAGE),
            ],
            tracked_fields: Vec::new(),
            variant_precedence: Vec::new(),
            indicators: BTreeMap::new(),
            ..Self::default()
        }
    }

    /// Look up a subject by exact code.
    #[must_use]
    pub fn subject(&self, code: &str) -> Option<&SubjectConfig> {
        self.subjects.iter().find(|s| s.code == code)
    }

    /// Historical midterm average for a subject, with the default fallback.
    #[must_use]
    pub fn midterm_average(&self, code: &str) -> f64 {
        self.subject(code)
            .map(|s| s.midterm_average)
            .unwrap_or(self.default_midterm_average)
    }

    /// Comma-separated subject codes, for error messages.
    #[must_use]
    pub fn subject_list(&self) -> String {
        self.subjects
            .iter()
            .map(|s| s.code.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Render the artifact name for a subject and variant.
    #[must_use]
    pub fn artifact_name(&self, subject: &str, variant: &str) -> String {
        self.artifact_pattern
            .replace("{subject}", subject)
            .replace("{variant}", variant)
    }

    /// Check internal consistency.
    pub fn validate(&self) -> PredictResult<()> {
        if self.subjects.is_empty() {
            return Err(PredictError::InvalidConfig("no subjects configured".into()));
        }

        let mut codes = BTreeSet::new();
        for subject in &self.subjects {
            if subject.code.trim().is_empty() {
                return Err(PredictError::InvalidConfig("empty subject code".into()));
            }
            if !codes.insert(subject.code.as_str()) {
                return Err(PredictError::InvalidConfig(format!(
                    "duplicate subject '{}'",
                    subject.code
                )));
            }
        }

        if !self.artifact_pattern.contains("{subject}") || !self.artifact_pattern.contains("{variant}") {
            return Err(PredictError::InvalidConfig(format!(
                "artifact pattern '{}' needs {{subject}} and {{variant}}",
                self.artifact_pattern
            )));
        }

        let c = &self.confidence;
        if !(c.floor <= c.base && c.penalty_per_field >= 0.0) {
            return Err(PredictError::InvalidConfig(
                "confidence floor must not exceed base and penalty must be non-negative".into(),
            ));
        }

        match self.policy {
            SelectionPolicy::Staged => self.validate_staged(),
            SelectionPolicy::MissingField => self.validate_missing_field(),
        }
    }

    fn validate_staged(&self) -> PredictResult<()> {
        if self.stages.required(Stage::Full).is_empty() {
            return Err(PredictError::InvalidConfig(
                "full stage has no required features".into(),
            ));
        }
        if self.stage_priority.is_empty() {
            return Err(PredictError::InvalidConfig("stage priority is empty".into()));
        }
        let mut seen = BTreeSet::new();
        for stage in &self.stage_priority {
            if *stage == Stage::Full {
                return Err(PredictError::InvalidConfig(
                    "stage priority must not list full".into(),
                ));
            }
            if !seen.insert(*stage) {
                return Err(PredictError::InvalidConfig(format!(
                    "stage '{}' listed twice in priority",
                    stage
                )));
            }
            if self.stages.required(*stage).is_empty() {
                return Err(PredictError::InvalidConfig(format!(
                    "stage '{}' has no required features",
                    stage
                )));
            }
        }
        Ok(())
    }

    fn validate_missing_field(&self) -> PredictResult<()> {
        for rule in &self.variant_precedence {
            if !self.tracked_fields.contains(&rule.field) {
                return Err(PredictError::InvalidConfig(format!(
                    "precedence rule names untracked field '{}'",
                    rule.field
                )));
            }
        }
        for (indicator, field) in &self.indicators {
            if !self.tracked_fields.contains(field) {
                return Err(PredictError::InvalidConfig(format!(
                    "indicator '{}' flags untracked field '{}'",
                    indicator, field
                )));
            }
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_validate() {
        assert_eq!(PipelineConfig::default().validate(), Ok(()));
        assert_eq!(PipelineConfig::staged().validate(), Ok(()));
    }

    #[test]
    fn midterm_average_lookup() {
        let config = PipelineConfig::default();
        assert_eq!(config.midterm_average("WEB101"), 65.0);
        assert_eq!(config.midterm_average("MATH201"), 60.0);
        assert_eq!(config.midterm_average("DATA301"), 55.0);
        assert_eq!(config.midterm_average("CHEM999"), DEFAULT_MIDTERM_AVERAGE);
    }

    #[test]
    fn artifact_name_pattern() {
        let config = PipelineConfig::default();
        assert_eq!(config.artifact_name("WEB101", "null_quiz1"), "WEB101_null_quiz1_enhanced");
    }

    #[test]
    fn rejects_untracked_precedence_field() {
        let mut config = PipelineConfig::default();
        config
            .variant_precedence
            .push(PrecedenceRule::new("gender", Variant::NullQuiz1));
        assert!(matches!(config.validate(), Err(PredictError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_full_in_priority() {
        let mut config = PipelineConfig::staged();
        config.stage_priority = vec![Stage::Full, Stage::Mid];
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_duplicate_subjects() {
        let mut config = PipelineConfig::default();
        config.subjects.push(SubjectConfig::new("WEB101", 70.0));
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: PipelineConfig =
            serde_json::from_str(r#"{"policy": "staged", "min_evidence": 3}"#)
                .unwrap_or_default();
        assert_eq!(config.policy, SelectionPolicy::Staged);
        assert_eq!(config.min_evidence, 3);
        assert_eq!(config.stage_priority, vec![Stage::Mid, Stage::Early]);
    }
}
