//! # Schema Module
//!
//! The canonical feature vocabulary and its fixed encodings.
//!
//! Canonical names are the names trained artifacts use in their
//! `expected_features` lists. Categorical fields map through closed ordinal
//! tables; a value outside a table is rejected, never defaulted.

use crate::error::{PredictError, PredictResult};
use crate::record::FieldValue;

// =============================================================================
// CANONICAL NAMES
// =============================================================================

pub const QUIZ1: &str = "quiz1";
pub const QUIZ2: &str = "quiz2";
pub const ASSIGNMENT1: &str = "assignment1";
pub const ASSIGNMENT2: &str = "assignment2";
pub const MIDTERM: &str = "midterm";
pub const STUDY_HOURS: &str = "study_hours";
pub const SLEEP_HOURS: &str = "sleep_hours";
pub const ATTENDANCE: &str = "attendance";
pub const TEACHER_QUALITY: &str = "teacher_quality";
pub const MOTIVATION: &str = "motivation";
pub const GENDER: &str = "gender";
pub const PEER_INFLUENCE: &str = "peer_influence";
pub const EXTRACURRICULAR: &str = "extracurricular";
pub const PHYSICAL_ACTIVITY: &str = "physical_activity";

/// Out-of-band selector: subject code.
pub const SUBJECT: &str = "subject";
/// Out-of-band selector: explicit stage or variant.
pub const STAGE: &str = "stage";

/// Derived: quiz average after stage-conditioned substitution.
pub const QUIZ_AVG: &str = "quiz_avg";
/// Derived: zero-defaulted mean of both assignments.
pub const ASSIGNMENT_AVG: &str = "assignment_avg";

/// Keys that select a model rather than describe the student.
pub const OUT_OF_BAND: [&str; 2] = [SUBJECT, STAGE];

/// Check whether a canonical name is an out-of-band selector.
#[must_use]
pub fn is_out_of_band(name: &str) -> bool {
    OUT_OF_BAND.contains(&name)
}

// =============================================================================
// CATEGORY TABLES
// =============================================================================

/// A closed ordinal vocabulary: labels in code order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryTable {
    labels: &'static [&'static str],
}

impl CategoryTable {
    const fn new(labels: &'static [&'static str]) -> Self {
        Self { labels }
    }

    /// Labels in code order.
    #[must_use]
    pub fn labels(&self) -> &'static [&'static str] {
        self.labels
    }

    /// Ordinal code for a label (case-insensitive).
    #[must_use]
    pub fn code_of(&self, label: &str) -> Option<usize> {
        let wanted = label.trim();
        self.labels
            .iter()
            .position(|l| l.eq_ignore_ascii_case(wanted))
    }

    /// Encode a raw value.
    ///
    /// Labels map to their code. A number is accepted only if it already is a
    /// valid code of this table; a boolean only if the table has `yes`/`no`.
    pub fn encode(&self, field: &str, value: &FieldValue) -> PredictResult<Option<f64>> {
        let unknown = || PredictError::UnknownCategoryValue {
            field: field.to_string(),
            value: value.display(),
        };

        match value {
            FieldValue::Absent => Ok(None),
            FieldValue::Text(s) if s.trim().is_empty() => Ok(None),
            FieldValue::Text(s) => self
                .code_of(s)
                .map(|code| Some(code as f64))
                .ok_or_else(unknown),
            FieldValue::Bool(b) => self
                .code_of(if *b { "yes" } else { "no" })
                .map(|code| Some(code as f64))
                .ok_or_else(unknown),
            FieldValue::Number(n) => {
                let max = self.labels.len().saturating_sub(1) as f64;
                if n.fract() == 0.0 && *n >= 0.0 && *n <= max {
                    Ok(Some(*n))
                } else {
                    Err(unknown())
                }
            }
        }
    }
}

pub const TEACHER_QUALITY_TABLE: CategoryTable =
    CategoryTable::new(&["poor", "average", "good", "excellent"]);
pub const MOTIVATION_TABLE: CategoryTable = CategoryTable::new(&["low", "medium", "high"]);
pub const GENDER_TABLE: CategoryTable = CategoryTable::new(&["female", "male"]);
pub const PEER_INFLUENCE_TABLE: CategoryTable =
    CategoryTable::new(&["negative", "neutral", "positive"]);
pub const EXTRACURRICULAR_TABLE: CategoryTable = CategoryTable::new(&["no", "yes"]);

// =============================================================================
// FEATURE KINDS
// =============================================================================

/// How a canonical raw field becomes a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureKind {
    /// Taken as is.
    Numeric,
    /// 0-100 input rescaled to 0-1.
    Percentage,
    /// Closed ordinal vocabulary.
    Categorical(CategoryTable),
}

impl FeatureKind {
    /// Encoding of a canonical field. Unknown names are treated as numeric.
    #[must_use]
    pub fn of(name: &str) -> Self {
        match name {
            ATTENDANCE => Self::Percentage,
            TEACHER_QUALITY => Self::Categorical(TEACHER_QUALITY_TABLE),
            MOTIVATION => Self::Categorical(MOTIVATION_TABLE),
            GENDER => Self::Categorical(GENDER_TABLE),
            PEER_INFLUENCE => Self::Categorical(PEER_INFLUENCE_TABLE),
            EXTRACURRICULAR => Self::Categorical(EXTRACURRICULAR_TABLE),
            _ => Self::Numeric,
        }
    }

    /// Encode a raw value (`Ok(None)` when absent).
    pub fn encode(&self, field: &str, value: &FieldValue) -> PredictResult<Option<f64>> {
        match self {
            Self::Numeric => value.as_number(field),
            Self::Percentage => Ok(value.as_number(field)?.map(|pct| pct / 100.0)),
            Self::Categorical(table) => table.encode(field, value),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
