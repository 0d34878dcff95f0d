//! # Missing-Field Variants
//!
//! The binary selection policy: the variant is chosen from which tracked
//! fields are absent, using an explicit precedence list.
//!
//! The default precedence is
//!
//! ```text
//! midterm absent      -> null_midterm
//! quiz1 absent        -> null_quiz1
//! assignment2 absent  -> null_quiz1
//! (nothing matched)   -> full
//! ```
//!
//! The last rule keeps the historical coupling where the artifact named for a
//! missing first quiz also serves records missing the second assignment.

use crate::error::PredictError;
use crate::record::StudentRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

// =============================================================================
// VARIANT
// =============================================================================

/// A trained artifact tied to a missing-field combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    Full,
    NullQuiz1,
    NullMidterm,
}

impl Variant {
    /// Every variant in declaration order.
    pub const ALL: [Variant; 3] = [Variant::Full, Variant::NullQuiz1, Variant::NullMidterm];

    /// Wire name of the variant.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::NullQuiz1 => "null_quiz1",
            Self::NullMidterm => "null_midterm",
        }
    }

    /// Comma-separated list of all variant names, for error messages.
    #[must_use]
    pub fn expected_list() -> String {
        Self::ALL
            .iter()
            .map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = PredictError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|v| v.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| PredictError::UnknownVariant {
                variant: s.to_string(),
                expected: Self::expected_list(),
            })
    }
}

// =============================================================================
// MISSING FIELD SET
// =============================================================================

/// Tracked fields absent from a record, in tracked-list order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MissingFieldSet {
    fields: Vec<String>,
}

impl MissingFieldSet {
    /// Empty set.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Collect the tracked fields that are absent from a record.
    #[must_use]
    pub fn detect(record: &StudentRecord, tracked: &[String]) -> Self {
        Self {
            fields: tracked
                .iter()
                .filter(|f| !record.is_present(f))
                .cloned()
                .collect(),
        }
    }

    /// Check membership.
    #[must_use]
    pub fn contains(&self, field: &str) -> bool {
        self.fields.iter().any(|f| f == field)
    }

    /// Number of missing fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if nothing is missing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Missing fields in tracked order.
    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.fields
    }
}

impl<S: Into<String>> FromIterator<S> for MissingFieldSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut seen = BTreeSet::new();
        Self {
            fields: iter
                .into_iter()
                .map(Into::into)
                .filter(|f: &String| seen.insert(f.clone()))
                .collect(),
        }
    }
}

// =============================================================================
// PRECEDENCE
// =============================================================================

/// One entry of the precedence list: when `field` is missing, use `variant`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrecedenceRule {
    pub field: String,
    pub variant: Variant,
}

impl PrecedenceRule {
    /// Create a rule.
    #[must_use]
    pub fn new(field: impl Into<String>, variant: Variant) -> Self {
        Self {
            field: field.into(),
            variant,
        }
    }
}

/// Outcome of variant resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantDecision {
    pub variant: Variant,
    /// The field whose rule fired, if any.
    pub triggered_by: Option<String>,
}

/// Resolve a missing-field set to a variant.
///
/// The first rule whose field is missing wins; the list order is the total
/// precedence order. With no match the result is [`Variant::Full`].
#[must_use]
pub fn resolve_variant(missing: &MissingFieldSet, precedence: &[PrecedenceRule]) -> VariantDecision {
    let decision = precedence
        .iter()
        .find(|rule| missing.contains(&rule.field))
        .map(|rule| VariantDecision {
            variant: rule.variant,
            triggered_by: Some(rule.field.clone()),
        })
        .unwrap_or(VariantDecision {
            variant: Variant::Full,
            triggered_by: None,
        });
    debug!(variant = %decision.variant, trigger = ?decision.triggered_by, "variant resolved");
    decision
}

// =============================================================================
// TESTS
// =============================================================================
