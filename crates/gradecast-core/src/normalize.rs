//! # Field Normalizer
//!
//! Maps the many spellings callers use for a field onto canonical names.
//!
//! Lookup is done on a folded form of the raw key (trimmed, lower case,
//! spaces and hyphens turned into underscores). Keys with no mapping pass
//! through unchanged so they stay visible to later stages.

use crate::record::{FieldValue, StudentRecord};
use crate::schema;
use std::collections::BTreeMap;
use tracing::debug;

/// Built-in alias table, keyed by folded spelling.
const ALIASES: &[(&str, &str)] = &[
    ("quiz_1", schema::QUIZ1),
    ("quiz_2", schema::QUIZ2),
    ("assignment_1", schema::ASSIGNMENT1),
    ("assignment_2", schema::ASSIGNMENT2),
    ("midterm_marks", schema::MIDTERM),
    ("midterm_mark", schema::MIDTERM),
    ("midterm_score", schema::MIDTERM),
    ("hours_studied", schema::STUDY_HOURS),
    ("study_hour", schema::STUDY_HOURS),
    ("attendance_percentage", schema::ATTENDANCE),
    ("motivation_level", schema::MOTIVATION),
    ("extracurricular_activities", schema::EXTRACURRICULAR),
    ("subject_code", schema::SUBJECT),
    ("course", schema::SUBJECT),
    ("variant", schema::STAGE),
    ("model_stage", schema::STAGE),
];

/// Every canonical name. Their folded form maps to themselves.
const CANONICAL: &[&str] = &[
    schema::QUIZ1,
    schema::QUIZ2,
    schema::ASSIGNMENT1,
    schema::ASSIGNMENT2,
    schema::MIDTERM,
    schema::STUDY_HOURS,
    schema::SLEEP_HOURS,
    schema::ATTENDANCE,
    schema::TEACHER_QUALITY,
    schema::MOTIVATION,
    schema::GENDER,
    schema::PEER_INFLUENCE,
    schema::EXTRACURRICULAR,
    schema::PHYSICAL_ACTIVITY,
    schema::SUBJECT,
    schema::STAGE,
];

/// Fold a raw key for table lookup.
fn fold(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            ' ' | '-' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

/// Deterministic raw-name to canonical-name mapping.
#[derive(Debug, Clone)]
pub struct FieldNormalizer {
    table: BTreeMap<String, String>,
}

impl Default for FieldNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldNormalizer {
    /// Create a normalizer with the built-in vocabulary.
    #[must_use]
    pub fn new() -> Self {
        let mut table = BTreeMap::new();
        for name in CANONICAL {
            table.insert((*name).to_string(), (*name).to_string());
        }
        for (alias, canonical) in ALIASES {
            table.insert((*alias).to_string(), (*canonical).to_string());
        }
        Self { table }
    }

    /// Register an extra spelling.
    #[must_use]
    pub fn with_alias(mut self, raw: &str, canonical: impl Into<String>) -> Self {
        self.table.insert(fold(raw), canonical.into());
        self
    }

    /// Canonical name for a raw key (the key itself if unmapped).
    #[must_use]
    pub fn canonical_name(&self, raw: &str) -> String {
        self.table
            .get(&fold(raw))
            .cloned()
            .unwrap_or_else(|| raw.to_string())
    }

    /// Check whether a raw key has a known mapping.
    #[must_use]
    pub fn is_known(&self, raw: &str) -> bool {
        self.table.contains_key(&fold(raw))
    }

    /// Re-key a record by canonical names.
    ///
    /// When several raw keys land on one canonical name, a present value
    /// beats an absent one, then the canonically spelled key wins, then the
    /// first raw key in sorted order.
    #[must_use]
    pub fn normalize(&self, record: &StudentRecord) -> StudentRecord {
        let mut out: BTreeMap<String, (String, FieldValue)> = BTreeMap::new();

        for (raw, value) in record.iter() {
            let canonical = self.canonical_name(raw);
            match out.get(&canonical) {
                None => {
                    out.insert(canonical, (raw.to_string(), value.clone()));
                }
                Some((kept_raw, kept)) => {
                    let replace = match (kept.is_present(), value.is_present()) {
                        (false, true) => true,
                        (true, false) => false,
                        _ => raw == canonical && kept_raw != &canonical,
                    };
                    debug!(
                        canonical = %canonical,
                        kept = %kept_raw,
                        other = %raw,
                        replace,
                        "duplicate spelling"
                    );
                    if replace {
                        out.insert(canonical, (raw.to_string(), value.clone()));
                    }
                }
            }
        }

        out.into_iter().map(|(k, (_, v))| (k, v)).collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
