//! # Record Module
//!
//! Student records as handed over by the upstream data-access collaborator.
//!
//! A record is an immutable mapping from field name to [`FieldValue`]. The
//! core never writes to a record once it has been read; normalization
//! produces a new one.

use crate::error::{PredictError, PredictResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// =============================================================================
// FIELD VALUE
// =============================================================================

/// A single raw field value.
///
/// Deserializes from a JSON number, boolean, string or `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// Numeric value.
    Number(f64),
    /// Yes/no flag; only yes/no category tables accept it.
    Bool(bool),
    /// Categorical or not-yet-parsed value.
    Text(String),
    /// Explicitly absent (`null`).
    Absent,
}

impl FieldValue {
    /// Create a text value.
    #[must_use]
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Check whether the value carries information.
    ///
    /// `null` and blank strings are treated as absent.
    #[must_use]
    pub fn is_present(&self) -> bool {
        match self {
            Self::Number(_) | Self::Bool(_) => true,
            Self::Text(s) => !s.trim().is_empty(),
            Self::Absent => false,
        }
    }

    /// Read the value as a finite number.
    ///
    /// Returns `Ok(None)` for absent values. Numeric strings are accepted.
    pub fn as_number(&self, field: &str) -> PredictResult<Option<f64>> {
        match self {
            Self::Number(n) if n.is_finite() => Ok(Some(*n)),
            Self::Number(n) => Err(PredictError::invalid_number(field, n.to_string())),
            Self::Bool(b) => Err(PredictError::invalid_number(field, b.to_string())),
            Self::Text(s) if s.trim().is_empty() => Ok(None),
            Self::Text(s) => match s.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(Some(n)),
                _ => Err(PredictError::invalid_number(field, s.clone())),
            },
            Self::Absent => Ok(None),
        }
    }

    /// Render the value for diagnostics.
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Number(n) => n.to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Text(s) => s.clone(),
            Self::Absent => String::from("null"),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

// =============================================================================
// STUDENT RECORD
// =============================================================================

/// Mapping from field name to value for one student in one subject.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl StudentRecord {
    /// Create an empty record.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion, used when assembling a record from parts.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Get the raw value of a field.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }

    /// Check whether a field is present and non-null.
    #[must_use]
    pub fn is_present(&self, name: &str) -> bool {
        self.fields.get(name).is_some_and(FieldValue::is_present)
    }

    /// Read a field as a number (`Ok(None)` when absent).
    pub fn number(&self, name: &str) -> PredictResult<Option<f64>> {
        match self.fields.get(name) {
            Some(value) => value.as_number(name),
            None => Ok(None),
        }
    }

    /// Read a field as trimmed text (`None` when absent or numeric).
    #[must_use]
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(FieldValue::Text(s)) if !s.trim().is_empty() => Some(s.trim()),
            _ => None,
        }
    }

    /// Names of fields that carry a value, in deterministic order.
    pub fn present_names(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(_, v)| v.is_present())
            .map(|(k, _)| k.as_str())
    }

    /// Iterate all fields, including absent ones.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of fields (present or not).
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the record has no fields at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<FieldValue>> FromIterator<(K, V)> for StudentRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// =============================================================================
// RECORD SOURCE
// =============================================================================

/// Data-access collaborator that resolves an enrollment to a record.
pub trait StudentRecordSource: Send + Sync {
    /// Fetch the record for an enrollment.
    ///
    /// Fails with [`PredictError::RecordNotFound`] when it does not exist.
    fn get(&self, enrollment_id: &str) -> PredictResult<StudentRecord>;
}

/// Record source backed by an in-memory map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryRecordSource {
    records: BTreeMap<String, StudentRecord>,
}

impl InMemoryRecordSource {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a record.
    pub fn insert(&mut self, enrollment_id: impl Into<String>, record: StudentRecord) {
        self.records.insert(enrollment_id.into(), record);
    }

    /// Number of stored records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl StudentRecordSource for InMemoryRecordSource {
    fn get(&self, enrollment_id: &str) -> PredictResult<StudentRecord> {
        self.records
            .get(enrollment_id)
            .cloned()
            .ok_or_else(|| PredictError::RecordNotFound {
                enrollment_id: enrollment_id.to_string(),
            })
    }
}

// =============================================================================
// TESTS
// =============================================================================
