//! # Feature Vector Builder
//!
//! Builds the ordered numeric vector a selected artifact expects.
//!
//! Each expected feature is resolved by the first rule that applies:
//!
//! | feature             | rule                                                   |
//! |---------------------|--------------------------------------------------------|
//! | indicator           | 1 if its field is in the missing set, else 0           |
//! | `quiz_avg`          | the other quiz alone if one is missing, else the mean  |
//! | `assignment_avg`    | mean of both assignments, absent ones counted as 0     |
//! | `midterm` (missing) | the subject's historical average                       |
//! | anything else       | the raw field through its fixed encoding               |
//!
//! A feature still unresolved becomes [`MISSING`] when the artifact tolerates
//! gaps, and a `MissingRequiredFeature` error otherwise.

use crate::config::PipelineConfig;
use crate::error::{PredictError, PredictResult};
use crate::record::StudentRecord;
use crate::schema::{self, FeatureKind};
use crate::variant::MissingFieldSet;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// Sentinel for a feature with no value. Artifacts that tolerate gaps were
/// trained with an imputer that consumes it.
pub const MISSING: f64 = f64::NAN;

// =============================================================================
// FEATURE VECTOR
// =============================================================================

/// Numeric values aligned positionally to a list of feature names.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureVector {
    names: Vec<String>,
    values: Vec<f64>,
}

impl FeatureVector {
    /// Pair names with values. Lengths must match.
    pub fn new(names: Vec<String>, values: Vec<f64>) -> PredictResult<Self> {
        if names.len() != values.len() {
            return Err(PredictError::InvalidConfig(format!(
                "feature vector has {} names but {} values",
                names.len(),
                values.len()
            )));
        }
        Ok(Self { names, values })
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the vector is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Feature names in order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Values in order.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Value of a named feature.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    /// Iterate (name, value) pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    /// Count entries holding the missing sentinel.
    #[must_use]
    pub fn sentinel_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }

    /// Re-align onto a superset of names, filling the rest with [`MISSING`].
    #[must_use]
    pub fn widen(&self, superset: &[String]) -> FeatureVector {
        let index: BTreeMap<&str, f64> = self.iter().collect();
        let values = superset
            .iter()
            .map(|name| index.get(name.as_str()).copied().unwrap_or(MISSING))
            .collect();
        FeatureVector {
            names: superset.to_vec(),
            values,
        }
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Output of a build: the vector plus the fields that were imputed.
#[derive(Debug, Clone, Serialize)]
pub struct BuiltFeatures {
    pub vector: FeatureVector,
    /// Missing tracked fields, then features left at the sentinel.
    pub imputed: Vec<String>,
}

/// Per-request inputs the builder needs besides the record.
#[derive(Debug, Clone, Copy)]
pub struct BuildContext<'a> {
    pub subject: &'a str,
    pub missing: &'a MissingFieldSet,
    /// The artifact accepts [`MISSING`] for unresolved features.
    pub tolerates_missing: bool,
}

/// Assembles feature vectors under a fixed configuration.
#[derive(Debug, Clone, Copy)]
pub struct FeatureVectorBuilder<'a> {
    config: &'a PipelineConfig,
}

impl<'a> FeatureVectorBuilder<'a> {
    /// Create a builder.
    #[must_use]
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Build the vector for `expected`, in that exact order.
    pub fn build(
        &self,
        record: &StudentRecord,
        ctx: BuildContext<'_>,
        expected: &[String],
    ) -> PredictResult<BuiltFeatures> {
        let mut values = Vec::with_capacity(expected.len());
        let mut imputed: Vec<String> = ctx.missing.as_slice().to_vec();

        for name in expected {
            let value = match self.resolve(record, ctx, name)? {
                Resolved::Value(v) => v,
                Resolved::Absent(field) if ctx.tolerates_missing => {
                    if !imputed.contains(name) {
                        imputed.push(name.clone());
                    }
                    debug!(feature = %name, source = %field, "left at missing sentinel");
                    MISSING
                }
                Resolved::Absent(field) => return Err(PredictError::missing(field)),
            };
            values.push(value);
        }

        Ok(BuiltFeatures {
            vector: FeatureVector {
                names: expected.to_vec(),
                values,
            },
            imputed,
        })
    }

    fn resolve(
        &self,
        record: &StudentRecord,
        ctx: BuildContext<'_>,
        name: &str,
    ) -> PredictResult<Resolved> {
        if let Some(field) = self.config.indicators.get(name) {
            let flag = if ctx.missing.contains(field) { 1.0 } else { 0.0 };
            return Ok(Resolved::Value(flag));
        }

        match name {
            schema::QUIZ_AVG => quiz_average(record, ctx.missing),
            schema::ASSIGNMENT_AVG => assignment_average(record),
            schema::MIDTERM if ctx.missing.contains(schema::MIDTERM) => Ok(Resolved::Value(
                self.config.midterm_average(ctx.subject),
            )),
            _ => {
                let encoded = match record.get(name) {
                    Some(value) => FeatureKind::of(name).encode(name, value)?,
                    None => None,
                };
                Ok(encoded.map_or_else(|| Resolved::Absent(name.to_string()), Resolved::Value))
            }
        }
    }
}

/// Result of resolving one feature.
enum Resolved {
    Value(f64),
    /// No value and no rule; carries the raw field that was needed.
    Absent(String),
}

fn quiz_average(record: &StudentRecord, missing: &MissingFieldSet) -> PredictResult<Resolved> {
    let quiz1 = record.number(schema::QUIZ1)?;
    let quiz2 = record.number(schema::QUIZ2)?;

    let resolved = if missing.contains(schema::QUIZ1) {
        quiz2.map_or_else(|| Resolved::Absent(schema::QUIZ2.into()), Resolved::Value)
    } else if missing.contains(schema::QUIZ2) {
        quiz1.map_or_else(|| Resolved::Absent(schema::QUIZ1.into()), Resolved::Value)
    } else {
        match (quiz1, quiz2) {
            (Some(a), Some(b)) => Resolved::Value((a + b) / 2.0),
            (None, _) => Resolved::Absent(schema::QUIZ1.into()),
            (_, None) => Resolved::Absent(schema::QUIZ2.into()),
        }
    };
    Ok(resolved)
}

fn assignment_average(record: &StudentRecord) -> PredictResult<Resolved> {
    let a1 = record.number(schema::ASSIGNMENT1)?.unwrap_or(0.0);
    let a2 = record.number(schema::ASSIGNMENT2)?.unwrap_or(0.0);
    Ok(Resolved::Value((a1 + a2) / 2.0))
}

// =============================================================================
// TESTS
// =============================================================================
