//! # Confidence & Interpretation
//!
//! Post-processing of a raw model output.
//!
//! The confidence score is a heuristic degradation signal: it starts at a
//! base value and loses a fixed penalty per imputed field, down to a floor.
//! Imputed fields are the missing tracked fields plus any expected feature
//! left at the missing sentinel.
//! It is not a statistical confidence interval and says nothing about the
//! model's error on complete inputs.

use crate::config::ConfidenceConfig;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Heuristic confidence for a prediction built with `imputed` substituted fields.
#[must_use]
pub fn confidence(config: &ConfidenceConfig, imputed: usize) -> f64 {
    let penalty = config.penalty_per_field * imputed as f64;
    let score = (config.base - penalty).max(config.floor);
    round_to(score, 2)
}

/// Round half away from zero to `places` decimals.
#[must_use]
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

// =============================================================================
// INTERPRETATION
// =============================================================================

/// Human-readable band of a predicted grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Interpretation {
    #[serde(rename = "Needs improvement")]
    NeedsImprovement,
    Average,
    Good,
    Excellent,
}

impl Interpretation {
    /// Band a grade. Each threshold belongs to the higher band.
    #[must_use]
    pub fn from_grade(grade: f64) -> Self {
        if grade >= 85.0 {
            Self::Excellent
        } else if grade >= 70.0 {
            Self::Good
        } else if grade >= 50.0 {
            Self::Average
        } else {
            Self::NeedsImprovement
        }
    }

    /// Display label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Average => "Average",
            Self::NeedsImprovement => "Needs improvement",
        }
    }
}

impl fmt::Display for Interpretation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// TESTS
// =============================================================================
