//! # Response Module
//!
//! Uniform output envelope shared by the CLI and the HTTP surface.
//!
//! - A success carries the full [`PredictionResult`]
//! - A failure carries the error kind and its message
//! - Nothing is silently filled in: every imputed field is listed

use crate::error::PredictError;
use crate::predictor::PredictionResult;
use serde::{Deserialize, Serialize};

/// Machine-readable description of a failed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Stable snake_case kind, e.g. `unknown_subject`.
    pub kind: String,
    /// Human-readable message.
    pub message: String,
}

impl From<&PredictError> for ErrorBody {
    fn from(err: &PredictError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// Either a prediction or the reason there is none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PredictionResponse {
    Ok { result: PredictionResult },
    Error { error: ErrorBody },
}

impl PredictionResponse {
    /// Check if this response carries a prediction.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok { .. })
    }

    /// The prediction, if any.
    #[must_use]
    pub fn result(&self) -> Option<&PredictionResult> {
        match self {
            Self::Ok { result } => Some(result),
            Self::Error { .. } => None,
        }
    }

    /// Format as plain text with the standard template.
    #[must_use]
    pub fn to_text(&self) -> String {
        let mut output = String::new();

        match self {
            Self::Ok { result } => {
                output.push_str("┌─────────────────────────────────────┐\n");
                output.push_str("│ PREDICTION                          │\n");
                output.push_str(&format!("│ - subject: {}\n", result.subject));
                output.push_str(&format!("│ - model: {} [{}]\n", result.variant, result.artifact));
                output.push_str(&format!("│ - grade: {:.2}\n", result.predicted_grade));
                output.push_str(&format!("│ - band: {}\n", result.interpretation));
                output.push_str(&format!("│ - confidence: {:.2}\n", result.confidence));

                output.push_str("├─────────────────────────────────────┤\n");
                output.push_str("│ IMPUTED (not read from the record)  │\n");

                if result.imputed_fields.is_empty() {
                    output.push_str("│ - (none)                            │\n");
                } else {
                    for field in &result.imputed_fields {
                        output.push_str(&format!("│ - {}\n", field));
                    }
                }
            }
            Self::Error { error } => {
                output.push_str("┌─────────────────────────────────────┐\n");
                output.push_str("│ ERROR                               │\n");
                output.push_str(&format!("│ - {}: {}\n", error.kind, error.message));
            }
        }

        output.push_str("└─────────────────────────────────────┘\n");
        output
    }
}

impl From<Result<PredictionResult, PredictError>> for PredictionResponse {
    fn from(outcome: Result<PredictionResult, PredictError>) -> Self {
        match outcome {
            Ok(result) => Self::Ok { result },
            Err(err) => Self::Error {
                error: ErrorBody::from(&err),
            },
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
