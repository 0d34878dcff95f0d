//! # Application Errors
//!
//! Everything the binary can fail with. Pipeline failures are carried as
//! [`PredictError`] so their `kind()` survives up to the exit path.

use gradecast_core::PredictError;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from the CLI and server.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Predict(#[from] PredictError),

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("malformed JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid arguments: {0}")]
    Usage(String),

    #[error("server error: {0}")]
    Server(#[source] std::io::Error),
}

impl AppError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn json(path: &Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Read and parse a JSON file.
pub(crate) fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| AppError::json(path, e))
}
