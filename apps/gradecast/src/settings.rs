//! # Settings
//!
//! Resolves the pipeline configuration for a run: a JSON file when given,
//! otherwise one of the built-in presets.

use crate::error::{AppError, read_json};
use clap::ValueEnum;
use gradecast_core::PipelineConfig;
use std::path::Path;
use tracing::info;

/// Built-in deployments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Preset {
    /// Variants chosen from missing assessments (WEB101, MATH201, DATA301).
    #[default]
    MissingField,
    /// Curriculum stages chosen by completeness (Easy, Medium, Hard).
    Staged,
}

impl Preset {
    /// The configuration this preset stands for.
    #[must_use]
    pub fn config(self) -> PipelineConfig {
        match self {
            Self::MissingField => PipelineConfig::default(),
            Self::Staged => PipelineConfig::staged(),
        }
    }
}

/// Load and validate the configuration.
///
/// Fields omitted from a config file take their missing-field defaults.
pub fn load_config(file: Option<&Path>, preset: Preset) -> Result<PipelineConfig, AppError> {
    let config = match file {
        Some(path) => {
            let config: PipelineConfig = read_json(path)?;
            info!(path = %path.display(), policy = ?config.policy, "configuration loaded");
            config
        }
        None => preset.config(),
    };
    config.validate()?;
    Ok(config)
}
