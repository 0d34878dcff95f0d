//! # CLI Commands
//!
//! One function per subcommand. Each returns `Result<(), AppError>`;
//! `main` turns an error into exit code 1.
//!
//! Output goes to stdout, either as the plain-text box or, with `--json`,
//! as pretty-printed JSON.

use crate::artifacts::FileModelProvider;
use crate::error::AppError;
use crate::records::{load_records, read_record};
use gradecast_core::{
    FieldValue, ModelRegistry, PipelineConfig, PredictionResponse, Predictor, PreparedRequest,
    SelectionBasis, StudentRecord, StudentRecordSource, all_keys,
};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

// =============================================================================
// INPUT
// =============================================================================

/// Where a command reads its student record from.
#[derive(Debug, Clone, Copy)]
pub enum RecordInput<'a> {
    /// A single JSON object of raw fields.
    File(&'a Path),
    /// An enrollment inside a records file.
    Enrollment { records: &'a Path, id: &'a str },
}

impl RecordInput<'_> {
    /// Resolve the record.
    pub fn read(&self) -> Result<StudentRecord, AppError> {
        match self {
            Self::File(path) => read_record(path),
            Self::Enrollment { records, id } => Ok(load_records(records)?.get(id)?),
        }
    }
}

/// Hints that override the record's own selectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hints<'a> {
    pub subject: Option<&'a str>,
    pub stage: Option<&'a str>,
}

/// Build a predictor over a directory of artifacts.
pub fn build_predictor(config: PipelineConfig, models: &Path) -> Result<Predictor, AppError> {
    let provider = FileModelProvider::new(models, config.clone());
    let registry = Arc::new(ModelRegistry::new(provider));
    Ok(Predictor::new(config, registry)?)
}

/// Load every artifact the configuration can select. Fails on the first
/// missing or invalid one.
pub fn preload_all(predictor: &Predictor) -> Result<usize, AppError> {
    let keys = all_keys(predictor.config());
    let loaded = predictor.registry().preload(keys.iter())?;
    info!(loaded, "artifacts preloaded");
    Ok(loaded)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| AppError::Usage(format!("cannot render output: {}", e)))?;
    println!("{}", text);
    Ok(())
}

// =============================================================================
// PREDICT
// =============================================================================

/// Run the full pipeline and print the response envelope.
pub fn cmd_predict(
    config: PipelineConfig,
    models: &Path,
    input: RecordInput<'_>,
    hints: Hints<'_>,
    json: bool,
) -> Result<(), AppError> {
    let predictor = build_predictor(config, models)?;
    let record = input.read()?;

    let outcome = predictor.predict(&record, hints.subject, hints.stage);
    let failure = outcome.as_ref().err().cloned();
    let response = PredictionResponse::from(outcome);

    if json {
        print_json(&response)?;
    } else {
        print!("{}", response.to_text());
    }

    match failure {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

// =============================================================================
// STAGE
// =============================================================================

/// Report on normalization and artifact selection, without loading a model.
#[derive(Debug, Serialize)]
pub struct StageReport {
    pub subject: String,
    pub variant: String,
    pub artifact: String,
    pub missing: Vec<String>,
    pub basis: SelectionBasis,
    /// The record after normalization.
    pub fields: StudentRecord,
}

impl From<PreparedRequest> for StageReport {
    fn from(prepared: PreparedRequest) -> Self {
        Self {
            subject: prepared.subject,
            variant: prepared.selection.key.variant.to_string(),
            artifact: prepared.selection.artifact,
            missing: prepared.selection.missing.as_slice().to_vec(),
            basis: prepared.selection.basis,
            fields: prepared.record,
        }
    }
}

/// Show which artifact a record would be routed to, and why.
pub fn cmd_stage(
    config: PipelineConfig,
    input: RecordInput<'_>,
    hints: Hints<'_>,
    json: bool,
) -> Result<(), AppError> {
    // The registry is never consulted here; any directory will do.
    let predictor = build_predictor(config, Path::new("."))?;
    let record = input.read()?;
    let report = StageReport::from(predictor.prepare(&record, hints.subject, hints.stage)?);

    if json {
        return print_json(&report);
    }

    println!("Subject:  {}", report.subject);
    println!("Model:    {} [{}]", report.variant, report.artifact);
    match &report.basis {
        SelectionBasis::Staged(decision) => {
            println!("Basis:    stage classifier ({:?})", decision.reason);
            for (stage, score) in &decision.scores {
                println!("  {:<6} {} matched", stage.as_str(), score);
            }
        }
        SelectionBasis::MissingField(decision) => match &decision.triggered_by {
            Some(field) => println!("Basis:    '{}' is missing", field),
            None => println!("Basis:    all tracked fields present"),
        },
        SelectionBasis::Explicit => println!("Basis:    explicit hint"),
    }
    if report.missing.is_empty() {
        println!("Missing:  (none)");
    } else {
        println!("Missing:  {}", report.missing.join(", "));
    }
    println!("Fields:");
    for (name, value) in report.fields.iter() {
        let shown = match value {
            FieldValue::Absent => String::from("(absent)"),
            other => other.display(),
        };
        println!("  {:<18} {}", name, shown);
    }
    Ok(())
}

// =============================================================================
// FEATURES
// =============================================================================

/// The assembled vector for the selected artifact.
#[derive(Debug, Serialize)]
pub struct FeatureReport {
    pub artifact: String,
    /// `null` marks the missing sentinel.
    pub features: Vec<(String, Option<f64>)>,
    pub imputed: Vec<String>,
}

/// Print the feature vector that would be handed to the model.
pub fn cmd_features(
    config: PipelineConfig,
    models: &Path,
    input: RecordInput<'_>,
    hints: Hints<'_>,
    json: bool,
) -> Result<(), AppError> {
    let predictor = build_predictor(config, models)?;
    let record = input.read()?;
    let prepared = predictor.prepare(&record, hints.subject, hints.stage)?;
    let model = predictor.registry().get(&prepared.selection.key)?;
    let built = predictor.assemble(&prepared, &model)?;

    let report = FeatureReport {
        artifact: prepared.selection.artifact,
        features: built
            .vector
            .iter()
            .map(|(name, value)| (name.to_string(), (!value.is_nan()).then_some(value)))
            .collect(),
        imputed: built.imputed,
    };

    if json {
        return print_json(&report);
    }

    println!("Artifact: {}", report.artifact);
    for (name, value) in &report.features {
        match value {
            Some(v) => println!("  {:<18} {}", name, v),
            None => println!("  {:<18} (missing)", name),
        }
    }
    if !report.imputed.is_empty() {
        println!("Imputed:  {}", report.imputed.join(", "));
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
