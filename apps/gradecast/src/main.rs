//! # Gradecast Binary
//!
//! CLI entry point. `serve` runs the HTTP surface; the other commands run the
//! pipeline once and print the result.

use clap::{Args, Parser, Subcommand};
use gradecast::api::{self, AppState};
use gradecast::cli::{self, Hints, RecordInput};
use gradecast::error::AppError;
use gradecast::records::load_records;
use gradecast::settings::{Preset, load_config};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Grade prediction with stage- and gap-aware model selection.
#[derive(Parser, Debug)]
#[command(name = "gradecast")]
#[command(version)]
struct Cli {
    /// Pipeline configuration file (JSON). Overrides --preset.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Built-in configuration to use when no file is given.
    #[arg(long, value_enum, default_value_t = Preset::MissingField, global = true)]
    preset: Preset,

    /// Print JSON instead of text.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct InputArgs {
    /// JSON file holding one record's raw fields.
    #[arg(long, conflicts_with_all = ["records", "enrollment"])]
    fields: Option<PathBuf>,

    /// JSON file mapping enrollment ids to records.
    #[arg(long, requires = "enrollment")]
    records: Option<PathBuf>,

    /// Enrollment id to look up in --records.
    #[arg(long, requires = "records")]
    enrollment: Option<String>,

    /// Subject code, overriding the record's own.
    #[arg(long)]
    subject: Option<String>,

    /// Stage or variant, overriding automatic selection.
    #[arg(long)]
    stage: Option<String>,
}

impl InputArgs {
    fn input(&self) -> Result<RecordInput<'_>, AppError> {
        match (&self.fields, &self.records, &self.enrollment) {
            (Some(path), _, _) => Ok(RecordInput::File(path)),
            (None, Some(records), Some(id)) => Ok(RecordInput::Enrollment { records, id }),
            _ => Err(AppError::Usage(
                "give --fields, or --records with --enrollment".into(),
            )),
        }
    }

    fn hints(&self) -> Hints<'_> {
        Hints {
            subject: self.subject.as_deref(),
            stage: self.stage.as_deref(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Predict a grade
    Predict {
        /// Directory of model artifacts
        #[arg(long)]
        models: PathBuf,
        #[command(flatten)]
        input: InputArgs,
    },
    /// Show which artifact a record selects, without loading it
    Stage {
        #[command(flatten)]
        input: InputArgs,
    },
    /// Show the feature vector handed to the model
    Features {
        /// Directory of model artifacts
        #[arg(long)]
        models: PathBuf,
        #[command(flatten)]
        input: InputArgs,
    },
    /// Serve the HTTP API
    Serve {
        /// Directory of model artifacts
        #[arg(long)]
        models: PathBuf,
        /// Records file enabling GET /predict/{enrollment_id}
        #[arg(long)]
        records: Option<PathBuf>,
        /// Address to bind
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: SocketAddr,
        /// Load every artifact before accepting requests
        #[arg(long)]
        preload: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(error = %err, "command failed");
            eprintln!("Error: {}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = load_config(cli.config.as_deref(), cli.preset)?;

    match cli.command {
        Commands::Predict { models, input } => {
            cli::cmd_predict(config, &models, input.input()?, input.hints(), cli.json)
        }
        Commands::Stage { input } => cli::cmd_stage(config, input.input()?, input.hints(), cli.json),
        Commands::Features { models, input } => {
            cli::cmd_features(config, &models, input.input()?, input.hints(), cli.json)
        }
        Commands::Serve {
            models,
            records,
            addr,
            preload,
        } => {
            let predictor = cli::build_predictor(config, &models)?;
            if preload {
                cli::preload_all(&predictor)?;
            }
            let mut state = AppState::new(predictor);
            if let Some(path) = records {
                state = state.with_records(load_records(&path)?);
            }
            api::serve(addr, state).await
        }
    }
}
