//! # HTTP API
//!
//! Thin axum surface over the predictor.
//!
//! | method | path                        | body / params                       |
//! |--------|-----------------------------|-------------------------------------|
//! | GET    | `/health`                   |                                     |
//! | POST   | `/predict`                  | flat JSON fields; `?subject&stage`  |
//! | GET    | `/predict/{enrollment_id}`  | only when a records file is loaded  |
//!
//! Every prediction answer is a [`PredictionResponse`] envelope, including a
//! body or query string that does not parse (`invalid_request`).

use crate::error::AppError;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use gradecast_core::{
    ErrorBody, PredictError, PredictResult, PredictionResponse, PredictionResult, Predictor, RegistryStats,
    SelectionPolicy, StudentRecord, StudentRecordSource,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

// =============================================================================
// STATE
// =============================================================================

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub predictor: Arc<Predictor>,
    pub records: Option<Arc<dyn StudentRecordSource>>,
}

impl AppState {
    /// State without a record source.
    #[must_use]
    pub fn new(predictor: Predictor) -> Self {
        Self {
            predictor: Arc::new(predictor),
            records: None,
        }
    }

    /// Attach a record source, enabling `GET /predict/{enrollment_id}`.
    #[must_use]
    pub fn with_records(mut self, records: impl StudentRecordSource + 'static) -> Self {
        self.records = Some(Arc::new(records));
        self
    }
}

// =============================================================================
// ROUTER
// =============================================================================

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let mut router = Router::new()
        .route("/health", get(health))
        .route("/predict", post(predict));

    if state.records.is_some() {
        router = router.route("/predict/{enrollment_id}", get(predict_enrollment));
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Bind and serve until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<(), AppError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(AppError::Server)?;
    info!(%addr, "listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "cannot listen for shutdown signal");
    }
    info!("shutting down");
}

// =============================================================================
// HANDLERS
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub policy: SelectionPolicy,
    pub subjects: Vec<String>,
    pub models: RegistryStats,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let config = state.predictor.config();
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        policy: config.policy,
        subjects: config.subjects.iter().map(|s| s.code.clone()).collect(),
        models: state.predictor.registry().stats(),
    })
}

/// Selector hints accepted on `POST /predict`.
#[derive(Debug, Default, Deserialize)]
pub struct PredictParams {
    pub subject: Option<String>,
    pub stage: Option<String>,
}

async fn predict(
    State(state): State<AppState>,
    params: Result<Query<PredictParams>, QueryRejection>,
    record: Result<Json<StudentRecord>, JsonRejection>,
) -> Response {
    let Query(params) = match params {
        Ok(params) => params,
        Err(rejection) => return reject(rejection.status(), rejection.body_text()),
    };
    let Json(record) = match record {
        Ok(record) => record,
        Err(rejection) => return reject(rejection.status(), rejection.body_text()),
    };
    let predictor = Arc::clone(&state.predictor);
    let outcome = run_blocking(move || {
        predictor.predict(&record, params.subject.as_deref(), params.stage.as_deref())
    })
    .await;
    respond(outcome)
}

async fn predict_enrollment(
    State(state): State<AppState>,
    Path(enrollment_id): Path<String>,
) -> Response {
    let Some(records) = state.records.clone() else {
        return respond(Err(PredictError::RecordNotFound { enrollment_id }));
    };
    let predictor = Arc::clone(&state.predictor);
    let outcome =
        run_blocking(move || predictor.predict_enrollment(&*records, &enrollment_id)).await;
    respond(outcome)
}

/// Model loads may touch the filesystem, so the pipeline runs off the
/// async workers.
async fn run_blocking<F>(job: F) -> PredictResult<PredictionResult>
where
    F: FnOnce() -> PredictResult<PredictionResult> + Send + 'static,
{
    match tokio::task::spawn_blocking(job).await {
        Ok(outcome) => outcome,
        Err(e) => Err(PredictError::ModelFailure {
            artifact: String::from("(worker)"),
            reason: e.to_string(),
        }),
    }
}

/// HTTP status for a pipeline error.
#[must_use]
pub fn status_for(err: &PredictError) -> StatusCode {
    if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

/// Envelope for a request the extractors could not parse.
fn reject(status: StatusCode, message: String) -> Response {
    warn!(%status, %message, "request rejected");
    let error = ErrorBody {
        kind: String::from("invalid_request"),
        message,
    };
    (status, Json(PredictionResponse::Error { error })).into_response()
}

fn respond(outcome: PredictResult<PredictionResult>) -> Response {
    let status = match &outcome {
        Ok(_) => StatusCode::OK,
        Err(err) => status_for(err),
    };
    (status, Json(PredictionResponse::from(outcome))).into_response()
}

// =============================================================================
// TESTS
// =============================================================================
