//! HTTP API tests using axum-test.

#![allow(clippy::unwrap_used, clippy::panic)]

use axum::http::StatusCode;
use axum_test::TestServer;
use gradecast::api::{AppState, router};
use gradecast::cli::build_predictor;
use gradecast_core::{InMemoryRecordSource, PipelineConfig, StudentRecord};
use serde_json::{Value, json};
use tempfile::TempDir;

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

const ARTIFACT: &str = r#"{
    "expected_features": ["quiz_avg", "assignment_avg", "midterm", "attendance"],
    "intercept": 0.0,
    "weights": { "quiz_avg": 0.5, "midterm": 0.5 }
}"#;

fn create_models() -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    for subject in ["WEB101", "MATH201", "DATA301"] {
        for variant in ["full", "null_quiz1", "null_midterm"] {
            let path = dir.path().join(format!("{}_{}_enhanced.json", subject, variant));
            std::fs::write(path, ARTIFACT).unwrap();
        }
    }
    dir
}

fn server(models: &TempDir, records: Option<InMemoryRecordSource>) -> TestServer {
    let predictor = build_predictor(PipelineConfig::default(), models.path()).unwrap();
    let mut state = AppState::new(predictor);
    if let Some(records) = records {
        state = state.with_records(records);
    }
    TestServer::new(router(state)).unwrap()
}

fn complete_fields() -> Value {
    json!({
        "Quiz 1": 80,
        "quiz2": 90,
        "assignment1": 70,
        "assignment2": 70,
        "Midterm_Marks": 90,
        "attendance": 95
    })
}

// =============================================================================
// TESTS
// =============================================================================

#[tokio::test]
async fn health_reports_policy_and_subjects() {
    let models = create_models();
    let server = server(&models, None);

    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["policy"], "missing_field");
    assert_eq!(body["subjects"], json!(["WEB101", "MATH201", "DATA301"]));
    assert_eq!(body["models"]["loaded"], 0);
}

#[tokio::test]
async fn predict_with_subject_hint() {
    let models = create_models();
    let server = server(&models, None);

    let response = server
        .post("/predict")
        .add_query_param("subject", "WEB101")
        .json(&complete_fields())
        .await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["result"]["variant"], "full");
    assert_eq!(body["result"]["predicted_grade"], 87.5);
    assert_eq!(body["result"]["interpretation"], "Excellent");
    assert_eq!(body["result"]["confidence"], 0.9);
}

#[tokio::test]
async fn predict_reads_subject_from_body() {
    let models = create_models();
    let server = server(&models, None);

    let mut fields = complete_fields();
    fields["subject_code"] = json!("DATA301");
    fields["Midterm_Marks"] = Value::Null;

    let response = server.post("/predict").json(&fields).await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["result"]["variant"], "null_midterm");
    // (85 + 55) / 2 with the subject's midterm average
    assert_eq!(body["result"]["predicted_grade"], 70.0);
    assert_eq!(body["result"]["imputed_fields"], json!(["midterm"]));
    assert_eq!(body["result"]["confidence"], 0.75);
}

#[tokio::test]
async fn unknown_subject_is_bad_request() {
    let models = create_models();
    let server = server(&models, None);

    let response = server
        .post("/predict")
        .add_query_param("subject", "CHEM999")
        .json(&complete_fields())
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"]["kind"], "unknown_subject");
}

#[tokio::test]
async fn unknown_category_is_bad_request() {
    let models = TempDir::new().unwrap();
    std::fs::write(
        models.path().join("WEB101_full_enhanced.json"),
        r#"{"expected_features": ["teacher_quality"], "weights": {"teacher_quality": 10.0}}"#,
    )
    .unwrap();
    let server = server(&models, None);

    let mut fields = complete_fields();
    fields["teacher_quality"] = json!("mediocre");

    let response = server
        .post("/predict")
        .add_query_param("subject", "WEB101")
        .json(&fields)
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body: Value = response.json();
    assert_eq!(body["error"]["kind"], "unknown_category_value");
}

#[tokio::test]
async fn boolean_flag_encodes_yes_no_field() {
    let models = TempDir::new().unwrap();
    std::fs::write(
        models.path().join("WEB101_full_enhanced.json"),
        r#"{"expected_features": ["extracurricular"], "intercept": 50.0, "weights": {"extracurricular": 10.0}}"#,
    )
    .unwrap();
    let server = server(&models, None);

    let mut fields = complete_fields();
    fields["subject"] = json!("WEB101");
    fields["extracurricular"] = json!(true);

    let response = server.post("/predict").json(&fields).await;
    response.assert_status_ok();

    let body: Value = response.json();
    assert_eq!(body["result"]["predicted_grade"], 60.0);
}

#[tokio::test]
async fn malformed_body_gets_error_envelope() {
    let models = create_models();
    let server = server(&models, None);

    let response = server
        .post("/predict")
        .add_query_param("subject", "WEB101")
        .json(&json!({"quiz1": [80, 90]}))
        .await;
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let body: Value = response.json();
    assert_eq!(body["status"], "error");
    assert_eq!(body["error"]["kind"], "invalid_request");
    assert!(body["error"]["message"].as_str().unwrap().contains("quiz1"));

    let response = server
        .post("/predict")
        .add_query_param("subject", "WEB101")
        .text("{ not json")
        .content_type("application/json")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["error"]["kind"], "invalid_request");
}

#[tokio::test]
async fn missing_artifact_is_not_found() {
    let empty = TempDir::new().unwrap();
    let server = server(&empty, None);

    let response = server
        .post("/predict")
        .add_query_param("subject", "MATH201")
        .json(&complete_fields())
        .await;
    response.assert_status(StatusCode::NOT_FOUND);

    let body: Value = response.json();
    assert_eq!(body["error"]["kind"], "artifact_not_found");
}

#[tokio::test]
async fn enrollment_route_only_with_records() {
    let models = create_models();

    let without = server(&models, None);
    without
        .get("/predict/E-1")
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let mut records = InMemoryRecordSource::new();
    let record: StudentRecord =
        serde_json::from_value(json!({"subject": "MATH201", "quiz1": 60, "quiz2": 70,
            "assignment1": 50, "assignment2": 50, "midterm": 65, "attendance": 80}))
        .unwrap();
    records.insert("E-1", record);
    let with = server(&models, Some(records));

    let found = with.get("/predict/E-1").await;
    found.assert_status_ok();
    let body: Value = found.json();
    assert_eq!(body["result"]["subject"], "MATH201");
    assert_eq!(body["result"]["predicted_grade"], 65.0);

    let missing = with.get("/predict/E-404").await;
    missing.assert_status(StatusCode::NOT_FOUND);
    let body: Value = missing.json();
    assert_eq!(body["error"]["kind"], "record_not_found");
}
