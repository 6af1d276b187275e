// HTTP route handlers for the Judgeflow API

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::Utc;
use judgeflow_common::{ExecutionLimits, Language, Submission, SubmissionStatus, TestCase};
use judgeflow_engine::{JudgeError, StoreError, ValidationError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{metrics, AppState};

pub enum ApiError {
    InvalidId(String),
    Judge(JudgeError),
}

impl From<JudgeError> for ApiError {
    fn from(e: JudgeError) -> Self {
        ApiError::Judge(e)
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::Judge(JudgeError::Validation(e))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InvalidId(raw) => (StatusCode::BAD_REQUEST, format!("Invalid ID format: {}", raw)),
            ApiError::Judge(JudgeError::Validation(e)) => {
                metrics::record_rejected(e.reason());
                warn!(reason = e.reason(), error = %e, "Request rejected");
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            ApiError::Judge(e @ JudgeError::ExerciseNotFound(_))
            | ApiError::Judge(e @ JudgeError::Store(StoreError::SubmissionNotFound(_))) => {
                (StatusCode::NOT_FOUND, e.to_string())
            }
            ApiError::Judge(e) => {
                error!(error = %e, "Request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::InvalidId(raw.to_string()))
}

#[derive(Debug, Deserialize)]
pub struct CreateExerciseRequest {
    pub title: String,
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub limits: ExecutionLimits,
    #[serde(default)]
    pub allowed_languages: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateExerciseResponse {
    pub exercise_id: Uuid,
    pub max_score: u32,
}

/// POST /exercises - Register an exercise and its test bank
pub async fn create_exercise(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateExerciseRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let allowed_languages = payload
        .allowed_languages
        .iter()
        .map(|name| Language::from_str(name).ok_or_else(|| ValidationError::UnknownLanguage(name.clone())))
        .collect::<Result<Vec<_>, _>>()?;

    let exercise = state
        .service
        .register_exercise(payload.title, payload.test_cases, payload.limits, allowed_languages)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateExerciseResponse {
            exercise_id: exercise.id,
            max_score: exercise.max_score(),
        }),
    ))
}

/// GET /exercises/{exercise_id} - Exercise as shown to students
pub async fn get_exercise(
    State(state): State<Arc<AppState>>,
    Path(exercise_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let exercise_id = parse_id(&exercise_id)?;
    let exercise = state.service.exercise(&exercise_id).await?;
    Ok(Json(exercise.redacted()))
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub exercise_id: Uuid,
    pub student_id: String,
    pub language: String,
    pub source_code: String,
}

#[derive(Debug, Serialize)]
pub struct JudgeResponse {
    pub submission_id: Uuid,
    pub status: SubmissionStatus,
    pub score: u32,
    pub max_score: u32,
}

/// POST /submissions - Judge synchronously and return the verdict
pub async fn judge_submission(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SubmitRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let start = Instant::now();
    let submission_id = state
        .service
        .judge(
            &payload.exercise_id,
            &payload.student_id,
            &payload.language,
            &payload.source_code,
        )
        .await?;
    let submission = state.service.submission(&submission_id).await?;

    metrics::record_judged(
        &submission.language.to_string(),
        &submission.status.to_string(),
        start.elapsed().as_secs_f64() * 1000.0,
    );
    info!(
        submission_id = %submission_id,
        status = %submission.status,
        score = submission.score,
        max_score = submission.max_score,
        "Submission judged"
    );

    Ok((
        StatusCode::CREATED,
        Json(JudgeResponse {
            submission_id,
            status: submission.status,
            score: submission.score,
            max_score: submission.max_score,
        }),
    ))
}

/// POST /submissions/async - Validate and hand to the worker queue
pub async fn queue_submission(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SubmitRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let submission_id = state
        .service
        .enqueue(
            &payload.exercise_id,
            &payload.student_id,
            &payload.language,
            &payload.source_code,
        )
        .await?;

    if let Some(language) = Language::from_str(&payload.language) {
        metrics::record_queued(&language.to_string());
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "submission_id": submission_id,
            "status": SubmissionStatus::Pending,
        })),
    ))
}

#[derive(Debug, Serialize)]
pub struct SubmissionView {
    #[serde(flatten)]
    pub submission: Submission,
    pub acceptance_rate: f64,
    /// Still judging well past the longest possible pass
    pub abandoned: bool,
}

/// GET /submissions/{submission_id} - Graded submission, hidden tests redacted
pub async fn get_submission(
    State(state): State<Arc<AppState>>,
    Path(submission_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let submission_id = parse_id(&submission_id)?;
    let submission = state.service.submission(&submission_id).await?;

    let abandoned = submission.status == SubmissionStatus::Judging && {
        let age_ms = (Utc::now() - submission.created_at).num_milliseconds().max(0) as u64;
        age_ms > state.config.abandonment_threshold_ms(submission.total_tests)
    };

    Ok(Json(SubmissionView {
        acceptance_rate: submission.acceptance_rate(),
        abandoned,
        submission: submission.redacted(),
    }))
}

/// GET /health - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics - Prometheus text exposition
pub async fn export_metrics() -> Response {
    match metrics::render_metrics() {
        Ok(body) => (StatusCode::OK, body).into_response(),
        Err(e) => {
            error!(error = %e, "Failed to render metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
