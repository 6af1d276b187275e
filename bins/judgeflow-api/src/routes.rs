// Route definitions for the Judgeflow API

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::{handlers, AppState};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/exercises", post(handlers::create_exercise))
        .route("/exercises/:exercise_id", get(handlers::get_exercise))
        .route("/submissions", post(handlers::judge_submission))
        .route("/submissions/async", post(handlers::queue_submission))
        .route("/submissions/:submission_id", get(handlers::get_submission))
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::export_metrics))
}
