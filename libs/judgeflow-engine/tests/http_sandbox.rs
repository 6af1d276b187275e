//! HttpSandboxClient against an in-process Judge0-style sandbox.

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::{engine::general_purpose, Engine as _};
use judgeflow_common::{
    ExecutionLimits, ExecutionRequest, ExecutionStatus, ExecutorEndpoint, ExecutorFleet, Language,
    SubmissionStatus, TestCase,
};
use judgeflow_engine::{
    DocumentStore, HttpSandboxClient, JudgeService, JudgeSettings, MemoryStore, PollSettings,
    SandboxClient, SandboxError,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct Sandbox {
    /// token -> decoded stdin
    jobs: Mutex<HashMap<String, String>>,
    auth_headers: Mutex<Vec<Option<String>>>,
    queries: Mutex<Vec<HashMap<String, String>>>,
}

async fn create_submission(
    State(sandbox): State<Arc<Sandbox>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    sandbox.auth_headers.lock().unwrap().push(
        headers
            .get("X-Auth-Token")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    );
    sandbox.queries.lock().unwrap().push(query);

    let stdin = body["stdin"]
        .as_str()
        .and_then(|s| general_purpose::STANDARD.decode(s).ok())
        .map(|b| String::from_utf8_lossy(&b).into_owned())
        .unwrap_or_default();

    let mut jobs = sandbox.jobs.lock().unwrap();
    let token = format!("tok-{}", jobs.len());
    jobs.insert(token.clone(), stdin);
    (StatusCode::CREATED, Json(json!({ "token": token })))
}

/// Sums the integers on stdin; reports time as a string like some deployments do
async fn get_submission(
    State(sandbox): State<Arc<Sandbox>>,
    Path(token): Path<String>,
) -> Result<Json<Value>, StatusCode> {
    let jobs = sandbox.jobs.lock().unwrap();
    let stdin = jobs.get(&token).ok_or(StatusCode::NOT_FOUND)?;
    let sum: i64 = stdin
        .split_whitespace()
        .filter_map(|n| n.parse::<i64>().ok())
        .sum();

    Ok(Json(json!({
        "status": { "id": 3, "description": "Accepted" },
        "stdout": general_purpose::STANDARD.encode(format!("{}\n", sum)),
        "stderr": null,
        "compile_output": null,
        "message": null,
        "time": "0.004",
        "memory": 2048
    })))
}

async fn spawn_sandbox(sandbox: Arc<Sandbox>) -> String {
    let app = Router::new()
        .route("/submissions", post(create_submission))
        .route("/submissions/:token", get(get_submission))
        .with_state(sandbox);
    spawn(app).await
}

async fn spawn_unavailable() -> String {
    let app = Router::new().route(
        "/submissions",
        post(|| async { (StatusCode::SERVICE_UNAVAILABLE, "queue full") }),
    );
    spawn(app).await
}

async fn spawn(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn request(stdin: &str) -> ExecutionRequest {
    ExecutionRequest {
        source_code: "print(sum(map(int, input().split())))".to_string(),
        language: Language::Python,
        stdin: stdin.to_string(),
        limits: ExecutionLimits::default(),
    }
}

#[tokio::test]
async fn test_submit_and_fetch_round_trip() {
    let sandbox = Arc::new(Sandbox::default());
    let url = spawn_sandbox(sandbox.clone()).await;
    let endpoint = ExecutorEndpoint {
        auth_token: Some("s3cret".to_string()),
        ..ExecutorEndpoint::new("local", format!("{}/", url))
    };
    let client = HttpSandboxClient::new(Duration::from_secs(5)).unwrap();

    let token = client.submit(&endpoint, &request("20 22")).await.unwrap();
    assert_eq!(token, "tok-0");

    let result = client.fetch(&endpoint, &token).await.unwrap();
    assert!(result.is_terminal());
    let decoded = result.decode();
    assert_eq!(decoded.stdout, "42\n");
    assert_eq!(decoded.time_secs, 0.004);
    assert_eq!(decoded.memory_kb, 2048);

    assert_eq!(
        sandbox.auth_headers.lock().unwrap().as_slice(),
        &[Some("s3cret".to_string())]
    );
    let queries = sandbox.queries.lock().unwrap();
    assert_eq!(queries[0].get("base64_encoded").map(String::as_str), Some("true"));
    assert_eq!(queries[0].get("wait").map(String::as_str), Some("false"));
}

#[tokio::test]
async fn test_unknown_token_is_rejected() {
    let url = spawn_sandbox(Arc::new(Sandbox::default())).await;
    let endpoint = ExecutorEndpoint::new("local", url);
    let client = HttpSandboxClient::new(Duration::from_secs(5)).unwrap();

    let err = client.fetch(&endpoint, "missing").await.unwrap_err();
    assert!(matches!(err, SandboxError::Rejected { status: 404, .. }), "{:?}", err);
}

#[tokio::test]
async fn test_unavailable_endpoint_surfaces_status_and_body() {
    let url = spawn_unavailable().await;
    let endpoint = ExecutorEndpoint::new("busy", url);
    let client = HttpSandboxClient::new(Duration::from_secs(5)).unwrap();

    match client.submit(&endpoint, &request("1 1")).await {
        Err(SandboxError::Rejected { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "queue full");
        }
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_judging_fails_over_to_healthy_http_endpoint() {
    let busy = spawn_unavailable().await;
    let sandbox = Arc::new(Sandbox::default());
    let healthy = spawn_sandbox(sandbox.clone()).await;

    let fleet = ExecutorFleet::new(vec![
        ExecutorEndpoint::new("busy", busy),
        ExecutorEndpoint::new("healthy", healthy),
    ])
    .unwrap();
    let store = Arc::new(MemoryStore::new());
    let settings = JudgeSettings {
        submit_timeout: Duration::from_secs(5),
        poll: PollSettings {
            max_attempts: 5,
            interval: Duration::from_millis(5),
        },
        inter_test_delay: Duration::from_millis(1),
        short_circuit_compile_errors: false,
    };
    let service = JudgeService::new(
        store.clone(),
        Arc::new(HttpSandboxClient::new(Duration::from_secs(5)).unwrap()),
        Arc::new(fleet),
        settings,
    );

    let exercise = service
        .register_exercise(
            "Sum".to_string(),
            vec![
                TestCase {
                    input: "3 4".to_string(),
                    expected_output: "7".to_string(),
                    hidden: false,
                    points: 2,
                },
                TestCase {
                    input: "-5 5".to_string(),
                    expected_output: "0".to_string(),
                    hidden: true,
                    points: 3,
                },
            ],
            ExecutionLimits::default(),
            vec![Language::Python],
        )
        .await
        .unwrap();

    let id = service
        .judge(&exercise.id, "student-7", "python", "print(sum(map(int, input().split())))")
        .await
        .unwrap();
    let submission = store.get_submission(&id).await.unwrap().unwrap();

    assert_eq!(submission.status, SubmissionStatus::Accepted);
    assert_eq!(submission.score, 5);
    assert!(submission
        .test_results
        .iter()
        .all(|r| r.status == ExecutionStatus::Accepted && r.execution_time_ms == 4));
    assert_eq!(sandbox.jobs.lock().unwrap().len(), 2);
}
