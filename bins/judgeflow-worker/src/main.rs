use anyhow::Context;
use async_trait::async_trait;
use judgeflow_common::{redis, Config, ExecutorFleet};
use judgeflow_engine::{HttpSandboxClient, JudgeService, JudgeSettings, RedisStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Source of submission ids awaiting judgement
#[async_trait]
trait SubmissionQueue: Send {
    /// Blocks up to `timeout_seconds`; `None` when nothing arrived
    async fn pop(&mut self, timeout_seconds: f64) -> anyhow::Result<Option<Uuid>>;
}

#[async_trait]
impl SubmissionQueue for ::redis::aio::ConnectionManager {
    async fn pop(&mut self, timeout_seconds: f64) -> anyhow::Result<Option<Uuid>> {
        Ok(redis::pop_submission(self, timeout_seconds).await?)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .init();

    info!("Judgeflow Worker booting...");

    let config = Config::from_env();
    let fleet = ExecutorFleet::from_config(&config).map_err(|e| {
        error!("Failed to load executor endpoints: {}", e);
        error!("Set JUDGE_ENDPOINTS or provide {}", config.endpoints_config_path);
        e
    })?;
    info!(endpoints = fleet.len(), "Executor fleet loaded");

    // Connect to Redis
    let client = ::redis::Client::open(config.redis_url.as_str())?;
    let mut redis_conn = ::redis::aio::ConnectionManager::new(client)
        .await
        .context("Failed to connect to Redis")?;
    info!("Connected to Redis: {}", config.redis_url);

    let sandbox = HttpSandboxClient::new(Duration::from_millis(config.submit_timeout_ms))?;
    let service = JudgeService::new(
        Arc::new(RedisStore::new(redis_conn.clone())),
        Arc::new(sandbox),
        Arc::new(fleet),
        JudgeSettings::from(&config),
    );

    // Setup graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match signal::ctrl_c().await {
            Ok(()) => {
                warn!("Received shutdown signal, finishing in-flight submissions...");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => error!(error = %e, "Failed to listen for shutdown signal"),
        }
    });

    let judged = worker_loop(&mut redis_conn, &service, shutdown_rx).await;

    info!(judged = judged, "Worker shutdown complete");
    Ok(())
}

/// Pop and judge until shutdown is signalled, then drain in-flight judging
///
/// Submissions already moved to Judging always reach a terminal status
/// before this returns. Returns the number of submissions finished.
#[instrument(skip_all)]
async fn worker_loop<Q: SubmissionQueue>(
    queue: &mut Q,
    service: &JudgeService,
    shutdown: watch::Receiver<bool>,
) -> usize {
    let mut in_flight = JoinSet::new();
    let mut judged = 0;

    while !*shutdown.borrow() {
        // BLPOP with 5 second timeout for graceful shutdown
        match queue.pop(5.0).await {
            Ok(Some(submission_id)) => {
                info!(submission_id = %submission_id, "Received submission");
                let service = service.clone();
                in_flight.spawn(async move { judge_one(service, submission_id).await });
            }
            Ok(None) => {}
            Err(e) => {
                error!(error = %e, "Redis error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
        }

        while let Some(finished) = in_flight.try_join_next() {
            judged += count_finished(finished);
        }
    }

    if !in_flight.is_empty() {
        info!(in_flight = in_flight.len(), "Waiting for in-flight submissions");
    }
    while let Some(finished) = in_flight.join_next().await {
        judged += count_finished(finished);
    }
    judged
}

async fn judge_one(service: JudgeService, submission_id: Uuid) {
    match service.supervise(submission_id).await {
        Ok(submission) => info!(
            submission_id = %submission_id,
            status = %submission.status,
            score = submission.score,
            max_score = submission.max_score,
            "Submission judged"
        ),
        Err(e) => error!(submission_id = %submission_id, error = %e, "Judging failed"),
    }
}

fn count_finished(finished: Result<(), tokio::task::JoinError>) -> usize {
    match finished {
        Ok(()) => 1,
        Err(e) => {
            error!(error = %e, "Judging task lost");
            0
        }
    }
}
