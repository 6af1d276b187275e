mod handlers;
mod metrics;
mod routes;

use anyhow::Context;
use axum::Router;
use judgeflow_common::{Config, ExecutorFleet};
use judgeflow_engine::{HttpSandboxClient, JudgeService, JudgeSettings, RedisStore};
use redis::aio::ConnectionManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

pub struct AppState {
    pub service: JudgeService,
    pub config: Config,
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
        .init();

    info!("Judgeflow API booting...");

    let config = Config::from_env();
    metrics::init_metrics().context("Failed to register metrics")?;

    let fleet = ExecutorFleet::from_config(&config)?;
    for (priority, endpoint) in fleet.endpoints().iter().enumerate() {
        info!(priority = priority, endpoint = %endpoint, "Executor endpoint configured");
    }

    // Connect to Redis
    let client = redis::Client::open(config.redis_url.as_str())
        .context("Failed to create Redis client")?;
    let redis_conn = ConnectionManager::new(client)
        .await
        .context("Failed to connect to Redis")?;
    info!("Connected to Redis: {}", config.redis_url);

    let sandbox = HttpSandboxClient::new(Duration::from_millis(config.submit_timeout_ms))?;
    let service = JudgeService::new(
        Arc::new(RedisStore::new(redis_conn)),
        Arc::new(sandbox),
        Arc::new(fleet),
        JudgeSettings::from(&config),
    );

    let addr = format!("0.0.0.0:{}", config.port);
    let state = Arc::new(AppState { service, config });

    let app = Router::new().merge(routes::routes()).with_state(state);

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
