use crate::types::ExecutorEndpoint;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

/// Application configuration
/// Provides defaults with environment variable overrides
#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,
    pub submit_timeout_ms: u64,
    pub poll_max_attempts: u32,
    pub poll_interval_ms: u64,
    pub inter_test_delay_ms: u64,
    pub short_circuit_compile_errors: bool,
    pub port: u16,
    pub endpoints_config_path: String,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            submit_timeout_ms: env_or("SUBMIT_TIMEOUT_MS", 10_000),
            poll_max_attempts: env_or("POLL_MAX_ATTEMPTS", 30),
            poll_interval_ms: env_or("POLL_INTERVAL_MS", 500),
            inter_test_delay_ms: env_or("INTER_TEST_DELAY_MS", 200),
            short_circuit_compile_errors: env_or("SHORT_CIRCUIT_COMPILE_ERRORS", false),
            port: env_or("PORT", 3000),
            endpoints_config_path: env::var("ENDPOINTS_CONFIG_PATH")
                .unwrap_or_else(|_| "config/endpoints.json".to_string()),
        }
    }

    /// Upper bound on how long one submission may stay in Judging
    pub fn abandonment_threshold_ms(&self, total_tests: usize) -> u64 {
        let per_test = self.submit_timeout_ms
            + u64::from(self.poll_max_attempts) * self.poll_interval_ms
            + self.inter_test_delay_ms;
        per_test * total_tests as u64
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct EndpointsJson {
    endpoints: Vec<ExecutorEndpoint>,
}

/// Ordered, read-only list of sandbox executors
/// Primary first; shared by every concurrently judged submission
#[derive(Debug, Clone)]
pub struct ExecutorFleet {
    endpoints: Vec<ExecutorEndpoint>,
}

impl ExecutorFleet {
    pub fn new(endpoints: Vec<ExecutorEndpoint>) -> Result<Self> {
        if endpoints.is_empty() {
            bail!("Executor fleet must contain at least one endpoint");
        }
        Ok(Self { endpoints })
    }

    /// Load the fleet from endpoints.json
    pub fn load(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            bail!("Endpoint config file not found: {}", config_path.display());
        }

        let content = fs::read_to_string(config_path)
            .context("Failed to read endpoints.json")?;

        let parsed: EndpointsJson = serde_json::from_str(&content)
            .context("Failed to parse endpoints.json")?;

        Self::new(parsed.endpoints)
    }

    /// Comma-separated URL list, e.g. `http://judge-a:2358,http://judge-b:2358`
    pub fn from_url_list(list: &str) -> Result<Self> {
        let endpoints = list
            .split(',')
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .enumerate()
            .map(|(idx, url)| ExecutorEndpoint::new(format!("executor-{}", idx + 1), url))
            .collect();
        Self::new(endpoints)
    }

    /// endpoints.json when present, otherwise the JUDGE_ENDPOINTS variable
    pub fn from_config(config: &Config) -> Result<Self> {
        let path = Path::new(&config.endpoints_config_path);
        if path.exists() {
            return Self::load(path);
        }

        let list = env::var("JUDGE_ENDPOINTS").with_context(|| {
            format!(
                "No endpoint config at {} and JUDGE_ENDPOINTS is not set",
                path.display()
            )
        })?;
        Self::from_url_list(&list)
    }

    pub fn endpoints(&self) -> &[ExecutorEndpoint] {
        &self.endpoints
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}
