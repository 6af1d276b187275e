/// Poller - wait for a job token to reach a terminal state
///
/// Each attempt sleeps `interval` and then queries the token's issuing
/// endpoint. Transport errors are logged and the loop keeps going; only an
/// exhausted attempt budget yields `PollTimeout`. This is the one place a
/// judging task suspends for a long time, so it must stay on the async
/// runtime and never block a worker thread.

use crate::error::PollTimeout;
use crate::sandbox::SandboxClient;
use judgeflow_common::{ExecutionResult, JobToken};
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval: Duration::from_millis(500),
        }
    }
}

pub async fn await_result(
    client: &dyn SandboxClient,
    job: &JobToken,
    settings: PollSettings,
) -> Result<ExecutionResult, PollTimeout> {
    for attempt in 1..=settings.max_attempts {
        tokio::time::sleep(settings.interval).await;

        match client.fetch(&job.endpoint, &job.token).await {
            Ok(raw) if raw.is_terminal() => {
                debug!(
                    token = %job.token,
                    endpoint = %job.endpoint.name,
                    attempt = attempt,
                    status_code = raw.status.id,
                    "Terminal result received"
                );
                return Ok(raw.decode());
            }
            Ok(raw) => {
                debug!(
                    token = %job.token,
                    attempt = attempt,
                    status = %raw.status.description,
                    "Execution still in progress"
                );
            }
            Err(e) => {
                warn!(
                    token = %job.token,
                    endpoint = %job.endpoint.name,
                    attempt = attempt,
                    error = %e,
                    "Poll failed, will retry"
                );
            }
        }
    }

    Err(PollTimeout {
        token: job.token.clone(),
        endpoint: job.endpoint.name.clone(),
        attempts: settings.max_attempts,
    })
}
