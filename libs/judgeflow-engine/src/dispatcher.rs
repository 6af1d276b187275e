/// Dispatcher - ordered failover across the executor fleet
///
/// **Algorithm:**
/// 1. Walk endpoints in priority order
/// 2. Submit with a per-attempt timeout
/// 3. First endpoint that hands back a token wins; later endpoints are never contacted
/// 4. If every endpoint fails, report all per-endpoint errors
///
/// No state survives between calls; the fleet is read-only and shared.

use crate::error::{DispatchFailure, EndpointError, SandboxError};
use crate::sandbox::SandboxClient;
use judgeflow_common::{ExecutionRequest, ExecutorEndpoint, JobToken};
use std::time::Duration;
use tracing::{debug, warn};

pub async fn submit(
    client: &dyn SandboxClient,
    request: &ExecutionRequest,
    endpoints: &[ExecutorEndpoint],
    attempt_timeout: Duration,
) -> Result<JobToken, DispatchFailure> {
    let mut errors = Vec::new();

    for endpoint in endpoints {
        let outcome = tokio::time::timeout(attempt_timeout, client.submit(endpoint, request)).await;

        let error = match outcome {
            Ok(Ok(token)) => {
                debug!(endpoint = %endpoint.name, token = %token, "Execution request accepted");
                return Ok(JobToken {
                    token,
                    endpoint: endpoint.clone(),
                });
            }
            Ok(Err(e)) => e,
            Err(_) => SandboxError::Timeout(attempt_timeout),
        };

        warn!(endpoint = %endpoint.name, error = %error, "Executor endpoint failed, trying next");
        errors.push(EndpointError {
            endpoint: endpoint.clone(),
            error,
        });
    }

    Err(DispatchFailure { errors })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::RawExecutionResult;
    use async_trait::async_trait;
    use judgeflow_common::{ExecutionLimits, Language};
    use std::collections::HashMap;
    use std::sync::Mutex;

    enum Behaviour {
        Accept,
        Reject,
        Hang,
    }

    /// Per-endpoint scripted behaviour; records which endpoints were contacted
    struct ScriptedFleet {
        behaviour: HashMap<String, Behaviour>,
        contacted: Mutex<Vec<String>>,
    }

    impl ScriptedFleet {
        fn new(script: Vec<(&str, Behaviour)>) -> Self {
            Self {
                behaviour: script
                    .into_iter()
                    .map(|(name, b)| (name.to_string(), b))
                    .collect(),
                contacted: Mutex::new(Vec::new()),
            }
        }

        fn contacted(&self) -> Vec<String> {
            self.contacted.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl SandboxClient for ScriptedFleet {
        async fn submit(
            &self,
            endpoint: &ExecutorEndpoint,
            _request: &ExecutionRequest,
        ) -> Result<String, SandboxError> {
            self.contacted.lock().unwrap().push(endpoint.name.clone());
            match self.behaviour[&endpoint.name] {
                Behaviour::Accept => Ok(format!("token-from-{}", endpoint.name)),
                Behaviour::Reject => Err(SandboxError::Rejected {
                    status: 503,
                    body: "unavailable".to_string(),
                }),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    unreachable!("dispatcher timeout should fire first")
                }
            }
        }

        async fn fetch(
            &self,
            _endpoint: &ExecutorEndpoint,
            _token: &str,
        ) -> Result<RawExecutionResult, SandboxError> {
            Err(SandboxError::Malformed("not used".to_string()))
        }
    }

    fn request() -> ExecutionRequest {
        ExecutionRequest {
            source_code: "print(sum(map(int, input().split())))".to_string(),
            language: Language::Python,
            stdin: "3 4".to_string(),
            limits: ExecutionLimits::default(),
        }
    }

    fn fleet(names: &[&str]) -> Vec<ExecutorEndpoint> {
        names
            .iter()
            .map(|n| ExecutorEndpoint::new(*n, format!("http://{}", n)))
            .collect()
    }

    #[tokio::test]
    async fn test_primary_accepts_and_backups_are_untouched() {
        let client = ScriptedFleet::new(vec![
            ("a", Behaviour::Accept),
            ("b", Behaviour::Accept),
        ]);

        let token = submit(&client, &request(), &fleet(&["a", "b"]), Duration::from_secs(1))
            .await
            .unwrap();

        assert_eq!(token.token, "token-from-a");
        assert_eq!(token.endpoint.name, "a");
        assert_eq!(client.contacted(), vec!["a"]);
    }

    #[tokio::test]
    async fn test_failover_to_nth_endpoint_and_no_further() {
        let client = ScriptedFleet::new(vec![
            ("a", Behaviour::Reject),
            ("b", Behaviour::Hang),
            ("c", Behaviour::Accept),
            ("d", Behaviour::Accept),
        ]);

        let token = submit(
            &client,
            &request(),
            &fleet(&["a", "b", "c", "d"]),
            Duration::from_millis(20),
        )
        .await
        .unwrap();

        assert_eq!(token.endpoint.name, "c");
        assert_eq!(token.token, "token-from-c");
        assert_eq!(client.contacted(), vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_all_endpoints_fail() {
        let client = ScriptedFleet::new(vec![
            ("a", Behaviour::Reject),
            ("b", Behaviour::Hang),
        ]);

        let failure = submit(&client, &request(), &fleet(&["a", "b"]), Duration::from_millis(20))
            .await
            .unwrap_err();

        assert_eq!(failure.errors.len(), 2);
        assert_eq!(failure.errors[0].endpoint.name, "a");
        assert!(matches!(failure.errors[0].error, SandboxError::Rejected { status: 503, .. }));
        assert!(matches!(failure.errors[1].error, SandboxError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_empty_fleet_is_a_dispatch_failure() {
        let client = ScriptedFleet::new(vec![]);
        let failure = submit(&client, &request(), &[], Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(failure.errors.is_empty());
    }
}
