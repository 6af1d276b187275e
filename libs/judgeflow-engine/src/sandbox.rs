/// Sandbox Wire Contract - how we talk to one executor endpoint
///
/// **Contract (Judge0-compatible):**
/// - `POST {url}/submissions?base64_encoded=true&wait=false` → `{ "token": ... }`
/// - `GET {url}/submissions/{token}?base64_encoded=true` → status + encoded outputs
///
/// Text fields travel as standard base64 in both directions.
/// The client knows nothing about failover, polling cadence or scoring;
/// those live in the dispatcher, poller and evaluator.

use crate::error::SandboxError;
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use judgeflow_common::{ExecutionRequest, ExecutionResult, ExecutorEndpoint};
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use tracing::warn;

const AUTH_HEADER: &str = "X-Auth-Token";
const RESULT_FIELDS: &str = "status,stdout,stderr,compile_output,message,time,memory";

/// Outbound calls to a sandbox endpoint
///
/// Implementations must be stateless with respect to endpoints: the same
/// client is shared by every concurrently judged submission.
#[async_trait]
pub trait SandboxClient: Send + Sync {
    /// Submit one execution request, returning the endpoint-issued token
    async fn submit(
        &self,
        endpoint: &ExecutorEndpoint,
        request: &ExecutionRequest,
    ) -> Result<String, SandboxError>;

    /// Query the current state of a token on its issuing endpoint
    async fn fetch(
        &self,
        endpoint: &ExecutorEndpoint,
        token: &str,
    ) -> Result<RawExecutionResult, SandboxError>;
}

#[derive(Debug, Serialize)]
struct SubmitBody {
    source_code: String,
    language_id: u32,
    stdin: String,
    cpu_time_limit: f64,
    memory_limit: u64,
}

impl SubmitBody {
    fn encode(request: &ExecutionRequest) -> Self {
        Self {
            source_code: general_purpose::STANDARD.encode(&request.source_code),
            language_id: request.language.runtime_id(),
            stdin: general_purpose::STANDARD.encode(&request.stdin),
            cpu_time_limit: request.limits.cpu_time_limit_secs,
            memory_limit: request.limits.memory_limit_kb,
        }
    }
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    token: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawStatus {
    pub id: u32,
    #[serde(default)]
    pub description: String,
}

/// Result document exactly as the endpoint returns it (outputs still encoded)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawExecutionResult {
    pub status: RawStatus,
    #[serde(default)]
    pub stdout: Option<String>,
    #[serde(default)]
    pub stderr: Option<String>,
    #[serde(default)]
    pub compile_output: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// Elapsed CPU seconds; some deployments send it as a string
    #[serde(default, deserialize_with = "deserialize_seconds")]
    pub time: f64,
    /// Peak memory in KB
    #[serde(default)]
    pub memory: Option<u64>,
}

fn deserialize_seconds<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Seconds {
        Number(f64),
        Text(String),
    }

    match Option::<Seconds>::deserialize(deserializer)? {
        None => Ok(0.0),
        Some(Seconds::Number(n)) => Ok(n),
        Some(Seconds::Text(s)) if s.trim().is_empty() => Ok(0.0),
        Some(Seconds::Text(s)) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Decode one transport-encoded field
///
/// Encoders commonly wrap base64 at 60/76 columns, so whitespace is
/// stripped first. Undecodable payloads are kept verbatim.
pub fn decode_field(field: &str, encoded: Option<&str>) -> String {
    let Some(encoded) = encoded else {
        return String::new();
    };

    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    match general_purpose::STANDARD.decode(compact.as_bytes()) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            warn!(field = field, error = %e, "Output is not valid base64, keeping raw text");
            encoded.to_string()
        }
    }
}

impl RawExecutionResult {
    pub fn is_terminal(&self) -> bool {
        crate::status::is_terminal(self.status.id)
    }

    pub fn decode(self) -> ExecutionResult {
        ExecutionResult {
            status_code: self.status.id,
            status_description: self.status.description,
            stdout: decode_field("stdout", self.stdout.as_deref()),
            stderr: decode_field("stderr", self.stderr.as_deref()),
            compile_output: decode_field("compile_output", self.compile_output.as_deref()),
            message: decode_field("message", self.message.as_deref()),
            time_secs: self.time,
            memory_kb: self.memory.unwrap_or(0),
        }
    }
}

/// reqwest-backed client used against real executor fleets
#[derive(Debug, Clone)]
pub struct HttpSandboxClient {
    client: reqwest::Client,
}

impl HttpSandboxClient {
    pub fn new(request_timeout: Duration) -> Result<Self, SandboxError> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("judgeflow/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    fn base_url(endpoint: &ExecutorEndpoint) -> &str {
        endpoint.url.trim_end_matches('/')
    }

    fn authorize(
        builder: reqwest::RequestBuilder,
        endpoint: &ExecutorEndpoint,
    ) -> reqwest::RequestBuilder {
        match &endpoint.auth_token {
            Some(token) => builder.header(AUTH_HEADER, token),
            None => builder,
        }
    }

    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, SandboxError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(SandboxError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl SandboxClient for HttpSandboxClient {
    async fn submit(
        &self,
        endpoint: &ExecutorEndpoint,
        request: &ExecutionRequest,
    ) -> Result<String, SandboxError> {
        let url = format!(
            "{}/submissions?base64_encoded=true&wait=false",
            Self::base_url(endpoint)
        );
        let builder = self.client.post(url).json(&SubmitBody::encode(request));
        let response = Self::authorize(builder, endpoint).send().await?;
        let response = Self::ensure_success(response).await?;

        let body: SubmitResponse = response
            .json()
            .await
            .map_err(|e| SandboxError::Malformed(e.to_string()))?;

        if body.token.trim().is_empty() {
            return Err(SandboxError::Malformed("empty token".to_string()));
        }
        Ok(body.token)
    }

    async fn fetch(
        &self,
        endpoint: &ExecutorEndpoint,
        token: &str,
    ) -> Result<RawExecutionResult, SandboxError> {
        let url = format!(
            "{}/submissions/{}?base64_encoded=true&fields={}",
            Self::base_url(endpoint),
            token,
            RESULT_FIELDS
        );
        let response = Self::authorize(self.client.get(url), endpoint).send().await?;
        let response = Self::ensure_success(response).await?;

        response
            .json()
            .await
            .map_err(|e| SandboxError::Malformed(e.to_string()))
    }
}
