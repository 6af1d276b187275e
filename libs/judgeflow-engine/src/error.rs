use judgeflow_common::{ExecutorEndpoint, SubmissionStatus};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Rejected before any dispatch; no submission is created
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("unknown language: {0}")]
    UnknownLanguage(String),

    #[error("language {0} is not allowed for this exercise")]
    LanguageNotAllowed(String),

    #[error("exercise has no test cases")]
    EmptyTestCases,

    #[error("malformed limits: {0}")]
    InvalidLimits(String),

    #[error("source code is empty")]
    EmptySource,
}

impl ValidationError {
    /// Short label used for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::UnknownLanguage(_) => "unknown_language",
            ValidationError::LanguageNotAllowed(_) => "language_not_allowed",
            ValidationError::EmptyTestCases => "empty_test_cases",
            ValidationError::InvalidLimits(_) => "invalid_limits",
            ValidationError::EmptySource => "empty_source",
        }
    }
}

/// One failed exchange with a sandbox endpoint
#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("endpoint answered {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// Error recorded for one endpoint during a dispatch
#[derive(Debug)]
pub struct EndpointError {
    pub endpoint: ExecutorEndpoint,
    pub error: SandboxError,
}

impl fmt::Display for EndpointError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.endpoint.name, self.error)
    }
}

/// Every endpoint of the fleet refused or failed the submit call
#[derive(Debug, Error)]
#[error("all {} executor endpoints failed: {}", .errors.len(), join_errors(.errors))]
pub struct DispatchFailure {
    pub errors: Vec<EndpointError>,
}

fn join_errors(errors: &[EndpointError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// No terminal result observed within the attempt budget
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("no terminal result for token {token} from {endpoint} after {attempts} polls")]
pub struct PollTimeout {
    pub token: String,
    pub endpoint: String,
    pub attempts: u32,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("submission {0} not found")]
    SubmissionNotFound(Uuid),

    #[error("invalid transition for submission {id}: {from} -> {to}")]
    InvalidTransition {
        id: Uuid,
        from: SubmissionStatus,
        to: SubmissionStatus,
    },
}

/// Errors surfaced by the inbound judging service
#[derive(Debug, Error)]
pub enum JudgeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("exercise {0} not found")]
    ExerciseNotFound(Uuid),

    #[error(transparent)]
    Store(#[from] StoreError),
}
