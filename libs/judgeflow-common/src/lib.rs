pub mod config;
pub mod redis;
pub mod types;

// Re-export commonly used types for convenience
pub use config::{Config, ExecutorFleet};
pub use types::{
    ExecutionLimits, ExecutionRequest, ExecutionResult, ExecutionStatus, Exercise,
    ExecutorEndpoint, JobToken, Language, Submission, SubmissionStatus, TestCase, TestResult,
};
