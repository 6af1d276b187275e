//! Sandbox status codes and their domain classification.
//!
//! The fleet speaks numeric status ids; everything downstream works with
//! `ExecutionStatus`. Sandbox-specific runtime error flavours (signals,
//! non-zero exit) collapse into `RuntimeError`.

use judgeflow_common::ExecutionStatus;
use tracing::warn;

pub const IN_QUEUE: u32 = 1;
pub const PROCESSING: u32 = 2;
pub const ACCEPTED: u32 = 3;
pub const WRONG_ANSWER: u32 = 4;
pub const TIME_LIMIT_EXCEEDED: u32 = 5;
pub const COMPILATION_ERROR: u32 = 6;
pub const RUNTIME_ERROR_SIGSEGV: u32 = 7;
pub const RUNTIME_ERROR_OTHER: u32 = 12;
pub const INTERNAL_ERROR: u32 = 13;
pub const EXEC_FORMAT_ERROR: u32 = 14;

/// A result is terminal once it is past queued/processing
pub fn is_terminal(status_code: u32) -> bool {
    !matches!(status_code, IN_QUEUE | PROCESSING)
}

pub fn classify(status_code: u32) -> ExecutionStatus {
    match status_code {
        ACCEPTED => ExecutionStatus::Accepted,
        WRONG_ANSWER => ExecutionStatus::WrongAnswer,
        TIME_LIMIT_EXCEEDED => ExecutionStatus::TimeLimitExceeded,
        COMPILATION_ERROR => ExecutionStatus::CompilationError,
        RUNTIME_ERROR_SIGSEGV..=RUNTIME_ERROR_OTHER => ExecutionStatus::RuntimeError,
        INTERNAL_ERROR | EXEC_FORMAT_ERROR => ExecutionStatus::InternalError,
        unknown => {
            warn!(status_code = unknown, "Unrecognized sandbox status code, classifying as runtime error");
            ExecutionStatus::RuntimeError
        }
    }
}
