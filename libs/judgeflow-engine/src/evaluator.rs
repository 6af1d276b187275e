/// Test Evaluator - Language-Agnostic Scoring Logic
///
/// **Core Responsibility:**
/// Classify one decoded sandbox result against one test case.
///
/// **Critical Properties:**
/// - Knows nothing about HTTP, endpoints or polling
/// - Performs no I/O, never retries
/// - Pure function: (test case, execution result) → test result
///
/// **Rules, in priority order:**
/// 1. Compilation error → 0 points, actual output = compiler output
/// 2. Runtime error / time limit → 0 points, actual output = stderr, else stdout
/// 3. Ran to completion → trimmed stdout must equal trimmed expected output
///
/// **Normalization Rules:**
/// - Trim leading and trailing whitespace: YES
/// - Case sensitivity: YES (exact match required)
/// - Anything else: NO

use crate::status::classify;
use judgeflow_common::{ExecutionResult, ExecutionStatus, TestCase, TestResult};
use tracing::warn;

fn normalize_output(output: &str) -> &str {
    output.trim()
}

fn secs_to_ms(secs: f64) -> u64 {
    if secs.is_finite() && secs > 0.0 {
        (secs * 1000.0).round() as u64
    } else {
        0
    }
}

fn kb_to_mb(kb: u64) -> f64 {
    kb as f64 / 1024.0
}

fn non_empty(text: &str) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub fn evaluate(index: usize, test_case: &TestCase, result: &ExecutionResult) -> TestResult {
    let classified = classify(result.status_code);

    let (status, actual_output, error) = match classified {
        ExecutionStatus::CompilationError => (
            ExecutionStatus::CompilationError,
            result.compile_output.clone(),
            non_empty(&result.compile_output),
        ),
        ExecutionStatus::RuntimeError
        | ExecutionStatus::TimeLimitExceeded
        | ExecutionStatus::InternalError => {
            let status = if classified == ExecutionStatus::InternalError {
                warn!(
                    test_index = index,
                    status_code = result.status_code,
                    description = %result.status_description,
                    "Sandbox reported an internal error, scoring as runtime error"
                );
                ExecutionStatus::RuntimeError
            } else {
                classified
            };
            let actual = if result.stderr.is_empty() {
                result.stdout.clone()
            } else {
                result.stderr.clone()
            };
            let error = non_empty(&result.message).or_else(|| non_empty(&result.status_description));
            (status, actual, error)
        }
        ExecutionStatus::Accepted | ExecutionStatus::WrongAnswer => {
            let status = if normalize_output(&result.stdout) == normalize_output(&test_case.expected_output) {
                ExecutionStatus::Accepted
            } else {
                ExecutionStatus::WrongAnswer
            };
            (status, result.stdout.clone(), None)
        }
    };

    let points = if status == ExecutionStatus::Accepted {
        test_case.points
    } else {
        0
    };

    TestResult {
        index,
        status,
        hidden: test_case.hidden,
        input: test_case.input.clone(),
        expected_output: test_case.expected_output.clone(),
        actual_output,
        execution_time_ms: secs_to_ms(result.time_secs),
        memory_mb: kb_to_mb(result.memory_kb),
        error,
        points,
    }
}
