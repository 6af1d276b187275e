/// Aggregator - drive every test case of one submission to a graded result
///
/// **Architecture:**
/// 1. Dispatcher places the run on the first healthy endpoint (dispatcher.rs)
/// 2. Poller waits for the terminal result (poller.rs)
/// 3. Evaluator scores it (evaluator.rs)
/// 4. Running totals and the overall status are accumulated here
///
/// Test cases run strictly sequentially, in exercise order, with a fixed
/// pause between them to keep the shared fleet from being flooded.
/// Dispatch and poll failures degrade a single test case, never the pass.

use crate::dispatcher;
use crate::evaluator;
use crate::poller::{self, PollSettings};
use crate::sandbox::SandboxClient;
use judgeflow_common::{
    Config, ExecutionRequest, ExecutionStatus, Exercise, ExecutorFleet, Submission,
    SubmissionStatus, TestCase, TestResult,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Timing and policy knobs for one judging pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JudgeSettings {
    pub submit_timeout: Duration,
    pub poll: PollSettings,
    pub inter_test_delay: Duration,
    /// Stop dispatching once one test case failed to compile
    pub short_circuit_compile_errors: bool,
}

impl Default for JudgeSettings {
    fn default() -> Self {
        Self {
            submit_timeout: Duration::from_secs(10),
            poll: PollSettings::default(),
            inter_test_delay: Duration::from_millis(200),
            short_circuit_compile_errors: false,
        }
    }
}

impl From<&Config> for JudgeSettings {
    fn from(config: &Config) -> Self {
        Self {
            submit_timeout: Duration::from_millis(config.submit_timeout_ms),
            poll: PollSettings {
                max_attempts: config.poll_max_attempts,
                interval: Duration::from_millis(config.poll_interval_ms),
            },
            inter_test_delay: Duration::from_millis(config.inter_test_delay_ms),
            short_circuit_compile_errors: config.short_circuit_compile_errors,
        }
    }
}

/// Overall status from the ordered test results
///
/// - every test accepted → Accepted
/// - some accepted → Partial
/// - none accepted → status of the first failing test
pub fn overall_status(results: &[TestResult]) -> SubmissionStatus {
    let passed = results
        .iter()
        .filter(|r| r.status == ExecutionStatus::Accepted)
        .count();

    if passed == results.len() {
        SubmissionStatus::Accepted
    } else if passed > 0 {
        SubmissionStatus::Partial
    } else {
        results
            .iter()
            .find(|r| r.status != ExecutionStatus::Accepted)
            .map(|r| SubmissionStatus::from_test_status(r.status))
            .unwrap_or(SubmissionStatus::RuntimeError)
    }
}

fn skipped_after_compile_error(index: usize, test_case: &TestCase, compiler_output: &str) -> TestResult {
    TestResult {
        index,
        status: ExecutionStatus::CompilationError,
        hidden: test_case.hidden,
        input: test_case.input.clone(),
        expected_output: test_case.expected_output.clone(),
        actual_output: compiler_output.to_string(),
        execution_time_ms: 0,
        memory_mb: 0.0,
        error: Some("not executed: program failed to compile".to_string()),
        points: 0,
    }
}

#[derive(Clone)]
pub struct Aggregator {
    client: Arc<dyn SandboxClient>,
    fleet: Arc<ExecutorFleet>,
    settings: JudgeSettings,
}

impl Aggregator {
    pub fn new(client: Arc<dyn SandboxClient>, fleet: Arc<ExecutorFleet>, settings: JudgeSettings) -> Self {
        Self {
            client,
            fleet,
            settings,
        }
    }

    pub fn settings(&self) -> &JudgeSettings {
        &self.settings
    }

    /// Dispatch, poll and evaluate a single test case
    pub async fn run_test_case(
        &self,
        index: usize,
        test_case: &TestCase,
        submission: &Submission,
        exercise: &Exercise,
    ) -> TestResult {
        let request = ExecutionRequest {
            source_code: submission.source_code.clone(),
            language: submission.language,
            stdin: test_case.input.clone(),
            limits: exercise.limits,
        };

        let job = match dispatcher::submit(
            self.client.as_ref(),
            &request,
            self.fleet.endpoints(),
            self.settings.submit_timeout,
        )
        .await
        {
            Ok(job) => job,
            Err(failure) => {
                warn!(test_index = index, error = %failure, "Dispatch failed for test case");
                return TestResult::failed(index, test_case, failure.to_string());
            }
        };

        let result = match poller::await_result(self.client.as_ref(), &job, self.settings.poll).await {
            Ok(result) => result,
            Err(timeout) => {
                warn!(test_index = index, error = %timeout, "Timed out waiting for test case result");
                return TestResult::failed(index, test_case, timeout.to_string());
            }
        };

        evaluator::evaluate(index, test_case, &result)
    }

    /// Grade a submission that is in Judging; returns it with a terminal status
    ///
    /// Nothing is persisted here - the caller hands the graded document to the
    /// state machine.
    #[instrument(skip_all, fields(submission_id = %submission.id, language = %submission.language))]
    pub async fn grade(&self, mut submission: Submission, exercise: &Exercise) -> Submission {
        let total = exercise.test_cases.len();
        info!(test_cases = total, endpoints = self.fleet.len(), "Grading submission");

        let mut results: Vec<TestResult> = Vec::with_capacity(total);
        let mut score = 0u32;
        let mut total_time_ms = 0u64;
        let mut max_memory_mb = 0.0f64;
        let mut compilation_error: Option<String> = None;

        for (index, test_case) in exercise.test_cases.iter().enumerate() {
            let skip = self.settings.short_circuit_compile_errors && compilation_error.is_some();

            let result = match (&compilation_error, skip) {
                (Some(output), true) => skipped_after_compile_error(index, test_case, output),
                _ => {
                    if index > 0 && !self.settings.inter_test_delay.is_zero() {
                        tokio::time::sleep(self.settings.inter_test_delay).await;
                    }
                    self.run_test_case(index, test_case, &submission, exercise).await
                }
            };

            debug!(
                test_index = index,
                status = ?result.status,
                points = result.points,
                execution_ms = result.execution_time_ms,
                "Test case judged"
            );

            if result.status == ExecutionStatus::CompilationError && compilation_error.is_none() {
                compilation_error = Some(result.actual_output.clone());
            }
            score = score.saturating_add(result.points);
            total_time_ms += result.execution_time_ms;
            max_memory_mb = max_memory_mb.max(result.memory_mb);
            results.push(result);
        }

        submission.status = overall_status(&results);
        submission.passed_tests = results
            .iter()
            .filter(|r| r.status == ExecutionStatus::Accepted)
            .count();
        submission.total_tests = total;
        submission.score = score;
        submission.max_score = exercise.max_score();
        submission.total_execution_time_ms = total_time_ms;
        submission.max_memory_used_mb = max_memory_mb;
        submission.compilation_error = compilation_error;
        submission.test_results = results;

        info!(
            status = %submission.status,
            score = submission.score,
            max_score = submission.max_score,
            passed = submission.passed_tests,
            total = submission.total_tests,
            "Grading complete"
        );

        submission
    }
}
