/// Judge Service - inbound entry point of the judging pipeline
///
/// **Responsibility:**
/// Validate a submission, record it, and run the aggregator on its own task.
///
/// Every judged submission is an independent tokio task, so a slow run never
/// delays another one. Test cases inside a submission stay sequential.

use crate::aggregator::{Aggregator, JudgeSettings};
use crate::error::{JudgeError, StoreError, ValidationError};
use crate::sandbox::SandboxClient;
use crate::state::SubmissionStateMachine;
use crate::store::DocumentStore;
use chrono::Utc;
use judgeflow_common::{
    ExecutionLimits, Exercise, ExecutorFleet, Language, Submission, SubmissionStatus, TestCase,
    TestResult,
};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Reject anything that must never reach the fleet
pub fn validate(exercise: &Exercise, language: &str, source_code: &str) -> Result<Language, ValidationError> {
    let language = Language::from_str(language)
        .ok_or_else(|| ValidationError::UnknownLanguage(language.to_string()))?;

    if !exercise.allows(language) {
        return Err(ValidationError::LanguageNotAllowed(language.to_string()));
    }
    if source_code.trim().is_empty() {
        return Err(ValidationError::EmptySource);
    }
    validate_bank(&exercise.test_cases, &exercise.limits)?;
    Ok(language)
}

fn validate_bank(test_cases: &[TestCase], limits: &ExecutionLimits) -> Result<(), ValidationError> {
    if test_cases.is_empty() {
        return Err(ValidationError::EmptyTestCases);
    }
    if !limits.is_valid() {
        return Err(ValidationError::InvalidLimits(format!(
            "cpu_time_limit_secs={}, memory_limit_kb={}",
            limits.cpu_time_limit_secs, limits.memory_limit_kb
        )));
    }
    let total_points = test_cases
        .iter()
        .try_fold(0u32, |total, tc| total.checked_add(tc.points));
    if total_points.is_none() {
        return Err(ValidationError::InvalidLimits(format!(
            "total points exceed {}",
            u32::MAX
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct JudgeService {
    store: Arc<dyn DocumentStore>,
    states: SubmissionStateMachine,
    aggregator: Aggregator,
}

impl JudgeService {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        client: Arc<dyn SandboxClient>,
        fleet: Arc<ExecutorFleet>,
        settings: JudgeSettings,
    ) -> Self {
        Self {
            states: SubmissionStateMachine::new(store.clone()),
            aggregator: Aggregator::new(client, fleet, settings),
            store,
        }
    }

    pub async fn register_exercise(
        &self,
        title: String,
        test_cases: Vec<TestCase>,
        limits: ExecutionLimits,
        allowed_languages: Vec<Language>,
    ) -> Result<Exercise, JudgeError> {
        validate_bank(&test_cases, &limits)?;

        let exercise = Exercise {
            id: Uuid::new_v4(),
            title,
            test_cases,
            limits,
            allowed_languages,
            created_at: Utc::now(),
        };
        self.store.put_exercise(&exercise).await?;
        info!(
            exercise_id = %exercise.id,
            test_cases = exercise.test_cases.len(),
            max_score = exercise.max_score(),
            "Exercise registered"
        );
        Ok(exercise)
    }

    pub async fn exercise(&self, exercise_id: &Uuid) -> Result<Exercise, JudgeError> {
        self.store
            .get_exercise(exercise_id)
            .await?
            .ok_or(JudgeError::ExerciseNotFound(*exercise_id))
    }

    pub async fn submission(&self, submission_id: &Uuid) -> Result<Submission, JudgeError> {
        self.store
            .get_submission(submission_id)
            .await?
            .ok_or(JudgeError::Store(StoreError::SubmissionNotFound(*submission_id)))
    }

    /// Validate and persist a Pending submission
    pub async fn prepare(
        &self,
        exercise_id: &Uuid,
        student_id: &str,
        language: &str,
        source_code: &str,
    ) -> Result<Submission, JudgeError> {
        let exercise = self.exercise(exercise_id).await?;
        let language = validate(&exercise, language, source_code)?;

        let submission = Submission::new_pending(&exercise, student_id, language, source_code);
        self.states.create(&submission).await?;
        Ok(submission)
    }

    /// Judge synchronously: returns once the terminal submission is persisted
    #[instrument(skip(self, exercise_id, source_code), fields(exercise_id = %exercise_id))]
    pub async fn judge(
        &self,
        exercise_id: &Uuid,
        student_id: &str,
        language: &str,
        source_code: &str,
    ) -> Result<Uuid, JudgeError> {
        let submission = self.prepare(exercise_id, student_id, language, source_code).await?;
        self.supervise(submission.id).await?;
        Ok(submission.id)
    }

    /// Run judging on its own task; a panicked task still ends terminal
    pub async fn supervise(&self, submission_id: Uuid) -> Result<Submission, JudgeError> {
        let service = self.clone();
        match tokio::spawn(async move { service.run(&submission_id).await }).await {
            Ok(outcome) => outcome,
            Err(join_error) => {
                error!(submission_id = %submission_id, error = %join_error, "Judging task aborted");
                self.abort(&submission_id, &format!("judging aborted: {}", join_error))
                    .await
            }
        }
    }

    /// Validate, persist as Pending and hand to the worker queue
    pub async fn enqueue(
        &self,
        exercise_id: &Uuid,
        student_id: &str,
        language: &str,
        source_code: &str,
    ) -> Result<Uuid, JudgeError> {
        let submission = self.prepare(exercise_id, student_id, language, source_code).await?;
        self.store.enqueue(&submission.id).await?;
        info!(submission_id = %submission.id, "Submission queued for judging");
        Ok(submission.id)
    }

    /// Pending → Judging → graded terminal submission
    pub async fn run(&self, submission_id: &Uuid) -> Result<Submission, JudgeError> {
        let submission = self.states.begin_judging(submission_id).await?;

        let exercise = match self.exercise(&submission.exercise_id).await {
            Ok(exercise) => exercise,
            Err(e) => {
                warn!(submission_id = %submission_id, error = %e, "Exercise vanished before judging");
                return self.abort(submission_id, &e.to_string()).await;
            }
        };

        let graded = self.aggregator.grade(submission, &exercise).await;
        Ok(self.states.finalize(graded).await?)
    }

    /// Force a terminal RuntimeError when judging could not run to completion
    ///
    /// Every test case is recorded as a failed result carrying `reason`.
    pub async fn abort(&self, submission_id: &Uuid, reason: &str) -> Result<Submission, JudgeError> {
        let mut submission = self.submission(submission_id).await?;
        if submission.status.is_terminal() {
            return Ok(submission);
        }
        if submission.status == SubmissionStatus::Pending {
            submission = self.states.begin_judging(submission_id).await?;
        }

        if let Ok(exercise) = self.exercise(&submission.exercise_id).await {
            submission.test_results = exercise
                .test_cases
                .iter()
                .enumerate()
                .map(|(idx, tc)| TestResult::failed(idx, tc, reason))
                .collect();
            submission.total_tests = exercise.test_cases.len();
        }
        submission.status = SubmissionStatus::RuntimeError;
        submission.score = 0;
        submission.passed_tests = 0;

        Ok(self.states.finalize(submission).await?)
    }
}
