use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Strongly-typed language enum
/// Closed set - the sandbox runtime mapping below must stay exhaustive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    C,
    Cpp,
    Java,
    Python,
    JavaScript,
    Rust,
    Go,
}

impl Language {
    /// Returns all language variants
    pub fn all_variants() -> &'static [Language] {
        &[
            Language::C,
            Language::Cpp,
            Language::Java,
            Language::Python,
            Language::JavaScript,
            Language::Rust,
            Language::Go,
        ]
    }

    /// Parse a language from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Language> {
        match s.trim().to_lowercase().as_str() {
            "c" => Some(Language::C),
            "cpp" | "c++" => Some(Language::Cpp),
            "java" => Some(Language::Java),
            "python" => Some(Language::Python),
            "javascript" => Some(Language::JavaScript),
            "rust" => Some(Language::Rust),
            "go" => Some(Language::Go),
            _ => None,
        }
    }

    /// Runtime identifier understood by the sandbox fleet
    pub fn runtime_id(&self) -> u32 {
        match self {
            Language::C => 50,
            Language::Cpp => 54,
            Language::Java => 62,
            Language::Python => 71,
            Language::JavaScript => 63,
            Language::Rust => 73,
            Language::Go => 60,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::Java => "java",
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::Rust => "rust",
            Language::Go => "go",
        };
        f.write_str(name)
    }
}

/// Test Case Definition (Immutable Input)
/// Owned by an Exercise; never mutated once grading starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCase {
    pub input: String,
    pub expected_output: String,
    /// Graded, but excluded from user-visible diagnostics
    #[serde(default)]
    pub hidden: bool,
    pub points: u32,
}

/// Resource limits handed to the sandbox with every execution request
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExecutionLimits {
    pub cpu_time_limit_secs: f64,
    pub memory_limit_kb: u64,
}

impl ExecutionLimits {
    pub fn is_valid(&self) -> bool {
        self.cpu_time_limit_secs.is_finite()
            && self.cpu_time_limit_secs > 0.0
            && self.memory_limit_kb > 0
    }
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            cpu_time_limit_secs: 2.0,
            memory_limit_kb: 128_000,
        }
    }
}

/// Exercise - the test case bank a submission is graded against
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Exercise {
    pub id: Uuid,
    pub title: String,
    pub test_cases: Vec<TestCase>,
    #[serde(default)]
    pub limits: ExecutionLimits,
    /// Empty means every language is accepted
    #[serde(default)]
    pub allowed_languages: Vec<Language>,
    pub created_at: DateTime<Utc>,
}

impl Exercise {
    pub fn max_score(&self) -> u32 {
        self.test_cases
            .iter()
            .fold(0u32, |total, tc| total.saturating_add(tc.points))
    }

    pub fn allows(&self, language: Language) -> bool {
        self.allowed_languages.is_empty() || self.allowed_languages.contains(&language)
    }

    /// Copy safe to show to students: hidden cases keep only their points
    pub fn redacted(&self) -> Self {
        let mut exercise = self.clone();
        for tc in exercise.test_cases.iter_mut().filter(|tc| tc.hidden) {
            tc.input.clear();
            tc.expected_output.clear();
        }
        exercise
    }
}

/// Execution Request (ephemeral)
/// One program run against one stdin
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRequest {
    pub source_code: String,
    pub language: Language,
    pub stdin: String,
    pub limits: ExecutionLimits,
}

/// One interchangeable sandbox service. Order in the fleet is priority.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorEndpoint {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
}

impl ExecutorEndpoint {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            auth_token: None,
        }
    }
}

impl fmt::Display for ExecutorEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.url)
    }
}

/// Opaque job handle, only valid against the endpoint that issued it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobToken {
    pub token: String,
    pub endpoint: ExecutorEndpoint,
}

/// Terminal outcome of one ExecutionRequest, with outputs already decoded
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionResult {
    pub status_code: u32,
    pub status_description: String,
    pub stdout: String,
    pub stderr: String,
    pub compile_output: String,
    pub message: String,
    pub time_secs: f64,
    pub memory_kb: u64,
}

/// Per-Test Status
/// Closed classification of one execution, shared by sandbox results and test results
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Accepted,
    WrongAnswer,
    TimeLimitExceeded,
    CompilationError,
    RuntimeError,
    InternalError,
}

/// Per-Test Result
/// Append-only: written once per test case, in test case order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub index: usize,
    pub status: ExecutionStatus,
    #[serde(default)]
    pub hidden: bool,
    pub input: String,
    pub expected_output: String,
    pub actual_output: String,
    pub execution_time_ms: u64,
    pub memory_mb: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub points: u32,
}

impl TestResult {
    /// Zero-point RuntimeError result for a test case the pipeline could not run
    pub fn failed(index: usize, test_case: &TestCase, error: impl Into<String>) -> Self {
        Self {
            index,
            status: ExecutionStatus::RuntimeError,
            hidden: test_case.hidden,
            input: test_case.input.clone(),
            expected_output: test_case.expected_output.clone(),
            actual_output: String::new(),
            execution_time_ms: 0,
            memory_mb: 0.0,
            error: Some(error.into()),
            points: 0,
        }
    }

    fn redact(&mut self) {
        if self.hidden {
            self.input.clear();
            self.expected_output.clear();
            self.actual_output.clear();
            self.error = None;
        }
    }
}

/// Submission State Machine
/// Pending -> Judging -> exactly one terminal status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Judging,
    Accepted,
    Partial,
    WrongAnswer,
    RuntimeError,
    TimeLimitExceeded,
    CompilationError,
}

impl SubmissionStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SubmissionStatus::Pending | SubmissionStatus::Judging)
    }

    pub fn can_transition_to(&self, next: SubmissionStatus) -> bool {
        match self {
            SubmissionStatus::Pending => next == SubmissionStatus::Judging,
            SubmissionStatus::Judging => next.is_terminal(),
            _ => false,
        }
    }

    /// Overall status carried by a single failing test result
    pub fn from_test_status(status: ExecutionStatus) -> Self {
        match status {
            ExecutionStatus::Accepted => SubmissionStatus::Accepted,
            ExecutionStatus::WrongAnswer => SubmissionStatus::WrongAnswer,
            ExecutionStatus::TimeLimitExceeded => SubmissionStatus::TimeLimitExceeded,
            ExecutionStatus::CompilationError => SubmissionStatus::CompilationError,
            ExecutionStatus::RuntimeError | ExecutionStatus::InternalError => {
                SubmissionStatus::RuntimeError
            }
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Judging => "judging",
            SubmissionStatus::Accepted => "accepted",
            SubmissionStatus::Partial => "partial",
            SubmissionStatus::WrongAnswer => "wrong_answer",
            SubmissionStatus::RuntimeError => "runtime_error",
            SubmissionStatus::TimeLimitExceeded => "time_limit_exceeded",
            SubmissionStatus::CompilationError => "compilation_error",
        };
        f.write_str(name)
    }
}

/// Submission Document
/// Written by the judging pipeline, read by the API
///
/// ## Scoring Semantics:
/// - score: sum of points for Accepted tests
/// - max_score: sum of all test case points
/// - status, score, test_results and summaries are written once, at finalize
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub exercise_id: Uuid,
    pub student_id: String,
    pub language: Language,
    pub source_code: String,
    pub status: SubmissionStatus,
    pub test_results: Vec<TestResult>,
    pub score: u32,
    pub max_score: u32,
    pub total_execution_time_ms: u64,
    pub max_memory_used_mb: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compilation_error: Option<String>,
    pub passed_tests: usize,
    pub total_tests: usize,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub judged_at: Option<DateTime<Utc>>,
}

impl Submission {
    pub fn new_pending(
        exercise: &Exercise,
        student_id: impl Into<String>,
        language: Language,
        source_code: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            exercise_id: exercise.id,
            student_id: student_id.into(),
            language,
            source_code: source_code.into(),
            status: SubmissionStatus::Pending,
            test_results: Vec::new(),
            score: 0,
            max_score: exercise.max_score(),
            total_execution_time_ms: 0,
            max_memory_used_mb: 0.0,
            compilation_error: None,
            passed_tests: 0,
            total_tests: exercise.test_cases.len(),
            created_at: Utc::now(),
            judged_at: None,
        }
    }

    pub fn acceptance_rate(&self) -> f64 {
        if self.total_tests == 0 {
            return 0.0;
        }
        self.passed_tests as f64 / self.total_tests as f64
    }

    pub fn redacted(&self) -> Self {
        let mut submission = self.clone();
        submission.test_results.iter_mut().for_each(TestResult::redact);
        submission
    }
}
