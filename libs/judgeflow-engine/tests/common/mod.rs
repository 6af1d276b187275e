#![allow(dead_code)]

use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use chrono::Utc;
use judgeflow_common::{
    ExecutionLimits, ExecutionRequest, Exercise, ExecutorEndpoint, ExecutorFleet, TestCase,
};
use judgeflow_engine::{
    JudgeService, JudgeSettings, MemoryStore, PollSettings, RawExecutionResult, RawStatus,
    SandboxClient, SandboxError,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use uuid::Uuid;

pub type Program = Arc<dyn Fn(&str) -> RawExecutionResult + Send + Sync>;

fn encode(text: &str) -> Option<String> {
    Some(general_purpose::STANDARD.encode(text))
}

pub fn finished(status: u32, stdout: &str) -> RawExecutionResult {
    RawExecutionResult {
        status: RawStatus {
            id: status,
            description: String::new(),
        },
        stdout: encode(stdout),
        time: 0.01,
        memory: Some(1024),
        ..Default::default()
    }
}

/// Prints the sum of the two integers on stdin
pub fn sum_program() -> Program {
    Arc::new(|stdin: &str| {
        let sum: i64 = stdin
            .split_whitespace()
            .filter_map(|n| n.parse::<i64>().ok())
            .sum();
        finished(3, &format!("{}\n", sum))
    })
}

/// Always prints the same text
pub fn constant_program(output: &'static str) -> Program {
    Arc::new(move |_stdin: &str| finished(3, output))
}

pub fn compile_error_program(message: &'static str) -> Program {
    Arc::new(move |_stdin: &str| RawExecutionResult {
        status: RawStatus {
            id: 6,
            description: "Compilation Error".to_string(),
        },
        compile_output: encode(message),
        ..Default::default()
    })
}

struct Job {
    endpoint: String,
    stdin: String,
    remaining_polls: u32,
}

/// In-process stand-in for an executor fleet
///
/// - endpoints named in `down` refuse every submit
/// - each job reports "processing" `pending_polls` times before its result
/// - tokens are only valid on the endpoint that issued them
pub struct FakeFleet {
    program: Program,
    down: HashSet<String>,
    pending_polls: u32,
    latency: Arc<dyn Fn(&str) -> Duration + Send + Sync>,
    jobs: Mutex<HashMap<String, Job>>,
    submits: Mutex<Vec<(String, String)>>,
    counter: AtomicUsize,
}

impl FakeFleet {
    pub fn new(program: Program) -> Self {
        Self {
            program,
            down: HashSet::new(),
            pending_polls: 1,
            latency: Arc::new(|_| Duration::ZERO),
            jobs: Mutex::new(HashMap::new()),
            submits: Mutex::new(Vec::new()),
            counter: AtomicUsize::new(0),
        }
    }

    pub fn with_down(mut self, names: &[&str]) -> Self {
        self.down = names.iter().map(|n| n.to_string()).collect();
        self
    }

    pub fn with_pending_polls(mut self, polls: u32) -> Self {
        self.pending_polls = polls;
        self
    }

    pub fn with_latency(mut self, latency: impl Fn(&str) -> Duration + Send + Sync + 'static) -> Self {
        self.latency = Arc::new(latency);
        self
    }

    /// (endpoint, stdin) of every submit attempt, in order
    pub fn submits(&self) -> Vec<(String, String)> {
        self.submits.lock().unwrap().clone()
    }

    pub fn endpoints_contacted(&self) -> Vec<String> {
        self.submits().into_iter().map(|(endpoint, _)| endpoint).collect()
    }
}

#[async_trait]
impl SandboxClient for FakeFleet {
    async fn submit(
        &self,
        endpoint: &ExecutorEndpoint,
        request: &ExecutionRequest,
    ) -> Result<String, SandboxError> {
        self.submits
            .lock()
            .unwrap()
            .push((endpoint.name.clone(), request.stdin.clone()));

        if self.down.contains(&endpoint.name) {
            return Err(SandboxError::Rejected {
                status: 503,
                body: "executor unavailable".to_string(),
            });
        }

        let token = format!("{}-{}", endpoint.name, self.counter.fetch_add(1, Ordering::SeqCst));
        self.jobs.lock().unwrap().insert(
            token.clone(),
            Job {
                endpoint: endpoint.name.clone(),
                stdin: request.stdin.clone(),
                remaining_polls: self.pending_polls,
            },
        );
        Ok(token)
    }

    async fn fetch(
        &self,
        endpoint: &ExecutorEndpoint,
        token: &str,
    ) -> Result<RawExecutionResult, SandboxError> {
        let stdin = {
            let mut jobs = self.jobs.lock().unwrap();
            let job = jobs.get_mut(token).ok_or_else(|| SandboxError::Rejected {
                status: 404,
                body: format!("unknown token {}", token),
            })?;
            if job.endpoint != endpoint.name {
                return Err(SandboxError::Rejected {
                    status: 404,
                    body: format!("token {} was not issued here", token),
                });
            }
            if job.remaining_polls > 0 {
                job.remaining_polls -= 1;
                return Ok(RawExecutionResult {
                    status: RawStatus {
                        id: 2,
                        description: "Processing".to_string(),
                    },
                    ..Default::default()
                });
            }
            job.stdin.clone()
        };

        let delay = (self.latency)(&stdin);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        Ok((self.program)(&stdin))
    }
}

pub fn case(input: &str, expected: &str, points: u32) -> TestCase {
    TestCase {
        input: input.to_string(),
        expected_output: expected.to_string(),
        hidden: false,
        points,
    }
}

/// The two-case "sum of two integers" exercise
pub fn sum_exercise() -> Exercise {
    Exercise {
        id: Uuid::new_v4(),
        title: "Sum of two integers".to_string(),
        test_cases: vec![case("3 4", "7", 5), case("0 0", "0", 5)],
        limits: ExecutionLimits::default(),
        allowed_languages: vec![],
        created_at: Utc::now(),
    }
}

pub fn fleet(names: &[&str]) -> Arc<ExecutorFleet> {
    let endpoints = names
        .iter()
        .map(|n| ExecutorEndpoint::new(*n, format!("http://{}.invalid", n)))
        .collect();
    Arc::new(ExecutorFleet::new(endpoints).expect("non-empty fleet"))
}

pub fn fast_settings() -> JudgeSettings {
    JudgeSettings {
        submit_timeout: Duration::from_millis(200),
        poll: PollSettings {
            max_attempts: 5,
            interval: Duration::from_millis(1),
        },
        inter_test_delay: Duration::from_millis(1),
        short_circuit_compile_errors: false,
    }
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub client: Arc<FakeFleet>,
    pub service: JudgeService,
}

pub fn harness(client: FakeFleet, endpoints: &[&str], settings: JudgeSettings) -> Harness {
    let store = Arc::new(MemoryStore::new());
    let client = Arc::new(client);
    let service = JudgeService::new(store.clone(), client.clone(), fleet(endpoints), settings);
    Harness {
        store,
        client,
        service,
    }
}
