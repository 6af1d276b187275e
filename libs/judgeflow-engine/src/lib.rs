pub mod aggregator;
pub mod dispatcher;
pub mod error;
pub mod evaluator;
pub mod poller;
pub mod sandbox;
pub mod service;
pub mod state;
pub mod status;
pub mod store;

pub use aggregator::{Aggregator, JudgeSettings};
pub use error::{DispatchFailure, JudgeError, PollTimeout, SandboxError, StoreError, ValidationError};
pub use poller::PollSettings;
pub use sandbox::{HttpSandboxClient, RawExecutionResult, RawStatus, SandboxClient};
pub use service::JudgeService;
pub use state::SubmissionStateMachine;
pub use store::{DocumentStore, MemoryStore, RedisStore};
