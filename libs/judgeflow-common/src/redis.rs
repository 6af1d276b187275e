use crate::types::{Exercise, Submission};
use redis::{AsyncCommands, RedisResult};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

/// Redis key semantics - shared by API and worker so they never drift

pub const EXERCISE_PREFIX: &str = "judgeflow:exercise";
pub const SUBMISSION_PREFIX: &str = "judgeflow:submission";
pub const SUBMISSION_QUEUE: &str = "judgeflow:queue:submissions";

pub fn exercise_key(exercise_id: &Uuid) -> String {
    format!("{}:{}", EXERCISE_PREFIX, exercise_id)
}

pub fn submission_key(submission_id: &Uuid) -> String {
    format!("{}:{}", SUBMISSION_PREFIX, submission_id)
}

fn encode<T: Serialize>(value: &T) -> RedisResult<String> {
    serde_json::to_string(value).map_err(|e| {
        redis::RedisError::from((redis::ErrorKind::TypeError, "serialization error", e.to_string()))
    })
}

fn decode<T: DeserializeOwned>(payload: &str) -> RedisResult<T> {
    serde_json::from_str(payload).map_err(|e| {
        redis::RedisError::from((redis::ErrorKind::TypeError, "deserialization error", e.to_string()))
    })
}

async fn get_document<T: DeserializeOwned>(
    conn: &mut redis::aio::ConnectionManager,
    key: &str,
) -> RedisResult<Option<T>> {
    let payload: Option<String> = conn.get(key).await?;
    payload.as_deref().map(decode).transpose()
}

pub async fn store_exercise(
    conn: &mut redis::aio::ConnectionManager,
    exercise: &Exercise,
) -> RedisResult<()> {
    let payload = encode(exercise)?;
    conn.set(exercise_key(&exercise.id), payload).await
}

pub async fn get_exercise(
    conn: &mut redis::aio::ConnectionManager,
    exercise_id: &Uuid,
) -> RedisResult<Option<Exercise>> {
    get_document(conn, &exercise_key(exercise_id)).await
}

pub async fn store_submission(
    conn: &mut redis::aio::ConnectionManager,
    submission: &Submission,
) -> RedisResult<()> {
    let payload = encode(submission)?;
    conn.set(submission_key(&submission.id), payload).await
}

pub async fn get_submission(
    conn: &mut redis::aio::ConnectionManager,
    submission_id: &Uuid,
) -> RedisResult<Option<Submission>> {
    get_document(conn, &submission_key(submission_id)).await
}

/// Push a pending submission id for asynchronous judging
/// Uses RPUSH for FIFO semantics
pub async fn push_submission(
    conn: &mut redis::aio::ConnectionManager,
    submission_id: &Uuid,
) -> RedisResult<()> {
    conn.rpush(SUBMISSION_QUEUE, submission_id.to_string()).await
}

/// Pop the next submission id
/// Uses BLPOP with timeout for graceful shutdown
pub async fn pop_submission(
    conn: &mut redis::aio::ConnectionManager,
    timeout_seconds: f64,
) -> RedisResult<Option<Uuid>> {
    let result: Option<(String, String)> = conn.blpop(SUBMISSION_QUEUE, timeout_seconds).await?;

    match result {
        Some((_key, payload)) => {
            let id = Uuid::parse_str(&payload).map_err(|e| {
                redis::RedisError::from((redis::ErrorKind::TypeError, "invalid submission id", e.to_string()))
            })?;
            Ok(Some(id))
        }
        None => Ok(None),
    }
}
