//! Persistence seam for exercises and submissions.

use crate::error::StoreError;
use async_trait::async_trait;
use judgeflow_common::{redis as keys, Exercise, Submission};
use redis::aio::ConnectionManager;
use std::collections::{HashMap, VecDeque};
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

/// Key/value document store addressed by id
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_exercise(&self, id: &Uuid) -> Result<Option<Exercise>, StoreError>;

    async fn put_exercise(&self, exercise: &Exercise) -> Result<(), StoreError>;

    async fn get_submission(&self, id: &Uuid) -> Result<Option<Submission>, StoreError>;

    async fn put_submission(&self, submission: &Submission) -> Result<(), StoreError>;

    /// Hand a pending submission to the asynchronous judging queue
    async fn enqueue(&self, submission_id: &Uuid) -> Result<(), StoreError>;
}

/// Redis-backed store shared by API and worker
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl DocumentStore for RedisStore {
    async fn get_exercise(&self, id: &Uuid) -> Result<Option<Exercise>, StoreError> {
        let mut conn = self.conn.clone();
        Ok(keys::get_exercise(&mut conn, id).await?)
    }

    async fn put_exercise(&self, exercise: &Exercise) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        Ok(keys::store_exercise(&mut conn, exercise).await?)
    }

    async fn get_submission(&self, id: &Uuid) -> Result<Option<Submission>, StoreError> {
        let mut conn = self.conn.clone();
        Ok(keys::get_submission(&mut conn, id).await?)
    }

    async fn put_submission(&self, submission: &Submission) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        Ok(keys::store_submission(&mut conn, submission).await?)
    }

    async fn enqueue(&self, submission_id: &Uuid) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        Ok(keys::push_submission(&mut conn, submission_id).await?)
    }
}

/// In-process store for tests and single-node runs
#[derive(Default)]
pub struct MemoryStore {
    exercises: RwLock<HashMap<Uuid, Exercise>>,
    submissions: RwLock<HashMap<Uuid, Submission>>,
    queue: Mutex<VecDeque<Uuid>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next queued submission id, FIFO
    pub async fn dequeue(&self) -> Option<Uuid> {
        self.queue.lock().await.pop_front()
    }

    pub async fn submission_count(&self) -> usize {
        self.submissions.read().await.len()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_exercise(&self, id: &Uuid) -> Result<Option<Exercise>, StoreError> {
        Ok(self.exercises.read().await.get(id).cloned())
    }

    async fn put_exercise(&self, exercise: &Exercise) -> Result<(), StoreError> {
        self.exercises
            .write()
            .await
            .insert(exercise.id, exercise.clone());
        Ok(())
    }

    async fn get_submission(&self, id: &Uuid) -> Result<Option<Submission>, StoreError> {
        Ok(self.submissions.read().await.get(id).cloned())
    }

    async fn put_submission(&self, submission: &Submission) -> Result<(), StoreError> {
        self.submissions
            .write()
            .await
            .insert(submission.id, submission.clone());
        Ok(())
    }

    async fn enqueue(&self, submission_id: &Uuid) -> Result<(), StoreError> {
        self.queue.lock().await.push_back(*submission_id);
        Ok(())
    }
}
