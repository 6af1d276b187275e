/// Submission State Machine
///
/// Pending → Judging → exactly one terminal status. `finalize` is the only
/// write of status, score, test results and the numeric summaries; once a
/// submission is terminal it is never written again.

use crate::error::StoreError;
use crate::store::DocumentStore;
use chrono::Utc;
use judgeflow_common::{Submission, SubmissionStatus};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

#[derive(Clone)]
pub struct SubmissionStateMachine {
    store: Arc<dyn DocumentStore>,
}

impl SubmissionStateMachine {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    async fn load(&self, id: &Uuid) -> Result<Submission, StoreError> {
        self.store
            .get_submission(id)
            .await?
            .ok_or(StoreError::SubmissionNotFound(*id))
    }

    fn check(id: Uuid, from: SubmissionStatus, to: SubmissionStatus) -> Result<(), StoreError> {
        if from.can_transition_to(to) {
            Ok(())
        } else {
            Err(StoreError::InvalidTransition { id, from, to })
        }
    }

    /// Persist a freshly created submission
    pub async fn create(&self, submission: &Submission) -> Result<(), StoreError> {
        if submission.status != SubmissionStatus::Pending {
            return Err(StoreError::InvalidTransition {
                id: submission.id,
                from: submission.status,
                to: SubmissionStatus::Pending,
            });
        }
        self.store.put_submission(submission).await?;
        info!(submission_id = %submission.id, "Submission created");
        Ok(())
    }

    /// Pending → Judging
    pub async fn begin_judging(&self, id: &Uuid) -> Result<Submission, StoreError> {
        let mut submission = self.load(id).await?;
        Self::check(*id, submission.status, SubmissionStatus::Judging)?;

        submission.status = SubmissionStatus::Judging;
        self.store.put_submission(&submission).await?;
        info!(submission_id = %id, "Submission judging started");
        Ok(submission)
    }

    /// Judging → terminal; writes the graded document
    pub async fn finalize(&self, mut graded: Submission) -> Result<Submission, StoreError> {
        let current = self.load(&graded.id).await?;
        Self::check(graded.id, current.status, graded.status)?;

        graded.judged_at = Some(Utc::now());
        self.store.put_submission(&graded).await?;
        info!(
            submission_id = %graded.id,
            status = %graded.status,
            score = graded.score,
            max_score = graded.max_score,
            "Submission finalized"
        );
        Ok(graded)
    }
}
