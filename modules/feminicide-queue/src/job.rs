use chrono::{DateTime, Utc};
use feminicide_common::CandidateArticle;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A classify-and-post job as enqueued by the scheduler (`spec.md` §4.7:
/// "jobs of shape `{project, article_batch}`"). The full candidate batch —
/// including `story_text` — rides in the payload rather than a list of ids,
/// since the audit store's `stories` table doesn't retain article text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPayload {
    pub project_id: i64,
    pub articles: Vec<CandidateArticle>,
}

/// A job claimed off the queue, ready to be handed to a worker closure.
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    pub id: i64,
    pub project_id: i64,
    pub attempts: i32,
    pub max_attempts: i32,
    pub payload: Value,
}

impl ClaimedJob {
    pub fn payload(&self) -> serde_json::Result<JobPayload> {
        serde_json::from_value(self.payload.clone())
    }
}

/// What a worker reports back after running one job — `spec.md` §9's
/// "Worker task retries via exception-throwing decorator" resolved to a
/// typed return instead of a raised-and-caught exception.
#[derive(Debug, Clone)]
pub enum JobOutcome {
    Completed,
    RetryableFailure(String),
    PermanentFailure(String),
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct QueueJobRow {
    pub id: i64,
    pub project_id: i64,
    pub payload: Value,
    pub status: String,
    pub attempts: i32,
    pub max_attempts: i32,
    #[allow(dead_code)]
    pub run_at: DateTime<Utc>,
    #[allow(dead_code)]
    pub last_error: Option<String>,
}
