use std::sync::Arc;

use async_trait::async_trait;
use feminicide_config::ConfigSnapshot;
use feminicide_queue::{ClaimedJob, JobHandler, JobOutcome};
use tracing::error;

use crate::error::PublisherError;
use crate::publisher::Publisher;

/// Bridges the durable queue (`feminicide-queue`) to the worker-task
/// contract (`spec.md` §4.9), looking up the posting project and model spec
/// from the run's config snapshot by the ids carried in the job payload.
pub struct PublisherJobHandler {
    publisher: Publisher,
    config: Arc<ConfigSnapshot>,
}

impl PublisherJobHandler {
    pub fn new(publisher: Publisher, config: Arc<ConfigSnapshot>) -> Self {
        Self { publisher, config }
    }
}

#[async_trait]
impl JobHandler for PublisherJobHandler {
    async fn handle(&self, job: &ClaimedJob) -> JobOutcome {
        let payload = match job.payload() {
            Ok(p) => p,
            Err(e) => return JobOutcome::PermanentFailure(format!("undecodable job payload: {e}")),
        };

        let Some(project) = self.config.projects.iter().find(|p| p.id == payload.project_id) else {
            return JobOutcome::PermanentFailure(format!("unknown project {}", payload.project_id));
        };

        let Some(model_spec) = self.config.model_for(project.language_model_id) else {
            return JobOutcome::PermanentFailure(format!(
                "unknown language_model_id {} for project {}",
                project.language_model_id, project.id
            ));
        };

        let result = self
            .publisher
            .process_batch(
                &payload.articles,
                &project.title,
                &project.language,
                project.country.as_deref(),
                project.min_confidence,
                &project.update_post_url,
                model_spec,
            )
            .await;

        match result {
            Ok(()) => JobOutcome::Completed,
            Err(e @ PublisherError::Model(_)) => {
                error!(project_id = payload.project_id, error = %e, "model error, dropping batch");
                JobOutcome::PermanentFailure(e.to_string())
            }
            Err(e) if e.is_retryable() => JobOutcome::RetryableFailure(e.to_string()),
            Err(e) => JobOutcome::PermanentFailure(e.to_string()),
        }
    }
}
