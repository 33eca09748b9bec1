use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, error};

use crate::job::{ClaimedJob, JobOutcome};
use crate::queue::JobQueue;

/// How long a worker sleeps after finding the queue empty before polling
/// again (`spec.md` §4.7 has no fixed figure; this trades latency for a
/// quiet queue against hammering Postgres).
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// The classify-and-post task body (`spec.md` §4.9), implemented by
/// `feminicide-publisher`. Kept as a trait here so the queue crate has no
/// dependency on the publisher crate.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &ClaimedJob) -> JobOutcome;
}

/// A pool of `tokio::task`s, each independently polling the queue
/// (`spec.md` §4.7/§5: "workers form a separate pool of long-lived
/// consumers... jobs from different projects may run in parallel").
pub struct WorkerPool {
    queue: JobQueue,
    handler: Arc<dyn JobHandler>,
    concurrency: usize,
}

impl WorkerPool {
    pub fn new(queue: JobQueue, handler: Arc<dyn JobHandler>, concurrency: usize) -> Self {
        Self { queue, handler, concurrency: concurrency.max(1) }
    }

    /// Runs forever, polling and executing jobs, until `shutdown` resolves.
    /// Each worker finishes its current job before exiting (`spec.md` §5:
    /// "workers finish the current job then exit").
    pub async fn run(self, mut shutdown: tokio::sync::watch::Receiver<bool>) {
        let mut tasks = tokio::task::JoinSet::new();
        for worker_id in 0..self.concurrency {
            let queue = self.queue.clone();
            let handler = self.handler.clone();
            let mut shutdown = shutdown.clone();
            tasks.spawn(async move {
                loop {
                    if *shutdown.borrow() {
                        debug!(worker_id, "worker shutting down");
                        return;
                    }

                    match queue.claim_next().await {
                        Ok(Some(job)) => {
                            let outcome = handler.handle(&job).await;
                            if let Err(e) = queue.report(&job, outcome).await {
                                error!(worker_id, job_id = job.id, error = %e, "failed to record job outcome");
                            }
                        }
                        Ok(None) => {
                            tokio::select! {
                                _ = tokio::time::sleep(IDLE_POLL_INTERVAL) => {}
                                _ = shutdown.changed() => {}
                            }
                        }
                        Err(e) => {
                            error!(worker_id, error = %e, "failed to claim a job, backing off");
                            tokio::time::sleep(IDLE_POLL_INTERVAL).await;
                        }
                    }
                }
            });
        }

        while tasks.join_next().await.is_some() {}
    }
}
