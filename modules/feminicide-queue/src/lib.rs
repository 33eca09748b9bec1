pub mod error;
pub mod job;
pub mod queue;
pub mod worker;

pub use error::{QueueError, Result};
pub use job::{ClaimedJob, JobOutcome, JobPayload};
pub use queue::JobQueue;
pub use worker::{JobHandler, WorkerPool};
