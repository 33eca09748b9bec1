pub type Result<T> = std::result::Result<T, SchedulerError>;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("audit store error: {0}")]
    Audit(#[from] feminicide_audit::AuditError),

    #[error("queue error: {0}")]
    Queue(#[from] feminicide_queue::QueueError),

    #[error("source adapter error: {0}")]
    Source(#[from] feminicide_sources::SourceError),
}
