pub type Result<T> = std::result::Result<T, PublisherError>;

#[derive(Debug, thiserror::Error)]
pub enum PublisherError {
    #[error("audit store error: {0}")]
    Audit(#[from] feminicide_audit::AuditError),

    #[error("classifier error: {0}")]
    Model(#[from] feminicide_classifier::ModelError),

    /// 5xx or connection failure — the queue should retry this job.
    #[error("transient post failure: {0}")]
    Transient(String),

    /// 4xx other than 408/429 — the queue should drop this job.
    #[error("permanent post failure: {0}")]
    Permanent(String),
}

impl PublisherError {
    /// Maps onto `feminicide_queue::JobOutcome`'s retryable/permanent split
    /// (`spec.md` §4.9 step 5: 5xx/connection error retries, other 4xx drops).
    pub fn is_retryable(&self) -> bool {
        matches!(self, PublisherError::Transient(_) | PublisherError::Audit(_))
    }
}
