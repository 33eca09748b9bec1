/// Result type alias for source adapter operations.
pub type Result<T> = std::result::Result<T, SourceError>;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP 5xx / connection error from the source; recoverable locally by
    /// the adapter's own retry, or by skipping the project this run
    /// (`spec.md` §4.4, §7).
    #[error("transient source error: {0}")]
    Transient(String),

    #[error("source returned malformed data: {0}")]
    Decode(String),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl SourceError {
    pub fn is_transient(&self) -> bool {
        matches!(self, SourceError::Transient(_) | SourceError::Http(_))
    }
}
