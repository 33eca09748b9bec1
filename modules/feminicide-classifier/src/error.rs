/// Result type alias for classifier operations.
pub type Result<T> = std::result::Result<T, ModelError>;

/// Non-retryable: a `ModelError` fails the worker job permanently
/// (`spec.md` §4.3, §7).
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("no model found for language_model_id {0}")]
    SpecNotFound(i64),

    #[error("missing artifact: {0}")]
    MissingArtifact(String),

    #[error("corrupt artifact {path}: {source}")]
    CorruptArtifact {
        path: String,
        #[source]
        source: bincode::Error,
    },

    #[error("unsupported vectorizer type for stage {stage}")]
    UnsupportedVectorizer { stage: u8 },

    #[error("vectorizer/model shape mismatch: expected dimension {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("model produced a NaN or out-of-range score")]
    InvalidScore,

    #[error("embedding service error: {0}")]
    EmbeddingService(String),

    #[error("artifact download failed: {0}")]
    Download(#[from] reqwest::Error),

    #[error("artifact I/O error: {0}")]
    Io(#[from] std::io::Error),
}
