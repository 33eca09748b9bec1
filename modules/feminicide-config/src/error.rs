pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config server returned {status}")]
    Http { status: reqwest::StatusCode },

    #[error("config server request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("config server returned an empty {0} list")]
    Empty(&'static str),

    #[error("config snapshot on disk is malformed: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("no network and no snapshot on disk at {0}")]
    NoSnapshot(String),

    #[error("failed to write snapshot to disk: {0}")]
    Io(#[from] std::io::Error),
}
