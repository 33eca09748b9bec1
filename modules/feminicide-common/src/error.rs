use thiserror::Error;

/// Errors shared across every crate in the pipeline. Component-specific crates
/// define their own narrower enums and convert into this one at their boundary
/// when the caller only needs "what broke", not which component it was.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
