pub mod artifact;
pub mod classifier;
pub mod embeddings;
pub mod error;
pub mod registry;

pub use artifact::{ArtifactModelKind, LinearModel, TfidfVectorizer};
pub use classifier::{Classifier, ScoreSet};
pub use embeddings::{EmbeddingClient, EmbeddingDescriptor};
pub use error::{ModelError, Result};
pub use registry::ModelRegistry;
