//! Remote sentence-embedding vectorizer, used when a stage's
//! `vectorizer_type` is `embeddings` (`spec.md` §4.3).
//!
//! The original loads a TensorFlow Hub `SavedModel` in-process
//! (`tensorflow_hub.load(...)`). No native ML runtime crate exists anywhere
//! in this codebase's dependency stack, so embeddings are produced by an
//! HTTP call to a small embedding service instead — the same shape
//! `rootsignal-scout`'s `Embedder` uses for Voyage AI, scaled down to just
//! the embedding call (no chat/tool-calling abstraction).

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};

/// Read once per classifier construction from
/// `files/models/embeddings-{en,multi}/descriptor.json` — the Rust stand-in
/// for the original's "magic local path" TFHub convention
/// (`spec.md` §9 redesign note: the language→subdir mapping is part of the
/// config structure, not ambient global state).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingDescriptor {
    pub remote_model_id: String,
    pub dimension: usize,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    inputs: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f64>>,
}

#[derive(Clone)]
pub struct EmbeddingClient {
    http: reqwest::Client,
    base_url: String,
}

impl EmbeddingClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
        }
    }

    pub async fn embed(&self, descriptor: &EmbeddingDescriptor, texts: &[String]) -> Result<Vec<Vec<f64>>> {
        let response = self
            .http
            .post(format!("{}/embed", self.base_url))
            .json(&EmbedRequest {
                model: &descriptor.remote_model_id,
                inputs: texts,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ModelError::EmbeddingService(format!(
                "embedding service returned {}",
                response.status()
            )));
        }

        let body: EmbedResponse = response
            .json()
            .await
            .map_err(|e| ModelError::EmbeddingService(e.to_string()))?;

        for v in &body.embeddings {
            if v.len() != descriptor.dimension {
                return Err(ModelError::ShapeMismatch {
                    expected: descriptor.dimension,
                    actual: v.len(),
                });
            }
        }

        Ok(body.embeddings)
    }
}
