//! Uniform scoring across tf-idf and embedding-backed stages, chained or not
//! (`spec.md` §4.3).

use feminicide_common::{ModelSpec, ModelStage, ModelType, VectorizerType};

use crate::artifact::{self, ArtifactModelKind, LinearModel, TfidfVectorizer};
use crate::embeddings::{EmbeddingClient, EmbeddingDescriptor};
use crate::error::{ModelError, Result};
use crate::registry::ModelRegistry;

/// `{model_1, model_2, combined}` for one article (`spec.md` §4.3).
/// `model_2`/`combined` equal `model_1` for non-chained specs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreSet {
    pub model_1: f64,
    pub model_2: Option<f64>,
    pub combined: f64,
}

enum Vectorizer {
    Tfidf(TfidfVectorizer),
    Embeddings(EmbeddingDescriptor),
}

struct Stage {
    vectorizer: Vectorizer,
    model: LinearModel,
}

impl Stage {
    async fn vectorize(&self, embedding_client: &EmbeddingClient, texts: &[String]) -> Result<Vec<Vec<f64>>> {
        match &self.vectorizer {
            Vectorizer::Tfidf(v) => Ok(v.transform(texts)),
            Vectorizer::Embeddings(descriptor) => embedding_client.embed(descriptor, texts).await,
        }
    }
}

/// Loads and runs a project's one- or two-stage model pipeline.
pub struct Classifier {
    stage_1: Stage,
    stage_2: Option<Stage>,
    embedding_client: EmbeddingClient,
}

impl Classifier {
    pub async fn load(
        registry: &ModelRegistry,
        spec: &ModelSpec,
        project_language: &str,
        embedding_client: EmbeddingClient,
    ) -> Result<Self> {
        let stage_1 = load_stage(registry, &spec.filename_prefix, 1, &spec.stage_1, project_language).await?;
        let stage_2 = match &spec.stage_2 {
            Some(s) => Some(load_stage(registry, &spec.filename_prefix, 2, s, project_language).await?),
            None => None,
        };

        if spec.chained_models && stage_2.is_none() {
            return Err(ModelError::MissingArtifact(format!(
                "spec {} declares chained_models but has no stage_2",
                spec.id
            )));
        }

        Ok(Self {
            stage_1,
            stage_2,
            embedding_client,
        })
    }

    /// Scores a batch of article texts, vectorized together per stage
    /// (`spec.md` §5: "articles are processed as a vector").
    pub async fn classify(&self, texts: &[String]) -> Result<Vec<ScoreSet>> {
        let vectors_1 = self.stage_1.vectorize(&self.embedding_client, texts).await?;
        let scores_1 = self.stage_1.model.predict_proba(&vectors_1)?;

        let Some(stage_2) = &self.stage_2 else {
            return Ok(scores_1
                .into_iter()
                .map(|s1| ScoreSet {
                    model_1: s1,
                    model_2: None,
                    combined: s1,
                })
                .collect());
        };

        let vectors_2 = stage_2.vectorize(&self.embedding_client, texts).await?;
        let scores_2 = stage_2.model.predict_proba(&vectors_2)?;

        Ok(scores_1
            .into_iter()
            .zip(scores_2)
            .map(|(s1, s2)| ScoreSet {
                model_1: s1,
                model_2: Some(s2),
                combined: s1 * s2,
            })
            .collect())
    }
}

async fn load_stage(
    registry: &ModelRegistry,
    filename_prefix: &str,
    stage_number: u8,
    stage: &ModelStage,
    project_language: &str,
) -> Result<Stage> {
    let model_path = registry.artifact_path(filename_prefix, stage_number, "model");
    let model_bytes = tokio::fs::read(&model_path)
        .await
        .map_err(|_| ModelError::MissingArtifact(model_path.display().to_string()))?;
    let mut model = artifact::deserialize_model(&model_bytes, &model_path.display().to_string())?;
    model.kind = match stage.model_type {
        ModelType::LogisticRegression => ArtifactModelKind::LogisticRegression,
        ModelType::NaiveBayes => ArtifactModelKind::NaiveBayes,
    };

    let vectorizer = match stage.vectorizer_type {
        VectorizerType::Tfidf => {
            let path = registry.artifact_path(filename_prefix, stage_number, "vectorizer");
            let bytes = tokio::fs::read(&path)
                .await
                .map_err(|_| ModelError::MissingArtifact(path.display().to_string()))?;
            Vectorizer::Tfidf(artifact::deserialize_vectorizer(&bytes, &path.display().to_string())?)
        }
        VectorizerType::Embeddings => {
            let subdir = if project_language.eq_ignore_ascii_case("en") {
                "embeddings-en"
            } else {
                "embeddings-multi"
            };
            let descriptor_path = registry.model_dir().join(subdir).join("descriptor.json");
            let bytes = tokio::fs::read(&descriptor_path)
                .await
                .map_err(|_| ModelError::MissingArtifact(descriptor_path.display().to_string()))?;
            let descriptor: EmbeddingDescriptor = serde_json::from_slice(&bytes)
                .map_err(|e| ModelError::EmbeddingService(e.to_string()))?;
            Vectorizer::Embeddings(descriptor)
        }
    };

    Ok(Stage { vectorizer, model })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn toy_stage(coefficients: Vec<f64>, intercept: f64) -> Stage {
        let mut vocabulary = HashMap::new();
        vocabulary.insert("femicide".to_string(), 0u32);
        vocabulary.insert("murder".to_string(), 1u32);
        Stage {
            vectorizer: Vectorizer::Tfidf(TfidfVectorizer {
                vocabulary,
                idf: vec![1.0, 1.0],
            }),
            model: LinearModel {
                coefficients,
                intercept,
                kind: ArtifactModelKind::LogisticRegression,
            },
        }
    }

    #[tokio::test]
    async fn non_chained_combined_equals_model_1() {
        let classifier = Classifier {
            stage_1: toy_stage(vec![2.0, 0.0], 0.0),
            stage_2: None,
            embedding_client: EmbeddingClient::new("http://localhost:0"),
        };

        let scores = classifier.classify(&["femicide femicide".to_string()]).await.unwrap();
        assert_eq!(scores[0].model_2, None);
        assert_eq!(scores[0].combined, scores[0].model_1);
    }

    #[tokio::test]
    async fn chained_combined_is_the_product() {
        let classifier = Classifier {
            stage_1: toy_stage(vec![2.0, 0.0], 0.0),
            stage_2: Some(toy_stage(vec![0.0, 1.5], 0.0)),
            embedding_client: EmbeddingClient::new("http://localhost:0"),
        };

        let scores = classifier
            .classify(&["femicide murder".to_string()])
            .await
            .unwrap();
        let s = scores[0];
        assert!((s.combined - s.model_1 * s.model_2.unwrap()).abs() < 1e-9);
    }
}
