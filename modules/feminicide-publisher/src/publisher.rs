use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use feminicide_audit::AuditStore;
use feminicide_classifier::{Classifier, EmbeddingClient, ModelRegistry};
use feminicide_common::{CandidateArticle, ModelSpec};
use feminicide_entities::EntityExtractor;
use reqwest::StatusCode;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::error::{PublisherError, Result};
use crate::projection::{self, StoryOut};

/// API version sent in every post body, matching the original's module-level
/// `VERSION` constant in `projects.py`.
const API_VERSION: u32 = 2;

/// Central-server posts have no hard upper bound documented, so this is
/// generous rather than tight — a hung connection must not wedge a worker
/// forever (`spec.md` §5).
const POST_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, Serialize)]
struct ProjectOut {
    id: i64,
    title: String,
    language: String,
    language_model_id: i64,
    country: Option<String>,
}

#[derive(Debug, Serialize)]
struct PostBody<'a> {
    version: u32,
    project: ProjectOut,
    stories: &'a [StoryOut],
    apikey: &'a str,
}

/// The classify-and-post worker task (`spec.md` §4.9). Classifiers are
/// loaded once per `language_model_id` and cached for the lifetime of the
/// pool, since model artifacts are read-only for a run
/// (`spec.md` §5 "model artifacts are read-only after download").
pub struct Publisher {
    http: reqwest::Client,
    audit: AuditStore,
    entities: EntityExtractor,
    registry: ModelRegistry,
    embedding_client: EmbeddingClient,
    api_key: String,
    classifiers: Mutex<HashMap<i64, Arc<Classifier>>>,
}

impl Publisher {
    pub fn new(
        audit: AuditStore,
        entities: EntityExtractor,
        registry: ModelRegistry,
        embedding_client: EmbeddingClient,
        api_key: String,
    ) -> Self {
        Self {
            http: reqwest::Client::builder()
                .timeout(POST_TIMEOUT)
                .build()
                .expect("failed to build HTTP client"),
            audit,
            entities,
            registry,
            embedding_client,
            api_key,
            classifiers: Mutex::new(HashMap::new()),
        }
    }

    async fn classifier_for(&self, spec: &ModelSpec, language: &str) -> Result<Arc<Classifier>> {
        let mut cache = self.classifiers.lock().await;
        if let Some(c) = cache.get(&spec.id) {
            return Ok(c.clone());
        }
        let classifier = Classifier::load(&self.registry, spec, language, self.embedding_client.clone()).await?;
        let classifier = Arc::new(classifier);
        cache.insert(spec.id, classifier.clone());
        Ok(classifier)
    }

    /// Runs the full worker-task contract for one enqueued batch
    /// (`spec.md` §4.9 steps 1-5). `project` and `model_spec` come from the
    /// run's config snapshot, keyed by the batch's `project_id` /
    /// `language_model_id`.
    pub async fn process_batch(
        &self,
        articles: &[CandidateArticle],
        project_title: &str,
        project_language: &str,
        project_country: Option<&str>,
        min_confidence: f64,
        update_post_url: &str,
        model_spec: &ModelSpec,
    ) -> Result<()> {
        if articles.is_empty() {
            return Ok(());
        }

        // Step 1: score + update_processed.
        let classifier = self.classifier_for(model_spec, project_language).await?;
        let texts: Vec<String> = articles.iter().map(|a| a.story_text.clone().unwrap_or_default()).collect();
        let scores = classifier.classify(&texts).await?;

        let log_updates: Vec<(i64, f64, f64, Option<f64>)> = articles
            .iter()
            .zip(&scores)
            .filter_map(|(a, s)| a.log_db_id.map(|id| (id, s.combined, s.model_1, s.model_2)))
            .collect();
        self.audit.update_processed(&log_updates).await?;

        // Step 2: drop below-threshold articles.
        let survivors: Vec<(&CandidateArticle, f64)> = articles
            .iter()
            .zip(&scores)
            .filter(|(_, s)| s.combined >= min_confidence)
            .map(|(a, s)| (a, s.combined))
            .collect();

        info!(
            project = project_title,
            total = articles.len(),
            above_threshold = survivors.len(),
            "scored batch"
        );

        if survivors.is_empty() {
            return Ok(());
        }

        // Step 3: entities (optional, never fails the batch).
        let mut story_outs = Vec::with_capacity(survivors.len());
        for (article, confidence) in &survivors {
            let entities = match (article.story_text.as_deref(), article.language.as_deref()) {
                (Some(text), Some(language)) => {
                    let title = article.title.as_deref().unwrap_or("");
                    self.entities.entities(&format!("{title} {text}"), language, &article.url).await
                }
                _ => None,
            };
            story_outs.push(projection::project(article, *confidence, entities));
        }

        // Step 4: mark_above_threshold.
        let survivor_ids: Vec<i64> = survivors.iter().filter_map(|(a, _)| a.log_db_id).collect();
        self.audit.mark_above_threshold(&survivor_ids).await?;

        // Step 5: post to the central server.
        let body = PostBody {
            version: API_VERSION,
            project: ProjectOut {
                id: survivors[0].0.project_id,
                title: project_title.to_string(),
                language: project_language.to_string(),
                language_model_id: model_spec.id,
                country: project_country.map(str::to_string),
            },
            stories: &story_outs,
            apikey: &self.api_key,
        };

        self.post_results(update_post_url, &body).await?;
        self.audit.update_posted(&survivor_ids).await?;

        Ok(())
    }

    /// Posts a batch of articles that were already scored and marked
    /// `above_threshold` in an earlier run and just never made it to the
    /// central server (`queue-unposted-retry`, `spec.md` §6 CLI surface).
    /// Skips classification and the threshold check entirely, mirroring
    /// `original_source/scripts/queue_unposted_stories.py::process_project_task`,
    /// which re-fetches the article and posts using the score already on file.
    pub async fn retry_post_batch(
        &self,
        articles: &[(CandidateArticle, f64)],
        project_title: &str,
        project_language: &str,
        project_country: Option<&str>,
        update_post_url: &str,
        model_spec: &ModelSpec,
    ) -> Result<()> {
        if articles.is_empty() {
            return Ok(());
        }

        let mut story_outs = Vec::with_capacity(articles.len());
        for (article, confidence) in articles {
            let entities = match (article.story_text.as_deref(), article.language.as_deref()) {
                (Some(text), Some(language)) => {
                    let title = article.title.as_deref().unwrap_or("");
                    self.entities.entities(&format!("{title} {text}"), language, &article.url).await
                }
                _ => None,
            };
            story_outs.push(projection::project(article, *confidence, entities));
        }

        let body = PostBody {
            version: API_VERSION,
            project: ProjectOut {
                id: articles[0].0.project_id,
                title: project_title.to_string(),
                language: project_language.to_string(),
                language_model_id: model_spec.id,
                country: project_country.map(str::to_string),
            },
            stories: &story_outs,
            apikey: &self.api_key,
        };

        self.post_results(update_post_url, &body).await?;

        let posted_ids: Vec<i64> = articles.iter().filter_map(|(a, _)| a.log_db_id).collect();
        self.audit.update_posted(&posted_ids).await?;

        Ok(())
    }

    async fn post_results(&self, update_post_url: &str, body: &PostBody<'_>) -> Result<()> {
        let response = self
            .http
            .post(update_post_url)
            .json(body)
            .send()
            .await
            .map_err(|e| PublisherError::Transient(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        if status.is_server_error() || status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(PublisherError::Transient(format!("central server returned {status}")));
        }

        warn!(%status, "central server rejected the post, dropping batch");
        Err(PublisherError::Permanent(format!("central server returned {status}")))
    }
}
