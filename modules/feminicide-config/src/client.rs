use std::path::{Path, PathBuf};
use std::sync::Arc;

use feminicide_common::{ModelSpec, Project};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{ConfigError, Result};

const PROJECTS_SNAPSHOT_FILE: &str = "projects.json";
const MODELS_SNAPSHOT_FILE: &str = "language_models.json";

#[derive(Debug, Deserialize)]
struct ProjectsResponse {
    projects: Vec<Project>,
}

#[derive(Debug, Deserialize)]
struct ModelsResponse {
    models: Vec<ModelSpec>,
}

/// The run-scoped, read-only view of the central server's configuration
/// (`spec.md` §4.1 "process-wide snapshot"). Built once per run and threaded
/// explicitly to every component as an `Arc` — no global/lazy-static
/// singleton, per the redesign resolving `spec.md` §9's Open Question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    pub projects: Vec<Project>,
    pub models: Vec<ModelSpec>,
}

impl ConfigSnapshot {
    pub fn model_for(&self, language_model_id: i64) -> Option<&ModelSpec> {
        self.models.iter().find(|m| m.id == language_model_id)
    }
}

/// Client for the central server's story-processor config endpoints
/// (`spec.md` §4.1), grounded on `Config::from_env`'s required/optional env
/// loading and the classifier registry's atomic write-temp + rename
/// discipline, applied here to a JSON snapshot instead of a binary artifact.
pub struct ConfigClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    config_dir: PathBuf,
}

impl ConfigClient {
    pub fn new(base_url: String, api_key: String, config_dir: PathBuf) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            api_key,
            config_dir,
        }
    }

    pub async fn get_projects(&self) -> Result<Vec<Project>> {
        let url = format!("{}/api/story_processor/projects.json", self.base_url);
        let response = self.http.get(url).query(&[("apikey", &self.api_key)]).send().await?;

        if !response.status().is_success() {
            return Err(ConfigError::Http { status: response.status() });
        }

        let body: ProjectsResponse = response.json().await?;
        if body.projects.is_empty() {
            return Err(ConfigError::Empty("projects"));
        }
        Ok(body.projects)
    }

    pub async fn get_models(&self) -> Result<Vec<ModelSpec>> {
        let url = format!("{}/api/story_processor/language_models.json", self.base_url);
        let response = self.http.get(url).query(&[("apikey", &self.api_key)]).send().await?;

        if !response.status().is_success() {
            return Err(ConfigError::Http { status: response.status() });
        }

        let body: ModelsResponse = response.json().await?;
        if body.models.is_empty() {
            return Err(ConfigError::Empty("models"));
        }
        Ok(body.models)
    }

    /// Fetches both lists and persists them atomically under the config
    /// directory. On network failure, falls back to the last good snapshot
    /// on disk; fails only when neither is available (`spec.md` §4.1).
    pub async fn refresh_to_disk(&self) -> Result<Arc<ConfigSnapshot>> {
        match self.fetch_fresh().await {
            Ok(snapshot) => {
                if let Err(e) = self.write_snapshot(&snapshot).await {
                    warn!(error = %e, "failed to persist refreshed config snapshot to disk");
                }
                Ok(Arc::new(snapshot))
            }
            Err(e) => {
                warn!(error = %e, "config server unreachable, falling back to last snapshot on disk");
                self.read_snapshot().await
            }
        }
    }

    async fn fetch_fresh(&self) -> Result<ConfigSnapshot> {
        let projects = self.get_projects().await?;
        let models = self.get_models().await?;
        Ok(ConfigSnapshot { projects, models })
    }

    async fn write_snapshot(&self, snapshot: &ConfigSnapshot) -> Result<()> {
        tokio::fs::create_dir_all(&self.config_dir).await?;
        write_atomic(&self.config_dir.join(PROJECTS_SNAPSHOT_FILE), &snapshot.projects).await?;
        write_atomic(&self.config_dir.join(MODELS_SNAPSHOT_FILE), &snapshot.models).await?;
        info!(dir = %self.config_dir.display(), "wrote config snapshot to disk");
        Ok(())
    }

    async fn read_snapshot(&self) -> Result<Arc<ConfigSnapshot>> {
        let projects_path = self.config_dir.join(PROJECTS_SNAPSHOT_FILE);
        let models_path = self.config_dir.join(MODELS_SNAPSHOT_FILE);

        if !projects_path.exists() || !models_path.exists() {
            return Err(ConfigError::NoSnapshot(self.config_dir.display().to_string()));
        }

        let projects: Vec<Project> = read_json(&projects_path).await?;
        let models: Vec<ModelSpec> = read_json(&models_path).await?;
        Ok(Arc::new(ConfigSnapshot { projects, models }))
    }
}

async fn write_atomic<T: Serialize>(dest: &Path, value: &T) -> Result<()> {
    let part_path = dest.with_extension("part");
    let bytes = serde_json::to_vec_pretty(value)?;
    tokio::fs::write(&part_path, bytes).await?;
    tokio::fs::rename(&part_path, dest).await?;
    Ok(())
}

async fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_project() -> Project {
        Project {
            id: 1,
            title: "t".into(),
            language: "en".into(),
            language_model_id: 7,
            search_terms: "feminicide".into(),
            media_collections: None,
            country: None,
            rss_url: None,
            min_confidence: 0.5,
            update_post_url: "https://example.com/post".into(),
            latest_processed_stories_id: None,
            start_date: chrono::Utc::now(),
        }
    }

    #[test]
    fn model_for_finds_matching_id() {
        let snapshot = ConfigSnapshot {
            projects: vec![sample_project()],
            models: vec![feminicide_common::ModelSpec {
                id: 7,
                filename_prefix: "feminicide_en".into(),
                chained_models: false,
                stage_1: feminicide_common::ModelStage {
                    model_type: feminicide_common::ModelType::NaiveBayes,
                    vectorizer_type: feminicide_common::VectorizerType::Tfidf,
                    artifact_urls: vec![],
                },
                stage_2: None,
            }],
        };

        assert!(snapshot.model_for(7).is_some());
        assert!(snapshot.model_for(999).is_none());
    }

    #[tokio::test]
    async fn refresh_falls_back_to_disk_when_server_unreachable() {
        let dir = tempfile::tempdir().unwrap();
        let snapshot = ConfigSnapshot {
            projects: vec![sample_project()],
            models: vec![],
        };
        write_atomic(&dir.path().join(PROJECTS_SNAPSHOT_FILE), &snapshot.projects).await.unwrap();
        write_atomic(&dir.path().join(MODELS_SNAPSHOT_FILE), &snapshot.models).await.unwrap();

        // A port nothing listens on, so the HTTP fetch fails immediately.
        let client = ConfigClient::new("http://127.0.0.1:1".into(), "key".into(), dir.path().to_path_buf());
        let result = client.refresh_to_disk().await.unwrap();
        assert_eq!(result.projects.len(), 1);
        assert_eq!(result.projects[0].id, 1);
    }

    #[tokio::test]
    async fn refresh_fails_without_network_or_disk_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let client = ConfigClient::new("http://127.0.0.1:1".into(), "key".into(), dir.path().to_path_buf());
        let result = client.refresh_to_disk().await;
        assert!(result.is_err());
    }
}
