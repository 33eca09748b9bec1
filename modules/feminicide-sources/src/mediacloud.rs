//! Full-text index adapter (MediaCloud-style), `spec.md` §4.4.
//!
//! Paginates by an opaque "last processed" integer cursor, page size 100.
//! Bounded exponential backoff with jitter on 5xx/connection errors, grounded
//! on the retry shape in `rootsignal-archive::services::page::ChromePageService`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feminicide_common::{CandidateArticle, Project, ProjectHistory, Source};
use rand::Rng;
use serde::Deserialize;
use tracing::warn;

use crate::adapter::{DateWindow, SourceAdapter};
use crate::error::{Result, SourceError};

const PAGE_SIZE: u32 = 100;
const MAX_ATTEMPTS_PER_PAGE: u32 = 5;
const RETRY_BASE: Duration = Duration::from_millis(500);
/// Full-text index cap is larger than the archive-style adapters' 5000
/// (`spec.md` §9 Open Question resolution).
const DEFAULT_MAX_STORIES_PER_PROJECT: u32 = 40_000;

#[derive(Debug, Deserialize)]
struct McPage {
    results: Vec<McStory>,
    next_cursor: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct McStory {
    stories_id: i64,
    url: String,
    title: Option<String>,
    language: Option<String>,
    publication_date: Option<DateTime<Utc>>,
    domain: Option<String>,
}

pub struct MediaCloudAdapter {
    http: reqwest::Client,
    base_url: String,
    api_token: String,
    max_stories_per_project: u32,
}

impl MediaCloudAdapter {
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_token: api_token.into(),
            max_stories_per_project: DEFAULT_MAX_STORIES_PER_PROJECT,
        }
    }

    pub fn with_max_stories_per_project(mut self, max: u32) -> Self {
        self.max_stories_per_project = max;
        self
    }

    async fn fetch_page(&self, project: &Project, window: DateWindow, cursor: i64) -> Result<McPage> {
        let mut last_err = None;
        for attempt in 0..MAX_ATTEMPTS_PER_PAGE {
            let result = self
                .http
                .get(format!("{}/stories.json", self.base_url))
                .query(&[
                    ("token", self.api_token.as_str()),
                    ("q", project.search_terms.as_str()),
                    ("language", project.language.as_str()),
                    ("start_date", &window.start.to_rfc3339()),
                    ("end_date", &window.end.to_rfc3339()),
                    ("cursor", &cursor.to_string()),
                    ("page_size", &PAGE_SIZE.to_string()),
                ])
                .send()
                .await;

            match result {
                Ok(resp) if resp.status().is_success() => {
                    return resp
                        .json::<McPage>()
                        .await
                        .map_err(|e| SourceError::Decode(e.to_string()));
                }
                Ok(resp) if resp.status().is_server_error() => {
                    last_err = Some(SourceError::Transient(format!("mediacloud returned {}", resp.status())));
                }
                Ok(resp) => {
                    return Err(SourceError::Decode(format!(
                        "mediacloud returned non-retryable status {}",
                        resp.status()
                    )));
                }
                Err(e) => last_err = Some(SourceError::Http(e)),
            }

            if attempt + 1 < MAX_ATTEMPTS_PER_PAGE {
                let backoff = RETRY_BASE * 2u32.pow(attempt);
                let jitter = Duration::from_millis(rand::rng().random_range(0..250));
                tokio::time::sleep(backoff + jitter).await;
            }
        }
        Err(last_err.unwrap_or_else(|| SourceError::Transient("mediacloud page fetch failed".to_string())))
    }

    /// Re-fetches stories by their native id, for the `queue-unposted-retry`
    /// entrypoint which already has scores in the audit log and just needs
    /// fresh article metadata to post (`original_source/scripts/queue_unposted_stories.py`
    /// builds the `stories_id:(...)` query the same way).
    pub async fn fetch_by_ids(&self, project: &Project, stories_ids: &[i64]) -> Result<Vec<CandidateArticle>> {
        if stories_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids_query = stories_ids.iter().map(i64::to_string).collect::<Vec<_>>().join(" ");
        let q = format!("stories_id:({ids_query})");
        let page_size = stories_ids.len().to_string();
        let response = self
            .http
            .get(format!("{}/stories.json", self.base_url))
            .query(&[("token", self.api_token.as_str()), ("q", q.as_str()), ("page_size", page_size.as_str())])
            .send()
            .await
            .map_err(SourceError::Http)?;

        if !response.status().is_success() {
            return Err(SourceError::Decode(format!("mediacloud returned {}", response.status())));
        }

        let page: McPage = response.json().await.map_err(|e| SourceError::Decode(e.to_string()))?;

        Ok(page
            .results
            .into_iter()
            .map(|story| {
                let media_url = story.domain.clone();
                CandidateArticle {
                    source: Source::MediaCloud,
                    url: story.url,
                    title: story.title,
                    language: story.language,
                    publish_date: story.publication_date,
                    media_url: media_url.clone(),
                    media_name: media_url,
                    project_id: project.id,
                    language_model_id: project.language_model_id,
                    story_text: None,
                    metadata: Some(feminicide_common::SourceMetadata::MediaCloud {
                        media_id: Some(story.stories_id),
                    }),
                    stories_id: Some(story.stories_id),
                    log_db_id: None,
                }
            })
            .collect())
    }
}

#[async_trait]
impl SourceAdapter for MediaCloudAdapter {
    async fn iterate(
        &self,
        project: &Project,
        window: DateWindow,
        history: Option<&ProjectHistory>,
    ) -> Result<Vec<CandidateArticle>> {
        let mut cursor = history.and_then(|h| h.last_processed_id).unwrap_or(0);
        let mut out = Vec::new();

        loop {
            if out.len() as u32 >= self.max_stories_per_project {
                break;
            }

            let page = match self.fetch_page(project, window, cursor).await {
                Ok(p) => p,
                Err(e) => {
                    warn!(project_id = project.id, error = %e, "mediacloud adapter giving up on project for this run");
                    break;
                }
            };

            if page.results.is_empty() {
                break;
            }

            for story in page.results {
                let media_url = story.domain.clone();
                out.push(CandidateArticle {
                    source: Source::MediaCloud,
                    url: story.url,
                    title: story.title,
                    language: story.language,
                    publish_date: story.publication_date,
                    media_url: media_url.clone(),
                    media_name: media_url,
                    project_id: project.id,
                    language_model_id: project.language_model_id,
                    story_text: None,
                    metadata: Some(feminicide_common::SourceMetadata::MediaCloud {
                        media_id: Some(story.stories_id),
                    }),
                    stories_id: Some(story.stories_id),
                    log_db_id: None,
                });
                if out.len() as u32 >= self.max_stories_per_project {
                    break;
                }
            }

            cursor = match page.next_cursor {
                Some(c) => c,
                None => break,
            };
        }

        Ok(out)
    }

    fn cap(&self) -> Option<u32> {
        Some(self.max_stories_per_project)
    }
}
