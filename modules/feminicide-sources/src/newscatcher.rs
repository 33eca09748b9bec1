//! Rate-limited commercial API adapter (Newscatcher-style), `spec.md` §4.4.
//!
//! Paginates at page size 100, enforces ≤5 req/s via a fixed 200ms sleep
//! between calls (grounded on `ChromePageService`'s use of a concurrency
//! primitive to bound an external resource, adapted here to rate limiting
//! rather than concurrency since the constraint is calls/sec, not
//! simultaneous calls). Decode errors skip the project for this run.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use feminicide_common::{CandidateArticle, Project, ProjectHistory, Source};
use serde::Deserialize;
use tracing::warn;

use crate::adapter::{broaden_with_watermark, DateWindow, SourceAdapter};
use crate::error::{Result, SourceError};

const PAGE_SIZE: u32 = 100;
const INTER_CALL_DELAY: Duration = Duration::from_millis(200);
const DEFAULT_MAX_STORIES_PER_PROJECT: u32 = 5_000;

#[derive(Debug, Deserialize)]
struct NewscatcherPage {
    articles: Vec<NewscatcherArticle>,
    total_pages: u32,
}

#[derive(Debug, Deserialize)]
struct NewscatcherArticle {
    link: String,
    title: Option<String>,
    language: Option<String>,
    published_date: Option<DateTime<Utc>>,
    rank: Option<u32>,
}

pub struct NewscatcherAdapter {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    max_stories_per_project: u32,
}

impl NewscatcherAdapter {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            max_stories_per_project: DEFAULT_MAX_STORIES_PER_PROJECT,
        }
    }

    pub fn with_max_stories_per_project(mut self, max: u32) -> Self {
        self.max_stories_per_project = max;
        self
    }
}

#[async_trait]
impl SourceAdapter for NewscatcherAdapter {
    async fn iterate(
        &self,
        project: &Project,
        window: DateWindow,
        history: Option<&ProjectHistory>,
    ) -> Result<Vec<CandidateArticle>> {
        let effective_window = broaden_with_watermark(window, history);
        let mut out = Vec::new();
        let mut page_number = 1u32;

        loop {
            if out.len() as u32 >= self.max_stories_per_project {
                break;
            }

            let response = self
                .http
                .get(format!("{}/v1/search", self.base_url))
                .header("x-api-key", &self.api_key)
                .query(&[
                    ("q", project.search_terms.as_str()),
                    ("lang", project.language.as_str()),
                    ("from", &effective_window.start.to_rfc3339()),
                    ("to", &effective_window.end.to_rfc3339()),
                    ("page", &page_number.to_string()),
                    ("page_size", &PAGE_SIZE.to_string()),
                ])
                .send()
                .await?;

            if response.status().is_server_error() {
                return Err(SourceError::Transient(format!("newscatcher returned {}", response.status())));
            }
            if !response.status().is_success() {
                return Err(SourceError::Decode(format!("newscatcher returned {}", response.status())));
            }

            let page = match response.json::<NewscatcherPage>().await {
                Ok(p) => p,
                Err(e) => {
                    warn!(project_id = project.id, error = %e, "newscatcher decode error, skipping project this run");
                    return Ok(out);
                }
            };

            if page.articles.is_empty() {
                break;
            }

            for article in page.articles {
                out.push(CandidateArticle {
                    source: Source::Newscatcher,
                    url: article.link,
                    title: article.title,
                    language: article.language,
                    publish_date: article.published_date,
                    media_url: None,
                    media_name: None,
                    project_id: project.id,
                    language_model_id: project.language_model_id,
                    story_text: None,
                    metadata: Some(feminicide_common::SourceMetadata::Newscatcher { rank: article.rank }),
                    stories_id: None,
                    log_db_id: None,
                });
                if out.len() as u32 >= self.max_stories_per_project {
                    break;
                }
            }

            if page_number >= page.total_pages {
                break;
            }
            page_number += 1;
            tokio::time::sleep(INTER_CALL_DELAY).await;
        }

        Ok(out)
    }

    fn cap(&self) -> Option<u32> {
        Some(self.max_stories_per_project)
    }
}
