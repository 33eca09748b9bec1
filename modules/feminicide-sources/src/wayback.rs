//! Wayback archive adapter (`spec.md` §4.4).
//!
//! Resolves a project's collection ids into a set of publisher domains via a
//! process-local cache, builds a boolean query, and splits it when it grows
//! past 16 KiB (ported from `_query_builder`/the halving loop in the
//! original `scripts/queue_wayback_stories.py`).

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use feminicide_common::{CandidateArticle, Project, ProjectHistory, Source};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::adapter::{broaden_with_watermark, DateWindow, SourceAdapter};
use crate::error::{Result, SourceError};

const DEFAULT_DAY_OFFSET: i64 = 4;
const DEFAULT_DAY_WINDOW: i64 = 3;
const QUERY_SIZE_LIMIT_BYTES: usize = 16 * 1024;
const PAGE_SIZE: u32 = 100;
const DEFAULT_MAX_STORIES_PER_PROJECT: u32 = 5_000;

#[derive(Debug, Deserialize)]
struct WaybackPage {
    results: Vec<WaybackStory>,
}

#[derive(Debug, Deserialize)]
struct WaybackStory {
    url: String,
    title: Option<String>,
    language: Option<String>,
    publication_date: Option<DateTime<Utc>>,
    domain: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CollectionSourcesResponse {
    results: Vec<CollectionSource>,
}

#[derive(Debug, Deserialize)]
struct CollectionSource {
    name: Option<String>,
}

pub struct WaybackAdapter {
    http: reqwest::Client,
    base_url: String,
    /// Process-local, lock-protected cache of collection id -> domains
    /// (`spec.md` §5 shared-resource policy). Not TTL'd — left exactly as
    /// unspecified in `spec.md` §9.
    domain_cache: Arc<RwLock<HashMap<String, Vec<String>>>>,
    max_stories_per_project: u32,
}

impl WaybackAdapter {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            domain_cache: Arc::new(RwLock::new(HashMap::new())),
            max_stories_per_project: DEFAULT_MAX_STORIES_PER_PROJECT,
        }
    }

    pub fn with_max_stories_per_project(mut self, max: u32) -> Self {
        self.max_stories_per_project = max;
        self
    }

    async fn domains_for_collection(&self, collection_id: &str) -> Result<Vec<String>> {
        if let Some(cached) = self.domain_cache.read().await.get(collection_id) {
            return Ok(cached.clone());
        }

        let response = self
            .http
            .get(format!("{}/collections/{}/sources.json", self.base_url, collection_id))
            .send()
            .await?
            .error_for_status()
            .map_err(SourceError::Http)?
            .json::<CollectionSourcesResponse>()
            .await
            .map_err(|e| SourceError::Decode(e.to_string()))?;

        let domains: Vec<String> = response.results.into_iter().filter_map(|s| s.name).collect();
        self.domain_cache
            .write()
            .await
            .insert(collection_id.to_string(), domains.clone());
        Ok(domains)
    }

    async fn domains_for_project(&self, project: &Project) -> Result<Vec<String>> {
        let mut seen = HashSet::new();
        let mut domains = Vec::new();
        for cid in project.media_collections.iter().flatten() {
            for d in self.domains_for_collection(cid).await? {
                if seen.insert(d.clone()) {
                    domains.push(d);
                }
            }
        }
        Ok(domains)
    }

    async fn fetch_query(&self, query: &str, window: DateWindow, remaining_cap: u32) -> Result<Vec<CandidateArticle>> {
        let mut out = Vec::new();
        let mut page_number = 0u32;
        loop {
            if out.len() as u32 >= remaining_cap {
                break;
            }
            let response = self
                .http
                .get(format!("{}/search.json", self.base_url))
                .query(&[
                    ("q", query),
                    ("start_date", &window.start.to_rfc3339()),
                    ("end_date", &window.end.to_rfc3339()),
                    ("page", &page_number.to_string()),
                    ("page_size", &PAGE_SIZE.to_string()),
                ])
                .send()
                .await?;

            if !response.status().is_success() {
                if response.status().is_server_error() {
                    return Err(SourceError::Transient(format!("wayback returned {}", response.status())));
                }
                return Err(SourceError::Decode(format!("wayback returned {}", response.status())));
            }

            let page: WaybackPage = response.json().await.map_err(|e| SourceError::Decode(e.to_string()))?;
            if page.results.is_empty() {
                break;
            }

            for story in page.results {
                let media_url = story.domain.clone();
                out.push(CandidateArticle {
                    source: Source::Wayback,
                    url: story.url,
                    title: story.title,
                    language: story.language,
                    publish_date: story.publication_date,
                    media_url: media_url.clone(),
                    media_name: media_url.clone(),
                    project_id: 0,
                    language_model_id: 0,
                    story_text: None,
                    metadata: Some(feminicide_common::SourceMetadata::Wayback { domain: media_url }),
                    stories_id: None,
                    log_db_id: None,
                });
                if out.len() as u32 >= remaining_cap {
                    break;
                }
            }
            page_number += 1;
        }
        Ok(out)
    }
}

/// `(terms) AND (language:lang) AND (domain:d1 OR domain:d2 OR …)`, ported
/// directly from `_query_builder`.
pub fn build_query(terms: &str, language: &str, domains: &[String]) -> String {
    let domain_clause = domains
        .iter()
        .map(|d| format!("domain:{d}"))
        .collect::<Vec<_>>()
        .join(" OR ");
    format!("({terms}) AND (language:{language}) AND ({domain_clause})")
}

/// Splits the domain set in halves, repeatedly, until every shard's query
/// fits under `QUERY_SIZE_LIMIT_BYTES` (`spec.md` §4.4, §8 boundary case).
pub fn build_queries(terms: &str, language: &str, domains: &[String]) -> Vec<String> {
    let full = build_query(terms, language, domains);
    if full.len() <= QUERY_SIZE_LIMIT_BYTES || domains.len() <= 1 {
        return vec![full];
    }
    let mid = domains.len() / 2;
    let mut queries = build_queries(terms, language, &domains[..mid]);
    queries.extend(build_queries(terms, language, &domains[mid..]));
    queries
}

/// `[now - (offset+window), now - offset]`, broadened to
/// `last_publish_date - 1 day` when that watermark is earlier
/// (`spec.md` §4.4). `reference_now` is `window.end` from the caller so the
/// computation stays deterministic and testable.
fn compute_window(reference_now: DateTime<Utc>, history: Option<&ProjectHistory>) -> DateWindow {
    let end = reference_now - ChronoDuration::days(DEFAULT_DAY_OFFSET);
    let start = end - ChronoDuration::days(DEFAULT_DAY_WINDOW);
    broaden_with_watermark(DateWindow { start, end }, history)
}

#[async_trait]
impl SourceAdapter for WaybackAdapter {
    async fn iterate(
        &self,
        project: &Project,
        window: DateWindow,
        history: Option<&ProjectHistory>,
    ) -> Result<Vec<CandidateArticle>> {
        let effective_window = compute_window(window.end, history);
        let domains = self.domains_for_project(project).await?;
        if domains.is_empty() {
            return Ok(Vec::new());
        }

        let queries = build_queries(&project.search_terms, &project.language, &domains);
        let mut out = Vec::new();
        for query in queries {
            if out.len() as u32 >= self.max_stories_per_project {
                break;
            }
            let remaining = self.max_stories_per_project - out.len() as u32;
            let mut shard = self.fetch_query(&query, effective_window, remaining).await?;
            for c in &mut shard {
                c.project_id = project.id;
                c.language_model_id = project.language_model_id;
            }
            out.extend(shard);
        }

        out.truncate(self.max_stories_per_project as usize);
        Ok(out)
    }

    fn cap(&self) -> Option<u32> {
        Some(self.max_stories_per_project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_splits_when_over_the_byte_limit() {
        let domains: Vec<String> = (0..5000).map(|i| format!("publisher-{i}.example.com")).collect();
        let queries = build_queries("feminicide", "en", &domains);
        assert!(queries.len() > 1);
        for q in &queries {
            assert!(q.len() <= QUERY_SIZE_LIMIT_BYTES);
        }

        let union: HashSet<String> = queries
            .iter()
            .flat_map(|q| {
                q.split("domain:")
                    .skip(1)
                    .map(|s| s.split(' ').next().unwrap_or("").trim_end_matches(')').to_string())
            })
            .collect();
        assert_eq!(union.len(), domains.len(), "union of shard domains must equal the unsharded set");
    }

    #[test]
    fn small_domain_set_is_not_split() {
        let domains = vec!["a.example.com".to_string(), "b.example.com".to_string()];
        let queries = build_queries("feminicide", "en", &domains);
        assert_eq!(queries.len(), 1);
    }

    #[test]
    fn watermark_broadens_the_start_when_earlier() {
        let now = Utc::now();
        let history = ProjectHistory {
            project_id: 1,
            last_processed_id: None,
            last_publish_date: Some(now - ChronoDuration::days(30)),
            last_url: None,
            created_at: now,
            updated_at: now,
        };
        let window = compute_window(now, Some(&history));
        assert_eq!(window.start, now - ChronoDuration::days(30) - ChronoDuration::days(1));
    }

    #[test]
    fn default_window_is_used_without_history() {
        let now = Utc::now();
        let window = compute_window(now, None);
        assert_eq!(window.end, now - ChronoDuration::days(DEFAULT_DAY_OFFSET));
        assert_eq!(
            window.start,
            now - ChronoDuration::days(DEFAULT_DAY_OFFSET) - ChronoDuration::days(DEFAULT_DAY_WINDOW)
        );
    }
}
