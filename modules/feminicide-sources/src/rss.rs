//! RSS/Atom push adapter (`spec.md` §4.4).
//!
//! Stops at the first item whose URL equals `ProjectHistory.last_url` (the
//! idempotence anchor). Normalizes redirector links by unwrapping the
//! wrapped `url` query parameter and stripping `utm_*` tracking parameters
//! before the anchor comparison — ported from the original
//! `scripts/queue_googlealerts_stories.py::_strip_google_redirect` intent of
//! keeping cosmetic query-string differences from defeating de-duplication.

use async_trait::async_trait;
use feminicide_common::{CandidateArticle, Project, ProjectHistory, Source};
use url::Url;

use crate::adapter::{DateWindow, SourceAdapter};
use crate::error::{Result, SourceError};

pub struct RssAdapter {
    http: reqwest::Client,
}

impl Default for RssAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl RssAdapter {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

/// Unwraps a redirector link's wrapped `url` query parameter (if present)
/// and strips `utm_*` tracking parameters, so the normalized form is stable
/// across cosmetic differences.
pub fn normalize_link(raw: &str) -> String {
    let Ok(mut parsed) = Url::parse(raw) else {
        return raw.to_string();
    };

    if let Some(wrapped) = parsed.query_pairs().find(|(k, _)| k == "url").map(|(_, v)| v.into_owned()) {
        if let Ok(inner) = Url::parse(&wrapped) {
            parsed = inner;
        }
    }

    let kept: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(k, _)| !k.starts_with("utm_"))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if kept.is_empty() {
        parsed.set_query(None);
    } else {
        let query = kept
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        parsed.set_query(Some(&query));
    }

    parsed.to_string()
}

#[async_trait]
impl SourceAdapter for RssAdapter {
    async fn iterate(
        &self,
        project: &Project,
        _window: DateWindow,
        history: Option<&ProjectHistory>,
    ) -> Result<Vec<CandidateArticle>> {
        let Some(feed_url) = &project.rss_url else {
            return Ok(Vec::new());
        };

        let body = self
            .http
            .get(feed_url)
            .send()
            .await?
            .error_for_status()
            .map_err(SourceError::Http)?
            .bytes()
            .await?;

        let feed = feed_rs::parser::parse(body.as_ref()).map_err(|e| SourceError::Decode(e.to_string()))?;

        let anchor = history.and_then(|h| h.last_url.as_deref()).map(normalize_link);

        let mut out = Vec::new();
        for entry in feed.entries {
            let Some(link) = entry.links.first().map(|l| l.href.clone()) else {
                continue;
            };
            let normalized = normalize_link(&link);

            if anchor.as_deref() == Some(normalized.as_str()) {
                break;
            }

            let title = entry.title.map(|t| t.content);
            let publish_date = entry.published.or(entry.updated);

            out.push(CandidateArticle {
                source: Source::RssAlerts,
                url: normalized,
                title,
                language: Some(project.language.clone()),
                publish_date,
                media_url: None,
                media_name: None,
                project_id: project.id,
                language_model_id: project.language_model_id,
                story_text: None,
                metadata: Some(feminicide_common::SourceMetadata::RssAlerts {
                    feed_url: feed_url.clone(),
                }),
                stories_id: None,
                log_db_id: None,
            });
        }

        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unwraps_google_alerts_redirector() {
        let wrapped = "https://www.google.com/url?rct=j&sa=t&url=https%3A%2F%2Fexample.com%2Fstory%3Futm_source%3Dalert%26utm_medium%3Demail";
        let normalized = normalize_link(wrapped);
        assert_eq!(normalized, "https://example.com/story");
    }

    #[test]
    fn strips_utm_params_on_plain_links() {
        let link = "https://example.com/story?utm_source=x&id=42";
        assert_eq!(normalize_link(link), "https://example.com/story?id=42");
    }

    #[test]
    fn leaves_links_without_tracking_params_untouched() {
        let link = "https://example.com/story?id=42";
        assert_eq!(normalize_link(link), link);
    }
}
