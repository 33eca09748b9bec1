//! Content extractor (`spec.md` §4.5): fetches a URL, returns cleaned
//! article text/title/language/publish date/canonical domain, or `None` on
//! failure. LRU-cached by URL.

use std::num::NonZeroUsize;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use lru::LruCache;
use spider_transformations::transformation::content::{
    transform_content_input, ReturnFormat, TransformConfig, TransformInput,
};
use tokio::sync::Mutex;
use tracing::warn;

/// Mirrors the original's `@lru_cache(maxsize=50000)` over
/// `mcmetadata.extract` (`original_source/scripts/tasks.py`).
const CACHE_CAPACITY: usize = 50_000;

#[derive(Debug, Clone)]
pub struct ExtractedContent {
    pub text: String,
    pub title: Option<String>,
    pub publish_date: Option<DateTime<Utc>>,
    pub language: Option<String>,
    pub canonical_domain: Option<String>,
}

pub struct ContentExtractor {
    http: reqwest::Client,
    cache: Arc<Mutex<LruCache<String, ExtractedContent>>>,
}

impl Default for ContentExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl ContentExtractor {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            cache: Arc::new(Mutex::new(LruCache::new(
                NonZeroUsize::new(CACHE_CAPACITY).expect("capacity is nonzero"),
            ))),
        }
    }

    /// Returns `None` on any failure — one unparsable page must never abort
    /// a batch (`spec.md` §4.5, §7 ExtractionError).
    pub async fn extract(&self, url: &str) -> Option<ExtractedContent> {
        if let Some(hit) = self.cache.lock().await.get(url).cloned() {
            return Some(hit);
        }

        let result = self.fetch_and_extract(url).await;
        match result {
            Ok(content) => {
                self.cache.lock().await.put(url.to_string(), content.clone());
                Some(content)
            }
            Err(e) => {
                warn!(url, error = %e, "content extraction failed");
                None
            }
        }
    }

    async fn fetch_and_extract(&self, url: &str) -> anyhow::Result<ExtractedContent> {
        let response = self.http.get(url).send().await?.error_for_status()?;
        let html = response.bytes().await?;

        let parsed_url = url::Url::parse(url).ok();
        let config = TransformConfig {
            readability: true,
            main_content: true,
            return_format: ReturnFormat::Markdown,
            filter_images: true,
            filter_svg: true,
            clean_html: true,
        };
        let input = TransformInput {
            url: parsed_url.as_ref(),
            content: html.as_ref(),
            screenshot_bytes: None,
            encoding: None,
            selector_config: None,
            ignore_tags: None,
        };

        let text = transform_content_input(input, &config);
        if text.trim().is_empty() {
            anyhow::bail!("extracted empty content for {url}");
        }

        let title = extract_title(&html);
        let canonical_domain = parsed_url.as_ref().and_then(|u| u.host_str()).map(|h| h.to_string());

        Ok(ExtractedContent {
            text,
            title,
            publish_date: None,
            language: None,
            canonical_domain,
        })
    }
}

fn extract_title(html: &[u8]) -> Option<String> {
    let haystack = String::from_utf8_lossy(html);
    let start = haystack.find("<title>")? + "<title>".len();
    let end = haystack[start..].find("</title>")? + start;
    Some(haystack[start..end].trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_title_finds_the_title_tag() {
        let html = b"<html><head><title>  A Story  </title></head><body></body></html>";
        assert_eq!(extract_title(html), Some("A Story".to_string()));
    }

    #[test]
    fn extract_title_returns_none_without_a_title_tag() {
        let html = b"<html><body>no title here</body></html>";
        assert_eq!(extract_title(html), None);
    }
}
