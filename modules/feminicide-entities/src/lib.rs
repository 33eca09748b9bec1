//! Entity extractor (`spec.md` §4.6). Given text + language, returns a
//! filtered list of named entities via HTTP POST to a configured service.
//! Unconfigured service, HTTP errors, and JSON decode errors all produce
//! `None` — articles still proceed (`original_source/processor/tasks.py`'s
//! `_add_entities_to_stories` swallow-and-continue).

use serde::{Deserialize, Serialize};
use tracing::{error, warn};

/// Only entities of these types are retained, lowercased — ported directly
/// from `ACCEPTED_ENTITY_TYPES`.
pub const ACCEPTED_ENTITY_TYPES: &[&str] = &["PERSON", "PER", "GPE", "LOC", "FAC", "DATE", "TIME", "C_DATE", "C_AGE"];

#[derive(Debug, Serialize)]
struct EntityRequest<'a> {
    content: &'a str,
    language: &'a str,
    url: &'a str,
}

#[derive(Debug, Deserialize)]
struct EntityResponse {
    results: EntityResults,
}

#[derive(Debug, Deserialize)]
struct EntityResults {
    entities: Vec<EntityHit>,
}

#[derive(Debug, Deserialize)]
struct EntityHit {
    #[serde(rename = "type")]
    kind: String,
    text: String,
}

#[derive(Clone)]
pub struct EntityExtractor {
    http: reqwest::Client,
    server_url: Option<String>,
}

impl EntityExtractor {
    /// `server_url` is `None` when `ENTITY_SERVER_URL` is unset — mirrors
    /// `entities.server_address_set()`.
    pub fn new(server_url: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            server_url,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.server_url.is_some()
    }

    /// `text` is expected to be `title + " " + story_text`, matching the
    /// original's concatenation before sending to the entity server.
    pub async fn entities(&self, text: &str, language: &str, url: &str) -> Option<Vec<String>> {
        let server_url = self.server_url.as_ref()?;

        let response = match self
            .http
            .post(format!("{server_url}/entities"))
            .json(&EntityRequest { content: text, language, url })
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "entity extractor request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "entity extractor returned non-2xx");
            return None;
        }

        let body: EntityResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                error!(error = %e, "entity extractor returned undecodable JSON");
                return None;
            }
        };

        Some(
            body.results
                .entities
                .into_iter()
                .filter(|e| ACCEPTED_ENTITY_TYPES.contains(&e.kind.as_str()))
                .map(|e| e.text.to_lowercase())
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unconfigured_service_returns_none() {
        let extractor = EntityExtractor::new(None);
        assert!(!extractor.is_configured());
        assert_eq!(extractor.entities("text", "en", "https://example.com").await, None);
    }
}
