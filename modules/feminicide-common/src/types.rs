use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Which adapter discovered a candidate article (`spec.md` §3, §4.4).
///
/// The original Python stores this as a free-form string column. `Other`
/// keeps that looseness for anything the central server's project config
/// names that this build doesn't have a dedicated adapter for, while still
/// giving call sites exhaustive matching over the four built-in sources.
/// (De)serializes as the plain string, not a tagged enum.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Source {
    MediaCloud,
    Wayback,
    RssAlerts,
    Newscatcher,
    Other(String),
}

impl Serialize for Source {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Source {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer).map_err(D::Error::custom)?;
        Ok(s.parse().expect("Source::from_str is infallible"))
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::MediaCloud => write!(f, "mediacloud"),
            Source::Wayback => write!(f, "wayback"),
            Source::RssAlerts => write!(f, "rss-alerts"),
            Source::Newscatcher => write!(f, "newscatcher"),
            Source::Other(s) => write!(f, "{s}"),
        }
    }
}

impl std::str::FromStr for Source {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "mediacloud" => Source::MediaCloud,
            "wayback" => Source::Wayback,
            "rss-alerts" | "rss" => Source::RssAlerts,
            "newscatcher" => Source::Newscatcher,
            other => Source::Other(other.to_string()),
        })
    }
}

/// Vectorizer family a model stage pairs with its predictor (`spec.md` §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VectorizerType {
    Tfidf,
    Embeddings,
}

/// Predictor family a model stage loads (`spec.md` §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelType {
    NaiveBayes,
    LogisticRegression,
}

/// One stage of a (possibly chained) `ModelSpec` (`spec.md` §3, §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelStage {
    pub model_type: ModelType,
    pub vectorizer_type: VectorizerType,
    /// Artifact URLs for this stage: vectorizer first, predictor second,
    /// matching the order `refresh_models()` downloads them in.
    pub artifact_urls: Vec<String>,
}

/// A project's configured model pipeline, from the central server's model
/// catalog (`spec.md` §3, `language-models.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    pub id: i64,
    pub filename_prefix: String,
    pub chained_models: bool,
    pub stage_1: ModelStage,
    /// Present iff `chained_models`.
    pub stage_2: Option<ModelStage>,
}

/// A project definition as served by the central server (`spec.md` §3,
/// `projects.json`). Refreshed once per run by C1 and treated as read-only
/// for the run's duration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub title: String,
    /// ISO 639-1.
    pub language: String,
    pub language_model_id: i64,
    pub search_terms: String,
    pub media_collections: Option<Vec<String>>,
    /// ISO 3166-1 alpha-2.
    pub country: Option<String>,
    pub rss_url: Option<String>,
    pub min_confidence: f64,
    pub update_post_url: String,
    pub latest_processed_stories_id: Option<i64>,
    pub start_date: DateTime<Utc>,
}

/// Per-project, per-source watermark owned by the audit store (`spec.md` §3,
/// §4.2, §4.8). Advisory: the audit store and the central server remain the
/// final de-duplication authority.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectHistory {
    pub project_id: i64,
    pub last_processed_id: Option<i64>,
    pub last_publish_date: Option<DateTime<Utc>>,
    pub last_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Source-specific metadata a `CandidateArticle` carries, replacing the
/// dynamically-typed dicts the original threads through the pipeline
/// (`spec.md` §9 redesign note). One variant per adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum SourceMetadata {
    MediaCloud { media_id: Option<i64> },
    Wayback { domain: Option<String> },
    RssAlerts { feed_url: String },
    Newscatcher { rank: Option<u32> },
}

/// An article discovered by an adapter, carried through extraction and
/// scoring (`spec.md` §3 CandidateArticle). `story_text` is populated by C5
/// and is `None` before extraction runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateArticle {
    pub source: Source,
    pub url: String,
    pub title: Option<String>,
    pub language: Option<String>,
    pub publish_date: Option<DateTime<Utc>>,
    pub media_url: Option<String>,
    pub media_name: Option<String>,
    pub project_id: i64,
    pub language_model_id: i64,
    pub story_text: Option<String>,
    pub metadata: Option<SourceMetadata>,
    /// Source-assigned id when one exists; `None` until the audit store
    /// assigns `stories_id = id` for sourceless records (`spec.md` §4.2).
    pub stories_id: Option<i64>,
    /// Set by `Audit Store::add_stories` once the row exists, so later
    /// pipeline stages can address the row without a second lookup.
    pub log_db_id: Option<i64>,
}

/// A story as recorded in the audit store (`spec.md` §3, `stories` table).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Story {
    pub id: i64,
    pub stories_id: i64,
    pub project_id: i64,
    pub model_id: i64,
    pub source: Source,
    pub url: String,
    pub published_date: Option<DateTime<Utc>>,
    pub queued_date: DateTime<Utc>,
    pub processed_date: Option<DateTime<Utc>>,
    pub posted_date: Option<DateTime<Utc>>,
    pub above_threshold: bool,
    pub model_score: Option<f64>,
    pub model_1_score: Option<f64>,
    pub model_2_score: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn source_roundtrips_through_display_and_fromstr() {
        for s in [Source::MediaCloud, Source::Wayback, Source::RssAlerts, Source::Newscatcher] {
            let rendered = s.to_string();
            assert_eq!(Source::from_str(&rendered).unwrap(), s);
        }
    }

    #[test]
    fn unknown_source_falls_back_to_other() {
        let s = Source::from_str("some-future-adapter").unwrap();
        assert_eq!(s, Source::Other("some-future-adapter".to_string()));
        assert_eq!(s.to_string(), "some-future-adapter");
    }

    #[test]
    fn source_serializes_as_plain_string() {
        let json = serde_json::to_string(&Source::RssAlerts).unwrap();
        assert_eq!(json, "\"rss-alerts\"");
        let back: Source = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Source::RssAlerts);
    }
}
