use chrono::{DateTime, Utc};
use feminicide_common::{CandidateArticle, SourceMetadata};
use serde::Serialize;

/// The external schema sent to the central server (`spec.md` §4.9 step 4 /
/// §6), ported field-for-field from
/// `original_source/processor/projects.py::prep_stories_for_posting`. Only
/// what the central server needs or can use crosses this boundary.
#[derive(Debug, Clone, Serialize)]
pub struct StoryOut {
    pub stories_id: Option<i64>,
    pub source: String,
    /// Legacy field kept for server-side schema compatibility; this pipeline
    /// never populates it.
    pub processed_stories_id: Option<i64>,
    pub language: Option<String>,
    pub media_id: Option<i64>,
    pub media_url: Option<String>,
    pub media_name: Option<String>,
    pub publish_date: Option<DateTime<Utc>>,
    pub story_tags: Option<Vec<String>>,
    pub title: Option<String>,
    pub url: String,
    pub entities: Option<Vec<String>>,
    pub confidence: f64,
    pub project_id: i64,
    pub language_model_id: i64,
}

pub fn project(candidate: &CandidateArticle, confidence: f64, entities: Option<Vec<String>>) -> StoryOut {
    let media_id = match &candidate.metadata {
        Some(SourceMetadata::MediaCloud { media_id }) => *media_id,
        _ => None,
    };

    StoryOut {
        stories_id: candidate.stories_id,
        source: candidate.source.to_string(),
        processed_stories_id: None,
        language: candidate.language.clone(),
        media_id,
        media_url: candidate.media_url.clone(),
        media_name: candidate.media_name.clone(),
        publish_date: candidate.publish_date,
        story_tags: None,
        title: candidate.title.clone(),
        url: candidate.url.clone(),
        entities,
        confidence,
        project_id: candidate.project_id,
        language_model_id: candidate.language_model_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feminicide_common::Source;

    #[test]
    fn media_id_is_pulled_out_of_source_metadata() {
        let candidate = CandidateArticle {
            source: Source::MediaCloud,
            url: "https://example.com/a".into(),
            title: Some("t".into()),
            language: Some("en".into()),
            publish_date: None,
            media_url: Some("https://example.com".into()),
            media_name: Some("Example".into()),
            project_id: 1,
            language_model_id: 2,
            story_text: Some("text".into()),
            metadata: Some(SourceMetadata::MediaCloud { media_id: Some(42) }),
            stories_id: Some(99),
            log_db_id: Some(7),
        };

        let out = project(&candidate, 0.87, Some(vec!["maria".into()]));
        assert_eq!(out.media_id, Some(42));
        assert_eq!(out.stories_id, Some(99));
        assert_eq!(out.confidence, 0.87);
        assert_eq!(out.entities, Some(vec!["maria".into()]));
    }

    #[test]
    fn non_mediacloud_sources_have_no_media_id() {
        let candidate = CandidateArticle {
            source: Source::RssAlerts,
            url: "https://example.com/a".into(),
            title: None,
            language: None,
            publish_date: None,
            media_url: None,
            media_name: None,
            project_id: 1,
            language_model_id: 2,
            story_text: None,
            metadata: Some(SourceMetadata::RssAlerts { feed_url: "https://example.com/feed".into() }),
            stories_id: None,
            log_db_id: None,
        };

        let out = project(&candidate, 0.1, None);
        assert_eq!(out.media_id, None);
    }
}
