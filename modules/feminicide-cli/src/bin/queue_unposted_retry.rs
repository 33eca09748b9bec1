//! `queue-unposted-retry` (`spec.md` §6): catch-up job for stories that
//! scored above threshold in a prior run but never made it to the central
//! server. Re-fetches the article from the full-text index by its native
//! id and posts using the score already on file, skipping re-classification
//! entirely — ported from
//! `original_source/scripts/queue_unposted_stories.py::process_project_task`.

use std::collections::HashMap;

use feminicide_audit::AuditStore;
use feminicide_classifier::{EmbeddingClient, ModelRegistry};
use feminicide_common::Source;
use feminicide_entities::EntityExtractor;
use feminicide_extract::ContentExtractor;
use feminicide_publisher::Publisher;
use feminicide_sources::MediaCloudAdapter;
use tracing::{info, warn};

const MEDIACLOUD_BASE_URL: &str = "https://search.mediacloud.org/api";
/// Matches the original's `DEFAULT_STORIES_PER_PAGE` comment: "performs
/// poorly if set higher than 100".
const PAGE_SIZE: usize = 100;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    feminicide_cli::init_tracing();
    let config = feminicide_cli::load_config_or_exit();
    config.log_redacted();

    let db_uri = config.require_db_uri().unwrap_or_else(|e| {
        eprintln!("fatal: {e}");
        std::process::exit(feminicide_cli::EXIT_CONFIG_ERROR);
    });
    let Some(mc_api_token) = config.mc_api_token.clone() else {
        eprintln!("fatal: MC_API_TOKEN environment variable is required");
        std::process::exit(feminicide_cli::EXIT_CONFIG_ERROR);
    };

    let snapshot = feminicide_cli::load_snapshot(&config).await?;

    let audit = AuditStore::new(sqlx::PgPool::connect(db_uri).await?);
    audit.migrate().await?;

    let adapter = MediaCloudAdapter::new(MEDIACLOUD_BASE_URL, mc_api_token);
    let extractor = ContentExtractor::new();
    let entities = EntityExtractor::new(config.entity_server_url.clone());
    let registry = ModelRegistry::new(config.model_dir.clone());
    let embedding_client = EmbeddingClient::new(config.embedding_server_url.clone());
    let publisher = Publisher::new(audit.clone(), entities, registry, embedding_client, config.feminicide_api_key.clone());

    let mut total_posted = 0u64;
    let mut had_error = false;

    for project in &snapshot.projects {
        if let Err(e) = audit.upsert_project(project).await {
            warn!(project_id = project.id, error = %e, "failed to upsert project into audit store");
        }

        let Some(model_spec) = snapshot.model_for(project.language_model_id) else {
            warn!(project_id = project.id, "no model spec for project, skipping unposted retry");
            continue;
        };

        let pending = match audit.unposted_above_stories(project.id, 10_000).await {
            Ok(p) => p,
            Err(e) => {
                warn!(project_id = project.id, error = %e, "failed to list unposted stories");
                had_error = true;
                continue;
            }
        };

        let mediacloud_only: Vec<_> = pending.into_iter().filter(|s| s.source.parse::<Source>().ok() == Some(Source::MediaCloud)).collect();
        if mediacloud_only.is_empty() {
            continue;
        }

        info!(project_id = project.id, count = mediacloud_only.len(), "re-posting unposted stories");

        let scores_by_stories_id: HashMap<i64, (i64, f64)> = mediacloud_only
            .iter()
            .filter_map(|s| s.stories_id.map(|sid| (sid, (s.log_db_id, s.model_score.unwrap_or(0.0)))))
            .collect();

        for chunk in mediacloud_only.chunks(PAGE_SIZE) {
            let stories_ids: Vec<i64> = chunk.iter().filter_map(|s| s.stories_id).collect();
            let refetched = match adapter.fetch_by_ids(project, &stories_ids).await {
                Ok(r) => r,
                Err(e) => {
                    warn!(project_id = project.id, error = %e, "failed to re-fetch unposted stories, skipping page");
                    had_error = true;
                    continue;
                }
            };

            let mut scored = Vec::with_capacity(refetched.len());
            for mut candidate in refetched {
                let Some(stories_id) = candidate.stories_id else { continue };
                let Some(&(log_db_id, confidence)) = scores_by_stories_id.get(&stories_id) else { continue };

                if let Some(content) = extractor.extract(&candidate.url).await {
                    candidate.story_text = Some(content.text);
                    candidate.language = candidate.language.or(content.language);
                }
                candidate.log_db_id = Some(log_db_id);
                scored.push((candidate, confidence));
            }

            if scored.is_empty() {
                continue;
            }

            match publisher
                .retry_post_batch(
                    &scored,
                    &project.title,
                    &project.language,
                    project.country.as_deref(),
                    &project.update_post_url,
                    model_spec,
                )
                .await
            {
                Ok(()) => total_posted += scored.len() as u64,
                Err(e) => {
                    warn!(project_id = project.id, error = %e, "failed to post unposted-story batch");
                    had_error = true;
                }
            }
        }
    }

    info!(total_posted, "unposted-retry run complete");
    std::process::exit(if had_error { feminicide_cli::EXIT_PARTIAL } else { feminicide_cli::EXIT_OK });
}
