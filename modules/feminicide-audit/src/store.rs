//! Postgres persistence for the audit trail (`spec.md` §4.2). This is the
//! single shared mutable resource in the pipeline; every write goes through a
//! short, autocommitting transaction (`spec.md` §5).

use chrono::{DateTime, Utc};
use feminicide_common::{CandidateArticle, Project, ProjectHistory, Source};
use sqlx::PgPool;

use crate::error::Result;

#[derive(Clone)]
pub struct AuditStore {
    pool: PgPool,
}

impl AuditStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    /// Mirrors the current project config into the `projects` table so
    /// `stories.project_id` has something to reference. Called once per run
    /// after C1 refreshes its snapshot.
    pub async fn upsert_project(&self, project: &Project) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO projects
                (id, title, language, language_model_id, search_terms, media_collections,
                 country, rss_url, min_confidence, update_post_url,
                 latest_processed_stories_id, start_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (id) DO UPDATE SET
                title = EXCLUDED.title,
                language = EXCLUDED.language,
                language_model_id = EXCLUDED.language_model_id,
                search_terms = EXCLUDED.search_terms,
                media_collections = EXCLUDED.media_collections,
                country = EXCLUDED.country,
                rss_url = EXCLUDED.rss_url,
                min_confidence = EXCLUDED.min_confidence,
                update_post_url = EXCLUDED.update_post_url,
                latest_processed_stories_id = EXCLUDED.latest_processed_stories_id,
                start_date = EXCLUDED.start_date
            "#,
        )
        .bind(project.id)
        .bind(&project.title)
        .bind(&project.language)
        .bind(project.language_model_id)
        .bind(&project.search_terms)
        .bind(
            project
                .media_collections
                .as_ref()
                .map(|c| serde_json::to_value(c).unwrap_or(serde_json::Value::Null)),
        )
        .bind(&project.country)
        .bind(&project.rss_url)
        .bind(project.min_confidence)
        .bind(&project.update_post_url)
        .bind(project.latest_processed_stories_id)
        .bind(project.start_date)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert candidate rows for one (project, source) batch, collapsing
    /// duplicates by `(project_id, stories_id, source)` and deduplicating
    /// within the batch by `(project_id, url)` first (`spec.md` §3, §4.8).
    ///
    /// Returns the candidates augmented with `log_db_id`. For sources
    /// without a native id, `stories_id` is backfilled to the row's internal
    /// `id` in a second transaction so downstream code treats every source
    /// uniformly.
    pub async fn add_stories(
        &self,
        candidates: &[CandidateArticle],
        project: &Project,
        source: &Source,
    ) -> Result<Vec<CandidateArticle>> {
        let mut deduped: Vec<CandidateArticle> = Vec::with_capacity(candidates.len());
        let mut seen_urls = std::collections::HashSet::new();
        for c in candidates {
            if seen_urls.insert(c.url.clone()) {
                deduped.push(c.clone());
            }
        }

        let mut out = Vec::with_capacity(deduped.len());
        let mut tx = self.pool.begin().await?;

        for candidate in deduped {
            let row: Option<(i64,)> = sqlx::query_as(
                r#"
                INSERT INTO stories
                    (stories_id, project_id, model_id, source, url, published_date,
                     queued_date, above_threshold)
                VALUES ($1, $2, $3, $4, $5, $6, now(), false)
                ON CONFLICT (project_id, stories_id, source) DO NOTHING
                RETURNING id
                "#,
            )
            .bind(candidate.stories_id)
            .bind(project.id)
            .bind(project.language_model_id)
            .bind(source.to_string())
            .bind(&candidate.url)
            .bind(candidate.publish_date)
            .fetch_optional(&mut *tx)
            .await?;

            let Some((id,)) = row else {
                // Already present from a prior run or an earlier batch this run.
                continue;
            };

            let mut enriched = candidate;
            if enriched.stories_id.is_none() {
                sqlx::query("UPDATE stories SET stories_id = $1 WHERE id = $1")
                    .bind(id)
                    .execute(&mut *tx)
                    .await?;
                enriched.stories_id = Some(id);
            }
            enriched.log_db_id = Some(id);
            out.push(enriched);
        }

        tx.commit().await?;
        Ok(out)
    }

    /// Sets `model_score`/`model_1_score`/`model_2_score`/`processed_date` by
    /// `log_db_id`. Idempotent — safe to call again with the same scores.
    pub async fn update_processed(&self, candidates: &[(i64, f64, f64, Option<f64>)]) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        for (log_db_id, model_score, model_1_score, model_2_score) in candidates {
            sqlx::query(
                r#"
                UPDATE stories
                SET model_score = $1, model_1_score = $2, model_2_score = $3, processed_date = now()
                WHERE id = $4
                "#,
            )
            .bind(model_score)
            .bind(model_1_score)
            .bind(model_2_score)
            .bind(log_db_id)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn mark_above_threshold(&self, log_db_ids: &[i64]) -> Result<()> {
        sqlx::query("UPDATE stories SET above_threshold = true WHERE id = ANY($1)")
            .bind(log_db_ids)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn update_posted(&self, log_db_ids: &[i64]) -> Result<()> {
        sqlx::query("UPDATE stories SET posted_date = now() WHERE id = ANY($1)")
            .bind(log_db_ids)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get_history(&self, project_id: i64) -> Result<Option<ProjectHistory>> {
        let row = sqlx::query_as::<_, ProjectHistoryRow>(
            r#"
            SELECT project_id, last_processed_id, last_publish_date, last_url, created_at, updated_at
            FROM project_history
            WHERE project_id = $1
            "#,
        )
        .bind(project_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    /// Upserts the watermark. `updated_at` is always `now()`, preserving the
    /// non-decreasing invariant in `spec.md` §8.
    pub async fn update_history(
        &self,
        project_id: i64,
        last_processed_id: Option<i64>,
        last_publish_date: Option<DateTime<Utc>>,
        last_url: Option<&str>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO project_history
                (project_id, last_processed_id, last_publish_date, last_url, created_at, updated_at)
            VALUES ($1, $2, $3, $4, now(), now())
            ON CONFLICT (project_id) DO UPDATE SET
                last_processed_id = COALESCE(EXCLUDED.last_processed_id, project_history.last_processed_id),
                last_publish_date = GREATEST(EXCLUDED.last_publish_date, project_history.last_publish_date),
                last_url = COALESCE(EXCLUDED.last_url, project_history.last_url),
                updated_at = now()
            "#,
        )
        .bind(project_id)
        .bind(last_processed_id)
        .bind(last_publish_date)
        .bind(last_url)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Stories above threshold, bucketed by day they were published. Read-only
    /// dashboard aggregation (`spec.md` §4.2); parameterized, no string
    /// concatenation (`spec.md` §9 redesign note).
    pub async fn stories_by_published_day(&self, project_id: i64) -> Result<Vec<DayCount>> {
        sqlx::query_as::<_, DayCount>(
            r#"
            SELECT published_date::date AS day, COUNT(*) AS count
            FROM stories
            WHERE project_id = $1 AND above_threshold = true
            GROUP BY published_date::date
            ORDER BY day DESC
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    pub async fn stories_by_processed_day(&self, project_id: i64) -> Result<Vec<DayCount>> {
        sqlx::query_as::<_, DayCount>(
            r#"
            SELECT processed_date::date AS day, COUNT(*) AS count
            FROM stories
            WHERE project_id = $1 AND above_threshold = true
            GROUP BY processed_date::date
            ORDER BY day DESC
            "#,
        )
        .bind(project_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }

    pub async fn unposted_above_story_count(&self, project_id: i64) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM stories
            WHERE project_id = $1 AND above_threshold = true AND posted_date IS NULL
            "#,
        )
        .bind(project_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn posted_above_story_count(&self, project_id: i64) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM stories
            WHERE project_id = $1 AND above_threshold = true AND posted_date IS NOT NULL
            "#,
        )
        .bind(project_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn below_story_count(&self, project_id: i64) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM stories
            WHERE project_id = $1 AND above_threshold = false AND processed_date IS NOT NULL
            "#,
        )
        .bind(project_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Stories still awaiting a successful post, for the `queue-unposted-retry`
    /// entrypoint (`spec.md` §6 CLI surface). Carries just enough of the
    /// audit row to re-fetch and re-post without re-classifying, mirroring
    /// `original_source/scripts/queue_unposted_stories.py::process_project_task`.
    pub async fn unposted_above_stories(&self, project_id: i64, limit: i64) -> Result<Vec<UnpostedStory>> {
        sqlx::query_as::<_, UnpostedStory>(
            r#"
            SELECT id AS log_db_id, stories_id, source, model_score
            FROM stories
            WHERE project_id = $1 AND above_threshold = true AND posted_date IS NULL
            ORDER BY processed_date ASC
            LIMIT $2
            "#,
        )
        .bind(project_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Into::into)
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UnpostedStory {
    pub log_db_id: i64,
    pub stories_id: Option<i64>,
    pub source: String,
    pub model_score: Option<f64>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct DayCount {
    pub day: Option<chrono::NaiveDate>,
    pub count: i64,
}

#[derive(sqlx::FromRow)]
struct ProjectHistoryRow {
    project_id: i64,
    last_processed_id: Option<i64>,
    last_publish_date: Option<DateTime<Utc>>,
    last_url: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProjectHistoryRow> for ProjectHistory {
    fn from(row: ProjectHistoryRow) -> Self {
        ProjectHistory {
            project_id: row.project_id,
            last_processed_id: row.last_processed_id,
            last_publish_date: row.last_publish_date,
            last_url: row.last_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
