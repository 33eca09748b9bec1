//! `queue-rss` (`spec.md` §6): runs the RSS/Atom push adapter over every
//! project with a configured `rss_url`.

use std::sync::Arc;

use chrono::Utc;
use feminicide_audit::AuditStore;
use feminicide_common::Source;
use feminicide_extract::ContentExtractor;
use feminicide_notify::NotifyBackend;
use feminicide_queue::JobQueue;
use feminicide_scheduler::Scheduler;
use feminicide_sources::RssAdapter;
use tracing::warn;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    feminicide_cli::init_tracing();
    let config = feminicide_cli::load_config_or_exit();
    config.log_redacted();

    let db_uri = config.require_db_uri().unwrap_or_else(|e| {
        eprintln!("fatal: {e}");
        std::process::exit(feminicide_cli::EXIT_CONFIG_ERROR);
    });
    let broker_url = config.require_broker_url().unwrap_or_else(|e| {
        eprintln!("fatal: {e}");
        std::process::exit(feminicide_cli::EXIT_CONFIG_ERROR);
    });

    let snapshot = feminicide_cli::load_snapshot(&config).await?;
    let projects: Vec<_> = snapshot.projects.iter().filter(|p| feminicide_cli::eligible_for_rss(p)).cloned().collect();

    let audit = AuditStore::new(sqlx::PgPool::connect(db_uri).await?);
    audit.migrate().await?;
    for project in &snapshot.projects {
        if let Err(e) = audit.upsert_project(project).await {
            warn!(project_id = project.id, error = %e, "failed to upsert project into audit store");
        }
    }

    let queue = JobQueue::new(sqlx::PgPool::connect(broker_url).await?);
    queue.migrate().await?;

    let adapter = Arc::new(RssAdapter::new());
    let extractor = Arc::new(ContentExtractor::new());

    let scheduler = Scheduler::new(Source::RssAlerts, adapter, audit, extractor, queue)
        .with_concurrency(config.scheduler_concurrency)
        .with_max_job_attempts(config.max_retry_attempts as i32);

    let started_at = Utc::now();
    let mut summary = scheduler.run(&projects, started_at).await;
    summary.finished_at = Utc::now();

    let notifier = feminicide_cli::build_notifier(&config);
    if let Err(e) = notifier.send_digest(&summary).await {
        warn!(error = %e, "failed to send run summary notification");
    }

    std::process::exit(feminicide_cli::exit_code_for(&summary));
}
