//! `worker` (`spec.md` §6, §4.9): long-running consumer of the
//! classify-and-post queue. Runs until sent SIGINT, draining in-flight jobs
//! before exiting.

use std::sync::Arc;

use feminicide_audit::AuditStore;
use feminicide_classifier::{EmbeddingClient, ModelRegistry};
use feminicide_entities::EntityExtractor;
use feminicide_publisher::{Publisher, PublisherJobHandler};
use feminicide_queue::{JobQueue, WorkerPool};
use tokio::sync::watch;
use tracing::info;

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

    let audit = AuditStore::new(sqlx::PgPool::connect(db_uri).await?);
    audit.migrate().await?;

    let queue = JobQueue::new(sqlx::PgPool::connect(broker_url).await?);
    queue.migrate().await?;

    let entities = EntityExtractor::new(config.entity_server_url.clone());
    let registry = ModelRegistry::new(config.model_dir.clone());
    let embedding_client = EmbeddingClient::new(config.embedding_server_url.clone());

    let publisher = Publisher::new(audit, entities, registry, embedding_client, config.feminicide_api_key.clone());
    let handler = Arc::new(PublisherJobHandler::new(publisher, snapshot));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let pool = WorkerPool::new(queue, handler, config.worker_concurrency);

    let run = tokio::spawn(pool.run(shutdown_rx));

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received, draining in-flight jobs");
    shutdown_tx.send(true).ok();

    run.await?;
    info!("worker stopped");
    Ok(())
}
