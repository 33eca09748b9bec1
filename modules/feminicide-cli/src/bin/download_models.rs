//! `download-models` (`spec.md` §4.3, §6): admin entrypoint that fetches any
//! model artifact the config snapshot references but the local model
//! directory is missing or stale. Intended to run before `worker` starts and
//! periodically afterward, mirroring
//! `original_source/scripts/queue_unposted_stories.py`'s
//! "important to do because there might be new models on the server" check.

use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    feminicide_cli::init_tracing();
    let config = feminicide_cli::load_config_or_exit();
    config.log_redacted();

    let snapshot = feminicide_cli::load_snapshot(&config).await?;

    let registry = feminicide_classifier::ModelRegistry::new(config.model_dir.clone());
    match registry.refresh_models(&snapshot.models).await {
        Ok(()) => {
            info!(models = snapshot.models.len(), "model artifacts up to date");
            std::process::exit(feminicide_cli::EXIT_OK);
        }
        Err(e) => {
            eprintln!("fatal: failed to refresh model artifacts: {e}");
            std::process::exit(feminicide_cli::EXIT_PARTIAL);
        }
    }
}
