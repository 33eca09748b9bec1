use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use anyhow::{Context, Result};
use feminicide_common::{Config, Project, RunSummary};
use feminicide_config::{ConfigClient, ConfigSnapshot};
use feminicide_notify::{NoopNotifier, NotifyBackend, SmtpNotifier};
use tracing::warn;
use tracing_subscriber::EnvFilter;

/// `spec.md` §6: "Exit code 0 on success; 1 on fatal configuration error; 2
/// on partial-success-with-errors."
pub const EXIT_OK: i32 = 0;
pub const EXIT_CONFIG_ERROR: i32 = 1;
pub const EXIT_PARTIAL: i32 = 2;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("feminicide=info".parse().expect("valid directive")))
        .try_init();
}

/// Loads `Config::from_env`, turning its "required var missing" panic into a
/// clean `EXIT_CONFIG_ERROR` exit instead of an abort — `spec.md` §6/§7
/// classifies missing required env as `ConfigError`, "fatal at startup".
pub fn load_config_or_exit() -> Config {
    match std::panic::catch_unwind(AssertUnwindSafe(Config::from_env)) {
        Ok(config) => config,
        Err(_) => {
            eprintln!("fatal: required configuration is missing, see above for which variable");
            std::process::exit(EXIT_CONFIG_ERROR);
        }
    }
}

pub async fn load_snapshot(config: &Config) -> Result<Arc<ConfigSnapshot>> {
    let client = ConfigClient::new(
        config.feminicide_api_url.clone(),
        config.feminicide_api_key.clone(),
        config.config_dir.clone(),
    );
    client.refresh_to_disk().await.context("failed to load project/model configuration")
}

pub fn build_notifier(config: &Config) -> Arc<dyn NotifyBackend> {
    if !config.is_email_configured() {
        return Arc::new(NoopNotifier);
    }

    let from = config.smtp_from_address.clone().unwrap_or_else(|| "story-processor@example.org".to_string());
    match SmtpNotifier::new(
        config.smtp_host.as_deref().expect("checked by is_email_configured"),
        config.smtp_port,
        config.smtp_username.as_deref().expect("checked by is_email_configured"),
        config.smtp_password.as_deref().expect("checked by is_email_configured"),
        &from,
        &config.notify_emails,
    ) {
        Ok(notifier) => Arc::new(notifier),
        Err(e) => {
            warn!(error = %e, "failed to build SMTP notifier, falling back to no-op");
            Arc::new(NoopNotifier)
        }
    }
}

/// `spec.md` §4.8 step 1: optionally filter the project list to those with
/// the fields a given source actually needs.
pub fn eligible_for_wayback(project: &Project) -> bool {
    project.media_collections.as_ref().is_some_and(|c| !c.is_empty())
}

pub fn eligible_for_rss(project: &Project) -> bool {
    project.rss_url.is_some()
}

pub fn exit_code_for(summary: &RunSummary) -> i32 {
    if summary.fatal_errors.is_empty() {
        EXIT_OK
    } else {
        EXIT_PARTIAL
    }
}
