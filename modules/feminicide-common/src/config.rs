use std::env;
use std::path::PathBuf;

use crate::error::CoreError;

/// Process configuration loaded from environment variables (`spec.md` §6).
///
/// Every field that a given binary doesn't need stays `None`/empty rather than
/// panicking at `from_env()` time — the panic happens lazily, the first time a
/// component actually reaches for a var it needs, via the `require_*` helpers.
/// This lets `download-models` run without `PROCESSOR_DB_URI` and `worker` run
/// without `MC_API_TOKEN`, without a constructor per binary.
#[derive(Debug, Clone)]
pub struct Config {
    pub feminicide_api_url: String,
    pub feminicide_api_key: String,

    pub processor_db_uri: Option<String>,
    pub broker_url: Option<String>,

    pub mc_api_token: Option<String>,
    pub newscatcher_api_key: Option<String>,

    pub entity_server_url: Option<String>,
    /// HTTP service backing `vectorizer_type: embeddings` stages
    /// (`spec.md` §4.3) — replaces the original's in-process TFHub load.
    pub embedding_server_url: String,

    pub smtp_host: Option<String>,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub smtp_from_address: Option<String>,
    pub notify_emails: Vec<String>,

    pub sentry_dsn: Option<String>,

    /// Directory holding `projects.json` / `language-models.json` snapshots.
    pub config_dir: PathBuf,
    /// Directory holding downloaded model artifacts.
    pub model_dir: PathBuf,
    /// Directory holding run logs / optional audit dumps.
    pub logs_dir: PathBuf,

    /// Bounded concurrency width for scheduler stages (`spec.md` §4.8, default 8-16).
    pub scheduler_concurrency: usize,
    /// Worker pool width for the task queue (`spec.md` §4.7).
    pub worker_concurrency: usize,
    /// Max retry attempts before a job is dead-lettered (`spec.md` §4.7, default 5).
    pub max_retry_attempts: u32,
}

impl Config {
    pub fn from_env() -> Self {
        let home = env::var("FEMINICIDE_HOME").unwrap_or_else(|_| ".".to_string());
        let home = PathBuf::from(home);

        let notify_emails: Vec<String> = env::var("NOTIFY_EMAILS")
            .unwrap_or_default()
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            feminicide_api_url: required_env("FEMINICIDE_API_URL"),
            feminicide_api_key: required_env("FEMINICIDE_API_KEY"),
            processor_db_uri: env::var("PROCESSOR_DB_URI").ok(),
            broker_url: env::var("BROKER_URL").ok(),
            mc_api_token: env::var("MC_API_TOKEN").ok(),
            newscatcher_api_key: env::var("NEWSCATCHER_API_KEY").ok(),
            entity_server_url: env::var("ENTITY_SERVER_URL").ok(),
            embedding_server_url: env::var("EMBEDDING_SERVER_URL")
                .unwrap_or_else(|_| "http://localhost:8090".to_string()),
            smtp_host: env::var("SMTP_HOST").ok(),
            smtp_port: env::var("SMTP_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(587),
            smtp_username: env::var("SMTP_USERNAME").ok(),
            smtp_password: env::var("SMTP_PASSWORD").ok(),
            smtp_from_address: env::var("SMTP_FROM_ADDRESS").ok(),
            notify_emails,
            sentry_dsn: env::var("SENTRY_DSN").ok(),
            config_dir: home.join("config"),
            model_dir: home.join("files").join("models"),
            logs_dir: home.join("logs"),
            scheduler_concurrency: env::var("SCHEDULER_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8),
            worker_concurrency: env::var("WORKER_CONCURRENCY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8),
            max_retry_attempts: env::var("MAX_RETRY_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
        }
    }

    pub fn require_db_uri(&self) -> Result<&str, CoreError> {
        self.processor_db_uri
            .as_deref()
            .ok_or_else(|| CoreError::Config("PROCESSOR_DB_URI environment variable is required".to_string()))
    }

    pub fn require_broker_url(&self) -> Result<&str, CoreError> {
        self.broker_url
            .as_deref()
            .ok_or_else(|| CoreError::Config("BROKER_URL environment variable is required".to_string()))
    }

    /// All-or-nothing email notification config (`spec.md` §6).
    pub fn is_email_configured(&self) -> bool {
        self.smtp_host.is_some()
            && self.smtp_username.is_some()
            && self.smtp_password.is_some()
            && !self.notify_emails.is_empty()
    }

    /// Log the presence (not the value) of every sensitive env var, for startup debugging.
    pub fn log_redacted(&self) {
        let vars: &[(&str, &Option<String>)] = &[
            ("FEMINICIDE_API_KEY", &Some(self.feminicide_api_key.clone())),
            ("PROCESSOR_DB_URI", &self.processor_db_uri),
            ("BROKER_URL", &self.broker_url),
            ("MC_API_TOKEN", &self.mc_api_token),
            ("NEWSCATCHER_API_KEY", &self.newscatcher_api_key),
            ("SMTP_PASSWORD", &self.smtp_password),
            ("SENTRY_DSN", &self.sentry_dsn),
        ];
        for (name, value) in vars {
            match value {
                Some(v) if !v.is_empty() => tracing::info!("{name} = ({} chars)", v.len()),
                _ => tracing::info!("{name} = (unset)"),
            }
        }
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_requires_all_parts() {
        let mut cfg = bare_config();
        assert!(!cfg.is_email_configured());
        cfg.smtp_host = Some("smtp.example.com".into());
        cfg.smtp_username = Some("bot".into());
        cfg.smtp_password = Some("secret".into());
        assert!(!cfg.is_email_configured(), "still missing notify_emails");
        cfg.notify_emails = vec!["ops@example.com".into()];
        assert!(cfg.is_email_configured());
    }

    #[test]
    fn missing_db_uri_is_a_config_error() {
        let cfg = bare_config();
        assert!(cfg.require_db_uri().is_err());
    }

    fn bare_config() -> Config {
        Config {
            feminicide_api_url: "https://example.com".into(),
            feminicide_api_key: "key".into(),
            processor_db_uri: None,
            broker_url: None,
            mc_api_token: None,
            newscatcher_api_key: None,
            entity_server_url: None,
            embedding_server_url: "http://localhost:8090".to_string(),
            smtp_host: None,
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            smtp_from_address: None,
            notify_emails: vec![],
            sentry_dsn: None,
            config_dir: PathBuf::from("config"),
            model_dir: PathBuf::from("files/models"),
            logs_dir: PathBuf::from("logs"),
            scheduler_concurrency: 8,
            worker_concurrency: 8,
            max_retry_attempts: 5,
        }
    }
}
