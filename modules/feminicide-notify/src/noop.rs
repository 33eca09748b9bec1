use async_trait::async_trait;
use feminicide_common::RunSummary;
use tracing::info;

use crate::backend::NotifyBackend;

/// Used when `SMTP_*`/`NOTIFY_EMAILS` are unset
/// (`original_source/processor/config.py::is_email_configured`).
pub struct NoopNotifier;

#[async_trait]
impl NotifyBackend for NoopNotifier {
    async fn send_digest(&self, stats: &RunSummary) -> anyhow::Result<()> {
        info!(
            source = %stats.source,
            discovered = stats.total_discovered(),
            posted = stats.total_posted(),
            "email notifications disabled, not sending run summary"
        );
        Ok(())
    }
}
