use async_trait::async_trait;
use feminicide_common::RunSummary;

/// Pluggable per-run notification backend (`spec.md` §2 row C10), grounded
/// on `rootsignal-scout-supervisor::notify::NotifyBackend`.
#[async_trait]
pub trait NotifyBackend: Send + Sync {
    async fn send_digest(&self, stats: &RunSummary) -> anyhow::Result<()>;
}
