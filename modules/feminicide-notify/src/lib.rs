pub mod backend;
pub mod noop;
pub mod smtp;

pub use backend::NotifyBackend;
pub use noop::NoopNotifier;
pub use smtp::SmtpNotifier;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use feminicide_common::{ProjectRunStats, RunSummary, Source};

    #[tokio::test]
    async fn noop_notifier_never_fails() {
        let notifier = NoopNotifier;
        let mut summary = RunSummary::new(Source::Wayback, Utc::now());
        summary.projects.push(ProjectRunStats {
            project_id: 1,
            project_title: "test".into(),
            discovered: 3,
            ..Default::default()
        });
        assert!(notifier.send_digest(&summary).await.is_ok());
    }
}
