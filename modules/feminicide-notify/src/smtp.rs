use async_trait::async_trait;
use feminicide_common::RunSummary;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::warn;

use crate::backend::NotifyBackend;

/// Mails a per-run digest, the Rust stand-in for the original's raw
/// `smtplib`/`ssl.create_default_context()` call in
/// `original_source/processor/notifications.py::send_email`, using `lettre`
/// (the natural async SMTP client for a `tokio`-based stack).
pub struct SmtpNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Vec<Mailbox>,
}

impl SmtpNotifier {
    pub fn new(
        host: &str,
        port: u16,
        username: &str,
        password: &str,
        from: &str,
        to: &[String],
    ) -> anyhow::Result<Self> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)?
            .port(port)
            .credentials(Credentials::new(username.to_string(), password.to_string()))
            .build();

        let to = to
            .iter()
            .map(|addr| addr.parse())
            .collect::<Result<Vec<Mailbox>, _>>()?;

        Ok(Self { transport, from: from.parse()?, to })
    }
}

#[async_trait]
impl NotifyBackend for SmtpNotifier {
    async fn send_digest(&self, stats: &RunSummary) -> anyhow::Result<()> {
        let duration_mins = (stats.finished_at - stats.started_at).num_seconds() as f64 / 60.0;
        let total_discovered = stats.total_discovered();
        let total_posted = stats.total_posted();

        let subject = format!(
            "Feminicide {} Update: {} stories ({:.2} mins)",
            stats.source, total_discovered, duration_mins
        );

        let mut body = format!("Checking {} projects.\n\n", stats.projects.len());
        for p in &stats.projects {
            body.push_str(&format!("Project {} - {}: {} stories\n", p.project_id, p.project_title, p.discovered));
            if p.hit_source_cap {
                body.push_str(
                    "  warning: discovered count hit the source adapter's per-project cap; results may be truncated\n",
                );
            }
        }
        body.push_str(&format!(
            "\nDone - pulled {total_discovered} stories, {total_posted} posted above threshold.\n\n"
        ));
        if !stats.fatal_errors.is_empty() {
            body.push_str("Fatal errors this run:\n");
            for e in &stats.fatal_errors {
                body.push_str(&format!("  - {e}\n"));
            }
            body.push('\n');
        }
        body.push_str(&format!(
            "(An automated email from your friendly neighborhood {} story processor)",
            stats.source
        ));

        for recipient in &self.to {
            let message = Message::builder()
                .from(self.from.clone())
                .to(recipient.clone())
                .subject(&subject)
                .body(body.clone())?;

            if let Err(e) = self.transport.send(message).await {
                warn!(error = %e, recipient = %recipient, "failed to send run summary email");
            }
        }

        Ok(())
    }
}
