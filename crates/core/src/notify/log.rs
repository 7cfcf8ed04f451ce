use async_trait::async_trait;
use tracing::info;

use super::{Mailer, MailerError, OutgoingMail};

/// Mailer that writes messages to the log instead of sending them.
#[derive(Debug, Default)]
pub struct LogMailer;

impl LogMailer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailerError> {
        info!(
            to = %mail.to.join(", "),
            subject = %mail.subject,
            "Mail not sent (no relay configured): {}",
            mail.body
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
