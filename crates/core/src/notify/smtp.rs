//! SMTP delivery through `lettre`.

use std::time::Instant;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::debug;

use super::{Mailer, MailerError, OutgoingMail};
use crate::config::MailerConfig;
use crate::metrics::{EXTERNAL_SERVICE_DURATION, EXTERNAL_SERVICE_REQUESTS};

const SERVICE: &str = "smtp";

/// Mailer backed by a STARTTLS SMTP relay.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    pub fn new(config: &MailerConfig) -> Result<Self, MailerError> {
        let host = config
            .host
            .as_deref()
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| MailerError::NotConfigured("SMTP host is required".to_string()))?;
        let from = config
            .from
            .as_deref()
            .ok_or_else(|| MailerError::NotConfigured("sender address is required".to_string()))?;
        let from: Mailbox = from
            .parse()
            .map_err(|_| MailerError::InvalidAddress(from.to_string()))?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| MailerError::Transport(e.to_string()))?
            .port(config.port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn build_message(&self, mail: &OutgoingMail) -> Result<Message, MailerError> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(mail.subject.clone())
            .header(ContentType::TEXT_PLAIN);

        for address in &mail.to {
            let mailbox: Mailbox = address
                .trim()
                .parse()
                .map_err(|_| MailerError::InvalidAddress(address.clone()))?;
            builder = builder.to(mailbox);
        }

        builder
            .body(mail.body.clone())
            .map_err(|e| MailerError::MessageBuild(e.to_string()))
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailerError> {
        let message = self.build_message(mail)?;

        debug!(to = %mail.to.join(", "), subject = %mail.subject, "Sending mail");
        let start = Instant::now();
        let result = self.transport.send(message).await;

        EXTERNAL_SERVICE_DURATION
            .with_label_values(&[SERVICE, "send"])
            .observe(start.elapsed().as_secs_f64());
        let outcome = if result.is_ok() { "success" } else { "error" };
        EXTERNAL_SERVICE_REQUESTS
            .with_label_values(&[SERVICE, "send", outcome])
            .inc();

        match result {
            Ok(response) if response.is_positive() => Ok(()),
            Ok(response) => Err(MailerError::Rejected(format!(
                "relay answered {}",
                response.code()
            ))),
            Err(e) if e.is_permanent() => Err(MailerError::Rejected(e.to_string())),
            Err(e) => Err(MailerError::Transport(e.to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "smtp"
    }
}
