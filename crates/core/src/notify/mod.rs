//! Outbound mail and parcel status notifications.
//!
//! A [`Mailer`] delivers plain-text mail. [`SmtpMailer`] talks to an SMTP
//! relay; [`LogMailer`] only writes the message to the log and is used when
//! no relay is configured. [`StatusNotifier`] formats the two status-change
//! messages an admin update produces.

mod log;
mod smtp;
mod status;

pub use self::log::LogMailer;
pub use smtp::SmtpMailer;
pub use status::{NotificationReport, StatusNotice, StatusNotifier, STATUS_SUBJECT};

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::config::{MailerBackend, MailerConfig};
use crate::validation::{is_valid_email, FieldErrors};

#[derive(Debug, Clone, Error)]
pub enum MailerError {
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    #[error("Failed to build message: {0}")]
    MessageBuild(String),

    #[error("Mail transport error: {0}")]
    Transport(String),

    #[error("Mail rejected: {0}")]
    Rejected(String),

    #[error("Mailer not configured: {0}")]
    NotConfigured(String),
}

/// A plain-text message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutgoingMail {
    /// Accepts a single address or a list on input.
    #[serde(deserialize_with = "one_or_many")]
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
}

impl OutgoingMail {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: vec![to.into()],
            subject: subject.into(),
            body: body.into(),
        }
    }

    /// Check that there is at least one well-formed recipient and a subject.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.to.is_empty() {
            errors.insert("to", "Required");
        } else if let Some(bad) = self.to.iter().find(|a| !is_valid_email(a.trim())) {
            errors.insert("to", format!("Invalid email address: {}", bad));
        }
        if self.subject.trim().is_empty() {
            errors.insert("subject", "Required");
        }
        if self.body.trim().is_empty() {
            errors.insert("body", "Required");
        }
        errors.into_result()
    }
}

fn one_or_many<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(String),
        Many(Vec<String>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(address) => vec![address],
        OneOrMany::Many(addresses) => addresses,
    })
}

/// Delivers mail.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailerError>;

    /// Backend name used in logs and metrics.
    fn name(&self) -> &'static str;
}

/// Build the mailer selected by `config`. Without a `[mailer]` section mail is only logged.
pub fn create_mailer(config: Option<&MailerConfig>) -> Result<Arc<dyn Mailer>, MailerError> {
    match config {
        None => Ok(Arc::new(LogMailer::new())),
        Some(config) => match config.backend {
            MailerBackend::Log => Ok(Arc::new(LogMailer::new())),
            MailerBackend::Smtp => Ok(Arc::new(SmtpMailer::new(config)?)),
        },
    }
}
