//! Mock mailer for testing.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::notify::{Mailer, MailerError, OutgoingMail};

/// Mock implementation of the Mailer trait.
///
/// Records every delivered mail. Sends to an address registered with
/// [`MockMailer::fail_for`] are rejected, as is the next send after
/// [`MockMailer::set_next_error`].
#[derive(Debug)]
pub struct MockMailer {
    sent: Arc<RwLock<Vec<OutgoingMail>>>,
    failing_addresses: Arc<RwLock<HashSet<String>>>,
    next_error: Arc<RwLock<Option<MailerError>>>,
}

impl Default for MockMailer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockMailer {
    pub fn new() -> Self {
        Self {
            sent: Arc::new(RwLock::new(Vec::new())),
            failing_addresses: Arc::new(RwLock::new(HashSet::new())),
            next_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Reject every mail addressed to `address`.
    pub async fn fail_for(&self, address: &str) {
        self.failing_addresses
            .write()
            .await
            .insert(address.to_lowercase());
    }

    pub async fn set_next_error(&self, error: MailerError) {
        *self.next_error.write().await = Some(error);
    }

    /// Mails accepted so far, in send order.
    pub async fn sent_mail(&self) -> Vec<OutgoingMail> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), MailerError> {
        if let Some(error) = self.next_error.write().await.take() {
            return Err(error);
        }

        let failing = self.failing_addresses.read().await;
        if let Some(address) = mail
            .to
            .iter()
            .find(|a| failing.contains(&a.to_lowercase()))
        {
            return Err(MailerError::Rejected(format!("mock rejects {}", address)));
        }
        drop(failing);

        self.sent.write().await.push(mail.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
