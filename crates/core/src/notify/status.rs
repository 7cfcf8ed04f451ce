//! Status-change notifications for the two parties of a parcel.

use std::sync::Arc;

use tracing::{debug, warn};

use super::{Mailer, MailerError, OutgoingMail};
use crate::metrics;
use crate::shipment::ParcelStatus;

pub const STATUS_SUBJECT: &str = "Parcel Status Update";

const SIGN_OFF: &str = "Got a Package? Let's SendIT!";

/// Who and what a status notification is about.
#[derive(Debug, Clone)]
pub struct StatusNotice {
    pub sender_name: String,
    pub sender_email: String,
    pub recipient_name: String,
    pub recipient_email: String,
    pub status: ParcelStatus,
    pub tracking_number: String,
}

impl StatusNotice {
    pub fn sender_mail(&self) -> OutgoingMail {
        OutgoingMail::new(
            self.sender_email.clone(),
            STATUS_SUBJECT,
            format!(
                "Dear {}, the status of your parcel to {} is now {}. Tracking Number: {} {}",
                self.sender_name, self.recipient_name, self.status, self.tracking_number, SIGN_OFF
            ),
        )
    }

    pub fn recipient_mail(&self) -> OutgoingMail {
        OutgoingMail::new(
            self.recipient_email.clone(),
            STATUS_SUBJECT,
            format!(
                "Dear {}, the status of your parcel from {} is now {}. Tracking Number: {} {}",
                self.recipient_name, self.sender_name, self.status, self.tracking_number, SIGN_OFF
            ),
        )
    }
}

/// Outcome of notifying both parties.
#[derive(Debug, Default)]
pub struct NotificationReport {
    /// Addresses that accepted the mail.
    pub sent: Vec<String>,
    /// Addresses that could not be reached, with the reason.
    pub failed: Vec<(String, MailerError)>,
}

impl NotificationReport {
    pub fn all_sent(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, kind: &str, address: String, result: Result<(), MailerError>) {
        let label = if result.is_ok() { "sent" } else { "failed" };
        metrics::NOTIFICATIONS_TOTAL
            .with_label_values(&[kind, label])
            .inc();

        match result {
            Ok(()) => self.sent.push(address),
            Err(e) => {
                warn!(kind, to = %address, "Notification failed: {}", e);
                self.failed.push((address, e));
            }
        }
    }
}

/// Sends the sender and recipient notifications for a status change.
pub struct StatusNotifier {
    mailer: Arc<dyn Mailer>,
}

impl StatusNotifier {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }

    pub fn mailer(&self) -> &Arc<dyn Mailer> {
        &self.mailer
    }

    /// Send both notifications concurrently. Failures are reported, never returned.
    pub async fn notify(&self, notice: &StatusNotice) -> NotificationReport {
        let sender_mail = notice.sender_mail();
        let recipient_mail = notice.recipient_mail();

        let (sender_result, recipient_result) = futures::join!(
            self.mailer.send(&sender_mail),
            self.mailer.send(&recipient_mail)
        );

        let mut report = NotificationReport::default();
        report.record("sender", notice.sender_email.clone(), sender_result);
        report.record("recipient", notice.recipient_email.clone(), recipient_result);

        debug!(
            tracking_number = %notice.tracking_number,
            sent = report.sent.len(),
            failed = report.failed.len(),
            "Status notifications processed"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockMailer;

    fn notice() -> StatusNotice {
        StatusNotice {
            sender_name: "Jane Mwangi".to_string(),
            sender_email: "jane@example.com".to_string(),
            recipient_name: "Amina Otieno".to_string(),
            recipient_email: "amina@example.com".to_string(),
            status: ParcelStatus::OutForDelivery,
            tracking_number: "abc123".to_string(),
        }
    }

    #[test]
    fn test_message_text() {
        let notice = notice();

        let sender = notice.sender_mail();
        assert_eq!(sender.to, vec!["jane@example.com"]);
        assert_eq!(sender.subject, "Parcel Status Update");
        assert_eq!(
            sender.body,
            "Dear Jane Mwangi, the status of your parcel to Amina Otieno is now Out For Delivery. \
             Tracking Number: abc123 Got a Package? Let's SendIT!"
        );

        let recipient = notice.recipient_mail();
        assert_eq!(recipient.to, vec!["amina@example.com"]);
        assert_eq!(
            recipient.body,
            "Dear Amina Otieno, the status of your parcel from Jane Mwangi is now Out For Delivery. \
             Tracking Number: abc123 Got a Package? Let's SendIT!"
        );
    }

    #[tokio::test]
    async fn test_sends_two_mails() {
        let mailer = Arc::new(MockMailer::new());
        let notifier = StatusNotifier::new(mailer.clone());

        let report = notifier.notify(&notice()).await;

        assert!(report.all_sent());
        assert_eq!(report.sent.len(), 2);
        let sent = mailer.sent_mail().await;
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|m| m.subject == STATUS_SUBJECT));
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_the_other() {
        let mailer = Arc::new(MockMailer::new());
        mailer.fail_for("amina@example.com").await;
        let notifier = StatusNotifier::new(mailer.clone());

        let report = notifier.notify(&notice()).await;

        assert_eq!(report.sent, vec!["jane@example.com"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "amina@example.com");
        assert_eq!(mailer.sent_mail().await.len(), 1);
    }
}
