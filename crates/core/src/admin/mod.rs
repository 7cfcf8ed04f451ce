//! Admin console: the cross-user parcel list, status updates with
//! notifications, and ad-hoc mail.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use crate::audit::{AuditEvent, AuditHandle};
use crate::auth::Identity;
use crate::lifecycle::{OrderError, OrderManager, ParcelView};
use crate::notify::{MailerError, OutgoingMail, StatusNotice, StatusNotifier};
use crate::shipment::ParcelStatus;
use crate::validation::FieldErrors;

/// Outcome of an admin status update.
#[derive(Debug, Clone, Serialize)]
pub struct StatusUpdate {
    pub parcel: ParcelView,
    pub previous_status: ParcelStatus,
    /// Addresses that were notified.
    pub notified: Vec<String>,
    /// Addresses whose notification failed. The status change stands regardless.
    pub notification_failures: Vec<String>,
}

pub struct AdminConsole {
    orders: Arc<OrderManager>,
    notifier: StatusNotifier,
    audit: Option<AuditHandle>,
}

impl AdminConsole {
    pub fn new(orders: Arc<OrderManager>, notifier: StatusNotifier) -> Self {
        Self {
            orders,
            notifier,
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: AuditHandle) -> Self {
        self.audit = Some(audit);
        self
    }

    fn require_admin(actor: &Identity) -> Result<(), OrderError> {
        if actor.is_admin() {
            Ok(())
        } else {
            Err(OrderError::Forbidden)
        }
    }

    /// All parcels with both parties, newest first, optionally filtered by a
    /// case-insensitive substring of sender name, recipient name or tracking number.
    pub fn list_parcels(
        &self,
        actor: &Identity,
        query: Option<&str>,
    ) -> Result<Vec<ParcelView>, OrderError> {
        Self::require_admin(actor)?;

        let query = query.unwrap_or_default();
        let mut views = Vec::new();
        for parcel in self.orders.all_parcels()? {
            let view = self.orders.view_of(parcel)?;
            if view.matches(query) {
                views.push(view);
            }
        }
        Ok(views)
    }

    /// Set a parcel's status, then notify sender and recipient.
    ///
    /// Notification failures are logged, counted and audited but never undo
    /// the status change.
    pub async fn set_status(
        &self,
        actor: &Identity,
        parcel_id: i64,
        status: ParcelStatus,
    ) -> Result<StatusUpdate, OrderError> {
        let change = self.orders.set_status(actor, parcel_id, status)?;
        let view = self.orders.view_of(change.parcel)?;

        let notice = StatusNotice {
            sender_name: view.sender.full_name(),
            sender_email: view.sender.email.clone(),
            recipient_name: view.recipient.full_name(),
            recipient_email: view.recipient.email.clone(),
            status: view.parcel.status,
            tracking_number: view.parcel.tracking_number.clone(),
        };
        let report = self.notifier.notify(&notice).await;

        let mut failures = Vec::with_capacity(report.failed.len());
        for (address, err) in report.failed {
            error!(parcel_id, to = %address, "Status notification not delivered: {}", err);
            if let Some(ref audit) = self.audit {
                audit.try_emit(AuditEvent::NotificationFailed {
                    parcel_id: Some(parcel_id),
                    to: address.clone(),
                    error: err.to_string(),
                });
            }
            failures.push(address);
        }

        Ok(StatusUpdate {
            parcel: view,
            previous_status: change.previous,
            notified: report.sent,
            notification_failures: failures,
        })
    }

    /// Send an arbitrary message through the configured mailer.
    pub async fn send_email(&self, actor: &Identity, mail: &OutgoingMail) -> Result<(), OrderError> {
        Self::require_admin(actor)?;
        mail.validate().map_err(OrderError::Validation)?;

        match self.notifier.mailer().send(mail).await {
            Ok(()) => {
                info!(admin_id = actor.user_id, to = %mail.to.join(", "), "Mail sent");
                Ok(())
            }
            Err(MailerError::InvalidAddress(address)) => Err(OrderError::Validation(
                FieldErrors::single("to", format!("Invalid email address: {}", address)),
            )),
            Err(e) => {
                error!(to = %mail.to.join(", "), "Mail not sent: {}", e);
                if let Some(ref audit) = self.audit {
                    audit.try_emit(AuditEvent::NotificationFailed {
                        parcel_id: None,
                        to: mail.to.join(", "),
                        error: e.to_string(),
                    });
                }
                Err(OrderError::Network(e.to_string()))
            }
        }
    }
}
