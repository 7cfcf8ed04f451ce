use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Audit event types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    // System events
    ServiceStarted {
        version: String,
        config_hash: String,
    },
    ServiceStopped {
        reason: String,
    },

    // Accounts
    UserRegistered {
        user_id: i64,
        email: String,
        role: String,
    },

    // Parcel lifecycle
    ParcelCreated {
        parcel_id: i64,
        user_id: i64,
        recipient_id: i64,
        tracking_number: String,
        cost: Decimal,
    },
    ParcelStatusChanged {
        parcel_id: i64,
        changed_by: i64,
        from_status: String,
        to_status: String,
    },
    ParcelCancelled {
        parcel_id: i64,
        cancelled_by: i64,
        previous_status: String,
    },
    /// Owner re-routed a parcel and paid the destination change fine.
    DestinationChanged {
        parcel_id: i64,
        changed_by: i64,
        new_city: String,
        new_country: String,
        base_cost: Decimal,
        fine: Decimal,
        new_cost: Decimal,
        /// 1 for the first change of this parcel, 2 for the second, ...
        change_number: u32,
    },

    // Notifications
    NotificationFailed {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        parcel_id: Option<i64>,
        to: String,
        error: String,
    },
}

impl AuditEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ServiceStarted { .. } => "service_started",
            Self::ServiceStopped { .. } => "service_stopped",
            Self::UserRegistered { .. } => "user_registered",
            Self::ParcelCreated { .. } => "parcel_created",
            Self::ParcelStatusChanged { .. } => "parcel_status_changed",
            Self::ParcelCancelled { .. } => "parcel_cancelled",
            Self::DestinationChanged { .. } => "destination_changed",
            Self::NotificationFailed { .. } => "notification_failed",
        }
    }

    /// Parcel this event concerns, if any.
    pub fn parcel_id(&self) -> Option<i64> {
        match self {
            Self::ParcelCreated { parcel_id, .. }
            | Self::ParcelStatusChanged { parcel_id, .. }
            | Self::ParcelCancelled { parcel_id, .. }
            | Self::DestinationChanged { parcel_id, .. } => Some(*parcel_id),
            Self::NotificationFailed { parcel_id, .. } => *parcel_id,
            _ => None,
        }
    }

    /// User who caused this event, if any.
    pub fn user_id(&self) -> Option<i64> {
        match self {
            Self::UserRegistered { user_id, .. } | Self::ParcelCreated { user_id, .. } => {
                Some(*user_id)
            }
            Self::ParcelStatusChanged { changed_by, .. }
            | Self::DestinationChanged { changed_by, .. } => Some(*changed_by),
            Self::ParcelCancelled { cancelled_by, .. } => Some(*cancelled_by),
            _ => None,
        }
    }
}

/// A stored audit record with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub parcel_id: Option<i64>,
    pub user_id: Option<i64>,
    pub data: AuditEvent,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_service_started() {
        let event = AuditEvent::ServiceStarted {
            version: "0.1.0".to_string(),
            config_hash: "abc123".to_string(),
        };
        assert_eq!(event.event_type(), "service_started");
        assert_eq!(event.parcel_id(), None);
        assert_eq!(event.user_id(), None);
    }

    #[test]
    fn test_status_change_ids() {
        let event = AuditEvent::ParcelStatusChanged {
            parcel_id: 4,
            changed_by: 1,
            from_status: "Pending".to_string(),
            to_status: "Accepted".to_string(),
        };
        assert_eq!(event.event_type(), "parcel_status_changed");
        assert_eq!(event.parcel_id(), Some(4));
        assert_eq!(event.user_id(), Some(1));
    }

    #[test]
    fn test_notification_failed_without_parcel() {
        let event = AuditEvent::NotificationFailed {
            parcel_id: None,
            to: "someone@example.com".to_string(),
            error: "relay refused".to_string(),
        };
        assert_eq!(event.parcel_id(), None);
        assert_eq!(event.user_id(), None);

        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("parcel_id").is_none());
    }

    #[test]
    fn test_destination_changed_serialization() {
        let event = AuditEvent::DestinationChanged {
            parcel_id: 9,
            changed_by: 2,
            new_city: "Nakuru".to_string(),
            new_country: "Kenya".to_string(),
            base_cost: Decimal::new(320, 2),
            fine: Decimal::from(20),
            new_cost: Decimal::new(2320, 2),
            change_number: 1,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "destination_changed");
        assert_eq!(json["new_cost"], "23.20");
        assert_eq!(json["fine"], "20");

        let back: AuditEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, event);
    }
}
