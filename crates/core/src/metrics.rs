//! Prometheus metrics for core components.
//!
//! Covers quotes, parcel lifecycle changes, notifications, accounts and
//! calls to the directions and mail collaborators.

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Quotes
// =============================================================================

/// Quotes computed, by result.
pub static QUOTES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("sendit_quotes_total", "Total quote computations"),
        &["result"], // "success", "invalid", "unavailable"
    )
    .unwrap()
});

/// Driving distance of successful quotes.
pub static QUOTE_DISTANCE_KM: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new("sendit_quote_distance_km", "Distance of quoted routes in km")
            .buckets(vec![1.0, 5.0, 10.0, 25.0, 50.0, 100.0, 250.0, 500.0, 1000.0]),
        &[],
    )
    .unwrap()
});

// =============================================================================
// Parcel lifecycle
// =============================================================================

pub static PARCELS_CREATED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("sendit_parcels_created_total", "Total parcels created").unwrap()
});

/// Status transitions applied, by target status.
pub static STATUS_TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "sendit_status_transitions_total",
            "Total parcel status changes",
        ),
        &["to_status"],
    )
    .unwrap()
});

/// Lifecycle operations rejected as invalid transitions.
pub static REJECTED_TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "sendit_rejected_transitions_total",
            "Total lifecycle operations rejected as invalid transitions",
        ),
        &["operation"], // "cancel", "update_destination", "set_status"
    )
    .unwrap()
});

pub static PARCELS_CANCELLED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("sendit_parcels_cancelled_total", "Total parcels cancelled").unwrap()
});

pub static DESTINATION_CHANGES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "sendit_destination_changes_total",
        "Total paid destination changes",
    )
    .unwrap()
});

// =============================================================================
// Notifications and accounts
// =============================================================================

/// Outbound mails, by kind and result.
pub static NOTIFICATIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("sendit_notifications_total", "Total outbound mails"),
        &["kind", "result"], // kind: "status_update", "manual"; result: "sent", "failed"
    )
    .unwrap()
});

pub static USERS_REGISTERED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("sendit_users_registered_total", "Total accounts registered").unwrap()
});

/// Login attempts by result.
pub static LOGINS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("sendit_logins_total", "Total login attempts"),
        &["result"], // "success", "failed"
    )
    .unwrap()
});

// =============================================================================
// External Service Metrics
// =============================================================================

/// External service request duration.
pub static EXTERNAL_SERVICE_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "sendit_external_service_duration_seconds",
            "Duration of external service calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["service", "operation"],
    )
    .unwrap()
});

/// External service requests total.
pub static EXTERNAL_SERVICE_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "sendit_external_service_requests_total",
            "Total external service requests",
        ),
        &["service", "operation", "status"], // status: "success", "error", "timeout"
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Quotes
        Box::new(QUOTES_TOTAL.clone()),
        Box::new(QUOTE_DISTANCE_KM.clone()),
        // Lifecycle
        Box::new(PARCELS_CREATED.clone()),
        Box::new(STATUS_TRANSITIONS.clone()),
        Box::new(REJECTED_TRANSITIONS.clone()),
        Box::new(PARCELS_CANCELLED.clone()),
        Box::new(DESTINATION_CHANGES.clone()),
        // Notifications and accounts
        Box::new(NOTIFICATIONS_TOTAL.clone()),
        Box::new(USERS_REGISTERED.clone()),
        Box::new(LOGINS_TOTAL.clone()),
        // External services
        Box::new(EXTERNAL_SERVICE_DURATION.clone()),
        Box::new(EXTERNAL_SERVICE_REQUESTS.clone()),
    ]
}
