use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::middleware::{auth_middleware, metrics_middleware};
use super::{accounts, audit, handlers, mail, parcels, quotes, recipients};
use crate::state::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    // Reachable without a session
    let public_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route("/signup", post(accounts::signup))
        .route("/login", post(accounts::login))
        .route("/logout", axum::routing::delete(accounts::logout))
        .route("/check_session", get(accounts::check_session));

    // Behind the session gate; admin-only handlers also take `AdminUser`
    let protected_routes = Router::new()
        .route("/config", get(handlers::get_config))
        // Accounts
        .route(
            "/users/{id}",
            get(accounts::get_user).patch(accounts::update_user),
        )
        // Quotes
        .route("/quote", post(quotes::quote))
        // Recipients
        .route("/recipients", post(recipients::create_recipient))
        .route(
            "/recipients/{id}",
            get(recipients::get_recipient).patch(recipients::update_recipient),
        )
        // Orders and parcels
        .route("/orders", post(parcels::create_order))
        .route(
            "/parcels",
            post(parcels::create_parcel).get(parcels::list_parcels),
        )
        .route(
            "/parcels/{id}",
            get(parcels::get_parcel)
                .patch(parcels::update_status)
                .delete(parcels::cancel_parcel),
        )
        .route(
            "/parcels/{id}/destination",
            patch(parcels::update_destination),
        )
        .route("/user/parcels", get(parcels::list_user_parcels))
        // Admin
        .route("/send-email", post(mail::send_email))
        .route("/admin/audit", get(audit::query_audit))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            auth_middleware,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
