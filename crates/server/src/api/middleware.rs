//! Session gate and metrics middleware for API routes.

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{request::Parts, Request},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use sendit_core::{AuthError, AuthRequest, Identity};

use super::error::ApiError;
use crate::metrics::{
    normalize_path, AUTH_FAILURES_TOTAL, HTTP_REQUESTS_IN_FLIGHT, HTTP_REQUESTS_TOTAL,
    HTTP_REQUEST_DURATION,
};
use crate::state::AppState;

/// Metrics middleware that tracks HTTP request duration and counts.
///
/// This middleware records:
/// - Request duration (histogram)
/// - Request count (counter)
/// - Requests in flight (gauge)
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = normalize_path(request.uri().path());

    HTTP_REQUESTS_IN_FLIGHT.inc();

    let response = next.run(request).await;

    HTTP_REQUESTS_IN_FLIGHT.dec();

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUEST_DURATION
        .with_label_values(&[&method, &path, &status])
        .observe(duration);
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    response
}

/// Session gate: resolves the session cookie into an [`Identity`].
///
/// Requests without a live session are answered with 401 before they reach
/// the handler. On success the identity is stored in the request extensions
/// for [`AuthUser`] and [`AdminUser`].
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let headers: HashMap<String, String> = request
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_lowercase(), v.to_string()))
        })
        .collect();

    let source_ip = request
        .extensions()
        .get::<std::net::SocketAddr>()
        .map(|addr| addr.ip())
        .unwrap_or(std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST));

    let auth_request = AuthRequest { headers, source_ip };

    match state.authenticator().authenticate(&auth_request).await {
        Ok(identity) => {
            let mut request = request;
            request.extensions_mut().insert(identity);
            Ok(next.run(request).await)
        }
        Err(AuthError::NoSession) => {
            AUTH_FAILURES_TOTAL
                .with_label_values(&["no_session"])
                .inc();
            Err(ApiError::unauthorized())
        }
        Err(AuthError::SessionRejected(reason)) => {
            debug!("Rejected session: {}", reason);
            AUTH_FAILURES_TOTAL
                .with_label_values(&["rejected_session"])
                .inc();
            Err(ApiError::unauthorized())
        }
        Err(e) => {
            AUTH_FAILURES_TOTAL
                .with_label_values(&["lookup_failed"])
                .inc();
            Err(ApiError::new(
                axum::http::StatusCode::INTERNAL_SERVER_ERROR,
                e.to_string(),
            ))
        }
    }
}

fn identity_from(parts: &Parts) -> Result<Identity, ApiError> {
    parts
        .extensions
        .get::<Identity>()
        .cloned()
        .ok_or_else(ApiError::unauthorized)
}

/// Extractor for the signed-in caller.
///
/// Only valid behind [`auth_middleware`]; without it every request is rejected with 401.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Identity);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        std::future::ready(identity_from(parts).map(AuthUser))
    }
}

/// Extractor for a signed-in admin. Non-admins get 403.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Identity);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl Future<Output = Result<Self, Self::Rejection>> + Send {
        let result = identity_from(parts).and_then(|identity| {
            if identity.is_admin() {
                Ok(AdminUser(identity))
            } else {
                Err(ApiError::forbidden())
            }
        });
        std::future::ready(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use sendit_core::testing::{fixtures, MockMailer};
    use sendit_core::{
        create_audit_system, load_config_from_str, AuditStore, LoginRequest, ShipmentStore,
        SqliteAuditStore, SqliteShipmentStore, SqliteUserStore, UserStore,
    };
    use tower::ServiceExt;

    use crate::state::{Collaborators, Stores};

    const CONFIG: &str = r#"
[auth]
method = "session"
admin_emails = ["admin@example.com"]
"#;

    fn test_state() -> Arc<AppState> {
        let config = load_config_from_str(CONFIG).unwrap();
        let audit_store: Arc<dyn AuditStore> = Arc::new(SqliteAuditStore::in_memory().unwrap());
        let (audit, _writer) = create_audit_system(Arc::clone(&audit_store), 16);
        let stores = Stores {
            users: Arc::new(SqliteUserStore::in_memory().unwrap()) as Arc<dyn UserStore>,
            shipments: Arc::new(SqliteShipmentStore::in_memory().unwrap())
                as Arc<dyn ShipmentStore>,
            audit: audit_store,
        };
        let collaborators = Collaborators {
            oracle: None,
            mailer: Arc::new(MockMailer::new()),
        };
        Arc::new(AppState::new(config, stores, collaborators, audit).unwrap())
    }

    fn cookie_for(state: &AppState, first: &str, email: &str) -> String {
        state
            .accounts()
            .signup(fixtures::signup(first, email, "Nairobi"))
            .unwrap();
        let (_, session) = state
            .accounts()
            .login(&LoginRequest {
                email: email.to_string(),
                password: "password123".to_string(),
            })
            .unwrap();
        format!("sendit_session={}", session.token)
    }

    async fn whoami(AuthUser(identity): AuthUser) -> String {
        identity.email
    }

    async fn admin_only(AdminUser(identity): AdminUser) -> String {
        identity.email
    }

    fn router(state: Arc<AppState>) -> Router {
        Router::new()
            .route("/me", get(whoami))
            .route("/admin", get(admin_only))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            ))
            .with_state(state)
    }

    async fn send(app: Router, path: &str, cookie: Option<&str>) -> StatusCode {
        let mut builder = Request::builder().uri(path);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let response = app
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        response.status()
    }

    #[tokio::test]
    async fn test_missing_cookie_is_unauthorized() {
        let app = router(test_state());
        assert_eq!(send(app, "/me", None).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unknown_session_is_unauthorized() {
        let app = router(test_state());
        let status = send(app, "/me", Some("sendit_session=not-a-session")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_valid_session_reaches_handler() {
        let state = test_state();
        let cookie = cookie_for(&state, "Amina", "amina@example.com");
        let app = router(state);

        assert_eq!(send(app, "/me", Some(&cookie)).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_admin_extractor_rejects_regular_user() {
        let state = test_state();
        let cookie = cookie_for(&state, "Amina", "amina@example.com");
        let app = router(state);

        assert_eq!(send(app, "/admin", Some(&cookie)).await, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_extractor_accepts_admin() {
        let state = test_state();
        let cookie = cookie_for(&state, "Ops", "admin@example.com");
        let app = router(state);

        assert_eq!(send(app, "/admin", Some(&cookie)).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_failures_are_counted() {
        let before = AUTH_FAILURES_TOTAL
            .with_label_values(&["no_session"])
            .get();

        let app = router(test_state());
        send(app, "/me", None).await;

        let after = AUTH_FAILURES_TOTAL
            .with_label_values(&["no_session"])
            .get();
        assert!(after > before);
    }
}
