//! Cookie session authentication.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::debug;

use super::{AuthError, AuthRequest, Authenticator, Identity};
use crate::account::UserStore;

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "sendit_session";

/// Generate a fresh opaque session token (64 hex characters).
pub fn generate_token() -> String {
    format!(
        "{}{}",
        uuid::Uuid::new_v4().simple(),
        uuid::Uuid::new_v4().simple()
    )
}

/// Digest under which a session token is stored.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// `Set-Cookie` value that installs a session.
pub fn session_cookie(token: &str, ttl_hours: u32) -> String {
    format!(
        "{}={}; HttpOnly; Path=/; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE,
        token,
        u64::from(ttl_hours) * 3600
    )
}

/// `Set-Cookie` value that removes the session cookie.
pub fn clear_session_cookie() -> String {
    format!(
        "{}=; HttpOnly; Path=/; SameSite=Lax; Max-Age=0",
        SESSION_COOKIE
    )
}

/// Pull the session token out of a `Cookie` header value.
pub fn extract_session_token(cookie_header: &str) -> Option<&str> {
    cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

/// Authenticator that resolves the `sendit_session` cookie against the session table.
pub struct SessionAuthenticator {
    users: Arc<dyn UserStore>,
}

impl SessionAuthenticator {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Authenticator for SessionAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        let token = request
            .headers
            .get("cookie")
            .and_then(|header| extract_session_token(header))
            .ok_or(AuthError::NoSession)?;

        let session = self
            .users
            .get_session(&hash_token(token))
            .map_err(|e| AuthError::Lookup(e.to_string()))?
            .ok_or_else(|| AuthError::SessionRejected("Unknown session".to_string()))?;

        if session.is_expired(Utc::now()) {
            debug!(user_id = session.user_id, "Session expired");
            return Err(AuthError::SessionRejected("Session expired".to_string()));
        }

        let user = self
            .users
            .get_user(session.user_id)
            .map_err(|e| AuthError::Lookup(e.to_string()))?
            .ok_or_else(|| AuthError::SessionRejected("Unknown session".to_string()))?;

        Ok(Identity::for_user(&user, self.method_name()))
    }

    fn method_name(&self) -> &'static str {
        "session"
    }
}
