use async_trait::async_trait;
use thiserror::Error;

use super::types::{AuthRequest, Identity};

/// Why a request could not be tied to a signed-in user.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No `sendit_session` cookie on the request.
    #[error("Authentication required")]
    NoSession,

    /// A cookie was sent but names no live session.
    #[error("Session rejected: {0}")]
    SessionRejected(String),

    /// The session or user lookup itself failed.
    #[error("Session lookup failed: {0}")]
    Lookup(String),

    #[error("Invalid auth configuration: {0}")]
    InvalidConfig(String),
}

/// Resolves the caller of a request from its headers.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError>;

    /// Stamped on every `Identity` this authenticator produces.
    fn method_name(&self) -> &'static str;
}
