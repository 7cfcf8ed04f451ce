//! Account storage trait.

use chrono::{DateTime, Utc};
use thiserror::Error;

use super::{NewUser, StoredSession, User};

/// Error type for account storage operations.
#[derive(Debug, Error)]
pub enum UserStoreError {
    #[error("Email already registered: {0}")]
    EmailTaken(String),

    #[error("User not found: {0}")]
    UserNotFound(i64),

    #[error("Database error: {0}")]
    Database(String),
}

/// Trait for user and session storage backends.
pub trait UserStore: Send + Sync {
    /// Insert a user. Fails with `EmailTaken` if the email is registered.
    fn create_user(&self, user: &NewUser) -> Result<User, UserStoreError>;

    fn get_user(&self, id: i64) -> Result<Option<User>, UserStoreError>;

    /// Look up a user by email, ignoring case.
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>, UserStoreError>;

    /// Overwrite every mutable column of `user`.
    fn update_user(&self, user: &User) -> Result<User, UserStoreError>;

    fn insert_session(&self, session: &StoredSession) -> Result<(), UserStoreError>;

    fn get_session(&self, token_hash: &str) -> Result<Option<StoredSession>, UserStoreError>;

    /// Delete a session. Returns whether one existed.
    fn delete_session(&self, token_hash: &str) -> Result<bool, UserStoreError>;

    /// Delete every session that expired at or before `now`.
    fn purge_expired_sessions(&self, now: DateTime<Utc>) -> Result<usize, UserStoreError>;
}
