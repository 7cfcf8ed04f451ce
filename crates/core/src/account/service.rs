//! Signup, login, sessions and profile management.

use std::sync::Arc;

use chrono::{Duration, Utc};
use thiserror::Error;
use tracing::{debug, info};

use super::{
    LoginRequest, NewUser, ProfileUpdate, Role, Session, SignupRequest, StoredSession, User,
    UserStore, UserStoreError,
};
use crate::audit::{AuditEvent, AuditHandle};
use crate::auth::{generate_token, hash_password, hash_token, verify_password, Identity, SessionContext};
use crate::config::AuthConfig;
use crate::metrics;
use crate::validation::{validate, validate_supplied, FieldErrors, ADDRESS_FORM, SIGNUP_FORM};

const EMAIL_IN_USE: &str = "Email is already in use";

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("User not found: {0}")]
    NotFound(i64),

    #[error("Not allowed to access this account")]
    Forbidden,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<UserStoreError> for AccountError {
    fn from(err: UserStoreError) -> Self {
        match err {
            UserStoreError::EmailTaken(_) => {
                AccountError::Validation(FieldErrors::single("email", EMAIL_IN_USE))
            }
            UserStoreError::UserNotFound(id) => AccountError::NotFound(id),
            UserStoreError::Database(msg) => AccountError::Storage(msg),
        }
    }
}

/// Account operations over a [`UserStore`].
pub struct AccountService {
    users: Arc<dyn UserStore>,
    admin_emails: Vec<String>,
    session_ttl: Duration,
    audit: Option<AuditHandle>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserStore>, config: &AuthConfig) -> Self {
        Self {
            users,
            admin_emails: config
                .admin_emails
                .iter()
                .map(|e| e.trim().to_lowercase())
                .collect(),
            session_ttl: Duration::hours(i64::from(config.session_ttl_hours)),
            audit: None,
        }
    }

    pub fn with_audit(mut self, audit: AuditHandle) -> Self {
        self.audit = Some(audit);
        self
    }

    fn emit(&self, event: AuditEvent) {
        if let Some(ref audit) = self.audit {
            audit.try_emit(event);
        }
    }

    /// Register an account and sign it in.
    pub fn signup(&self, request: SignupRequest) -> Result<(User, Session), AccountError> {
        validate(&request, SIGNUP_FORM)
            .into_result()
            .map_err(AccountError::Validation)?;

        let email = request.email.trim().to_lowercase();
        if self.users.get_user_by_email(&email)?.is_some() {
            return Err(AccountError::Validation(FieldErrors::single(
                "email",
                EMAIL_IN_USE,
            )));
        }

        let password_hash =
            hash_password(&request.password).map_err(|e| AccountError::Storage(e.to_string()))?;

        let role = if self.admin_emails.contains(&email) {
            Role::Admin
        } else {
            Role::User
        };

        let user = self.users.create_user(&NewUser {
            first_name: request.first_name,
            last_name: request.last_name,
            email,
            password_hash,
            phone_number: request.phone_number,
            address: request.address,
            roles: vec![role],
        })?;

        info!(user_id = user.id, role = role.as_str(), "User registered");
        metrics::USERS_REGISTERED.inc();
        self.emit(AuditEvent::UserRegistered {
            user_id: user.id,
            email: user.email.clone(),
            role: role.as_str().to_string(),
        });

        let session = self.start_session(user.id)?;
        Ok((user, session))
    }

    /// Verify credentials and open a session.
    pub fn login(&self, request: &LoginRequest) -> Result<(User, Session), AccountError> {
        let user = match self.users.get_user_by_email(&request.email)? {
            Some(user) if verify_password(&request.password, &user.password_hash) => user,
            _ => {
                debug!("Login rejected");
                metrics::LOGINS_TOTAL.with_label_values(&["failed"]).inc();
                return Err(AccountError::InvalidCredentials);
            }
        };

        metrics::LOGINS_TOTAL.with_label_values(&["success"]).inc();
        let session = self.start_session(user.id)?;
        Ok((user, session))
    }

    fn start_session(&self, user_id: i64) -> Result<Session, AccountError> {
        let token = generate_token();
        let created_at = Utc::now();
        let expires_at = created_at + self.session_ttl;

        self.users.insert_session(&StoredSession {
            token_hash: hash_token(&token),
            user_id,
            created_at,
            expires_at,
        })?;

        Ok(Session {
            token,
            user_id,
            created_at,
            expires_at,
        })
    }

    /// End the session behind `token`. Returns whether one existed.
    pub fn logout(&self, token: &str) -> Result<bool, AccountError> {
        Ok(self.users.delete_session(&hash_token(token))?)
    }

    /// Resolve a session token. `None` when there is no live session.
    pub fn check_session(&self, token: Option<&str>) -> Result<Option<SessionContext>, AccountError> {
        let Some(token) = token else {
            return Ok(None);
        };

        let token_hash = hash_token(token);
        let Some(session) = self.users.get_session(&token_hash)? else {
            return Ok(None);
        };

        if session.is_expired(Utc::now()) {
            self.users.delete_session(&token_hash)?;
            return Ok(None);
        }

        Ok(self
            .users
            .get_user(session.user_id)?
            .map(|user| SessionContext::for_user(&user)))
    }

    /// Drop expired sessions. Returns how many were removed.
    pub fn purge_expired_sessions(&self) -> Result<usize, AccountError> {
        Ok(self.users.purge_expired_sessions(Utc::now())?)
    }

    /// Load the account behind an authenticated identity.
    pub fn current_user(&self, actor: &Identity) -> Result<User, AccountError> {
        self.users
            .get_user(actor.user_id)?
            .ok_or(AccountError::NotFound(actor.user_id))
    }

    pub fn get_profile(&self, actor: &Identity, id: i64) -> Result<User, AccountError> {
        if actor.user_id != id && !actor.is_admin() {
            return Err(AccountError::Forbidden);
        }
        self.users.get_user(id)?.ok_or(AccountError::NotFound(id))
    }

    /// Apply a partial profile edit. Only the account owner or an admin may do this.
    pub fn update_profile(
        &self,
        actor: &Identity,
        id: i64,
        update: ProfileUpdate,
    ) -> Result<User, AccountError> {
        let mut user = self.get_profile(actor, id)?;

        let mut errors = validate_supplied(
            SIGNUP_FORM,
            &[
                ("first_name", update.first_name.as_deref()),
                ("last_name", update.last_name.as_deref()),
                ("email", update.email.as_deref()),
                ("password", update.password.as_deref()),
            ],
        );
        errors.extend(validate_supplied(
            ADDRESS_FORM,
            &[
                ("street", update.street.as_deref()),
                ("city", update.city.as_deref()),
                ("state", update.state.as_deref()),
                ("zip_code", update.zip_code.as_deref()),
                ("country", update.country.as_deref()),
            ],
        ));
        errors.into_result().map_err(AccountError::Validation)?;

        if let Some(email) = update.email {
            let email = email.trim().to_lowercase();
            if email != user.email {
                if let Some(existing) = self.users.get_user_by_email(&email)? {
                    if existing.id != user.id {
                        return Err(AccountError::Validation(FieldErrors::single(
                            "email",
                            EMAIL_IN_USE,
                        )));
                    }
                }
                user.email = email;
            }
        }

        if let Some(password) = update.password {
            user.password_hash =
                hash_password(&password).map_err(|e| AccountError::Storage(e.to_string()))?;
        }

        if let Some(first_name) = update.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = update.last_name {
            user.last_name = last_name;
        }
        if let Some(phone_number) = update.phone_number {
            user.phone_number = phone_number;
        }
        if let Some(street) = update.street {
            user.address.street = street;
        }
        if let Some(city) = update.city {
            user.address.city = city;
        }
        if let Some(state) = update.state {
            user.address.state = state;
        }
        if let Some(zip_code) = update.zip_code {
            user.address.zip_code = zip_code;
        }
        if let Some(country) = update.country {
            user.address.country = country;
        }

        let updated = self.users.update_user(&user)?;
        if actor.user_id != id {
            info!(admin_id = actor.user_id, user_id = id, "Profile updated by admin");
        }
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::SqliteUserStore;
    use crate::config::AuthMethod;
    use crate::shipment::Address;

    fn service() -> AccountService {
        let users = Arc::new(SqliteUserStore::in_memory().unwrap());
        AccountService::new(
            users,
            &AuthConfig {
                method: AuthMethod::Session,
                session_ttl_hours: 24,
                admin_emails: vec!["Ops@SendIT.example".to_string()],
            },
        )
    }

    fn signup_request(email: &str) -> SignupRequest {
        SignupRequest {
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            email: email.to_string(),
            password: "hunter22".to_string(),
            phone_number: "0700000000".to_string(),
            address: Address {
                street: "1 Moi Avenue".to_string(),
                city: "Nairobi".to_string(),
                state: "Nairobi".to_string(),
                zip_code: "00100".to_string(),
                country: "Kenya".to_string(),
            },
        }
    }

    fn identity(user: &User) -> Identity {
        Identity::for_user(user, "session")
    }

    #[test]
    fn test_signup_creates_user_and_session() {
        let service = service();
        let (user, session) = service.signup(signup_request("Jane@Example.com")).unwrap();

        assert_eq!(user.email, "jane@example.com");
        assert_eq!(user.roles, vec![Role::User]);
        assert_ne!(user.password_hash, "hunter22");
        assert_eq!(session.user_id, user.id);
        assert_eq!(session.expires_at - session.created_at, Duration::hours(24));

        let context = service.check_session(Some(&session.token)).unwrap().unwrap();
        assert!(context.signed_in);
        assert_eq!(context.user.unwrap().id, user.id);
    }

    #[test]
    fn test_signup_admin_email_gets_admin_role() {
        let service = service();
        let (user, _) = service.signup(signup_request("ops@sendit.example")).unwrap();
        assert!(user.is_admin());
    }

    #[test]
    fn test_signup_validation() {
        let service = service();
        let mut request = signup_request("not-an-email");
        request.password = "123".to_string();
        request.first_name = " ".to_string();

        let err = service.signup(request).unwrap_err();
        let AccountError::Validation(fields) = err else {
            panic!("expected validation error, got {:?}", err);
        };
        assert_eq!(fields.get("email"), Some("Invalid email address"));
        assert_eq!(fields.get("password"), Some("Must be at least 6 characters"));
        assert_eq!(fields.get("first_name"), Some("Required"));
    }

    #[test]
    fn test_signup_duplicate_email() {
        let service = service();
        service.signup(signup_request("jane@example.com")).unwrap();

        let err = service.signup(signup_request("JANE@example.com")).unwrap_err();
        let AccountError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert_eq!(fields.get("email"), Some(EMAIL_IN_USE));
    }

    #[test]
    fn test_login() {
        let service = service();
        let (user, _) = service.signup(signup_request("jane@example.com")).unwrap();

        let (logged_in, session) = service
            .login(&LoginRequest {
                email: "JANE@example.com".to_string(),
                password: "hunter22".to_string(),
            })
            .unwrap();
        assert_eq!(logged_in.id, user.id);
        assert_eq!(session.token.len(), 64);

        let wrong = service.login(&LoginRequest {
            email: "jane@example.com".to_string(),
            password: "wrong-password".to_string(),
        });
        assert!(matches!(wrong, Err(AccountError::InvalidCredentials)));

        let unknown = service.login(&LoginRequest {
            email: "nobody@example.com".to_string(),
            password: "hunter22".to_string(),
        });
        assert!(matches!(unknown, Err(AccountError::InvalidCredentials)));
    }

    #[test]
    fn test_logout_ends_session() {
        let service = service();
        let (_, session) = service.signup(signup_request("jane@example.com")).unwrap();

        assert!(service.logout(&session.token).unwrap());
        assert!(service.check_session(Some(&session.token)).unwrap().is_none());
        assert!(!service.logout(&session.token).unwrap());
    }

    #[test]
    fn test_check_session_without_token() {
        let service = service();
        assert!(service.check_session(None).unwrap().is_none());
        assert!(service.check_session(Some("garbage")).unwrap().is_none());
    }

    #[test]
    fn test_profile_access_rules() {
        let service = service();
        let (jane, _) = service.signup(signup_request("jane@example.com")).unwrap();
        let (john, _) = service.signup(signup_request("john@example.com")).unwrap();
        let (admin, _) = service.signup(signup_request("ops@sendit.example")).unwrap();

        assert_eq!(service.get_profile(&identity(&jane), jane.id).unwrap().id, jane.id);
        assert!(matches!(
            service.get_profile(&identity(&john), jane.id),
            Err(AccountError::Forbidden)
        ));
        assert_eq!(service.get_profile(&identity(&admin), jane.id).unwrap().id, jane.id);
        assert!(matches!(
            service.get_profile(&identity(&admin), 999),
            Err(AccountError::NotFound(999))
        ));
    }

    #[test]
    fn test_update_profile() {
        let service = service();
        let (jane, _) = service.signup(signup_request("jane@example.com")).unwrap();

        let updated = service
            .update_profile(
                &identity(&jane),
                jane.id,
                ProfileUpdate {
                    city: Some("Kisumu".to_string()),
                    phone_number: Some("0711111111".to_string()),
                    password: Some("new-secret".to_string()),
                    ..Default::default()
                },
            )
            .unwrap();

        assert_eq!(updated.address.city, "Kisumu");
        assert_eq!(updated.address.country, "Kenya");
        assert_eq!(updated.phone_number, "0711111111");

        assert!(service
            .login(&LoginRequest {
                email: "jane@example.com".to_string(),
                password: "new-secret".to_string(),
            })
            .is_ok());
    }

    #[test]
    fn test_update_profile_rejects_bad_fields() {
        let service = service();
        let (jane, _) = service.signup(signup_request("jane@example.com")).unwrap();
        service.signup(signup_request("john@example.com")).unwrap();

        let err = service
            .update_profile(
                &identity(&jane),
                jane.id,
                ProfileUpdate {
                    email: Some("bad".to_string()),
                    city: Some("".to_string()),
                    ..Default::default()
                },
            )
            .unwrap_err();
        let AccountError::Validation(fields) = err else {
            panic!("expected validation error");
        };
        assert!(fields.contains("email"));
        assert_eq!(fields.get("city"), Some("Required"));

        let taken = service.update_profile(
            &identity(&jane),
            jane.id,
            ProfileUpdate {
                email: Some("john@example.com".to_string()),
                ..Default::default()
            },
        );
        assert!(matches!(taken, Err(AccountError::Validation(_))));
    }

    #[tokio::test]
    async fn test_signup_emits_audit_event() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(10);
        let service = service().with_audit(AuditHandle::new(tx));

        let (user, _) = service.signup(signup_request("jane@example.com")).unwrap();

        let envelope = rx.try_recv().unwrap();
        assert_eq!(
            envelope.event,
            AuditEvent::UserRegistered {
                user_id: user.id,
                email: "jane@example.com".to_string(),
                role: "user".to_string(),
            }
        );
    }
}
