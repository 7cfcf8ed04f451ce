mod password;
mod session;
mod traits;
mod types;

pub use password::*;
pub use session::*;
pub use traits::*;
pub use types::*;

use std::sync::Arc;

use crate::account::UserStore;
use crate::config::AuthConfig;

/// Factory function to create authenticator from config
pub fn create_authenticator(
    config: &AuthConfig,
    users: Arc<dyn UserStore>,
) -> Result<Box<dyn Authenticator>, AuthError> {
    use crate::config::AuthMethod;

    match config.method {
        AuthMethod::Session => {
            if config.session_ttl_hours == 0 {
                return Err(AuthError::InvalidConfig(
                    "session_ttl_hours must be greater than zero".to_string(),
                ));
            }
            Ok(Box::new(SessionAuthenticator::new(users)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::SqliteUserStore;
    use crate::config::AuthMethod;

    #[test]
    fn test_create_authenticator_session() {
        let config = AuthConfig {
            method: AuthMethod::Session,
            session_ttl_hours: 24,
            admin_emails: vec![],
        };
        let users = Arc::new(SqliteUserStore::in_memory().unwrap());
        let auth = create_authenticator(&config, users).unwrap();
        assert_eq!(auth.method_name(), "session");
    }

    #[test]
    fn test_create_authenticator_zero_ttl() {
        let config = AuthConfig {
            method: AuthMethod::Session,
            session_ttl_hours: 0,
            admin_emails: vec![],
        };
        let users = Arc::new(SqliteUserStore::in_memory().unwrap());
        let result = create_authenticator(&config, users);
        assert!(matches!(result, Err(AuthError::InvalidConfig(_))));
    }
}
