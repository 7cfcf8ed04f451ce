use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;

use crate::account::{Role, User, UserSummary};

/// Request information for authentication
#[derive(Debug, Clone)]
pub struct AuthRequest {
    /// Header names are lowercased.
    pub headers: HashMap<String, String>,
    pub source_ip: IpAddr,
}

/// Authenticated identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: i64,
    pub email: String,
    pub roles: Vec<Role>,
    pub method: String,
}

impl Identity {
    pub fn for_user(user: &User, method: &str) -> Self {
        Self {
            user_id: user.id,
            email: user.email.clone(),
            roles: user.roles.clone(),
            method: method.to_string(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }
}

/// What a client learns about its own session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionContext {
    pub signed_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
    pub roles: Vec<Role>,
}

impl SessionContext {
    pub fn signed_out() -> Self {
        Self {
            signed_in: false,
            user: None,
            roles: Vec::new(),
        }
    }

    pub fn for_user(user: &User) -> Self {
        Self {
            signed_in: true,
            user: Some(user.summary()),
            roles: user.roles.clone(),
        }
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }
}
