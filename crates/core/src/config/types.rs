use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub auth: AuthConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub pricing: PricingConfig,
    #[serde(default)]
    pub lifecycle: LifecycleConfig,
    #[serde(default)]
    pub directions: Option<DirectionsConfig>,
    #[serde(default)]
    pub mailer: Option<MailerConfig>,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    pub method: AuthMethod,
    /// Lifetime of a session cookie, in hours.
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: u32,
    /// Accounts registered with one of these emails get the admin role.
    #[serde(default)]
    pub admin_emails: Vec<String>,
}

fn default_session_ttl_hours() -> u32 {
    168
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    Session,
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("sendit.db")
}

/// Pricing parameters for quotes and destination changes.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PricingConfig {
    /// Currency units charged per driven kilometre.
    #[serde(default = "default_rate_per_km")]
    pub rate_per_km: Decimal,
    /// Flat fee added whenever an owner re-routes a parcel.
    #[serde(default = "default_destination_change_fine")]
    pub destination_change_fine: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            rate_per_km: default_rate_per_km(),
            destination_change_fine: default_destination_change_fine(),
        }
    }
}

fn default_rate_per_km() -> Decimal {
    Decimal::new(5, 2)
}

fn default_destination_change_fine() -> Decimal {
    Decimal::from(20)
}

/// Order lifecycle rules
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LifecycleConfig {
    /// Reject admin status changes that move a parcel to an earlier state.
    #[serde(default)]
    pub enforce_forward_transitions: bool,
}

/// Directions (distance oracle) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DirectionsConfig {
    pub api_key: String,
    #[serde(default = "default_directions_base_url")]
    pub base_url: String,
    /// Request timeout in seconds (default: 10)
    #[serde(default = "default_directions_timeout")]
    pub timeout_secs: u64,
}

fn default_directions_base_url() -> String {
    "https://maps.googleapis.com/maps/api".to_string()
}

fn default_directions_timeout() -> u64 {
    10
}

/// Outbound mail configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MailerConfig {
    pub backend: MailerBackend,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub from: Option<String>,
}

fn default_smtp_port() -> u16 {
    587
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MailerBackend {
    Smtp,
    Log,
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub auth: SanitizedAuthConfig,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub pricing: PricingConfig,
    pub lifecycle: LifecycleConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub directions: Option<SanitizedDirectionsConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mailer: Option<SanitizedMailerConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAuthConfig {
    pub method: String,
    pub session_ttl_hours: u32,
    pub admin_emails_configured: usize,
}

/// Directions config with the API key hidden
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedDirectionsConfig {
    pub base_url: String,
    pub api_key_configured: bool,
    pub timeout_secs: u64,
}

/// Mailer config with credentials hidden
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedMailerConfig {
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
    pub port: u16,
    pub credentials_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            auth: SanitizedAuthConfig {
                method: match config.auth.method {
                    AuthMethod::Session => "session".to_string(),
                },
                session_ttl_hours: config.auth.session_ttl_hours,
                admin_emails_configured: config.auth.admin_emails.len(),
            },
            server: config.server.clone(),
            database: config.database.clone(),
            pricing: config.pricing.clone(),
            lifecycle: config.lifecycle.clone(),
            directions: config
                .directions
                .as_ref()
                .map(|d| SanitizedDirectionsConfig {
                    base_url: d.base_url.clone(),
                    api_key_configured: !d.api_key.is_empty(),
                    timeout_secs: d.timeout_secs,
                }),
            mailer: config.mailer.as_ref().map(|m| SanitizedMailerConfig {
                backend: match m.backend {
                    MailerBackend::Smtp => "smtp".to_string(),
                    MailerBackend::Log => "log".to_string(),
                },
                host: m.host.clone(),
                port: m.port,
                credentials_configured: m.username.is_some() && m.password.is_some(),
                from: m.from.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_config() {
        let toml = r#"
[auth]
method = "session"

[server]
host = "127.0.0.1"
port = 9000
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.auth.method, AuthMethod::Session);
        assert_eq!(config.auth.session_ttl_hours, 168);
        assert!(config.auth.admin_emails.is_empty());
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let toml = r#"
[auth]
method = "session"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.database.path.to_str().unwrap(), "sendit.db");
        assert_eq!(config.pricing.rate_per_km, Decimal::new(5, 2));
        assert_eq!(config.pricing.destination_change_fine, Decimal::from(20));
        assert!(!config.lifecycle.enforce_forward_transitions);
        assert!(config.directions.is_none());
        assert!(config.mailer.is_none());
    }

    #[test]
    fn test_deserialize_missing_auth_fails() {
        let toml = r#"
[server]
port = 8080
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_unknown_auth_method_fails() {
        let toml = r#"
[auth]
method = "oidc"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[auth]
method = "session"
session_ttl_hours = 24
admin_emails = ["ops@sendit.example"]

[pricing]
rate_per_km = "0.10"
destination_change_fine = "25.50"

[lifecycle]
enforce_forward_transitions = true

[directions]
api_key = "maps-key"

[mailer]
backend = "smtp"
host = "smtp.example.com"
username = "mailer"
password = "hunter2"
from = "SendIT <noreply@sendit.example>"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.auth.session_ttl_hours, 24);
        assert_eq!(config.auth.admin_emails, vec!["ops@sendit.example"]);
        assert_eq!(config.pricing.rate_per_km, Decimal::new(10, 2));
        assert_eq!(config.pricing.destination_change_fine, Decimal::new(2550, 2));
        assert!(config.lifecycle.enforce_forward_transitions);

        let directions = config.directions.as_ref().unwrap();
        assert_eq!(directions.api_key, "maps-key");
        assert_eq!(directions.base_url, "https://maps.googleapis.com/maps/api");
        assert_eq!(directions.timeout_secs, 10);

        let mailer = config.mailer.as_ref().unwrap();
        assert_eq!(mailer.backend, MailerBackend::Smtp);
        assert_eq!(mailer.port, 587);
    }

    #[test]
    fn test_sanitized_config_hides_secrets() {
        let toml = r#"
[auth]
method = "session"
admin_emails = ["a@example.com", "b@example.com"]

[directions]
api_key = "maps-key"
timeout_secs = 5

[mailer]
backend = "smtp"
host = "smtp.example.com"
username = "mailer"
password = "hunter2"
from = "noreply@sendit.example"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let sanitized = SanitizedConfig::from(&config);

        assert_eq!(sanitized.auth.method, "session");
        assert_eq!(sanitized.auth.admin_emails_configured, 2);

        let directions = sanitized.directions.as_ref().unwrap();
        assert!(directions.api_key_configured);
        assert_eq!(directions.timeout_secs, 5);

        let mailer = sanitized.mailer.as_ref().unwrap();
        assert_eq!(mailer.backend, "smtp");
        assert!(mailer.credentials_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("maps-key"));
        assert!(!json.contains("hunter2"));
    }
}
