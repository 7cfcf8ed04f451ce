use rust_decimal::Decimal;

use super::{
    types::{Config, MailerBackend},
    ConfigError,
};

/// Validate configuration
/// Currently validates:
/// - Auth section exists (enforced by serde) and the session TTL is positive
/// - Server port is not 0
/// - Pricing: positive rate, non-negative destination change fine
/// - Directions: API key present, positive timeout
/// - Mailer: SMTP host and sender present when the SMTP backend is selected
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.auth.session_ttl_hours == 0 {
        return Err(ConfigError::ValidationError(
            "auth.session_ttl_hours must be greater than 0".to_string(),
        ));
    }

    if config.pricing.rate_per_km <= Decimal::ZERO {
        return Err(ConfigError::ValidationError(
            "pricing.rate_per_km must be greater than 0".to_string(),
        ));
    }

    if config.pricing.destination_change_fine < Decimal::ZERO {
        return Err(ConfigError::ValidationError(
            "pricing.destination_change_fine cannot be negative".to_string(),
        ));
    }

    if let Some(ref directions) = config.directions {
        if directions.api_key.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "directions.api_key cannot be empty".to_string(),
            ));
        }
        if directions.timeout_secs == 0 {
            return Err(ConfigError::ValidationError(
                "directions.timeout_secs must be greater than 0".to_string(),
            ));
        }
    }

    if let Some(ref mailer) = config.mailer {
        if mailer.backend == MailerBackend::Smtp {
            if mailer.host.as_deref().map_or(true, |h| h.trim().is_empty()) {
                return Err(ConfigError::ValidationError(
                    "mailer.host is required for the smtp backend".to_string(),
                ));
            }
            if mailer.from.as_deref().map_or(true, |f| f.trim().is_empty()) {
                return Err(ConfigError::ValidationError(
                    "mailer.from is required for the smtp backend".to_string(),
                ));
            }
        }
    }

    Ok(())
}
