//! Mapping of service errors onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

use sendit_core::{AccountError, AuditError, FieldErrors, OrderError};

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

/// An error a handler returns; renders as `{"error": ..., "fields": ...}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    fields: Option<FieldErrors>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            fields: None,
        }
    }

    pub fn validation(fields: FieldErrors) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: "Validation failed".to_string(),
            fields: Some(fields),
        }
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, "Authentication required")
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, "Admin role required")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = self.status.as_u16(), "{}", self.message);
        } else if self.status == StatusCode::CONFLICT {
            warn!("{}", self.message);
        }

        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
                fields: self.fields,
            }),
        )
            .into_response()
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::Validation(fields) => Self::validation(fields),
            OrderError::QuoteUnavailable(_) => Self::new(StatusCode::BAD_GATEWAY, err.to_string()),
            OrderError::InvalidTransition { .. } => {
                Self::new(StatusCode::CONFLICT, err.to_string())
            }
            OrderError::NotFound { .. } => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            OrderError::Forbidden => Self::forbidden(),
            OrderError::Network(_) => Self::new(StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
            OrderError::Storage(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::Validation(fields) => Self::validation(fields),
            AccountError::InvalidCredentials => {
                Self::new(StatusCode::UNAUTHORIZED, err.to_string())
            }
            AccountError::NotFound(_) => Self::new(StatusCode::NOT_FOUND, err.to_string()),
            AccountError::Forbidden => Self::new(StatusCode::FORBIDDEN, err.to_string()),
            AccountError::Storage(_) => {
                Self::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        }
    }
}

impl From<AuditError> for ApiError {
    fn from(err: AuditError) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to query audit events: {}", err),
        )
    }
}
