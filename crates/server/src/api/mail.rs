use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use sendit_core::OutgoingMail;

use super::error::ApiError;
use super::middleware::AdminUser;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct SendEmailResponse {
    pub sent: bool,
    pub recipients: usize,
}

/// Send an ad-hoc message through the configured mailer.
pub async fn send_email(
    State(state): State<Arc<AppState>>,
    AdminUser(identity): AdminUser,
    Json(mail): Json<OutgoingMail>,
) -> Result<(StatusCode, Json<SendEmailResponse>), ApiError> {
    state.admin().send_email(&identity, &mail).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(SendEmailResponse {
            sent: true,
            recipients: mail.to.len(),
        }),
    ))
}
