use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use sendit_core::{ContactUpdate, Recipient, RecipientInfo};

use super::error::ApiError;
use super::middleware::AuthUser;
use crate::state::AppState;

pub async fn create_recipient(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    Json(info): Json<RecipientInfo>,
) -> Result<(StatusCode, Json<Recipient>), ApiError> {
    let recipient = state.orders().create_recipient(&identity, &info)?;
    Ok((StatusCode::CREATED, Json(recipient)))
}

pub async fn get_recipient(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Recipient>, ApiError> {
    Ok(Json(state.orders().get_recipient(&identity, id)?))
}

/// Edit contact fields; the address is changed through the parcel's destination.
pub async fn update_recipient(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    Path(id): Path<i64>,
    Json(update): Json<ContactUpdate>,
) -> Result<Json<Recipient>, ApiError> {
    Ok(Json(
        state
            .orders()
            .update_recipient_contact(&identity, id, &update)?,
    ))
}
