use axum::{extract::State, Json};
use serde::Deserialize;
use std::sync::Arc;

use sendit_core::{Address, ParcelInfo, Quote};

use super::error::ApiError;
use super::middleware::AuthUser;
use crate::state::AppState;

/// Body of `POST /quote`. The origin is always the caller's profile address.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct QuoteRequest {
    pub destination: Address,
    pub parcel: ParcelInfo,
}

pub async fn quote(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    Json(request): Json<QuoteRequest>,
) -> Result<Json<Quote>, ApiError> {
    let quote = state
        .orders()
        .quote(&identity, &request.destination, &request.parcel)
        .await?;
    Ok(Json(quote))
}
