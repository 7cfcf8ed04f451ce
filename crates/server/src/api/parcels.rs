//! Orders, parcels and their lifecycle.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use sendit_core::{
    Address, DestinationChange, Order, OrderRequest, Parcel, ParcelRequest, ParcelStatus,
    ParcelView, StatusUpdate,
};

use super::error::ApiError;
use super::middleware::{AdminUser, AuthUser};
use crate::state::AppState;

/// Query parameters for the admin parcel list
#[derive(Debug, Deserialize)]
pub struct ListParcelsQuery {
    /// Case-insensitive match on sender name, recipient name or tracking number
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListParcelsResponse {
    pub parcels: Vec<ParcelView>,
    pub total: usize,
}

#[derive(Debug, Serialize)]
pub struct UserParcelsResponse {
    pub parcels: Vec<Parcel>,
    pub total: usize,
}

/// Body of `PATCH /parcels/{id}`.
#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: ParcelStatus,
}

/// Create a recipient and a parcel for them in one step.
pub async fn create_order(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    Json(request): Json<OrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let order = state.orders().create_order(&identity, &request).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

/// Create a parcel for an existing recipient.
pub async fn create_parcel(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    Json(request): Json<ParcelRequest>,
) -> Result<(StatusCode, Json<Parcel>), ApiError> {
    let parcel = state
        .orders()
        .create_parcel(&identity, request.recipient_id, request.parcel)
        .await?;
    Ok((StatusCode::CREATED, Json(parcel)))
}

pub async fn list_parcels(
    State(state): State<Arc<AppState>>,
    AdminUser(identity): AdminUser,
    Query(query): Query<ListParcelsQuery>,
) -> Result<Json<ListParcelsResponse>, ApiError> {
    let parcels = state
        .admin()
        .list_parcels(&identity, query.q.as_deref())?;
    let total = parcels.len();
    Ok(Json(ListParcelsResponse { parcels, total }))
}

pub async fn get_parcel(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<ParcelView>, ApiError> {
    Ok(Json(state.orders().parcel_view(&identity, id)?))
}

/// Admin status update; sender and recipient are notified.
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    AdminUser(identity): AdminUser,
    Path(id): Path<i64>,
    Json(request): Json<StatusRequest>,
) -> Result<Json<StatusUpdate>, ApiError> {
    let update = state
        .admin()
        .set_status(&identity, id, request.status)
        .await?;
    Ok(Json(update))
}

pub async fn update_destination(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    Path(id): Path<i64>,
    Json(address): Json<Address>,
) -> Result<Json<DestinationChange>, ApiError> {
    let change = state
        .orders()
        .update_destination(&identity, id, &address)
        .await?;
    Ok(Json(change))
}

/// Cancel an undelivered parcel. Returns the removed record.
pub async fn cancel_parcel(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<Parcel>, ApiError> {
    Ok(Json(state.orders().cancel_order(&identity, id)?))
}

/// The caller's own parcels, newest first.
pub async fn list_user_parcels(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
) -> Result<Json<UserParcelsResponse>, ApiError> {
    let parcels = state.orders().list_user_parcels(&identity)?;
    let total = parcels.len();
    Ok(Json(UserParcelsResponse { parcels, total }))
}
