//! Signup, login, session and profile endpoints.

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use tracing::info;

use sendit_core::{
    clear_session_cookie, extract_session_token, session_cookie, LoginRequest, ProfileUpdate,
    SessionContext, SignupRequest, User,
};

use super::error::ApiError;
use super::middleware::AuthUser;
use crate::state::AppState;

/// Session token from the request's `Cookie` header, if any.
fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::COOKIE)
        .and_then(|value| value.to_str().ok())
        .and_then(extract_session_token)
}

fn signed_in(state: &AppState, status: StatusCode, user: &User, token: &str) -> Response {
    let cookie = session_cookie(token, state.config().auth.session_ttl_hours);
    (
        status,
        [(header::SET_COOKIE, cookie)],
        Json(SessionContext::for_user(user)),
    )
        .into_response()
}

/// Register an account and sign it in.
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SignupRequest>,
) -> Result<Response, ApiError> {
    let (user, session) = state.accounts().signup(request)?;
    Ok(signed_in(&state, StatusCode::CREATED, &user, &session.token))
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    let (user, session) = state.accounts().login(&request)?;
    Ok(signed_in(&state, StatusCode::OK, &user, &session.token))
}

/// End the current session, if any, and clear the cookie.
pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    if let Some(token) = session_token(&headers) {
        if state.accounts().logout(token)? {
            info!("Session ended");
        }
    }
    Ok((
        StatusCode::NO_CONTENT,
        [(header::SET_COOKIE, clear_session_cookie())],
    )
        .into_response())
}

/// Who is signed in: 200 with the session context, or 204 when nobody is.
pub async fn check_session(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    match state.accounts().check_session(session_token(&headers))? {
        Some(context) => Ok(Json(context).into_response()),
        None => Ok(StatusCode::NO_CONTENT.into_response()),
    }
}

pub async fn get_user(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    Path(id): Path<i64>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.accounts().get_profile(&identity, id)?))
}

pub async fn update_user(
    State(state): State<Arc<AppState>>,
    AuthUser(identity): AuthUser,
    Path(id): Path<i64>,
    Json(update): Json<ProfileUpdate>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(state.accounts().update_profile(&identity, id, update)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_session_token_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; sendit_session=abc123"),
        );
        assert_eq!(session_token(&headers), Some("abc123"));
    }

    #[test]
    fn test_session_token_absent() {
        let headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);
    }
}
