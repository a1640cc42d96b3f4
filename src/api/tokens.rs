//! Token management API endpoints.
//!
//! - POST `/refresh` - Exchange a refresh token for a new token pair
//! - POST `/logout` - Revoke the refresh token and clear cookies
//! - GET `/verify` - Check that the access token is valid

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    middleware,
    response::{AppendHeaders, IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;

use super::error::ApiError;
use crate::auth::{
    ACCESS_COOKIE_NAME, Auth, REFRESH_COOKIE_NAME, clear_cookie, extract_token, require_auth,
    set_cookie,
};
use crate::db::Database;
use crate::error::AuthError;
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::session::{SessionManager, TokenPair};

#[derive(Clone)]
pub struct TokensState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub sessions: SessionManager,
    pub secure_cookies: bool,
}

impl_has_auth_backend!(TokensState);

pub fn router(state: TokensState) -> Router {
    Router::new()
        .route("/verify", get(verify_token))
        .route("/logout", post(logout))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_auth::<TokensState>,
        ))
        .route("/refresh", post(refresh_token))
        .with_state(state)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokensResponse {
    access_token: String,
    refresh_token: String,
}

/// `Set-Cookie` headers for a freshly issued token pair.
pub(super) fn session_cookies(
    tokens: &TokenPair,
    secure: bool,
) -> AppendHeaders<[(axum::http::HeaderName, String); 2]> {
    AppendHeaders([
        (
            SET_COOKIE,
            set_cookie(
                ACCESS_COOKIE_NAME,
                &tokens.access.token,
                tokens.access.duration,
                secure,
            ),
        ),
        (
            SET_COOKIE,
            set_cookie(
                REFRESH_COOKIE_NAME,
                &tokens.refresh.token,
                tokens.refresh.duration,
                secure,
            ),
        ),
    ])
}

/// `Set-Cookie` headers that remove both token cookies.
pub(super) fn cleared_cookies(secure: bool) -> AppendHeaders<[(axum::http::HeaderName, String); 2]> {
    AppendHeaders([
        (SET_COOKIE, clear_cookie(ACCESS_COOKIE_NAME, secure)),
        (SET_COOKIE, clear_cookie(REFRESH_COOKIE_NAME, secure)),
    ])
}

/// Verify that the current access token is still valid.
/// Returns 200 if valid, 401 if not.
async fn verify_token(Auth(_user): Auth) -> impl IntoResponse {
    StatusCode::OK
}

/// Rotate the refresh token and issue a new pair.
/// On rejection both cookies are cleared so the client logs in again.
async fn refresh_token(State(state): State<TokensState>, headers: HeaderMap) -> Response {
    let presented = extract_token(&headers, REFRESH_COOKIE_NAME);

    match state.sessions.refresh(presented).await {
        Ok(tokens) => (
            StatusCode::OK,
            session_cookies(&tokens, state.secure_cookies),
            Json(TokensResponse {
                access_token: tokens.access.token,
                refresh_token: tokens.refresh.token,
            }),
        )
            .into_response(),
        Err(AuthError::Unauthorized) => (
            cleared_cookies(state.secure_cookies),
            ApiError::unauthorized("Invalid or expired refresh token"),
        )
            .into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

/// Logout - revoke the refresh token and clear both cookies.
async fn logout(
    State(state): State<TokensState>,
    Auth(user): Auth,
) -> Result<impl IntoResponse, ApiError> {
    state.sessions.logout(&user.profile.uuid).await?;

    Ok((
        StatusCode::OK,
        cleared_cookies(state.secure_cookies),
        Json(serde_json::json!({ "success": true })),
    ))
}
