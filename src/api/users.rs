//! User account API endpoints.
//!
//! - POST `/register` - Create an account
//! - POST `/login` - Verify credentials and start a session
//! - GET/PATCH/DELETE `/me` - Read, edit, or delete the current account
//! - POST `/change-password` - Replace the current password

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;

use super::error::ApiError;
use super::tokens::{cleared_cookies, session_cookies};
use crate::auth::{Auth, require_auth};
use crate::db::{Database, UserProfile};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::session::{
    ChangePasswordRequest, LoginRequest, RegisterRequest, SessionManager, UpdateDetailsRequest,
};

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub sessions: SessionManager,
    pub secure_cookies: bool,
}

impl_has_auth_backend!(UsersState);

pub fn router(state: UsersState) -> Router {
    Router::new()
        .route(
            "/me",
            get(current_user).patch(update_details).delete(delete_account),
        )
        .route("/change-password", post(change_password))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_auth::<UsersState>,
        ))
        .route("/register", post(register))
        .route("/login", post(login))
        .with_state(state)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginResponse {
    user: UserProfile,
    access_token: String,
    refresh_token: String,
}

async fn register(
    State(state): State<UsersState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let profile = state.sessions.register(&payload).await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

async fn login(
    State(state): State<UsersState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let identity = payload.identity()?;
    let outcome = state.sessions.login(identity, &payload.password).await?;

    Ok((
        StatusCode::OK,
        session_cookies(&outcome.tokens, state.secure_cookies),
        Json(LoginResponse {
            user: outcome.user,
            access_token: outcome.tokens.access.token,
            refresh_token: outcome.tokens.refresh.token,
        }),
    ))
}

async fn current_user(Auth(user): Auth) -> impl IntoResponse {
    Json(user.profile)
}

async fn update_details(
    State(state): State<UsersState>,
    Auth(user): Auth,
    payload: Result<Json<UpdateDetailsRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    let profile = state
        .sessions
        .update_details(&user.profile.uuid, &payload)
        .await?;
    Ok(Json(profile))
}

async fn change_password(
    State(state): State<UsersState>,
    Auth(user): Auth,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(payload) = payload?;
    state
        .sessions
        .change_password(&user.profile.uuid, &payload)
        .await?;
    Ok(Json(serde_json::json!({ "success": true })))
}

async fn delete_account(
    State(state): State<UsersState>,
    Auth(user): Auth,
) -> Result<impl IntoResponse, ApiError> {
    state.sessions.delete_account(&user.profile.uuid).await?;
    Ok((StatusCode::NO_CONTENT, cleared_cookies(state.secure_cookies)))
}
