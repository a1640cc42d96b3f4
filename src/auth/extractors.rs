//! Request authentication: middleware and extractor.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{HeaderMap, request::Parts},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use super::cookie::{ACCESS_COOKIE_NAME, extract_token};
use super::errors::{ApiAuthError, AuthErrorKind};
use super::state::HasAuthBackend;
use super::types::AuthenticatedUser;

/// Resolve the caller from the access token in the request headers.
///
/// The token comes from the access cookie, else the Bearer header. Only the
/// access token is consulted; the stored refresh hash is never read here.
pub async fn authenticate<S>(headers: &HeaderMap, state: &S) -> Result<AuthenticatedUser, ApiAuthError>
where
    S: HasAuthBackend + Send + Sync,
{
    let reject = |kind: AuthErrorKind| ApiAuthError::new(kind, state.secure_cookies());

    let token = extract_token(headers, ACCESS_COOKIE_NAME)
        .ok_or_else(|| reject(AuthErrorKind::NotAuthenticated))?;

    let claims = state.jwt().access().verify(token).map_err(|e| {
        debug!(reason = %e, "Access token rejected");
        reject(AuthErrorKind::InvalidToken)
    })?;

    let profile = state
        .db()
        .users()
        .get_profile_by_uuid(&claims.sub)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get user: {}", e);
            reject(AuthErrorKind::DatabaseError)
        })?
        .ok_or_else(|| {
            debug!(user = %claims.sub, "Access token for missing user");
            reject(AuthErrorKind::UserNotFound)
        })?;

    Ok(AuthenticatedUser { profile, claims })
}

/// Middleware that rejects unauthenticated requests and stores the
/// [`AuthenticatedUser`] in request extensions for downstream handlers.
pub async fn require_auth<S>(
    State(state): State<S>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiAuthError>
where
    S: HasAuthBackend + Clone + Send + Sync + 'static,
{
    let user = authenticate(request.headers(), &state).await?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// Extractor for handlers that require authentication.
///
/// Reuses the identity placed by [`require_auth`] when present, otherwise
/// authenticates the request itself.
pub struct Auth(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for Auth
where
    S: HasAuthBackend + Send + Sync,
{
    type Rejection = ApiAuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthenticatedUser>() {
            return Ok(Auth(user.clone()));
        }
        authenticate(&parts.headers, state).await.map(Auth)
    }
}
