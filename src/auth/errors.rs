//! Authentication error types.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use super::cookie::{ACCESS_COOKIE_NAME, clear_cookie};

/// Internal auth error kind used by the core authentication logic.
#[derive(Debug, Clone, Copy)]
pub enum AuthErrorKind {
    NotAuthenticated,
    InvalidToken,
    UserNotFound,
    DatabaseError,
}

/// Rejection from the request authenticator (JSON body, clears the access cookie).
#[derive(Debug)]
pub struct ApiAuthError {
    pub(super) kind: AuthErrorKind,
    pub(super) secure_cookies: bool,
}

impl ApiAuthError {
    pub(super) fn new(kind: AuthErrorKind, secure_cookies: bool) -> Self {
        Self {
            kind,
            secure_cookies,
        }
    }

    fn status_code(&self) -> StatusCode {
        match self.kind {
            AuthErrorKind::NotAuthenticated
            | AuthErrorKind::InvalidToken
            | AuthErrorKind::UserNotFound => StatusCode::UNAUTHORIZED,
            AuthErrorKind::DatabaseError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self.kind {
            AuthErrorKind::NotAuthenticated => "Unauthorized request",
            AuthErrorKind::InvalidToken => "Invalid or expired access token",
            AuthErrorKind::UserNotFound => "Invalid access token",
            AuthErrorKind::DatabaseError => "Internal server error",
        }
    }
}

impl IntoResponse for ApiAuthError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: &'static str,
        }

        let mut response = (
            self.status_code(),
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response();

        // The refresh cookie is kept so the client can obtain a new access token
        if self.status_code() == StatusCode::UNAUTHORIZED {
            if let Ok(value) =
                HeaderValue::from_str(&clear_cookie(ACCESS_COOKIE_NAME, self.secure_cookies))
            {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
        }

        response
    }
}
