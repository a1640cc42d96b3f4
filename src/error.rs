//! Error kinds returned by the session and account operations.

use crate::password::PasswordError;

/// Outcome of a failed login, refresh, authentication, or account change.
///
/// Token validity details never appear here: a malformed and an expired
/// token both surface as [`AuthError::Unauthorized`].
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("user does not exist")]
    NotFound,
    #[error("invalid credential")]
    InvalidCredential,
    #[error("unauthorized")]
    Unauthorized,
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    /// Log a store failure and wrap it without leaking details.
    pub fn store(context: &str, e: impl std::fmt::Display) -> Self {
        tracing::error!("{}: {}", context, e);
        Self::Internal(context.to_string())
    }
}

impl From<PasswordError> for AuthError {
    fn from(e: PasswordError) -> Self {
        match e {
            PasswordError::Empty => AuthError::validation("Password is required"),
            PasswordError::Hash(msg) => {
                tracing::error!("Password hashing failed: {}", msg);
                AuthError::Internal("Password hashing failed".into())
            }
        }
    }
}

/// Extension trait for concise store error mapping on Results.
pub trait StoreResultExt<T> {
    fn store_err(self, context: &str) -> Result<T, AuthError>;
}

impl<T> StoreResultExt<T> for Result<T, sqlx::Error> {
    fn store_err(self, context: &str) -> Result<T, AuthError> {
        self.map_err(|e| AuthError::store(context, e))
    }
}
