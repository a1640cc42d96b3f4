//! Session lifecycle: login, logout, and refresh token rotation.
//!
//! Only a SHA-256 hash of the most recent refresh token is kept on the user
//! record. A refresh token is accepted when its signature and expiry check
//! out AND its hash matches the stored one; every successful refresh
//! replaces the stored hash, so a refresh token is good for one use.

mod account;

use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::db::{Database, User, UserProfile};
use crate::error::{AuthError, StoreResultExt};
use crate::jwt::{IssuedToken, JwtConfig, TokenError};
use crate::password;

pub use account::{ChangePasswordRequest, RegisterRequest, UpdateDetailsRequest};

/// Freshly issued access and refresh tokens.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub tokens: TokenPair,
    pub user: UserProfile,
}

/// Login request body. Either `username` or `email` identifies the account.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub password: String,
}

impl LoginRequest {
    /// The identity to look up: username if given, else email.
    pub fn identity(&self) -> Result<&str, AuthError> {
        [self.username.as_deref(), self.email.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|s| !s.is_empty())
            .ok_or_else(|| AuthError::validation("Username or email is required"))
    }
}

/// Orchestrates credential checks, token issuance, and refresh token storage.
#[derive(Clone)]
pub struct SessionManager {
    db: Database,
    jwt: Arc<JwtConfig>,
}

impl SessionManager {
    pub fn new(db: Database, jwt: Arc<JwtConfig>) -> Self {
        Self { db, jwt }
    }

    pub fn jwt(&self) -> &JwtConfig {
        &self.jwt
    }

    /// Verify a password and start a session.
    ///
    /// Performs exactly one store write: the new refresh token hash.
    pub async fn login(&self, identity: &str, password: &str) -> Result<LoginOutcome, AuthError> {
        let identity = identity.trim();
        if identity.is_empty() {
            return Err(AuthError::validation("Username or email is required"));
        }
        if password.is_empty() {
            return Err(AuthError::validation("Password is required"));
        }

        let user = self
            .db
            .users()
            .get_by_identity(identity)
            .await
            .store_err("Failed to look up user")?
            .ok_or(AuthError::NotFound)?;

        if !verify_password(password, &user.password_hash).await? {
            warn!(user = %user.uuid, "Login rejected: wrong password");
            return Err(AuthError::InvalidCredential);
        }

        let tokens = self.issue_pair(&user.uuid)?;
        let new_hash = hash_refresh_token(&tokens.refresh.token);

        let updated = self
            .write_refresh_hash(user.id, None, Some(new_hash))
            .await?
            .ok_or(AuthError::NotFound)?;

        info!(user = %updated.uuid, "User logged in");

        Ok(LoginOutcome {
            tokens,
            user: updated.profile(),
        })
    }

    /// Revoke the user's refresh token. Safe to call when already logged out.
    pub async fn logout(&self, user_uuid: &str) -> Result<(), AuthError> {
        let user = self.load_user(user_uuid).await?;

        self.write_refresh_hash(user.id, None, None)
            .await?
            .ok_or(AuthError::Unauthorized)?;

        info!(user = %user.uuid, "User logged out");
        Ok(())
    }

    /// Exchange a refresh token for a new token pair, rotating the stored hash.
    pub async fn refresh(&self, presented: Option<&str>) -> Result<TokenPair, AuthError> {
        let presented = presented
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::Unauthorized)?;

        let claims = self.jwt.refresh().verify(presented).map_err(|e| {
            debug!(reason = %e, "Refresh token rejected");
            AuthError::Unauthorized
        })?;

        let user = self.load_user(&claims.sub).await?;

        let presented_hash = hash_refresh_token(presented);
        let is_current = user
            .refresh_token_hash
            .as_deref()
            .is_some_and(|stored| constant_time_eq(stored.as_bytes(), presented_hash.as_bytes()));

        if !is_current {
            warn!(user = %user.uuid, "Refresh rejected: token revoked or already rotated");
            return Err(AuthError::Unauthorized);
        }

        let tokens = self.issue_pair(&user.uuid)?;
        let new_hash = hash_refresh_token(&tokens.refresh.token);

        // Compare-and-set on the presented hash: a concurrent refresh with the
        // same token that wrote first makes this match no row.
        let rotated = self
            .write_refresh_hash(user.id, Some(presented_hash), Some(new_hash))
            .await?;

        if rotated.is_none() {
            warn!(user = %user.uuid, "Refresh rejected: lost rotation race");
            return Err(AuthError::Unauthorized);
        }

        info!(user = %user.uuid, "Refresh token rotated");
        Ok(tokens)
    }

    async fn load_user(&self, user_uuid: &str) -> Result<User, AuthError> {
        self.db
            .users()
            .get_by_uuid(user_uuid)
            .await
            .store_err("Failed to get user")?
            .ok_or(AuthError::Unauthorized)
    }

    fn issue_pair(&self, subject: &str) -> Result<TokenPair, AuthError> {
        let issue_err = |e: TokenError| {
            tracing::error!("Failed to issue token: {}", e);
            AuthError::Internal("Failed to issue token".into())
        };

        Ok(TokenPair {
            access: self.jwt.access().issue(subject).map_err(issue_err)?,
            refresh: self.jwt.refresh().issue(subject).map_err(issue_err)?,
        })
    }

    async fn write_refresh_hash(
        &self,
        id: i64,
        expected: Option<String>,
        new_hash: Option<String>,
    ) -> Result<Option<User>, AuthError> {
        let users = self.db.users();
        run_write(async move {
            users
                .update_refresh_hash(id, expected.as_deref(), new_hash.as_deref())
                .await
        })
        .await
        .store_err("Failed to store refresh token")
    }
}

/// Hex SHA-256 of a refresh token, the form kept on the user record.
pub fn hash_refresh_token(token: &str) -> String {
    let mut h = Sha256::new();
    h.update(token.as_bytes());
    hex::encode(h.finalize())
}

/// Constant-time byte comparison.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Run a store write on its own task so it completes even if the caller is dropped.
async fn run_write<F, T>(write: F) -> Result<T, sqlx::Error>
where
    F: Future<Output = Result<T, sqlx::Error>> + Send + 'static,
    T: Send + 'static,
{
    match tokio::spawn(write).await {
        Ok(result) => result,
        Err(e) => Err(sqlx::Error::Protocol(format!("write task failed: {e}"))),
    }
}

async fn verify_password(plain: &str, hash: &str) -> Result<bool, AuthError> {
    let plain = plain.to_owned();
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || password::verify_password(&plain, &hash))
        .await
        .map_err(|e| AuthError::store("Password verification task failed", e))
}

async fn hash_password(plain: &str) -> Result<String, AuthError> {
    let plain = plain.to_owned();
    tokio::task::spawn_blocking(move || password::hash_password(&plain))
        .await
        .map_err(|e| AuthError::store("Password hashing task failed", e))?
        .map_err(AuthError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuthConfig;

    async fn setup() -> (SessionManager, Database) {
        let db = Database::open(":memory:").await.unwrap();
        let config = AuthConfig::new(b"access-secret".to_vec(), b"refresh-secret".to_vec());
        let sessions = SessionManager::new(db.clone(), Arc::new(JwtConfig::new(&config)));
        (sessions, db)
    }

    async fn register_alice(sessions: &SessionManager) -> UserProfile {
        sessions
            .register(&RegisterRequest {
                username: "alice".into(),
                email: "alice@x.com".into(),
                full_name: "Alice".into(),
                password: "pw123".into(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_login_by_username_and_email() {
        let (sessions, _) = setup().await;
        let alice = register_alice(&sessions).await;

        let by_name = sessions.login("alice", "pw123").await.unwrap();
        let claims = sessions
            .jwt()
            .access()
            .verify(&by_name.tokens.access.token)
            .unwrap();
        assert_eq!(claims.sub, alice.uuid);
        assert_eq!(by_name.user, alice);

        let by_email = sessions.login("alice@x.com", "pw123").await.unwrap();
        assert_eq!(by_email.user.uuid, alice.uuid);
    }

    #[tokio::test]
    async fn test_login_stores_refresh_hash() {
        let (sessions, db) = setup().await;
        let alice = register_alice(&sessions).await;

        let outcome = sessions.login("alice", "pw123").await.unwrap();
        let user = db.users().get_by_uuid(&alice.uuid).await.unwrap().unwrap();

        assert_eq!(
            user.refresh_token_hash.as_deref(),
            Some(hash_refresh_token(&outcome.tokens.refresh.token).as_str())
        );
        assert_ne!(
            user.refresh_token_hash.as_deref(),
            Some(outcome.tokens.refresh.token.as_str())
        );
    }

    #[tokio::test]
    async fn test_login_failures() {
        let (sessions, _) = setup().await;
        register_alice(&sessions).await;

        assert!(matches!(
            sessions.login("alice", "wrong").await,
            Err(AuthError::InvalidCredential)
        ));
        assert!(matches!(
            sessions.login("bob", "pw123").await,
            Err(AuthError::NotFound)
        ));
        assert!(matches!(
            sessions.login("  ", "pw123").await,
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            sessions.login("alice", "").await,
            Err(AuthError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_refresh_rotates() {
        let (sessions, _) = setup().await;
        register_alice(&sessions).await;
        let outcome = sessions.login("alice", "pw123").await.unwrap();
        let old_refresh = outcome.tokens.refresh.token;

        let pair = sessions.refresh(Some(&old_refresh)).await.unwrap();
        assert_ne!(pair.refresh.token, old_refresh);

        assert!(matches!(
            sessions.refresh(Some(&old_refresh)).await,
            Err(AuthError::Unauthorized)
        ));
        assert!(sessions.refresh(Some(&pair.refresh.token)).await.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_rejects_missing_and_garbage() {
        let (sessions, _) = setup().await;

        assert!(matches!(
            sessions.refresh(None).await,
            Err(AuthError::Unauthorized)
        ));
        assert!(matches!(
            sessions.refresh(Some("")).await,
            Err(AuthError::Unauthorized)
        ));
        assert!(matches!(
            sessions.refresh(Some("not-a-token")).await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let (sessions, _) = setup().await;
        register_alice(&sessions).await;
        let outcome = sessions.login("alice", "pw123").await.unwrap();

        assert!(matches!(
            sessions.refresh(Some(&outcome.tokens.access.token)).await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_logout_revokes_and_is_idempotent() {
        let (sessions, db) = setup().await;
        let alice = register_alice(&sessions).await;
        let outcome = sessions.login("alice", "pw123").await.unwrap();

        sessions.logout(&alice.uuid).await.unwrap();
        sessions.logout(&alice.uuid).await.unwrap();

        let user = db.users().get_by_uuid(&alice.uuid).await.unwrap().unwrap();
        assert_eq!(user.refresh_token_hash, None);

        assert!(matches!(
            sessions.refresh(Some(&outcome.tokens.refresh.token)).await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[tokio::test]
    async fn test_new_login_invalidates_previous_refresh_token() {
        let (sessions, _) = setup().await;
        register_alice(&sessions).await;

        let first = sessions.login("alice", "pw123").await.unwrap();
        let second = sessions.login("alice", "pw123").await.unwrap();

        assert!(sessions
            .refresh(Some(&first.tokens.refresh.token))
            .await
            .is_err());
        assert!(sessions
            .refresh(Some(&second.tokens.refresh.token))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_refresh_single_winner() {
        let (sessions, _) = setup().await;
        register_alice(&sessions).await;
        let token = sessions
            .login("alice", "pw123")
            .await
            .unwrap()
            .tokens
            .refresh
            .token;

        let (a, b) = tokio::join!(sessions.refresh(Some(&token)), sessions.refresh(Some(&token)));

        assert_eq!(
            [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count(),
            1,
            "exactly one concurrent refresh may win"
        );
    }

    #[tokio::test]
    async fn test_refresh_for_deleted_user() {
        let (sessions, _) = setup().await;
        let alice = register_alice(&sessions).await;
        let outcome = sessions.login("alice", "pw123").await.unwrap();

        sessions.delete_account(&alice.uuid).await.unwrap();

        assert!(matches!(
            sessions.refresh(Some(&outcome.tokens.refresh.token)).await,
            Err(AuthError::Unauthorized)
        ));
    }

    #[test]
    fn test_login_request_identity() {
        let by_name = LoginRequest {
            username: Some("alice".into()),
            email: None,
            password: "pw".into(),
        };
        assert_eq!(by_name.identity().unwrap(), "alice");

        let blank_name = LoginRequest {
            username: Some("  ".into()),
            email: Some("alice@x.com".into()),
            password: "pw".into(),
        };
        assert_eq!(blank_name.identity().unwrap(), "alice@x.com");

        assert!(LoginRequest::default().identity().is_err());
    }

    #[test]
    fn test_hash_refresh_token() {
        let h = hash_refresh_token("abc");
        assert_eq!(h.len(), 64);
        assert_eq!(h, hash_refresh_token("abc"));
        assert_ne!(h, hash_refresh_token("abd"));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"hello", b"hello"));
        assert!(!constant_time_eq(b"hello", b"world"));
        assert!(!constant_time_eq(b"short", b"longer"));
    }
}
