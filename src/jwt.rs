//! JWT token generation and validation.
//!
//! Access and refresh tokens are signed by two independent [`TokenSigner`]s,
//! each with its own secret and lifetime. Neither signer knows about
//! revocation; refresh token revocation lives in the session layer.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::config::AuthConfig;

/// Token type for distinguishing access vs refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Short-lived, stateless
    Access,
    /// Long-lived, hash stored on the user record
    Refresh,
}

/// JWT claims shared by both token kinds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Random token id, keeps tokens issued in the same second distinct
    pub jti: String,
    /// Subject (user UUID)
    pub sub: String,
    #[serde(rename = "typ")]
    pub kind: TokenKind,
    /// Issued at (Unix timestamp)
    pub iat: u64,
    /// Expiration time (Unix timestamp)
    pub exp: u64,
}

/// A freshly signed token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    /// Token lifetime in seconds
    pub duration: u64,
}

/// Signs and verifies one kind of token.
#[derive(Clone)]
pub struct TokenSigner {
    kind: TokenKind,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl_secs: u64,
}

impl TokenSigner {
    pub fn new(kind: TokenKind, secret: &[u8], ttl: Duration) -> Self {
        Self {
            kind,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            ttl_secs: ttl.as_secs(),
        }
    }

    pub fn ttl_secs(&self) -> u64 {
        self.ttl_secs
    }

    /// Sign a new token for `subject`, valid from now for the configured lifetime.
    pub fn issue(&self, subject: &str) -> Result<IssuedToken, TokenError> {
        let now = now_secs()?;

        let claims = Claims {
            jti: uuid::Uuid::new_v4().to_string(),
            sub: subject.to_string(),
            kind: self.kind,
            iat: now,
            exp: now.checked_add(self.ttl_secs).ok_or(TokenError::TimeError)?,
        };

        let token = jsonwebtoken::encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(TokenError::Encoding)?;

        Ok(IssuedToken {
            token,
            duration: self.ttl_secs,
        })
    }

    /// Validate a token and return its claims.
    ///
    /// The signature is checked first; expiry is only compared once the
    /// token is known to be authentic.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = false;

        let token_data = jsonwebtoken::decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|_| TokenError::Malformed)?;

        let claims = token_data.claims;
        if claims.kind != self.kind {
            return Err(TokenError::Malformed);
        }

        if now_secs()? > claims.exp {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}

/// The pair of signers used by the service.
#[derive(Clone)]
pub struct JwtConfig {
    access: TokenSigner,
    refresh: TokenSigner,
}

impl JwtConfig {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            access: TokenSigner::new(TokenKind::Access, &config.access_secret, config.access_ttl),
            refresh: TokenSigner::new(
                TokenKind::Refresh,
                &config.refresh_secret,
                config.refresh_ttl,
            ),
        }
    }

    pub fn access(&self) -> &TokenSigner {
        &self.access
    }

    pub fn refresh(&self) -> &TokenSigner {
        &self.refresh
    }
}

fn now_secs() -> Result<u64, TokenError> {
    Ok(SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| TokenError::TimeError)?
        .as_secs())
}

/// Errors that can occur during JWT operations.
#[derive(Debug)]
pub enum TokenError {
    /// Bad encoding, bad signature, or wrong token kind
    Malformed,
    /// Authentic but past its expiry
    Expired,
    /// Error encoding the token
    Encoding(jsonwebtoken::errors::Error),
    /// System time error
    TimeError,
}

impl std::fmt::Display for TokenError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenError::Malformed => write!(f, "Malformed token"),
            TokenError::Expired => write!(f, "Token expired"),
            TokenError::Encoding(e) => write!(f, "Failed to encode token: {}", e),
            TokenError::TimeError => write!(f, "System time error"),
        }
    }
}

impl std::error::Error for TokenError {}
