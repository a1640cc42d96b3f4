//! Process-wide authentication settings.
//!
//! Built once at startup and handed to the token layer and routers by
//! reference. Nothing here changes after construction.

use std::time::Duration;

/// Access token lifetime: 15 minutes
pub const DEFAULT_ACCESS_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);

/// Refresh token lifetime: 10 days
pub const DEFAULT_REFRESH_TOKEN_TTL: Duration = Duration::from_secs(10 * 24 * 60 * 60);

/// Immutable signing and cookie configuration.
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC secret for access tokens
    pub access_secret: Vec<u8>,
    /// HMAC secret for refresh tokens, must differ from the access secret
    pub refresh_secret: Vec<u8>,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    /// Whether to set the Secure flag on auth cookies
    pub secure_cookies: bool,
}

impl AuthConfig {
    /// Configuration with default lifetimes and secure cookies.
    pub fn new(access_secret: impl Into<Vec<u8>>, refresh_secret: impl Into<Vec<u8>>) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl: DEFAULT_ACCESS_TOKEN_TTL,
            refresh_ttl: DEFAULT_REFRESH_TOKEN_TTL,
            secure_cookies: true,
        }
    }

    pub fn with_ttls(mut self, access_ttl: Duration, refresh_ttl: Duration) -> Self {
        self.access_ttl = access_ttl;
        self.refresh_ttl = refresh_ttl;
        self
    }

    pub fn with_secure_cookies(mut self, secure_cookies: bool) -> Self {
        self.secure_cookies = secure_cookies;
        self
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("secure_cookies", &self.secure_cookies)
            .finish()
    }
}
