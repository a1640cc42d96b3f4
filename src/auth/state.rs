//! Router state access for the authenticator.

use crate::db::Database;
use crate::jwt::JwtConfig;

/// State that can verify access tokens, load the caller, and format cookies.
pub trait HasAuthBackend {
    fn jwt(&self) -> &JwtConfig;
    fn db(&self) -> &Database;
    fn secure_cookies(&self) -> bool;
}

/// Implements [`HasAuthBackend`] for a state struct with `jwt: Arc<JwtConfig>`,
/// `db: Database` and `secure_cookies: bool` fields.
#[macro_export]
macro_rules! impl_has_auth_backend {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthBackend for $state_type {
            fn jwt(&self) -> &$crate::jwt::JwtConfig {
                &self.jwt
            }
            fn db(&self) -> &$crate::db::Database {
                &self.db
            }
            fn secure_cookies(&self) -> bool {
                self.secure_cookies
            }
        }
    };
}
