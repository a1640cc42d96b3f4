//! Request authentication from access tokens.
//!
//! Dual-token system: short-lived access tokens (stateless) authenticate
//! requests; long-lived refresh tokens are only accepted by the refresh
//! endpoint. Tokens travel in HttpOnly cookies or a Bearer header.

mod cookie;
mod errors;
mod extractors;
mod state;
mod types;

pub use cookie::{
    ACCESS_COOKIE_NAME, REFRESH_COOKIE_NAME, bearer_token, clear_cookie, extract_token,
    get_cookie, set_cookie,
};
pub use errors::ApiAuthError;
pub use extractors::{Auth, authenticate, require_auth};
pub use state::HasAuthBackend;
pub use types::AuthenticatedUser;
