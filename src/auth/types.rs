//! Authentication user types.

use crate::db::UserProfile;
use crate::jwt::Claims;

/// Identity attached to an authenticated request.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    /// Public projection loaded for `claims.sub`
    pub profile: UserProfile,
    /// Claims from the verified access token
    pub claims: Claims,
}
