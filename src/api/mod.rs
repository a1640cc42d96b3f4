mod error;
mod tokens;
mod users;

use axum::Router;
use std::sync::Arc;

use crate::db::Database;
use crate::jwt::JwtConfig;
use crate::session::SessionManager;

pub use error::ApiError;
pub use tokens::TokensState;
pub use users::UsersState;

/// Create the API router.
pub fn create_api_router(db: Database, jwt: Arc<JwtConfig>, secure_cookies: bool) -> Router {
    let sessions = SessionManager::new(db.clone(), jwt.clone());

    let tokens_state = tokens::TokensState {
        db: db.clone(),
        jwt: jwt.clone(),
        sessions: sessions.clone(),
        secure_cookies,
    };

    let users_state = users::UsersState {
        db,
        jwt,
        sessions,
        secure_cookies,
    };

    Router::new()
        .nest("/users", users::router(users_state))
        .nest("/tokens", tokens::router(tokens_state))
}
