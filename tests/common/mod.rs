#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response},
};
use std::sync::Arc;
use tower::ServiceExt;
use tubeauth::{
    ServerConfig,
    config::AuthConfig,
    create_app,
    db::{Database, UserProfile},
    jwt::JwtConfig,
    session::{LoginOutcome, RegisterRequest, SessionManager},
};

pub const ACCESS_SECRET: &[u8] = b"test-access-secret-0123456789abcdef";
pub const REFRESH_SECRET: &[u8] = b"test-refresh-secret-0123456789abcdef";

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub jwt: JwtConfig,
    pub sessions: SessionManager,
}

/// Create a test app with secure cookies enabled.
pub async fn create_test_app() -> TestApp {
    create_test_app_with(AuthConfig::new(ACCESS_SECRET, REFRESH_SECRET)).await
}

pub async fn create_test_app_with(auth: AuthConfig) -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let jwt = JwtConfig::new(&auth);
    let sessions = SessionManager::new(db.clone(), Arc::new(jwt.clone()));
    let config = ServerConfig {
        db: db.clone(),
        auth,
    };

    TestApp {
        app: create_app(&config),
        db,
        jwt,
        sessions,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app.clone().oneshot(request).await.unwrap()
    }

    /// Register a user directly through the session layer.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> UserProfile {
        self.sessions
            .register(&RegisterRequest {
                username: username.to_string(),
                email: email.to_string(),
                full_name: format!("{} test", username),
                password: password.to_string(),
            })
            .await
            .unwrap()
    }

    /// Register and log in a user, returning the issued tokens.
    pub async fn register_and_login(&self, username: &str) -> LoginOutcome {
        let email = format!("{}@x.com", username);
        self.register(username, &email, "pw123").await;
        self.sessions.login(username, "pw123").await.unwrap()
    }
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn json_request_with_cookie(
    method: &str,
    uri: &str,
    cookie: &str,
    body: serde_json::Value,
) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .header("cookie", cookie)
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn request_with_cookie(method: &str, uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("cookie", cookie)
        .body(Body::empty())
        .unwrap()
}

pub fn request_with_bearer(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap()
}

pub fn access_cookie(token: &str) -> String {
    format!("accessToken={}", token)
}

pub fn refresh_cookie(token: &str) -> String {
    format!("refreshToken={}", token)
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

pub fn extract_set_cookies(response: &Response<Body>) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(|s| s.to_string())
        .collect()
}

/// Check if cookies contain a token being cleared (Max-Age=0)
pub fn has_cleared_cookie(cookies: &[String], cookie_name: &str) -> bool {
    cookies
        .iter()
        .any(|c| c.starts_with(&format!("{}=;", cookie_name)) && c.contains("Max-Age=0"))
}

/// Value of a cookie being set, if present.
pub fn set_cookie_value(cookies: &[String], cookie_name: &str) -> Option<String> {
    let prefix = format!("{}=", cookie_name);
    cookies
        .iter()
        .filter(|c| !c.contains("Max-Age=0"))
        .find_map(|c| c.strip_prefix(&prefix))
        .and_then(|rest| rest.split(';').next())
        .map(|v| v.to_string())
}
