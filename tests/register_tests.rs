//! Tests for account management endpoints.

mod common;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use common::{
    access_cookie, body_json, create_test_app, extract_set_cookies, has_cleared_cookie,
    json_request, json_request_with_cookie, request_with_cookie,
};
use serde_json::json;

fn registration(username: &str, email: &str) -> serde_json::Value {
    json!({
        "username": username,
        "email": email,
        "fullName": "Alice Liddell",
        "password": "pw123"
    })
}

// =============================================================================
// Registration
// =============================================================================

#[tokio::test]
async fn test_register_returns_profile() {
    let t = create_test_app().await;

    let response = t
        .send(json_request(
            "POST",
            "/api/users/register",
            registration("Alice", "alice@x.com"),
        ))
        .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    // Registration does not log the user in
    assert!(extract_set_cookies(&response).is_empty());

    let json = body_json(response).await;
    assert_eq!(json["username"], "alice");
    assert_eq!(json["email"], "alice@x.com");
    assert_eq!(json["fullName"], "Alice Liddell");
    assert!(json["uuid"].as_str().is_some());
    assert!(json.get("password").is_none());
    assert!(json.get("passwordHash").is_none());
}

#[tokio::test]
async fn test_register_duplicate_conflicts() {
    let t = create_test_app().await;
    t.register("alice", "alice@x.com", "pw123").await;

    let same_name = t
        .send(json_request(
            "POST",
            "/api/users/register",
            registration("alice", "other@x.com"),
        ))
        .await;
    assert_eq!(same_name.status(), StatusCode::CONFLICT);

    let same_email = t
        .send(json_request(
            "POST",
            "/api/users/register",
            registration("bob", "ALICE@x.com"),
        ))
        .await;
    assert_eq!(same_email.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_register_blank_fields_rejected() {
    let t = create_test_app().await;

    for body in [
        json!({}),
        json!({ "username": "alice", "email": "alice@x.com", "fullName": " ", "password": "pw" }),
        json!({ "username": "alice", "email": "alice@x.com", "fullName": "A", "password": "" }),
        registration("a!", "alice@x.com"),
        registration("alice", "no-at-sign"),
    ] {
        let response = t
            .send(json_request("POST", "/api/users/register", body.clone()))
            .await;
        assert_eq!(
            response.status(),
            StatusCode::BAD_REQUEST,
            "expected 400 for {}",
            body
        );
    }
}

// =============================================================================
// Current Account
// =============================================================================

#[tokio::test]
async fn test_me_requires_auth() {
    let t = create_test_app().await;

    let response = t
        .send(
            Request::builder()
                .method("GET")
                .uri("/api/users/me")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_update_details() {
    let t = create_test_app().await;
    let login = t.register_and_login("alice").await;
    t.register("bob", "bob@x.com", "pw123").await;
    let cookie = access_cookie(&login.tokens.access.token);

    let taken = t
        .send(json_request_with_cookie(
            "PATCH",
            "/api/users/me",
            &cookie,
            json!({ "fullName": "Alice", "email": "bob@x.com" }),
        ))
        .await;
    assert_eq!(taken.status(), StatusCode::CONFLICT);

    let blank = t
        .send(json_request_with_cookie(
            "PATCH",
            "/api/users/me",
            &cookie,
            json!({ "fullName": "", "email": "alice@y.com" }),
        ))
        .await;
    assert_eq!(blank.status(), StatusCode::BAD_REQUEST);

    let ok = t
        .send(json_request_with_cookie(
            "PATCH",
            "/api/users/me",
            &cookie,
            json!({ "fullName": "Alice L.", "email": "alice@y.com" }),
        ))
        .await;
    assert_eq!(ok.status(), StatusCode::OK);
    let json = body_json(ok).await;
    assert_eq!(json["fullName"], "Alice L.");
    assert_eq!(json["email"], "alice@y.com");

    let me = t.send(request_with_cookie("GET", "/api/users/me", &cookie)).await;
    let json = body_json(me).await;
    assert_eq!(json["email"], "alice@y.com");
}

#[tokio::test]
async fn test_update_details_unparseable_body() {
    let t = create_test_app().await;
    let login = t.register_and_login("alice").await;

    let response = t
        .send(
            Request::builder()
                .method("PATCH")
                .uri("/api/users/me")
                .header("cookie", access_cookie(&login.tokens.access.token))
                .header("content-type", "application/json")
                .body(Body::from("not json"))
                .unwrap(),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["error"].is_string());
}

#[tokio::test]
async fn test_change_password() {
    let t = create_test_app().await;
    let login = t.register_and_login("alice").await;
    let cookie = access_cookie(&login.tokens.access.token);

    let wrong = t
        .send(json_request_with_cookie(
            "POST",
            "/api/users/change-password",
            &cookie,
            json!({ "oldPassword": "nope", "newPassword": "pw456" }),
        ))
        .await;
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

    let ok = t
        .send(json_request_with_cookie(
            "POST",
            "/api/users/change-password",
            &cookie,
            json!({ "oldPassword": "pw123", "newPassword": "pw456" }),
        ))
        .await;
    assert_eq!(ok.status(), StatusCode::OK);

    let old = t
        .send(json_request(
            "POST",
            "/api/users/login",
            json!({ "username": "alice", "password": "pw123" }),
        ))
        .await;
    assert_eq!(old.status(), StatusCode::UNAUTHORIZED);

    let new = t
        .send(json_request(
            "POST",
            "/api/users/login",
            json!({ "username": "alice", "password": "pw456" }),
        ))
        .await;
    assert_eq!(new.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_delete_account() {
    let t = create_test_app().await;
    let login = t.register_and_login("alice").await;
    let cookie = access_cookie(&login.tokens.access.token);

    let response = t
        .send(request_with_cookie("DELETE", "/api/users/me", &cookie))
        .await;

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cookies = extract_set_cookies(&response);
    assert!(has_cleared_cookie(&cookies, "accessToken"));
    assert!(has_cleared_cookie(&cookies, "refreshToken"));

    let me = t.send(request_with_cookie("GET", "/api/users/me", &cookie)).await;
    assert_eq!(me.status(), StatusCode::UNAUTHORIZED);

    let login_again = t
        .send(json_request(
            "POST",
            "/api/users/login",
            json!({ "username": "alice", "password": "pw123" }),
        ))
        .await;
    assert_eq!(login_again.status(), StatusCode::NOT_FOUND);
}
