//! API Integration Tests
//!
//! Every test drives the full router through `oneshot`.
//!
//! Author: hephaex@gmail.com

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use async_trait::async_trait;
use serde_json::{json, Value};
use sso_api::{create_router, create_router_for_testing, state::AppState, testing_state};
use sso_core::{
    AppConfig, DirectoryError, MemoryDirectory, NewUser, User, UserDirectory, UserStatus,
};
use std::sync::Arc;
use tower::ServiceExt;

/// Helper to create a test request
fn create_json_request(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("Content-Type", "application/json");

    match body {
        Some(json_body) => builder
            .body(Body::from(serde_json::to_string(&json_body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn create_admin_request(token: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/auth/admins")
        .header("Content-Type", "application/json")
        .header("Authorization", format!("Bearer {token}"))
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

async fn register(app: &Router, email: &str, nickname: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        create_json_request(
            "POST",
            "/api/v1/auth/register",
            Some(json!({ "email": email, "nickname": nickname, "password": password })),
        ),
    )
    .await
}

async fn login(app: &Router, email: &str, password: &str, app_id: i32) -> (StatusCode, Value) {
    send(
        app,
        create_json_request(
            "POST",
            "/api/v1/auth/login",
            Some(json!({ "email": email, "password": password, "app_id": app_id })),
        ),
    )
    .await
}

// =============================================================================
// Health Check Tests
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let app = create_router_for_testing();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();

    assert_eq!(json["status"], "ok");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_openapi_document_served() {
    let app = create_router_for_testing();
    let (status, json) = send(
        &app,
        Request::builder()
            .uri("/api-docs/openapi.json")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/api/v1/auth/login"].is_object());
}

// =============================================================================
// Registration and Login
// =============================================================================

#[tokio::test]
async fn test_register_login_validate_flow() {
    let app = create_router_for_testing();

    let (status, json) = register(&app, "a@b.com", "alice", "password1").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["nickname"], "alice");
    let user_id = json["user_id"].as_i64().unwrap();

    let (status, json) = login(&app, "a@b.com", "password1", 42).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["nickname"], "alice");
    assert_eq!(json["role"], "user");
    let token = json["token"].as_str().unwrap().to_string();

    let (status, json) = send(
        &app,
        create_json_request(
            "POST",
            "/api/v1/auth/validate",
            Some(json!({ "token": token })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["valid"], true);
    assert_eq!(json["user_id"], user_id);
    assert_eq!(json["app_id"], 42);
    assert_eq!(json["role"], "user");
    assert_eq!(json["nickname"], "alice");

    let (status, json) = send(
        &app,
        create_json_request("GET", &format!("/api/v1/users/{user_id}/is-admin"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["is_admin"], false);
}

#[tokio::test]
async fn test_register_invalid_fields() {
    let app = create_router_for_testing();

    let (status, json) = register(&app, "not-an-email", "alice", "password1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "INVALID_CREDENTIALS");

    let (status, _) = register(&app, "a@b.com", "alice", "short").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = register(&app, "a@b.com", "al", "password1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_register_duplicate_email_conflict() {
    let app = create_router_for_testing();

    let (status, _) = register(&app, "a@b.com", "alice", "password1").await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, json) = register(&app, "A@b.com", "alice2", "password1").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["code"], "CONFLICT");
}

#[tokio::test]
async fn test_login_failures() {
    let app = create_router_for_testing();
    register(&app, "a@b.com", "alice", "password1").await;

    let (status, json) = login(&app, "a@b.com", "wrong-password", 1).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "INVALID_CREDENTIALS");

    let (status, _) = login(&app, "ghost@b.com", "password1", 1).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_banned_user_cannot_login() {
    let (state, directory) = testing_state();
    let app = create_router(state);

    let (_, json) = register(&app, "a@b.com", "alice", "password1").await;
    let user_id = json["user_id"].as_i64().unwrap();
    directory
        .set_status(user_id, UserStatus::Banned)
        .await
        .unwrap();

    let (status, json) = login(&app, "a@b.com", "password1", 1).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "USER_BANNED");
}

#[tokio::test]
async fn test_login_malformed_body_rejected() {
    let app = create_router_for_testing();
    let (status, _) = send(
        &app,
        create_json_request(
            "POST",
            "/api/v1/auth/login",
            Some(json!({ "email": "a@b.com" })),
        ),
    )
    .await;
    assert!(status.is_client_error());
}

// =============================================================================
// Token Validation
// =============================================================================

#[tokio::test]
async fn test_validate_garbage_token_is_not_an_error() {
    let app = create_router_for_testing();
    let (status, json) = send(
        &app,
        create_json_request(
            "POST",
            "/api/v1/auth/validate",
            Some(json!({ "token": "garbage" })),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["valid"], false);
    assert!(json["role"].is_null());
}

// =============================================================================
// Admin Management
// =============================================================================

#[tokio::test]
async fn test_admin_creates_admin() {
    let (state, _) = testing_state();
    state
        .auth
        .register_admin("root@example.com", "root", "rootpassword")
        .await
        .unwrap();
    let app = create_router(state);

    let (_, json) = login(&app, "root@example.com", "rootpassword", 1).await;
    assert_eq!(json["role"], "admin");
    let token = json["token"].as_str().unwrap().to_string();

    let (status, json) = send(
        &app,
        create_admin_request(
            &token,
            json!({ "email": "ops@b.com", "password": "password1", "nickname": "ops" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let new_id = json["user_id"].as_i64().unwrap();

    let (_, json) = send(
        &app,
        create_json_request("GET", &format!("/api/v1/users/{new_id}/is-admin"), None),
    )
    .await;
    assert_eq!(json["is_admin"], true);
}

#[tokio::test]
async fn test_non_admin_cannot_create_admin() {
    let (state, directory) = testing_state();
    let app = create_router(state);

    register(&app, "joe@b.com", "joe", "password1").await;
    let (_, json) = login(&app, "joe@b.com", "password1", 1).await;
    let token = json["token"].as_str().unwrap().to_string();

    let (status, json) = send(
        &app,
        create_admin_request(
            &token,
            json!({ "email": "evil@b.com", "password": "password1", "nickname": "evil" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(json["code"], "FORBIDDEN");
    assert_eq!(directory.user_count().await, 1);
}

#[tokio::test]
async fn test_create_admin_requires_bearer_token() {
    let app = create_router_for_testing();

    let (status, json) = send(
        &app,
        create_json_request(
            "POST",
            "/api/v1/auth/admins",
            Some(json!({ "email": "x@b.com", "password": "password1", "nickname": "xxx" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "UNAUTHORIZED");

    let (status, json) = send(
        &app,
        create_admin_request(
            "not.a.token",
            json!({ "email": "x@b.com", "password": "password1", "nickname": "xxx" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(json["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_is_admin_unknown_user() {
    let app = create_router_for_testing();
    let (status, json) = send(
        &app,
        create_json_request("GET", "/api/v1/users/999/is-admin", None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");
}

// =============================================================================
// Request Timeout
// =============================================================================

/// Directory whose calls never complete
struct StalledDirectory;

#[async_trait]
impl UserDirectory for StalledDirectory {
    async fn save_user(&self, _: &NewUser) -> Result<i64, DirectoryError> {
        std::future::pending().await
    }
    async fn get_user_by_email(&self, _: &str) -> Result<User, DirectoryError> {
        std::future::pending().await
    }
    async fn get_user_by_id(&self, _: i64) -> Result<User, DirectoryError> {
        std::future::pending().await
    }
    async fn set_status(&self, _: i64, _: UserStatus) -> Result<(), DirectoryError> {
        std::future::pending().await
    }
}

#[tokio::test]
async fn test_request_timeout_applies_to_routes() {
    let mut config = AppConfig::default();
    config.server.request_timeout_secs = 1;
    // Longer than the request budget, so the router gives up first.
    config.auth.directory_timeout_ms = 30_000;

    let state = Arc::new(AppState::new(
        config,
        Arc::new(StalledDirectory),
        Arc::new(MemoryDirectory::new()),
    ));
    let app = create_router(state);

    let (status, _) = send(
        &app,
        create_json_request("GET", "/api/v1/users/1/is-admin", None),
    )
    .await;
    assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
}
