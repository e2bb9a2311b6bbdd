//! Authentication API handlers
//!
//! HTTP endpoints over the authentication engine: registration, login,
//! admin creation, role lookup and token validation.
//!
//! Author: hephaex@gmail.com

use crate::auth::{LoginOutcome, TokenValidation};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Registration request
#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub nickname: String,
    pub password: String,
}

/// Registration response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub user_id: i64,
    pub nickname: String,
}

/// Login request
#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Calling application the token is scoped to
    pub app_id: i32,
}

/// Admin creation request
#[derive(Deserialize, ToSchema)]
pub struct CreateAdminRequest {
    pub email: String,
    pub password: String,
    pub nickname: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateAdminResponse {
    pub user_id: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct IsAdminResponse {
    pub is_admin: bool,
}

/// Token validation request
#[derive(Deserialize, ToSchema)]
pub struct ValidateTokenRequest {
    pub token: String,
}

/// Register a new user account
///
/// New users get the `user` role.
///
/// # Responses
///
/// * `201 Created` - User registered
/// * `400 Bad Request` - Invalid email, short password or short nickname
/// * `409 Conflict` - Email already registered
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = RegisterResponse),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 409, description = "Email already exists", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (user_id, nickname) = state
        .auth
        .register(&request.email, &request.nickname, &request.password)
        .await?;

    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id, nickname })))
}

/// Login with email and password
///
/// Returns a session token scoped to `app_id`.
///
/// # Responses
///
/// * `200 OK` - Token issued
/// * `401 Unauthorized` - Wrong password
/// * `403 Forbidden` - Account banned
/// * `404 Not Found` - Unknown email, or unknown app when apps are enforced
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginOutcome),
        (status = 401, description = "Invalid credentials", body = crate::error::ApiError),
        (status = 403, description = "User banned", body = crate::error::ApiError),
        (status = 404, description = "User or app not found", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .auth
        .login(&request.email, &request.password, request.app_id)
        .await
        .map_err(AppError::from_login)?;

    Ok(Json(outcome))
}

/// Create an administrator
///
/// The caller is identified by the bearer token and must currently hold
/// the admin role.
#[utoipa::path(
    post,
    path = "/api/v1/auth/admins",
    tag = "auth",
    request_body = CreateAdminRequest,
    responses(
        (status = 201, description = "Admin created", body = CreateAdminResponse),
        (status = 400, description = "Invalid input", body = crate::error::ApiError),
        (status = 401, description = "Missing, invalid or expired token", body = crate::error::ApiError),
        (status = 403, description = "Caller is not an admin", body = crate::error::ApiError),
        (status = 409, description = "Email already exists", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn create_admin_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(request): Json<CreateAdminRequest>,
) -> Result<impl IntoResponse, AppError> {
    let token = bearer_token(&headers).ok_or_else(AppError::missing_bearer)?;

    let user_id = state
        .auth
        .create_admin_with_token(token, &request.email, &request.password, &request.nickname)
        .await?;

    Ok((StatusCode::CREATED, Json(CreateAdminResponse { user_id })))
}

/// Check whether a user holds the admin role
#[utoipa::path(
    get,
    path = "/api/v1/users/{id}/is-admin",
    tag = "users",
    params(
        ("id" = i64, Path, description = "User identifier")
    ),
    responses(
        (status = 200, description = "Role lookup", body = IsAdminResponse),
        (status = 404, description = "User not found", body = crate::error::ApiError),
    )
)]
pub async fn is_admin_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let is_admin = state.auth.is_admin(id).await?;
    Ok(Json(IsAdminResponse { is_admin }))
}

/// Validate a session token
///
/// Always 200; an invalid or expired token yields `valid: false`.
#[utoipa::path(
    post,
    path = "/api/v1/auth/validate",
    tag = "auth",
    request_body = ValidateTokenRequest,
    responses(
        (status = 200, description = "Validation result", body = TokenValidation),
    )
)]
pub async fn validate_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ValidateTokenRequest>,
) -> Json<TokenValidation> {
    Json(state.auth.validate_token(&request.token))
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
