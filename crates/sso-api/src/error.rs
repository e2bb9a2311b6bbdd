//! API error handling
//!
//! Author: hephaex@gmail.com

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use sso_core::AuthError;
use utoipa::ToSchema;

/// API error response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error code
    pub code: String,
    /// Human-readable message
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(resource: &str) -> Self {
        Self::new("NOT_FOUND", format!("{resource} not found"))
    }

    pub fn forbidden() -> Self {
        Self::new("FORBIDDEN", "Access denied")
    }

    pub fn internal_error() -> Self {
        Self::new("INTERNAL_ERROR", "Internal server error")
    }
}

/// Application error type
#[derive(Debug)]
pub enum AppError {
    NotFound(String),
    BadRequest { code: &'static str, message: String },
    Unauthorized { code: &'static str, message: String },
    Forbidden { code: &'static str, message: String },
    Conflict(String),
    Timeout,
    Internal(String),
}

impl AppError {
    /// Conversion for the login endpoint, where a wrong password is 401
    pub fn from_login(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials(msg) => AppError::Unauthorized {
                code: "INVALID_CREDENTIALS",
                message: msg,
            },
            e => e.into(),
        }
    }

    /// Missing or malformed `Authorization` header
    pub fn missing_bearer() -> Self {
        AppError::Unauthorized {
            code: "UNAUTHORIZED",
            message: "Bearer token required".to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            AppError::NotFound(resource) => (StatusCode::NOT_FOUND, ApiError::not_found(&resource)),
            AppError::BadRequest { code, message } => {
                (StatusCode::BAD_REQUEST, ApiError::new(code, message))
            }
            AppError::Unauthorized { code, message } => {
                (StatusCode::UNAUTHORIZED, ApiError::new(code, message))
            }
            AppError::Forbidden { code, message } => {
                (StatusCode::FORBIDDEN, ApiError::new(code, message))
            }
            AppError::Conflict(msg) => (StatusCode::CONFLICT, ApiError::new("CONFLICT", msg)),
            AppError::Timeout => (
                StatusCode::GATEWAY_TIMEOUT,
                ApiError::new("DEADLINE_EXCEEDED", "Upstream directory timed out"),
            ),
            AppError::Internal(msg) => {
                // Details stay in the log.
                tracing::error!(error = %msg, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, ApiError::internal_error())
            }
        };

        (status, Json(error)).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials(msg) => AppError::BadRequest {
                code: "INVALID_CREDENTIALS",
                message: msg,
            },
            AuthError::EmailExists => AppError::Conflict("Email already exists".to_string()),
            AuthError::UserNotFound => AppError::NotFound("User".to_string()),
            AuthError::AppNotFound => AppError::NotFound("App".to_string()),
            AuthError::UserBanned => AppError::Forbidden {
                code: "USER_BANNED",
                message: "User is banned".to_string(),
            },
            AuthError::AccessDenied => AppError::Forbidden {
                code: "FORBIDDEN",
                message: ApiError::forbidden().message,
            },
            AuthError::InvalidToken => AppError::Unauthorized {
                code: "INVALID_TOKEN",
                message: "Invalid token".to_string(),
            },
            AuthError::TokenExpired => AppError::Unauthorized {
                code: "TOKEN_EXPIRED",
                message: "Token has expired".to_string(),
            },
            AuthError::DeadlineExceeded => AppError::Timeout,
            AuthError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: AuthError) -> StatusCode {
        AppError::from(err).into_response().status()
    }

    #[test]
    fn test_auth_error_status_mapping() {
        assert_eq!(
            status_of(AuthError::InvalidCredentials("x".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(AuthError::EmailExists), StatusCode::CONFLICT);
        assert_eq!(status_of(AuthError::UserNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_of(AuthError::AppNotFound), StatusCode::NOT_FOUND);
        assert_eq!(status_of(AuthError::UserBanned), StatusCode::FORBIDDEN);
        assert_eq!(status_of(AuthError::AccessDenied), StatusCode::FORBIDDEN);
        assert_eq!(status_of(AuthError::InvalidToken), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AuthError::TokenExpired), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status_of(AuthError::DeadlineExceeded),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_of(AuthError::Internal("db down".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_login_wrong_password_is_unauthorized() {
        let response =
            AppError::from_login(AuthError::InvalidCredentials("bad".into())).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = AppError::from_login(AuthError::UserBanned).into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
