//! SSO Core - Domain models, directory traits, and shared types
//!
//! This crate defines the core abstractions used throughout the SSO system:
//! - User and tenant (app) models
//! - Closed role and status enumerations shared by storage and tokens
//! - Common error types
//! - Directory traits for user and app persistence
//! - Configuration management
//! - PostgreSQL and in-memory directory implementations

pub mod config;
pub mod directory;
pub mod store;

pub use config::{
    AppConfig, AuthConfig, ConfigError, DatabaseConfig, LoggingConfig, PasswordConfig,
    ServerConfig,
};
pub use directory::{AppDirectory, MemoryDirectory, UserDirectory};
pub use store::PgDirectory;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Caller-facing error kinds of the authentication engine
///
/// None of these are retried by the engine itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Malformed email, weak password/nickname, or wrong password at login
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Email already exists")]
    EmailExists,

    #[error("User not found")]
    UserNotFound,

    #[error("User banned")]
    UserBanned,

    #[error("Access denied")]
    AccessDenied,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("App not found")]
    AppNotFound,

    /// A directory call did not finish within the configured deadline
    #[error("Deadline exceeded")]
    DeadlineExceeded,

    /// Unexpected failure; the message is for logs only
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors reported by directory implementations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("Record not found")]
    NotFound,

    #[error("Email already exists")]
    DuplicateEmail,

    #[error("Directory unavailable: {0}")]
    Unavailable(String),
}

impl From<DirectoryError> for AuthError {
    /// Default mapping for user-record operations
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::NotFound => AuthError::UserNotFound,
            DirectoryError::DuplicateEmail => AuthError::EmailExists,
            DirectoryError::Unavailable(msg) => AuthError::Internal(msg),
        }
    }
}

// ============================================================================
// Identity Models
// ============================================================================

/// User role
///
/// Stored in the directory and embedded in session tokens with the same
/// lowercase representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserRole {
    type Err = DirectoryError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(DirectoryError::Unavailable(format!(
                "unknown role in record: {other}"
            ))),
        }
    }
}

/// Account status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Active,
    Banned,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Banned => "banned",
        }
    }
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserStatus {
    type Err = DirectoryError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "banned" => Ok(Self::Banned),
            other => Err(DirectoryError::Unavailable(format!(
                "unknown status in record: {other}"
            ))),
        }
    }
}

/// Persisted user record
///
/// `password_hash` is never serialized, so a `User` can't leak it through
/// a JSON response or a log line built with serde.
#[derive(Clone, Serialize, Deserialize)]
pub struct User {
    /// Directory-assigned identifier
    pub id: i64,
    /// Normalized (trimmed, lower-cased) email
    pub email: String,
    pub nickname: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: UserRole,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn is_banned(&self) -> bool {
        self.status == UserStatus::Banned
    }
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("nickname", &self.nickname)
            .field("role", &self.role)
            .field("status", &self.status)
            .field("created_at", &self.created_at)
            .finish_non_exhaustive()
    }
}

/// A user that has not been persisted yet
#[derive(Clone)]
pub struct NewUser {
    pub email: String,
    pub nickname: String,
    pub password_hash: String,
    pub role: UserRole,
    pub status: UserStatus,
}

impl NewUser {
    /// Build an active account; `email` is normalized here
    pub fn new(
        email: &str,
        nickname: impl Into<String>,
        password_hash: String,
        role: UserRole,
    ) -> Self {
        Self {
            email: normalize_email(email),
            nickname: nickname.into(),
            password_hash,
            role,
            status: UserStatus::Active,
        }
    }

    /// Materialize the record once the directory has assigned an id
    pub fn into_user(self, id: i64) -> User {
        User {
            id,
            email: self.email,
            nickname: self.nickname,
            password_hash: self.password_hash,
            role: self.role,
            status: self.status,
            created_at: Utc::now(),
        }
    }
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("nickname", &self.nickname)
            .field("role", &self.role)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// Calling application (tenant)
#[derive(Clone, Serialize, Deserialize)]
pub struct App {
    pub id: i32,
    pub name: String,
    #[serde(skip_serializing, default)]
    pub secret: String,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Canonical form used for every email save and lookup
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_round_trip_through_str() {
        assert_eq!("admin".parse::<UserRole>().unwrap(), UserRole::Admin);
        assert_eq!("user".parse::<UserRole>().unwrap(), UserRole::User);
        assert_eq!(UserRole::Admin.to_string(), "admin");
        assert!("ADMIN".parse::<UserRole>().is_err());
        assert!("editor".parse::<UserRole>().is_err());
    }

    #[test]
    fn test_role_serde_matches_display() {
        let json = serde_json::to_string(&UserRole::Admin).unwrap();
        assert_eq!(json, "\"admin\"");
        let role: UserRole = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(role, UserRole::User);
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("banned".parse::<UserStatus>().unwrap(), UserStatus::Banned);
        assert_eq!(UserStatus::default(), UserStatus::Active);
        assert!("deleted".parse::<UserStatus>().is_err());
    }

    #[test]
    fn test_new_user_normalizes_email_and_is_active() {
        let user = NewUser::new("  Alice@Example.COM ", "alice", "hash".into(), UserRole::User);
        assert_eq!(user.email, "alice@example.com");
        assert_eq!(user.status, UserStatus::Active);
    }

    #[test]
    fn test_password_hash_never_serialized_or_debugged() {
        let user = NewUser::new("a@b.com", "alice", "$argon2id$secret".into(), UserRole::User)
            .into_user(7);

        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("password_hash"));
        assert!(!json.contains("$argon2id$secret"));

        let debug = format!("{user:?}");
        assert!(!debug.contains("$argon2id$secret"));
    }
}
