//! Authentication service layer
//!
//! Composes the password hasher, token service and admin policy over the
//! user and app directories. Owns the ordering rules: ban checks run before
//! password checks, authorization runs before validation and persistence.

use super::jwt::{TokenConfig, TokenError, TokenService};
use super::password::{hash_password_with_config, verify_password, PasswordError};
use super::policy::AdminPolicy;
use serde::{Deserialize, Serialize};
use sso_core::{
    normalize_email, AppDirectory, AuthConfig, AuthError, DirectoryError, NewUser,
    PasswordConfig, Result, UserDirectory, UserRole,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use utoipa::ToSchema;
use validator::Validate;

/// Minimum password length in characters
pub const MIN_PASSWORD_LEN: u64 = 8;
/// Minimum nickname length in characters
pub const MIN_NICKNAME_LEN: u64 = 3;

/// Successful login
#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginOutcome {
    pub token: String,
    pub nickname: String,
    #[schema(value_type = String, example = "user")]
    pub role: UserRole,
}

impl std::fmt::Debug for LoginOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginOutcome")
            .field("token", &"<redacted>")
            .field("nickname", &self.nickname)
            .field("role", &self.role)
            .finish()
    }
}

/// Result of checking a token; invalid and expired tokens are `valid: false`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TokenValidation {
    pub valid: bool,
    pub user_id: i64,
    pub app_id: i32,
    #[schema(value_type = Option<String>, example = "admin")]
    pub role: Option<UserRole>,
    pub nickname: String,
}

/// Field rules shared by registration and admin creation
#[derive(Validate)]
struct Credentials {
    #[validate(email)]
    email: String,
    #[validate(length(min = 8))]
    password: String,
    #[validate(length(min = 3))]
    nickname: String,
}

impl Credentials {
    /// Reports the first failing field in the order email, password, nickname
    fn check(&self) -> Result<()> {
        let Err(errors) = self.validate() else {
            return Ok(());
        };

        let failed: Vec<String> = errors.field_errors().keys().map(|k| k.to_string()).collect();
        let message = if failed.iter().any(|f| f == "email") {
            "invalid email format".to_string()
        } else if failed.iter().any(|f| f == "password") {
            format!("password must be at least {MIN_PASSWORD_LEN} characters")
        } else {
            format!("nickname must be at least {MIN_NICKNAME_LEN} characters")
        };
        Err(AuthError::InvalidCredentials(message))
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidToken => AuthError::InvalidToken,
            TokenError::ExpiredToken => AuthError::TokenExpired,
            e => AuthError::Internal(e.to_string()),
        }
    }
}

impl From<PasswordError> for AuthError {
    fn from(err: PasswordError) -> Self {
        AuthError::Internal(err.to_string())
    }
}

/// Authentication service
///
/// Holds only immutable configuration and shared directory handles, so a
/// single instance can serve any number of concurrent calls.
#[derive(Clone)]
pub struct AuthService {
    users: Arc<dyn UserDirectory>,
    apps: Arc<dyn AppDirectory>,
    tokens: Arc<TokenService>,
    policy: AdminPolicy,
    password: PasswordConfig,
    directory_timeout: Duration,
    require_known_app: bool,
}

impl AuthService {
    /// Create a new authentication service
    pub fn new(
        users: Arc<dyn UserDirectory>,
        apps: Arc<dyn AppDirectory>,
        auth: &AuthConfig,
        password: PasswordConfig,
    ) -> Self {
        let directory_timeout = auth.directory_timeout();
        Self {
            users,
            apps,
            tokens: Arc::new(TokenService::new(TokenConfig::from(auth))),
            policy: AdminPolicy::new(directory_timeout),
            password,
            directory_timeout,
            require_known_app: auth.require_known_app,
        }
    }

    /// The token service used for issuance and verification
    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Register a new user with the `user` role
    ///
    /// # Returns
    ///
    /// * `Ok((user_id, nickname))` - Newly created user
    /// * `Err(AuthError::InvalidCredentials)` - A field failed validation, nothing stored
    /// * `Err(AuthError::EmailExists)` - Email already taken
    #[tracing::instrument(skip(self, password))]
    pub async fn register(
        &self,
        email: &str,
        nickname: &str,
        password: &str,
    ) -> Result<(i64, String)> {
        let user_id = self
            .create_user(email, nickname, password, UserRole::User)
            .await?;
        tracing::info!(user_id, "User registered");
        Ok((user_id, nickname.to_string()))
    }

    /// Authenticate with email and password and issue a token for `app_id`
    ///
    /// A banned account is rejected before its password is looked at.
    #[tracing::instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str, app_id: i32) -> Result<LoginOutcome> {
        let email = normalize_email(email);
        let user = self.within(self.users.get_user_by_email(&email)).await??;

        if user.is_banned() {
            tracing::warn!(user_id = user.id, "Login rejected for banned user");
            return Err(AuthError::UserBanned);
        }

        if !self.verify(password, &user.password_hash).await? {
            tracing::warn!(user_id = user.id, "Login rejected, wrong password");
            return Err(AuthError::InvalidCredentials(
                "invalid email or password".to_string(),
            ));
        }

        if self.require_known_app {
            let app = self
                .within(self.apps.get_app_by_id(app_id))
                .await?
                .map_err(|e| match e {
                    DirectoryError::NotFound => AuthError::AppNotFound,
                    e => e.into(),
                })?;
            tracing::debug!(app = %app.name, "Resolved calling app");
        }

        let token = self
            .tokens
            .issue(user.id, app_id, user.role, &user.nickname)?;
        tracing::info!(user_id = user.id, "User logged in");

        Ok(LoginOutcome {
            token,
            nickname: user.nickname,
            role: user.role,
        })
    }

    /// Create an administrator on behalf of `requesting_user_id`
    ///
    /// Authorization is decided first; a denied caller causes no validation
    /// and no persistence attempt.
    #[tracing::instrument(skip(self, password))]
    pub async fn create_admin(
        &self,
        email: &str,
        password: &str,
        nickname: &str,
        requesting_user_id: i64,
    ) -> Result<i64> {
        if !self
            .policy
            .can_create_admin(self.users.as_ref(), requesting_user_id)
            .await
        {
            tracing::warn!("Admin creation denied");
            return Err(AuthError::AccessDenied);
        }

        let user_id = self
            .create_user(email, nickname, password, UserRole::Admin)
            .await?;
        tracing::info!(user_id, "Admin created");
        Ok(user_id)
    }

    /// Create an administrator for the caller identified by `token`
    ///
    /// The token must verify and assert the admin role; the caller's current
    /// role is then re-checked against the directory.
    #[tracing::instrument(skip(self, token, password))]
    pub async fn create_admin_with_token(
        &self,
        token: &str,
        email: &str,
        password: &str,
        nickname: &str,
    ) -> Result<i64> {
        let claims = self.tokens.verify(token)?;
        if claims.role != UserRole::Admin {
            tracing::warn!(caller_id = claims.user_id, "Token does not assert admin role");
            return Err(AuthError::AccessDenied);
        }

        self.create_admin(email, password, nickname, claims.user_id)
            .await
    }

    /// Create an administrator without a policy check
    ///
    /// Operator bootstrap for an empty directory; not reachable over HTTP.
    #[tracing::instrument(skip(self, password))]
    pub async fn register_admin(
        &self,
        email: &str,
        nickname: &str,
        password: &str,
    ) -> Result<i64> {
        let user_id = self
            .create_user(email, nickname, password, UserRole::Admin)
            .await?;
        tracing::info!(user_id, "Admin bootstrapped");
        Ok(user_id)
    }

    /// Whether the user currently holds the admin role
    ///
    /// An unknown id is `UserNotFound`, not `false`.
    #[tracing::instrument(skip(self))]
    pub async fn is_admin(&self, user_id: i64) -> Result<bool> {
        let user = self.within(self.users.get_user_by_id(user_id)).await??;
        Ok(user.is_admin())
    }

    /// Check a token without raising
    pub fn validate_token(&self, token: &str) -> TokenValidation {
        match self.tokens.verify(token) {
            Ok(claims) => TokenValidation {
                valid: true,
                user_id: claims.user_id,
                app_id: claims.app_id,
                role: Some(claims.role),
                nickname: claims.nickname,
            },
            Err(e) => {
                tracing::debug!(error = %e, "Token rejected");
                TokenValidation::default()
            }
        }
    }

    async fn create_user(
        &self,
        email: &str,
        nickname: &str,
        password: &str,
        role: UserRole,
    ) -> Result<i64> {
        let email = normalize_email(email);
        let credentials = Credentials {
            email,
            password: password.to_string(),
            nickname: nickname.to_string(),
        };
        if let Err(e) = credentials.check() {
            tracing::warn!(error = %e, "Rejected credentials");
            return Err(e);
        }

        let password_hash = self.hash(password).await?;
        let user = NewUser::new(&credentials.email, nickname, password_hash, role);

        self.within(self.users.save_user(&user))
            .await?
            .map_err(|e| match e {
                DirectoryError::DuplicateEmail => AuthError::EmailExists,
                e => {
                    tracing::error!(error = %e, "Failed to save user");
                    e.into()
                }
            })
    }

    /// Await a directory call under the configured deadline
    async fn within<T>(&self, call: impl Future<Output = T>) -> Result<T> {
        tokio::time::timeout(self.directory_timeout, call)
            .await
            .map_err(|_| {
                tracing::error!(timeout = ?self.directory_timeout, "Directory call timed out");
                AuthError::DeadlineExceeded
            })
    }

    async fn hash(&self, password: &str) -> Result<String> {
        let password = password.to_string();
        let config = self.password.clone();
        tokio::task::spawn_blocking(move || hash_password_with_config(&password, &config))
            .await
            .map_err(|e| AuthError::Internal(format!("Hashing task failed: {e}")))?
            .map_err(AuthError::from)
    }

    async fn verify(&self, password: &str, hash: &str) -> Result<bool> {
        let password = password.to_string();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AuthError::Internal(format!("Verification task failed: {e}")))?
            .map_err(AuthError::from)
    }
}
