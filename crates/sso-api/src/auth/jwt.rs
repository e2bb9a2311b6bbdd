//! Session token issuance and verification
//!
//! Implements JWT-based session tokens with HMAC-SHA256 signing.
//! Tokens carry the user, the calling app, a role snapshot and the display
//! nickname, and are valid strictly before their `exp` timestamp.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sso_core::{AuthConfig, UserRole};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use thiserror::Error;

/// The only algorithm tokens are signed with or accepted under
const ALGORITHM: Algorithm = Algorithm::HS256;

/// Claims embedded in every session token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Directory identifier of the user
    pub user_id: i64,
    /// Calling application the token is scoped to
    pub app_id: i32,
    /// Role at issuance time
    pub role: UserRole,
    /// Display nickname at issuance time
    pub nickname: String,
    /// Issued at (Unix epoch seconds)
    pub iat: u64,
    /// Expiration (Unix epoch seconds)
    pub exp: u64,
    /// Token issuer
    pub iss: String,
}

/// Token issuance and verification errors
#[derive(Debug, Error)]
pub enum TokenError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    /// Malformed, forged, wrongly signed or wrong-issuer token
    #[error("Invalid token")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("System time error: {0}")]
    SystemTimeError(#[from] std::time::SystemTimeError),
}

/// Token service configuration
#[derive(Clone)]
pub struct TokenConfig {
    /// Secret key for HMAC signing
    pub secret: String,
    /// Token lifetime
    pub ttl: Duration,
    /// Token issuer identifier
    pub issuer: String,
}

impl From<&AuthConfig> for TokenConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            secret: config.jwt_secret.clone(),
            ttl: config.token_ttl(),
            issuer: config.issuer.clone(),
        }
    }
}

/// Issues and verifies session tokens with one process-wide secret
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl_secs: u64,
    issuer: String,
}

impl TokenService {
    pub fn new(config: TokenConfig) -> Self {
        let mut validation = Validation::new(ALGORITHM);
        validation.set_issuer(&[&config.issuer]);
        validation.set_required_spec_claims(&["exp", "iss"]);
        // Expiry is checked in verify_at with zero leeway.
        validation.validate_exp = false;

        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            ttl_secs: config.ttl.as_secs(),
            issuer: config.issuer,
        }
    }

    /// Issue a token stamped with the current time
    pub fn issue(
        &self,
        user_id: i64,
        app_id: i32,
        role: UserRole,
        nickname: &str,
    ) -> Result<String, TokenError> {
        self.issue_at(user_id, app_id, role, nickname, unix_now()?)
    }

    /// Issue a token as if the current time were `now`
    pub fn issue_at(
        &self,
        user_id: i64,
        app_id: i32,
        role: UserRole,
        nickname: &str,
        now: u64,
    ) -> Result<String, TokenError> {
        let claims = Claims {
            user_id,
            app_id,
            role,
            nickname: nickname.to_string(),
            iat: now,
            exp: now.saturating_add(self.ttl_secs),
            iss: self.issuer.clone(),
        };

        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Verify a token against the current time
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.verify_at(token, unix_now()?)
    }

    /// Verify a token as if the current time were `now`
    ///
    /// Signature, algorithm and issuer problems are reported as
    /// [`TokenError::InvalidToken`]; a genuine token at or past its `exp`
    /// is [`TokenError::ExpiredToken`].
    pub fn verify_at(&self, token: &str, now: u64) -> Result<Claims, TokenError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|_| TokenError::InvalidToken)?;

        if now >= token_data.claims.exp {
            return Err(TokenError::ExpiredToken);
        }

        Ok(token_data.claims)
    }
}

fn unix_now() -> Result<u64, TokenError> {
    Ok(SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs())
}
