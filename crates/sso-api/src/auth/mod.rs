//! Authentication and authorization module
//!
//! - Token issuance and validation
//! - Password hashing with Argon2
//! - Admin-escalation policy
//! - Authentication service composing the above over the directories

pub mod jwt;
pub mod password;
pub mod policy;
pub mod service;

pub use jwt::{Claims, TokenConfig, TokenError, TokenService};
pub use password::{hash_password, hash_password_with_config, verify_password, PasswordError};
pub use policy::AdminPolicy;
pub use service::{AuthService, LoginOutcome, TokenValidation};
