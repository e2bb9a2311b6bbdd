//! API route definitions
//!
//! Author: hephaex@gmail.com

use crate::handlers::auth;
use crate::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Create API v1 routes
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/validate", post(auth::validate_handler))
        // Bearer token checked by the handler against the admin policy
        .route("/auth/admins", post(auth::create_admin_handler))
        .route("/users/:id/is-admin", get(auth::is_admin_handler))
}
