//! SSO API - authentication engine and REST server
//!
//! Provides HTTP endpoints for registration, login, admin management and
//! session token validation.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

use axum::{routing::get, Router};
use sso_core::{AppConfig, LoggingConfig, MemoryDirectory, PasswordConfig};
use state::AppState;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;
use utoipa::{
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health::health_check,
        handlers::auth::register_handler,
        handlers::auth::login_handler,
        handlers::auth::create_admin_handler,
        handlers::auth::is_admin_handler,
        handlers::auth::validate_handler,
    ),
    components(schemas(
        error::ApiError,
        handlers::health::HealthResponse,
        handlers::auth::RegisterRequest,
        handlers::auth::RegisterResponse,
        handlers::auth::LoginRequest,
        handlers::auth::CreateAdminRequest,
        handlers::auth::CreateAdminResponse,
        handlers::auth::IsAdminResponse,
        handlers::auth::ValidateTokenRequest,
        auth::LoginOutcome,
        auth::TokenValidation,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Registration, login and tokens"),
        (name = "users", description = "User role lookups"),
        (name = "health", description = "Liveness"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

/// Build the full application router
///
/// Requests running past `server.request_timeout_secs` are answered with 408.
pub fn create_router(state: Arc<AppState>) -> Router {
    let request_timeout = Duration::from_secs(state.config.server.request_timeout_secs);

    Router::new()
        .route("/health", get(handlers::health::health_check))
        .nest("/api/v1", routes::api_routes())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

/// Install the global subscriber from `logging`; `RUST_LOG` takes precedence
pub fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_log_filter(logging).into());

    if logging.json_format {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn default_log_filter(logging: &LoggingConfig) -> String {
    let level = &logging.level;
    format!("sso_api={level},sso_core={level},sso_cli={level},tower_http={level}")
}

/// In-memory state with cheap password hashing, for tests and local runs
pub fn testing_state() -> (Arc<AppState>, Arc<MemoryDirectory>) {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = "test-secret".to_string();
    config.password = PasswordConfig {
        memory_cost: 1024,
        time_cost: 1,
        parallelism: 1,
        output_len: Some(32),
    };

    let directory = Arc::new(MemoryDirectory::new());
    let state = Arc::new(AppState::new(config, directory.clone(), directory.clone()));
    (state, directory)
}

/// Router over a fresh in-memory directory
pub fn create_router_for_testing() -> Router {
    let (state, _) = testing_state();
    create_router(state)
}
