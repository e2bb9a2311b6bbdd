//! SSO API Server
//!
//! REST API server for the authentication service.
//!
//! Author: hephaex@gmail.com

use anyhow::Context;
use sso_api::{create_router, init_tracing, state::AppState};
use sso_core::{AppConfig, PgDirectory};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = match std::env::var("SSO_CONFIG") {
        Ok(path) => AppConfig::from_file(path)?.with_env_override()?,
        Err(_) => AppConfig::from_env()?,
    };

    init_tracing(&config.logging);
    config.validate()?;

    // Connect the directory
    let directory = Arc::new(
        PgDirectory::new(
            &config.database.postgres_url,
            config.database.postgres_pool_size,
        )
        .await
        .context("Failed to connect to PostgreSQL")?,
    );
    directory
        .migrate()
        .await
        .context("Failed to apply schema")?;

    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Create application state
    let state = Arc::new(AppState::new(config, directory.clone(), directory));

    // Create router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("SSO API Server starting on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui/", addr);
    tracing::info!("OpenAPI spec at http://{}/api-docs/openapi.json", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Gracefully shutdown");
}
