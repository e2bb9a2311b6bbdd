//! SSO CLI - operator commands
//!
//! Usage:
//!   sso seed-admin --email <email> --nickname <nickname> --password <password>
//!   sso ban <user_id>
//!   sso inspect-token <token>

use anyhow::Context;
use clap::{Parser, Subcommand};
use sso_api::auth::{AuthService, TokenService};
use sso_api::init_tracing;
use sso_core::{AppConfig, PgDirectory, UserDirectory, UserStatus};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "sso")]
#[command(about = "SSO service operator CLI")]
#[command(version)]
struct Cli {
    /// TOML configuration file (environment variables still override)
    #[arg(long, env = "SSO_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an administrator without an authorization check
    SeedAdmin {
        #[arg(long)]
        email: String,
        #[arg(long)]
        nickname: String,
        #[arg(long, env = "SSO_ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Ban a user; later logins are rejected
    Ban {
        user_id: i64,
    },
    /// Verify a session token and print its claims
    InspectToken {
        token: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    init_tracing(&config.logging);
    config.validate()?;

    match cli.command {
        Commands::SeedAdmin {
            email,
            nickname,
            password,
        } => {
            let directory = connect(&config).await?;
            let service =
                AuthService::new(directory.clone(), directory, &config.auth, config.password);
            let user_id = service
                .register_admin(&email, &nickname, &password)
                .await
                .context("Failed to create admin")?;
            println!("Created admin {nickname} with id {user_id}");
        }
        Commands::Ban { user_id } => {
            let directory = connect(&config).await?;
            ban(directory.as_ref(), user_id).await?;
            println!("User {user_id} banned");
        }
        Commands::InspectToken { token } => {
            // Verification needs only the signing settings, not the directory.
            let tokens = TokenService::new((&config.auth).into());
            let report = inspect_token(&tokens, &token)?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}

/// Mark a user banned; unknown ids are an error
async fn ban(users: &dyn UserDirectory, user_id: i64) -> anyhow::Result<()> {
    users
        .set_status(user_id, UserStatus::Banned)
        .await
        .with_context(|| format!("Failed to ban user {user_id}"))?;
    tracing::info!(user_id, "User banned");
    Ok(())
}

/// Claims of a verified token, or `{valid: false, error}`
fn inspect_token(tokens: &TokenService, token: &str) -> anyhow::Result<serde_json::Value> {
    let report = match tokens.verify(token) {
        Ok(claims) => {
            let mut value = serde_json::to_value(&claims)?;
            value["valid"] = serde_json::Value::Bool(true);
            value
        }
        Err(e) => serde_json::json!({ "valid": false, "error": e.to_string() }),
    };
    Ok(report)
}

async fn connect(config: &AppConfig) -> anyhow::Result<Arc<PgDirectory>> {
    let directory = PgDirectory::new(
        &config.database.postgres_url,
        config.database.postgres_pool_size,
    )
    .await
    .context("Failed to connect to PostgreSQL")?;
    directory.migrate().await?;
    Ok(Arc::new(directory))
}
