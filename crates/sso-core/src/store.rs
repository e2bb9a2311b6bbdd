//! PostgreSQL directory
//!
//! Provides user and app persistence using SQLx and PostgreSQL.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::FromRow;

use crate::directory::{AppDirectory, UserDirectory};
use crate::{App, AuthError, DirectoryError, NewUser, User, UserStatus};

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id BIGSERIAL PRIMARY KEY,
        email TEXT NOT NULL,
        nickname TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        role TEXT NOT NULL DEFAULT 'user' CHECK (role IN ('user', 'admin')),
        status TEXT NOT NULL DEFAULT 'active' CHECK (status IN ('active', 'banned')),
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS users_email_lower_idx ON users (lower(email))",
    r#"
    CREATE TABLE IF NOT EXISTS apps (
        id INTEGER PRIMARY KEY,
        name TEXT NOT NULL,
        secret TEXT NOT NULL
    )
    "#,
];

/// PostgreSQL-backed user and app directory
#[derive(Clone)]
pub struct PgDirectory {
    pool: PgPool,
}

impl PgDirectory {
    /// Create a new directory connection
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self, AuthError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| AuthError::Internal(format!("PostgreSQL connection failed: {e}")))?;

        Ok(Self { pool })
    }

    /// Create the `users` and `apps` tables if they don't exist
    pub async fn migrate(&self) -> Result<(), AuthError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AuthError::Internal(format!("Migration failed: {e}")))?;
        }
        tracing::info!("Directory schema ready");
        Ok(())
    }
}

/// User row from database
#[derive(Debug, FromRow)]
struct UserRow {
    id: i64,
    email: String,
    nickname: String,
    password_hash: String,
    role: String,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DirectoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            email: row.email,
            nickname: row.nickname,
            password_hash: row.password_hash,
            role: row.role.parse()?,
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}

/// App row from database
#[derive(Debug, FromRow)]
struct AppRow {
    id: i32,
    name: String,
    secret: String,
}

impl From<AppRow> for App {
    fn from(row: AppRow) -> Self {
        App {
            id: row.id,
            name: row.name,
            secret: row.secret,
        }
    }
}

fn unavailable(context: &str, err: sqlx::Error) -> DirectoryError {
    DirectoryError::Unavailable(format!("{context}: {err}"))
}

const SELECT_USER: &str =
    "SELECT id, email, nickname, password_hash, role, status, created_at FROM users";

#[async_trait]
impl UserDirectory for PgDirectory {
    async fn save_user(&self, user: &NewUser) -> Result<i64, DirectoryError> {
        let row: (i64,) = sqlx::query_as(
            r#"
            INSERT INTO users (email, nickname, password_hash, role, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id
            "#,
        )
        .bind(&user.email)
        .bind(&user.nickname)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.status.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                DirectoryError::DuplicateEmail
            }
            e => unavailable("Failed to save user", e),
        })?;

        Ok(row.0)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, DirectoryError> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("{SELECT_USER} WHERE lower(email) = lower($1)"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| unavailable("Failed to get user by email", e))?;

        row.ok_or(DirectoryError::NotFound)?.try_into()
    }

    async fn get_user_by_id(&self, id: i64) -> Result<User, DirectoryError> {
        let row: Option<UserRow> = sqlx::query_as(&format!("{SELECT_USER} WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| unavailable("Failed to get user by id", e))?;

        row.ok_or(DirectoryError::NotFound)?.try_into()
    }

    async fn set_status(&self, id: i64, status: UserStatus) -> Result<(), DirectoryError> {
        let result = sqlx::query("UPDATE users SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| unavailable("Failed to update status", e))?;

        if result.rows_affected() == 0 {
            return Err(DirectoryError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl AppDirectory for PgDirectory {
    async fn get_app_by_id(&self, id: i32) -> Result<App, DirectoryError> {
        let row: Option<AppRow> = sqlx::query_as("SELECT id, name, secret FROM apps WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| unavailable("Failed to get app", e))?;

        row.map(App::from).ok_or(DirectoryError::NotFound)
    }
}
