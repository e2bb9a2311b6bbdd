//! Directory traits for durable identity state
//!
//! The engine never touches storage directly: it depends on these traits,
//! which are satisfied by [`crate::store::PgDirectory`] in production and by
//! [`MemoryDirectory`] in tests and single-process deployments.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::{App, DirectoryError, NewUser, User, UserStatus};

/// Persistence of user records
///
/// Implementations enforce email uniqueness atomically: of two concurrent
/// saves for the same email, exactly one succeeds and the other reports
/// [`DirectoryError::DuplicateEmail`].
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Persist a new user and return the assigned identifier
    async fn save_user(&self, user: &NewUser) -> Result<i64, DirectoryError>;

    /// Look up a user by normalized email
    async fn get_user_by_email(&self, email: &str) -> Result<User, DirectoryError>;

    /// Look up a user by identifier
    async fn get_user_by_id(&self, id: i64) -> Result<User, DirectoryError>;

    /// Administrative status change (ban / unban)
    async fn set_status(&self, id: i64, status: UserStatus) -> Result<(), DirectoryError>;
}

/// Resolution of calling applications (tenants)
#[async_trait]
pub trait AppDirectory: Send + Sync {
    async fn get_app_by_id(&self, id: i32) -> Result<App, DirectoryError>;
}

#[derive(Default)]
struct MemoryState {
    next_id: i64,
    users: HashMap<i64, User>,
    by_email: HashMap<String, i64>,
    apps: HashMap<i32, App>,
}

/// In-process directory backed by hash maps
#[derive(Default)]
pub struct MemoryDirectory {
    state: RwLock<MemoryState>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tenant
    pub async fn insert_app(&self, id: i32, name: impl Into<String>, secret: impl Into<String>) {
        let app = App {
            id,
            name: name.into(),
            secret: secret.into(),
        };
        self.state.write().await.apps.insert(id, app);
    }

    /// Number of stored users
    pub async fn user_count(&self) -> usize {
        self.state.read().await.users.len()
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn save_user(&self, user: &NewUser) -> Result<i64, DirectoryError> {
        // Check and insert under the same write guard.
        let mut state = self.state.write().await;
        if state.by_email.contains_key(&user.email) {
            return Err(DirectoryError::DuplicateEmail);
        }

        state.next_id += 1;
        let id = state.next_id;
        state.by_email.insert(user.email.clone(), id);
        state.users.insert(id, user.clone().into_user(id));
        Ok(id)
    }

    async fn get_user_by_email(&self, email: &str) -> Result<User, DirectoryError> {
        let state = self.state.read().await;
        state
            .by_email
            .get(email)
            .and_then(|id| state.users.get(id))
            .cloned()
            .ok_or(DirectoryError::NotFound)
    }

    async fn get_user_by_id(&self, id: i64) -> Result<User, DirectoryError> {
        self.state
            .read()
            .await
            .users
            .get(&id)
            .cloned()
            .ok_or(DirectoryError::NotFound)
    }

    async fn set_status(&self, id: i64, status: UserStatus) -> Result<(), DirectoryError> {
        let mut state = self.state.write().await;
        let user = state.users.get_mut(&id).ok_or(DirectoryError::NotFound)?;
        user.status = status;
        Ok(())
    }
}

#[async_trait]
impl AppDirectory for MemoryDirectory {
    async fn get_app_by_id(&self, id: i32) -> Result<App, DirectoryError> {
        self.state
            .read()
            .await
            .apps
            .get(&id)
            .cloned()
            .ok_or(DirectoryError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UserRole;
    use std::sync::Arc;

    fn new_user(email: &str) -> NewUser {
        NewUser::new(email, "nick", "hash".to_string(), UserRole::User)
    }

    #[tokio::test]
    async fn test_save_assigns_increasing_ids() {
        let dir = MemoryDirectory::new();
        let first = dir.save_user(&new_user("a@b.com")).await.unwrap();
        let second = dir.save_user(&new_user("c@d.com")).await.unwrap();
        assert!(second > first);

        let user = dir.get_user_by_id(first).await.unwrap();
        assert_eq!(user.email, "a@b.com");
        assert_eq!(user.status, UserStatus::Active);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let dir = MemoryDirectory::new();
        dir.save_user(&new_user("a@b.com")).await.unwrap();

        let result = dir.save_user(&new_user("A@B.com")).await;
        assert_eq!(result, Err(DirectoryError::DuplicateEmail));
        assert_eq!(dir.user_count().await, 1);
    }

    #[tokio::test]
    async fn test_concurrent_saves_only_one_wins() {
        let dir = Arc::new(MemoryDirectory::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let dir = dir.clone();
                tokio::spawn(async move { dir.save_user(&new_user("race@b.com")).await })
            })
            .collect();

        let results = futures::future::join_all(handles).await;
        let wins = results
            .iter()
            .filter(|r| matches!(r, Ok(Ok(_))))
            .count();
        assert_eq!(wins, 1);
        assert_eq!(dir.user_count().await, 1);
    }

    #[tokio::test]
    async fn test_lookups_report_not_found() {
        let dir = MemoryDirectory::new();
        assert_eq!(
            dir.get_user_by_email("nobody@b.com").await.unwrap_err(),
            DirectoryError::NotFound
        );
        assert_eq!(dir.get_user_by_id(99).await.unwrap_err(), DirectoryError::NotFound);
        assert_eq!(dir.get_app_by_id(1).await.unwrap_err(), DirectoryError::NotFound);
        assert_eq!(
            dir.set_status(99, UserStatus::Banned).await,
            Err(DirectoryError::NotFound)
        );
    }

    #[tokio::test]
    async fn test_set_status_and_apps() {
        let dir = MemoryDirectory::new();
        let id = dir.save_user(&new_user("a@b.com")).await.unwrap();
        dir.set_status(id, UserStatus::Banned).await.unwrap();
        assert!(dir.get_user_by_id(id).await.unwrap().is_banned());

        dir.insert_app(42, "forum", "tenant-secret").await;
        let app = dir.get_app_by_id(42).await.unwrap();
        assert_eq!(app.name, "forum");
        assert_eq!(app.secret, "tenant-secret");
    }
}
