//! Authorization policy for privileged actions
//!
//! Decisions read the caller's current role from the user directory, so a
//! demoted admin loses privileges immediately even while holding a token
//! issued with the admin role.

use sso_core::{UserDirectory, UserRole};
use std::time::Duration;

/// Admin-escalation policy
///
/// Fails closed: lookup errors, unknown callers and timeouts all deny.
#[derive(Debug, Clone, Copy)]
pub struct AdminPolicy {
    timeout: Duration,
}

impl AdminPolicy {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Whether `caller_id` may create another administrator
    pub async fn can_create_admin(&self, users: &dyn UserDirectory, caller_id: i64) -> bool {
        match tokio::time::timeout(self.timeout, users.get_user_by_id(caller_id)).await {
            Ok(Ok(caller)) => caller.role == UserRole::Admin,
            Ok(Err(e)) => {
                tracing::warn!(caller_id, error = %e, "Admin policy lookup failed, denying");
                false
            }
            Err(_) => {
                tracing::warn!(caller_id, "Admin policy lookup timed out, denying");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sso_core::{DirectoryError, MemoryDirectory, NewUser, User, UserStatus};

    struct BrokenDirectory;

    #[async_trait]
    impl UserDirectory for BrokenDirectory {
        async fn save_user(&self, _: &NewUser) -> Result<i64, DirectoryError> {
            Err(DirectoryError::Unavailable("down".into()))
        }
        async fn get_user_by_email(&self, _: &str) -> Result<User, DirectoryError> {
            Err(DirectoryError::Unavailable("down".into()))
        }
        async fn get_user_by_id(&self, _: i64) -> Result<User, DirectoryError> {
            Err(DirectoryError::Unavailable("down".into()))
        }
        async fn set_status(&self, _: i64, _: UserStatus) -> Result<(), DirectoryError> {
            Err(DirectoryError::Unavailable("down".into()))
        }
    }

    fn policy() -> AdminPolicy {
        AdminPolicy::new(Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_only_admin_role_may_create_admin() {
        let dir = MemoryDirectory::new();
        let admin = dir
            .save_user(&NewUser::new("root@b.com", "root", "h".into(), UserRole::Admin))
            .await
            .unwrap();
        let user = dir
            .save_user(&NewUser::new("joe@b.com", "joe", "h".into(), UserRole::User))
            .await
            .unwrap();

        assert!(policy().can_create_admin(&dir, admin).await);
        assert!(!policy().can_create_admin(&dir, user).await);
    }

    #[tokio::test]
    async fn test_unknown_caller_denied() {
        let dir = MemoryDirectory::new();
        assert!(!policy().can_create_admin(&dir, 404).await);
    }

    #[tokio::test]
    async fn test_directory_failure_denied() {
        assert!(!policy().can_create_admin(&BrokenDirectory, 1).await);
    }
}
