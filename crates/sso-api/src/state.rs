//! Application state management
//!
//! Author: hephaex@gmail.com

use crate::auth::AuthService;
use sso_core::{AppConfig, AppDirectory, UserDirectory};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Server start time
    pub start_time: Instant,
    /// Authentication engine
    pub auth: AuthService,
}

impl AppState {
    /// Build state over the given directories
    pub fn new(
        config: AppConfig,
        users: Arc<dyn UserDirectory>,
        apps: Arc<dyn AppDirectory>,
    ) -> Self {
        let auth = AuthService::new(users, apps, &config.auth, config.password.clone());
        Self {
            config,
            start_time: Instant::now(),
            auth,
        }
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
