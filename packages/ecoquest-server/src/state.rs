//! Server state management.
//!
//! Holds the shared [`EcoService`] and the server configuration. The
//! service is synchronous (SQLite behind a mutex), so handlers reach it
//! through [`AppState::run`], which moves the call onto the blocking pool.

use std::collections::HashSet;
use std::sync::Arc;

use ecoquest_core::EcoService;

use crate::api::ApiError;

/// Default rollup interval in seconds (5 minutes).
const DEFAULT_ROLLUP_INTERVAL_SECS: u64 = 300;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Profiles promoted to administrator when they sync
    pub admin_ids: HashSet<String>,
    pub rollup_interval_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            admin_ids: HashSet::new(),
            rollup_interval_secs: DEFAULT_ROLLUP_INTERVAL_SECS,
        }
    }
}

/// Shared server state.
#[derive(Clone)]
pub struct AppState {
    pub service: EcoService,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Create the state around an opened service.
    pub fn new(service: EcoService, config: ServerConfig) -> Self {
        Self {
            service,
            config: Arc::new(config),
        }
    }

    /// Is this user configured as an administrator?
    pub fn is_configured_admin(&self, user_id: &str) -> bool {
        self.config.admin_ids.contains(user_id)
    }

    /// Run a service call on the blocking pool.
    pub async fn run<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&EcoService) -> ecoquest_core::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let service = self.service.clone();
        tokio::task::spawn_blocking(move || f(&service))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Blocking task failed");
                ApiError::from(ecoquest_core::Error::Internal(e.to_string()))
            })?
            .map_err(ApiError::from)
    }

    /// Promote every configured admin that already has a profile.
    pub fn apply_admin_ids(&self) -> ecoquest_core::Result<usize> {
        let mut promoted = 0;
        for user_id in &self.config.admin_ids {
            match self.service.set_admin(user_id, true) {
                Ok(_) => promoted += 1,
                Err(ecoquest_core::Error::ProfileNotFound(_)) => {
                    tracing::debug!(user_id = user_id.as_str(), "Configured admin has no profile yet");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(promoted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ecoquest_core::{Database, RulesConfig};

    fn state(admins: &[&str]) -> AppState {
        let db = Database::open(None).unwrap();
        db.seed_catalog().unwrap();
        AppState::new(
            EcoService::new(db, RulesConfig::default()),
            ServerConfig {
                admin_ids: admins.iter().map(|s| s.to_string()).collect(),
                ..ServerConfig::default()
            },
        )
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 8080);
        assert_eq!(config.rollup_interval_secs, 300);
        assert!(config.admin_ids.is_empty());
    }

    #[test]
    fn test_apply_admin_ids_skips_missing_profiles() {
        let state = state(&["boss", "later"]);
        state.service.sync_profile("boss", "Boss", None).unwrap();
        assert_eq!(state.apply_admin_ids().unwrap(), 1);
        assert!(state.service.get_profile("boss").unwrap().is_admin);
        assert!(state.is_configured_admin("later"));
    }

    #[tokio::test]
    async fn test_run_maps_errors() {
        let state = state(&[]);
        let err = state
            .run(|service| service.get_profile("ghost"))
            .await
            .unwrap_err();
        assert_eq!(err.status, axum::http::StatusCode::NOT_FOUND);
    }
}
