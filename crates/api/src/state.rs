//! Application state

use std::sync::Arc;

use motorlot_entitlements::EntitlementService;
use sqlx::PgPool;

use crate::auth::{AuthState, JwtManager};
use crate::config::Config;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Config,
    pub jwt_manager: JwtManager,
    pub entitlements: Arc<EntitlementService>,
}

impl AppState {
    pub fn new(pool: PgPool, config: Config) -> Self {
        let jwt_manager = JwtManager::new(&config.jwt_secret);
        let entitlements = Arc::new(EntitlementService::from_env(pool.clone()));
        tracing::info!("Entitlement service initialized");

        Self {
            pool,
            config,
            jwt_manager,
            entitlements,
        }
    }

    /// Get auth state for middleware
    pub fn auth_state(&self) -> AuthState {
        AuthState {
            jwt_manager: self.jwt_manager.clone(),
        }
    }
}
