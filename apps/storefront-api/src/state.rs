//! Shared application state handed to every handler.

use std::sync::Arc;

use farmgate_core::checkout::CheckoutPolicy;
use farmgate_db::Database;

use crate::auth::JwtManager;
use crate::config::ServerConfig;

/// Cloned per request; everything inside is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub jwt: Arc<JwtManager>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(db: Database, config: ServerConfig) -> Self {
        let jwt = JwtManager::new(
            &config.jwt_secret,
            config.jwt_access_lifetime_secs,
            config.jwt_refresh_lifetime_secs,
        );

        AppState {
            db,
            jwt: Arc::new(jwt),
            config: Arc::new(config),
        }
    }

    pub fn policy(&self) -> CheckoutPolicy {
        self.config.checkout_policy()
    }
}
