//! # Farmgate Storefront API
//!
//! REST server for the agricultural storefront.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Storefront API                                   │
//! │                                                                         │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────────┐│
//! │  │  auth          │  │  routes        │  │  farmgate-db               ││
//! │  │                │  │                │  │                            ││
//! │  │ • JwtManager   │  │ • auth         │  │ • InventoryRepository      ││
//! │  │ • argon2       │─►│ • products     │─►│ • OrderRepository          ││
//! │  │ • CurrentUser  │  │ • orders       │  │ • ApplicationRepository    ││
//! │  │ • require_admin│  │ • applications │  │ • UserRepository           ││
//! │  └────────────────┘  │ • admin/*      │  │ • NotificationRepository   ││
//! │                      └────────────────┘  └────────────────────────────┘│
//! │                                                                         │
//! │  Every handler returns ApiResponse<T> | ApiError, rendered as           │
//! │  { success, message, data?, errors? }                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration
//! Environment variables (see [`config::ServerConfig::load`]):
//! - `HTTP_PORT` - listen port (default: 8080)
//! - `DATABASE_PATH` - SQLite file (default: ./data/farmgate.db)
//! - `JWT_SECRET` - HS256 signing secret
//! - `JWT_ACCESS_LIFETIME_SECS` - access token lifetime (default: 900)
//! - `JWT_REFRESH_LIFETIME_SECS` - refresh token lifetime (default: 604800)
//! - `BOOTSTRAP_ADMIN_EMAIL` / `BOOTSTRAP_ADMIN_PASSWORD` - first super admin

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use tracing::info;

use farmgate_core::Role;
use farmgate_db::{Database, NewUser};

// Re-exports
pub use config::{ConfigError, ServerConfig};
pub use error::{ApiError, ApiResponse, ApiResult};
pub use routes::build_app;
pub use state::AppState;

/// Makes sure the configured bootstrap account exists and is a super admin.
///
/// Returns the admin's id, or `None` when no bootstrap account is configured.
/// An existing account keeps its password.
pub async fn bootstrap_admin(db: &Database, config: &ServerConfig) -> Result<Option<String>, ApiError> {
    let (Some(email), Some(password)) = (
        config.bootstrap_admin_email.as_deref(),
        config.bootstrap_admin_password.as_deref(),
    ) else {
        return Ok(None);
    };

    let users = db.users();
    let user = match users.get_by_email(email).await? {
        Some(user) => user,
        None => {
            farmgate_core::validation::validate_password(password)?;
            users
                .create(NewUser {
                    email: email.to_string(),
                    name: "Administrator".to_string(),
                    phone: None,
                    password_hash: auth::password::spawn_hash(password.to_string()).await?,
                })
                .await?
        }
    };

    if user.role != Role::SuperAdmin {
        users.set_role(&user.id, Role::SuperAdmin).await?;
        info!(user_id = %user.id, email = %user.email, "Bootstrap admin promoted");
    }

    Ok(Some(user.id))
}
