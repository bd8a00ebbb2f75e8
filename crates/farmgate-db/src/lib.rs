//! # farmgate-db: Database Layer for Farmgate
//!
//! The SQLite store behind the storefront. Every stock counter, account,
//! application and order lives here, and every mutation goes through one of
//! these repositories.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Farmgate Data Flow                               │
//! │                                                                         │
//! │  axum handler (POST /api/v1/checkout)                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     farmgate-db (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ ProductRepo    │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ InventoryRepo  │    │ 001_initial  │  │   │
//! │  │   │ DbConfig      │    │ UserRepo       │    │   _schema    │  │   │
//! │  │   │               │    │ ApplicationRepo│    │              │  │   │
//! │  │   │               │    │ OrderRepo      │    │              │  │   │
//! │  │   │               │    │ NotificationRe.│    │              │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              SQLite Database (./data/farmgate.db)               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//! - [`catalog`] - Static seed catalog
//!
//! ## Usage
//!
//! ```rust,ignore
//! use farmgate_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("./data/farmgate.db")).await?;
//! db.seed_catalog().await?;
//!
//! let availability = db.inventory().check_availability(1, 3).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod catalog;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::application::ApplicationRepository;
pub use repository::inventory::{InventoryRepository, RestockResult};
pub use repository::notification::NotificationRepository;
pub use repository::order::{CheckoutRequest, OrderRepository};
pub use repository::product::ProductRepository;
pub use repository::user::{NewUser, StoredCredentials, UserRepository};
