//! HTTP routes.
//!
//! ```text
//! /api/v1
//! ├── /health                          public
//! ├── /auth/*                          register/login/refresh public, rest user
//! ├── /products/*                      catalog public, quote/subscribe user
//! ├── /checkout, /orders/*             user
//! ├── /applications/*                  user
//! ├── /notifications                   user
//! └── /admin/*                         require_admin middleware
//!     ├── /applications/*
//!     ├── /inventory/*
//!     ├── /orders/*
//!     └── /notifications/*
//! ```

use axum::middleware;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::require_admin;
use crate::state::AppState;

pub mod applications;
pub mod auth;
pub mod health;
pub mod inventory;
pub mod notifications;
pub mod orders;
pub mod products;

pub const API_PREFIX: &str = "/api/v1";

/// Every route, without middleware or state.
pub fn build_router(state: &AppState) -> Router<AppState> {
    let admin = Router::new()
        .merge(applications::admin_router())
        .merge(inventory::admin_router())
        .merge(orders::admin_router())
        .merge(notifications::admin_router())
        .layer(middleware::from_fn_with_state(state.clone(), require_admin));

    Router::new()
        .merge(health::router())
        .merge(auth::router())
        .merge(products::router())
        .merge(orders::router())
        .merge(applications::router())
        .merge(notifications::router())
        .nest("/admin", admin)
}

/// The full application: routes under [`API_PREFIX`], tower-http layers and
/// state. Used by the server and by the integration tests.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .nest(API_PREFIX, build_router(&state))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
