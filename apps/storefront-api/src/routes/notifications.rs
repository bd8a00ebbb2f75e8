//! Notification feeds: a buyer's own messages and the admin alert feed.

use axum::extract::{Path, Query, State};
use axum::routing::{get, put};
use axum::Router;
use serde::Deserialize;

use farmgate_core::Notification;

use crate::auth::{AdminUser, CurrentUser};
use crate::error::{ApiError, ApiResponse, ApiResult};
use crate::state::AppState;

const DEFAULT_FEED_LIMIT: i64 = 50;
const MAX_FEED_LIMIT: i64 = 200;

pub fn router() -> Router<AppState> {
    Router::new().route("/notifications", get(my_notifications))
}

/// Mounted under `/admin`.
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(feed))
        .route("/notifications/{id}/read", put(mark_read))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedQuery {
    #[serde(default)]
    pub unread_only: bool,
    pub limit: Option<i64>,
}

async fn my_notifications(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Vec<Notification>> {
    let notifications = state.db.notifications().list_for_user(&user.id).await?;
    Ok(ApiResponse::ok("Notifications retrieved", notifications))
}

async fn feed(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<FeedQuery>,
) -> ApiResult<Vec<Notification>> {
    let limit = query.limit.unwrap_or(DEFAULT_FEED_LIMIT).clamp(1, MAX_FEED_LIMIT);
    let notifications = state
        .db
        .notifications()
        .list(query.unread_only, limit)
        .await?;
    Ok(ApiResponse::ok("Notifications retrieved", notifications))
}

async fn mark_read(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    if !state.db.notifications().mark_read(&id).await? {
        return Err(ApiError::not_found("Notification"));
    }
    Ok(ApiResponse::message("Notification marked read"))
}
