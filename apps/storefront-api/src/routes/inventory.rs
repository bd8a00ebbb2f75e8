//! Admin views of the inventory ledger. Mounted under `/admin`.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use farmgate_core::{Product, RestockRecord};

use crate::auth::AdminUser;
use crate::error::{ApiError, ApiJson, ApiResponse, ApiResult};
use crate::state::AppState;

pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/inventory/low-stock", get(low_stock))
        .route("/inventory/{id}/restock", post(restock))
        .route("/inventory/{id}/history", get(history))
}

#[derive(Debug, Deserialize)]
pub struct RestockBody {
    pub quantity: i64,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RestockSummary {
    pub record: RestockRecord,
    pub notified_subscribers: usize,
}

async fn restock(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<i64>,
    ApiJson(body): ApiJson<RestockBody>,
) -> ApiResult<RestockSummary> {
    let result = state
        .db
        .inventory()
        .restock(id, body.quantity, &admin.id, body.notes.as_deref())
        .await?
        .ok_or_else(|| ApiError::not_found("Product"))?;

    Ok(ApiResponse::ok(
        format!("Stock is now {}", result.record.new_stock),
        RestockSummary {
            record: result.record,
            notified_subscribers: result.notified_subscribers,
        },
    ))
}

async fn low_stock(State(state): State<AppState>, _admin: AdminUser) -> ApiResult<Vec<Product>> {
    let products = state.db.inventory().low_stock().await?;
    Ok(ApiResponse::ok("Low stock products", products))
}

async fn history(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<i64>,
) -> ApiResult<Vec<RestockRecord>> {
    let records = state.db.inventory().restock_history(id).await?;
    Ok(ApiResponse::ok("Restock history", records))
}
