//! Checkout and order history.
//!
//! ```text
//! POST /checkout {items, shippingAddress, paymentMethod}
//!      │
//!      ▼
//! OrderRepository::checkout (one transaction)
//!      │
//!      ├── 201 Order (status pending)
//!      ├── 409 itemised shortages, stock untouched
//!      └── 400 empty cart / bad address
//! ```

use axum::extract::{Path, Query, State};
use axum::routing::{get, post, put};
use axum::Router;
use serde::Deserialize;

use farmgate_core::checkout::CartLine;
use farmgate_core::{Order, OrderStatus, PaymentMethod, ShippingAddress};
use farmgate_db::CheckoutRequest;

use crate::auth::{AdminUser, CurrentUser};
use crate::error::{ApiError, ApiJson, ApiResponse, ApiResult};
use crate::state::AppState;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(checkout))
        .route("/orders", get(my_orders))
        .route("/orders/{id}", get(get_order))
}

/// Mounted under `/admin`.
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(all_orders))
        .route("/orders/{id}/status", put(update_status))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutBody {
    pub items: Vec<CartLine>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl PageQuery {
    fn limit(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }

    fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }
}

#[derive(Debug, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

async fn checkout(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(body): ApiJson<CheckoutBody>,
) -> ApiResult<Order> {
    let request = CheckoutRequest {
        buyer_id: user.id,
        cart: body.items,
        shipping_address: body.shipping_address,
        payment_method: body.payment_method,
    };

    let order = state.db.orders().checkout(request, &state.policy()).await?;
    Ok(ApiResponse::created("Order placed", order))
}

async fn my_orders(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(page): Query<PageQuery>,
) -> ApiResult<Vec<Order>> {
    let orders = state
        .db
        .orders()
        .list_for_buyer(&user.id, page.limit(), page.offset())
        .await?;
    Ok(ApiResponse::ok("Orders retrieved", orders))
}

/// Owners see their own orders; admins see any. Anyone else gets 404 so
/// order ids cannot be enumerated.
async fn get_order(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Order> {
    let order = state
        .db
        .orders()
        .get(&id)
        .await?
        .filter(|order| order.buyer_id == user.id || user.is_admin())
        .ok_or_else(|| ApiError::not_found("Order"))?;
    Ok(ApiResponse::ok("Order retrieved", order))
}

async fn all_orders(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(filter): Query<OrderFilter>,
) -> ApiResult<Vec<Order>> {
    let page = PageQuery {
        limit: filter.limit,
        offset: filter.offset,
    };
    let orders = state
        .db
        .orders()
        .list_all(filter.status, page.limit(), page.offset())
        .await?;
    Ok(ApiResponse::ok("Orders retrieved", orders))
}

async fn update_status(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<StatusUpdate>,
) -> ApiResult<Order> {
    let order = state
        .db
        .orders()
        .advance_status(&id, body.status, &admin.actor())
        .await?;
    Ok(ApiResponse::ok(
        format!("Order moved to {}", order.status.as_str()),
        order,
    ))
}
