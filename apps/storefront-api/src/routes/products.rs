//! Catalog, availability, price quotes and back-in-stock subscriptions.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};

use farmgate_core::pricing::{quote as price_quote, PriceQuote};
use farmgate_core::validation::validate_quantity;
use farmgate_core::{Availability, Product};

use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResponse, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/products", get(list_products))
        .route("/products/{id}", get(get_product))
        .route("/products/{id}/availability", get(availability))
        .route("/products/{id}/quote", get(quote))
        .route("/products/{id}/subscribe", post(subscribe))
}

#[derive(Debug, Deserialize)]
pub struct CatalogQuery {
    pub category: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QuantityQuery {
    pub quantity: Option<i64>,
}

impl QuantityQuery {
    fn quantity(&self) -> i64 {
        self.quantity.unwrap_or(1)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub product_id: i64,
    /// False when the caller was already waiting on this product.
    pub new_subscription: bool,
}

async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<CatalogQuery>,
) -> ApiResult<Vec<Product>> {
    let products = state.db.products().list(query.category.as_deref()).await?;
    Ok(ApiResponse::ok("Products retrieved", products))
}

async fn get_product(State(state): State<AppState>, Path(id): Path<i64>) -> ApiResult<Product> {
    let product = state
        .db
        .products()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product"))?;
    Ok(ApiResponse::ok("Product retrieved", product))
}

/// Read-only; unknown products report unavailable with zero stock.
async fn availability(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<QuantityQuery>,
) -> ApiResult<Availability> {
    let availability = state
        .db
        .inventory()
        .check_availability(id, query.quantity())
        .await?;
    Ok(ApiResponse::ok("Availability checked", availability))
}

/// Prices for the caller's stored classification, not the one in the token.
async fn quote(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
    Query(query): Query<QuantityQuery>,
) -> ApiResult<PriceQuote> {
    let quantity = query.quantity();
    validate_quantity(quantity)?;

    let product = state
        .db
        .products()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Product"))?;
    let buyer = state
        .db
        .users()
        .get_by_id(&user.id)
        .await?
        .ok_or_else(|| ApiError::not_found("User"))?;

    Ok(ApiResponse::ok(
        "Price quoted",
        price_quote(&product, quantity, buyer.classification),
    ))
}

async fn subscribe(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i64>,
) -> ApiResult<Subscription> {
    let subscribed = state.db.inventory().subscribe(id, &user.id, &user.email).await?;

    let message = if subscribed {
        "You will be notified when this product is back in stock"
    } else {
        "Already subscribed"
    };
    Ok(ApiResponse::ok(
        message,
        Subscription {
            product_id: id,
            new_subscription: subscribed,
        },
    ))
}
