//! End-to-end tests: the full router over an in-memory database, driven with
//! `tower::ServiceExt::oneshot`.

use axum::body::Body;
use axum::http::{header, HeaderMap, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use farmgate_api::{bootstrap_admin, build_app, AppState, ServerConfig};
use farmgate_core::{BulkTier, Product};
use farmgate_db::{Database, DbConfig};

const ADMIN_EMAIL: &str = "admin@farmgate.ng";
const ADMIN_PASSWORD: &str = "harvest-admin-1";
const PASSWORD: &str = "harvest-2024";

struct TestApp {
    app: Router,
    db: Database,
}

struct Reply {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
}

fn catalog() -> Vec<Product> {
    let mut rice = Product::new(1, "Ofada Rice (50kg)", 7500, 100);
    rice.bulk_tiers = vec![BulkTier::new(10, 6500), BulkTier::new(50, 6000)];

    let mut yam = Product::new(2, "Yam Tubers", 1000, 5);
    yam.low_stock_threshold = 3;

    vec![rice, yam]
}

async fn spawn() -> TestApp {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    for product in catalog() {
        db.products().insert(&product).await.unwrap();
    }

    let config = ServerConfig {
        seed_catalog: false,
        bootstrap_admin_email: Some(ADMIN_EMAIL.to_string()),
        bootstrap_admin_password: Some(ADMIN_PASSWORD.to_string()),
        ..ServerConfig::default()
    };
    bootstrap_admin(&db, &config).await.unwrap();

    TestApp {
        app: build_app(AppState::new(db.clone(), config)),
        db,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> Reply {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        Reply {
            status,
            headers,
            body,
        }
    }

    async fn call(&self, method: Method, path: &str, token: Option<&str>, body: Option<Value>) -> Reply {
        let mut builder = Request::builder()
            .method(method)
            .uri(format!("/api/v1{path}"));
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }

    async fn get(&self, path: &str, token: Option<&str>) -> Reply {
        self.call(Method::GET, path, token, None).await
    }

    async fn post(&self, path: &str, token: Option<&str>, body: Value) -> Reply {
        self.call(Method::POST, path, token, Some(body)).await
    }

    async fn register(&self, email: &str) -> Reply {
        self.post(
            "/auth/register",
            None,
            json!({ "email": email, "password": PASSWORD, "name": "Ada Obi" }),
        )
        .await
    }

    async fn login(&self, email: &str, password: &str) -> Reply {
        self.post("/auth/login", None, json!({ "email": email, "password": password }))
            .await
    }

    /// Registers a buyer and returns their access token.
    async fn buyer(&self, email: &str) -> String {
        let reply = self.register(email).await;
        assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
        token_of(&reply)
    }

    async fn admin(&self) -> String {
        let reply = self.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
        assert_eq!(reply.status, StatusCode::OK, "{}", reply.body);
        token_of(&reply)
    }

    async fn stock_of(&self, id: i64) -> i64 {
        self.db.products().get_by_id(id).await.unwrap().unwrap().stock
    }
}

fn token_of(reply: &Reply) -> String {
    reply.body["data"]["accessToken"].as_str().unwrap().to_string()
}

/// `refreshToken=...` pair from a response's `Set-Cookie`.
fn refresh_cookie_of(reply: &Reply) -> String {
    let cookie = reply.headers[header::SET_COOKIE].to_str().unwrap();
    cookie.split(';').next().unwrap().to_string()
}

fn checkout_body(items: Value) -> Value {
    json!({
        "items": items,
        "shippingAddress": {
            "fullName": "Ada Obi",
            "phone": "+234 803 000 0000",
            "street": "12 Allen Avenue",
            "city": "Ikeja",
            "state": "Lagos"
        },
        "paymentMethod": "pay_on_delivery"
    })
}

// =============================================================================
// Health & Auth
// =============================================================================

#[tokio::test]
async fn test_health() {
    let app = spawn().await;
    let reply = app.get("/health", None).await;

    assert_eq!(reply.status, StatusCode::OK);
    assert_eq!(reply.body["success"], true);
    assert_eq!(reply.body["data"]["database"], true);
}

#[tokio::test]
async fn test_register_login_and_me() {
    let app = spawn().await;

    let reply = app.register("Ada@Farmgate.ng").await;
    assert_eq!(reply.status, StatusCode::CREATED);
    assert_eq!(reply.body["data"]["user"]["email"], "ada@farmgate.ng");
    assert_eq!(reply.body["data"]["user"]["classification"], "retail");
    assert_eq!(reply.body["data"]["expiresIn"], 900);
    assert!(reply.body["data"].get("refreshToken").is_none());
    assert!(refresh_cookie_of(&reply).starts_with("refreshToken="));

    let wrong = app.login("ada@farmgate.ng", "not-the-password").await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong.body["success"], false);

    let reply = app.login("ada@farmgate.ng", PASSWORD).await;
    assert_eq!(reply.status, StatusCode::OK);
    let token = token_of(&reply);

    let me = app.get("/auth/me", Some(&token)).await;
    assert_eq!(me.status, StatusCode::OK);
    assert_eq!(me.body["data"]["name"], "Ada Obi");
    assert!(me.body["data"]["lastLogin"].is_string());

    let anonymous = app.get("/auth/me", None).await;
    assert_eq!(anonymous.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_rejects_duplicates_and_bad_input() {
    let app = spawn().await;
    app.buyer("ada@farmgate.ng").await;

    let duplicate = app.register("ada@farmgate.ng").await;
    assert_eq!(duplicate.status, StatusCode::CONFLICT);

    let short = app
        .post(
            "/auth/register",
            None,
            json!({ "email": "bola@farmgate.ng", "password": "short", "name": "Bola" }),
        )
        .await;
    assert_eq!(short.status, StatusCode::BAD_REQUEST);
    assert_eq!(short.body["errors"][0]["field"], "password");
}

#[tokio::test]
async fn test_refresh_rotates_and_rejects_replay() {
    let app = spawn().await;
    let registered = app.register("ada@farmgate.ng").await;
    let first_cookie = refresh_cookie_of(&registered);

    let refresh = |cookie: String| {
        Request::builder()
            .method(Method::POST)
            .uri("/api/v1/auth/refresh")
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    };

    let rotated = app.send(refresh(first_cookie.clone())).await;
    assert_eq!(rotated.status, StatusCode::OK, "{}", rotated.body);
    let second_cookie = refresh_cookie_of(&rotated);
    assert_ne!(first_cookie, second_cookie);

    let replayed = app.send(refresh(first_cookie)).await;
    assert_eq!(replayed.status, StatusCode::UNAUTHORIZED);

    let missing = app
        .send(
            Request::builder()
                .method(Method::POST)
                .uri("/api/v1/auth/refresh")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);

    // Logout revokes the current session too.
    let token = token_of(&rotated);
    let logout = app.call(Method::POST, "/auth/logout", Some(&token), None).await;
    assert_eq!(logout.status, StatusCode::OK);
    let after_logout = app.send(refresh(second_cookie)).await;
    assert_eq!(after_logout.status, StatusCode::UNAUTHORIZED);
}

// =============================================================================
// Catalog
// =============================================================================

#[tokio::test]
async fn test_products_and_availability() {
    let app = spawn().await;

    let list = app.get("/products", None).await;
    assert_eq!(list.status, StatusCode::OK);
    assert_eq!(list.body["data"].as_array().unwrap().len(), 2);

    let rice = app.get("/products/1", None).await;
    assert_eq!(rice.body["data"]["basePrice"], 7500);
    assert_eq!(rice.body["data"]["bulkTiers"].as_array().unwrap().len(), 2);

    let missing = app.get("/products/99", None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let enough = app.get("/products/2/availability?quantity=5", None).await;
    assert_eq!(enough.body["data"]["available"], true);
    let too_many = app.get("/products/2/availability?quantity=6", None).await;
    assert_eq!(too_many.body["data"]["available"], false);
    assert_eq!(too_many.body["data"]["currentStock"], 5);
    assert_eq!(app.stock_of(2).await, 5);
}

// =============================================================================
// Checkout
// =============================================================================

#[tokio::test]
async fn test_checkout_requires_login() {
    let app = spawn().await;
    let reply = app
        .post("/checkout", None, checkout_body(json!([{ "productId": 2, "quantity": 1 }])))
        .await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
    assert_eq!(app.stock_of(2).await, 5);
}

#[tokio::test]
async fn test_checkout_places_order() {
    let app = spawn().await;
    let token = app.buyer("ada@farmgate.ng").await;

    let reply = app
        .post(
            "/checkout",
            Some(&token),
            checkout_body(json!([{ "productId": 2, "quantity": 3 }])),
        )
        .await;

    assert_eq!(reply.status, StatusCode::CREATED, "{}", reply.body);
    let order = &reply.body["data"];
    assert_eq!(order["status"], "pending");
    assert_eq!(order["subtotal"], 3000);
    assert_eq!(order["shipping"], 2500);
    assert_eq!(order["tax"], 225);
    assert_eq!(order["total"], 5725);
    assert_eq!(app.stock_of(2).await, 2);

    let id = order["id"].as_str().unwrap();
    let mine = app.get("/orders", Some(&token)).await;
    assert_eq!(mine.body["data"].as_array().unwrap().len(), 1);
    let past_end = app.get("/orders?limit=10&offset=1", Some(&token)).await;
    assert_eq!(past_end.status, StatusCode::OK);
    assert!(past_end.body["data"].as_array().unwrap().is_empty());
    let fetched = app.get(&format!("/orders/{id}"), Some(&token)).await;
    assert_eq!(fetched.status, StatusCode::OK);

    let stranger = app.buyer("bola@farmgate.ng").await;
    let hidden = app.get(&format!("/orders/{id}"), Some(&stranger)).await;
    assert_eq!(hidden.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_checkout_insufficient_stock() {
    let app = spawn().await;
    let token = app.buyer("ada@farmgate.ng").await;

    let reply = app
        .post(
            "/checkout",
            Some(&token),
            checkout_body(json!([
                { "productId": 1, "quantity": 2 },
                { "productId": 2, "quantity": 6 }
            ])),
        )
        .await;

    assert_eq!(reply.status, StatusCode::CONFLICT);
    assert_eq!(reply.body["success"], false);
    let errors = reply.body["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["field"], "items.2");

    assert_eq!(app.stock_of(1).await, 100);
    assert_eq!(app.stock_of(2).await, 5);

    let empty = app.post("/checkout", Some(&token), checkout_body(json!([]))).await;
    assert_eq!(empty.status, StatusCode::BAD_REQUEST);
}

// =============================================================================
// Applications & Admin
// =============================================================================

#[tokio::test]
async fn test_admin_routes_refuse_buyers() {
    let app = spawn().await;
    let token = app.buyer("ada@farmgate.ng").await;

    let reply = app.get("/admin/applications", Some(&token)).await;
    assert_eq!(reply.status, StatusCode::FORBIDDEN);

    let reply = app.get("/admin/orders", None).await;
    assert_eq!(reply.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wholesale_approval_unlocks_tier_pricing() {
    let app = spawn().await;
    let token = app.buyer("ada@farmgate.ng").await;
    let admin = app.admin().await;

    let retail = app.get("/products/1/quote?quantity=60", Some(&token)).await;
    assert_eq!(retail.body["data"]["unitPrice"], 7500);
    assert!(retail.body["data"]["appliedTier"].is_null());

    let submitted = app
        .post(
            "/applications/wholesale",
            Some(&token),
            json!({ "businessName": "Obi Grains Ltd", "businessAddress": "4 Market Road, Aba" }),
        )
        .await;
    assert_eq!(submitted.status, StatusCode::CREATED, "{}", submitted.body);
    let id = submitted.body["data"]["id"].as_str().unwrap().to_string();

    let again = app
        .post(
            "/applications/wholesale",
            Some(&token),
            json!({ "businessName": "Obi Grains Ltd", "businessAddress": "4 Market Road, Aba" }),
        )
        .await;
    assert_eq!(again.status, StatusCode::CONFLICT);

    let queue = app.get("/admin/applications?status=pending", Some(&admin)).await;
    assert_eq!(queue.body["data"].as_array().unwrap().len(), 1);

    let approved = app
        .post(&format!("/admin/applications/{id}/approve"), Some(&admin), json!({ "notes": "ok" }))
        .await;
    assert_eq!(approved.status, StatusCode::OK, "{}", approved.body);
    assert_eq!(approved.body["data"]["status"], "approved");

    let twice = app
        .post(&format!("/admin/applications/{id}/approve"), Some(&admin), json!({}))
        .await;
    assert_eq!(twice.status, StatusCode::CONFLICT);

    // Same token as before: the quote reads the stored classification.
    let wholesale = app.get("/products/1/quote?quantity=60", Some(&token)).await;
    assert_eq!(wholesale.body["data"]["unitPrice"], 6000);
    assert_eq!(wholesale.body["data"]["lineTotal"], 360_000);

    let me = app.get("/auth/me", Some(&token)).await;
    assert_eq!(me.body["data"]["classification"], "wholesale_verified");
}

#[tokio::test]
async fn test_admin_restock_and_order_status() {
    let app = spawn().await;
    let token = app.buyer("ada@farmgate.ng").await;
    let admin = app.admin().await;

    let placed = app
        .post(
            "/checkout",
            Some(&token),
            checkout_body(json!([{ "productId": 2, "quantity": 5 }])),
        )
        .await;
    assert_eq!(placed.status, StatusCode::CREATED);
    let order_id = placed.body["data"]["id"].as_str().unwrap().to_string();

    let low = app.get("/admin/inventory/low-stock", Some(&admin)).await;
    assert_eq!(low.body["data"][0]["id"], 2);

    let subscribed = app.post("/products/2/subscribe", Some(&token), json!({})).await;
    assert_eq!(subscribed.status, StatusCode::OK);

    let restocked = app
        .post("/admin/inventory/2/restock", Some(&admin), json!({ "quantity": 20 }))
        .await;
    assert_eq!(restocked.status, StatusCode::OK, "{}", restocked.body);
    assert_eq!(restocked.body["data"]["record"]["previousStock"], 0);
    assert_eq!(restocked.body["data"]["record"]["newStock"], 20);
    assert_eq!(restocked.body["data"]["notifiedSubscribers"], 1);

    let history = app.get("/admin/inventory/2/history", Some(&admin)).await;
    assert_eq!(history.body["data"].as_array().unwrap().len(), 1);

    let mine = app.get("/notifications", Some(&token)).await;
    assert!(mine.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .any(|n| n["title"] == "Back in stock"));

    let advanced = app
        .call(
            Method::PUT,
            &format!("/admin/orders/{order_id}/status"),
            Some(&admin),
            Some(json!({ "status": "processing" })),
        )
        .await;
    assert_eq!(advanced.status, StatusCode::OK, "{}", advanced.body);
    assert_eq!(advanced.body["data"]["status"], "processing");

    let backwards = app
        .call(
            Method::PUT,
            &format!("/admin/orders/{order_id}/status"),
            Some(&admin),
            Some(json!({ "status": "pending" })),
        )
        .await;
    assert_eq!(backwards.status, StatusCode::CONFLICT);

    let feed = app.get("/admin/notifications", Some(&admin)).await;
    assert!(!feed.body["data"].as_array().unwrap().is_empty());
}
