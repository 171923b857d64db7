//! Integration tests for Shelfwise.
//!
//! # Running Tests
//!
//! ```bash
//! # Apply migrations and start the server against a scratch database
//! cargo run -p shelfwise-cli -- migrate
//! cargo run -p shelfwise-server
//!
//! # Run the ignored integration tests
//! cargo test -p shelfwise-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `SHELFWISE_TEST_URL` - Server under test (default: `http://localhost:3000`)
//! - `SHELFWISE_DATABASE_URL` - Same database the server uses; tests create
//!   their own users and records with unique names
//!
//! Tests hit one shared server, so the login rate limiter applies. Each test
//! sends its own `x-forwarded-for` address to get a separate bucket.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::str::FromStr;
use std::sync::atomic::{AtomicU8, Ordering};

use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use serde_json::{Value, json};
use sqlx::PgPool;
use uuid::Uuid;

use shelfwise_core::Role;
use shelfwise_server::models::user::CreateUserInput;
use shelfwise_server::services::AuthService;

/// Password given to every user the tests create.
pub const TEST_PASSWORD: &str = "integration-pass-1";

static NEXT_CLIENT_IP: AtomicU8 = AtomicU8::new(1);

/// Base URL of the server under test.
#[must_use]
pub fn base_url() -> String {
    std::env::var("SHELFWISE_TEST_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// Full URL for `path`.
#[must_use]
pub fn url(path: &str) -> String {
    format!("{}{path}", base_url())
}

/// Connect to the database the server under test uses.
pub async fn pool() -> PgPool {
    dotenvy::dotenv().ok();
    let database_url = shelfwise_server::config::get_database_url("SHELFWISE_DATABASE_URL")
        .expect("SHELFWISE_DATABASE_URL or DATABASE_URL must be set");
    PgPool::connect(database_url.expose_secret())
        .await
        .expect("Failed to connect to database")
}

/// A unique, lowercase token for names, emails and SKUs.
#[must_use]
pub fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

/// A cookie-keeping client with its own rate-limit bucket.
#[must_use]
pub fn client() -> Client {
    let ip = NEXT_CLIENT_IP.fetch_add(1, Ordering::Relaxed);
    let mut headers = HeaderMap::new();
    headers.insert(
        "x-forwarded-for",
        HeaderValue::from_str(&format!("198.18.{}.{ip}", std::process::id() % 250)).unwrap(),
    );
    Client::builder()
        .cookie_store(true)
        .default_headers(headers)
        .build()
        .expect("Failed to create HTTP client")
}

/// Create an active user directly in the database and return its email.
pub async fn create_user(pool: &PgPool, role: Role) -> String {
    let email = format!("{}@shelfwise.test", unique(&role.to_string()));
    let input = CreateUserInput {
        email: email.clone(),
        password: TEST_PASSWORD.to_string(),
        name: format!("Test {role}"),
        role,
        is_active: true,
    };
    AuthService::new(pool)
        .create_user(&input)
        .await
        .expect("Failed to create test user");
    email
}

/// A client logged in as a fresh user with `role`.
pub async fn login_as(pool: &PgPool, role: Role) -> Client {
    let email = create_user(pool, role).await;
    let client = client();
    let resp = client
        .post(url("/auth/login"))
        .json(&json!({ "email": email, "password": TEST_PASSWORD }))
        .send()
        .await
        .expect("Failed to log in");
    assert_eq!(resp.status(), reqwest::StatusCode::OK, "login as {role}");
    client
}

/// POST `body` and return `(status, envelope)`.
pub async fn post(client: &Client, path: &str, body: &Value) -> (reqwest::StatusCode, Value) {
    let resp = client.post(url(path)).json(body).send().await.unwrap();
    let status = resp.status();
    (status, resp.json().await.unwrap())
}

/// GET and return `(status, envelope)`.
pub async fn get(client: &Client, path: &str) -> (reqwest::StatusCode, Value) {
    let resp = client.get(url(path)).send().await.unwrap();
    let status = resp.status();
    (status, resp.json().await.unwrap())
}

/// Read a decimal-string money field.
#[must_use]
pub fn money(value: &Value) -> Decimal {
    Decimal::from_str(value.as_str().expect("money is a string")).unwrap()
}

/// Create a warehouse and a product priced at `price`; returns their ids.
pub async fn warehouse_and_product(admin: &Client, price: i64) -> (i64, i64) {
    let (status, warehouse) = post(admin, "/warehouses", &json!({ "name": unique("wh") })).await;
    assert!(status.is_success(), "{warehouse}");

    let (status, product) = post(
        admin,
        "/products",
        &json!({ "name": unique("product"), "sku": unique("SKU"), "unitPrice": price.to_string() }),
    )
    .await;
    assert!(status.is_success(), "{product}");

    (
        warehouse["data"]["id"].as_i64().unwrap(),
        product["data"]["id"].as_i64().unwrap(),
    )
}

/// Receive `quantity` units of `product` into `warehouse`.
pub async fn receive(admin: &Client, warehouse: i64, product: i64, quantity: i32, entry_date: &str) -> i64 {
    let (status, lot) = post(
        admin,
        "/stock",
        &json!({
            "productId": product,
            "location": { "kind": "warehouse", "id": warehouse },
            "quantity": quantity,
            "unitCost": "10.00",
            "entryDate": entry_date,
        }),
    )
    .await;
    assert!(status.is_success(), "{lot}");
    lot["data"]["id"].as_i64().unwrap()
}
