//! HTTP route handlers for the Shelfwise API.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                    - Liveness
//! GET  /health/ready              - Readiness (database reachable)
//!
//! # Auth
//! POST /auth/register             - Register (rate limited)
//! POST /auth/login                - Login (rate limited)
//! POST /auth/logout               - Logout
//! GET  /auth/profile              - Current user
//!
//! # Catalog, people and places (list/create, get/update/delete)
//! /products  /brands  /vendors  /discounts
//! /customers /outlets /warehouses /users
//!
//! # Stock
//! GET  /stock                     - Lots
//! POST /stock                     - Receive a lot
//! GET  /stock/summary             - On-hand per product and location
//! POST /stock/transfer            - FIFO move between locations
//! GET  /stock/{id}                - Lot detail
//! DELETE /stock/{id}              - Delete an untouched lot
//!
//! # Sales and orders
//! GET  /sales, POST /sales, GET /sales/{id}
//! POST /sales/{id}/payments       - Collect due
//! GET  /orders, POST /orders, GET /orders/{id}
//! PUT  /orders/{id}/status        - Advance or cancel
//!
//! # Demands
//! GET  /demands, POST /demands, GET|DELETE /demands/{id}
//! PUT  /demands/{id}/status       - Approve, reject or fulfil
//! ```

pub mod auth;
pub mod brands;
pub mod customers;
pub mod demands;
pub mod discounts;
pub mod health;
pub mod locations;
pub mod orders;
pub mod products;
pub mod sales;
pub mod stock;
pub mod users;
pub mod vendors;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::config::AuthRateLimit;
use crate::error::AppError;
use crate::middleware::auth_rate_limiter;
use crate::state::AppState;

/// Create the auth routes router.
///
/// Login and registration sit behind the per-IP rate limiter.
pub fn auth_routes(limit: &AuthRateLimit) -> Router<AppState> {
    let limited = Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .layer(auth_rate_limiter(limit));

    Router::new()
        .route("/logout", post(auth::logout))
        .route("/profile", get(auth::profile))
        .merge(limited)
}

/// Create the REST resource routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(products::list).post(products::create))
        .route(
            "/products/{id}",
            get(products::get).put(products::update).delete(products::delete),
        )
        .route("/brands", get(brands::list).post(brands::create))
        .route(
            "/brands/{id}",
            get(brands::get).put(brands::update).delete(brands::delete),
        )
        .route("/vendors", get(vendors::list).post(vendors::create))
        .route(
            "/vendors/{id}",
            get(vendors::get).put(vendors::update).delete(vendors::delete),
        )
        .route("/discounts", get(discounts::list).post(discounts::create))
        .route(
            "/discounts/{id}",
            get(discounts::get)
                .put(discounts::update)
                .delete(discounts::delete),
        )
        .route("/customers", get(customers::list).post(customers::create))
        .route(
            "/customers/{id}",
            get(customers::get)
                .put(customers::update)
                .delete(customers::delete),
        )
        .route(
            "/outlets",
            get(locations::list_outlets).post(locations::create_outlet),
        )
        .route(
            "/outlets/{id}",
            get(locations::get_outlet)
                .put(locations::update_outlet)
                .delete(locations::delete_outlet),
        )
        .route(
            "/warehouses",
            get(locations::list_warehouses).post(locations::create_warehouse),
        )
        .route(
            "/warehouses/{id}",
            get(locations::get_warehouse)
                .put(locations::update_warehouse)
                .delete(locations::delete_warehouse),
        )
        .route("/users", get(users::list).post(users::create))
        .route(
            "/users/{id}",
            get(users::get).put(users::update).delete(users::delete),
        )
        .route("/stock", get(stock::list).post(stock::receive))
        .route("/stock/summary", get(stock::summary))
        .route("/stock/transfer", post(stock::transfer))
        .route("/stock/{id}", get(stock::get).delete(stock::delete))
        .route("/sales", get(sales::list).post(sales::create))
        .route("/sales/{id}", get(sales::get))
        .route("/sales/{id}/payments", post(sales::collect_payment))
        .route("/orders", get(orders::list).post(orders::create))
        .route("/orders/{id}", get(orders::get))
        .route("/orders/{id}/status", put(orders::update_status))
        .route("/demands", get(demands::list).post(demands::create))
        .route("/demands/{id}", get(demands::get).delete(demands::delete))
        .route("/demands/{id}/status", put(demands::update_status))
}

/// 404 for a missing record, named by kind and id.
pub(crate) fn not_found(what: &str, id: impl std::fmt::Display) -> AppError {
    AppError::NotFound(format!("{what} {id} not found"))
}

/// Session store failures are server errors.
pub(crate) fn session_error(err: &tower_sessions::session::Error) -> AppError {
    AppError::Internal(format!("session error: {err}"))
}
