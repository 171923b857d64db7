//! Integration tests for FIFO allocation and sale finalization.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database
//! - The server running (cargo run -p shelfwise-server)
//!
//! Run with: cargo test -p shelfwise-integration-tests -- --ignored

use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde_json::json;

use shelfwise_core::Role;
use shelfwise_integration_tests::{
    get, login_as, money, pool, post, receive, warehouse_and_product,
};

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_sale_draws_oldest_lots_first() {
    let pool = pool().await;
    let admin = login_as(&pool, Role::Admin).await;
    let (warehouse, product) = warehouse_and_product(&admin, 100).await;

    let newer = receive(&admin, warehouse, product, 5, "2026-10-02T09:00:00Z").await;
    let older = receive(&admin, warehouse, product, 3, "2026-10-01T09:00:00Z").await;

    let (status, sale) = post(
        &admin,
        "/sales",
        &json!({
            "location": { "kind": "warehouse", "id": warehouse },
            "items": [{ "productId": product, "quantity": 4 }],
            "payments": [{ "method": "cash", "amount": "400.00" }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{sale}");

    let allocations = &sale["data"]["lines"][0]["allocations"];
    assert_eq!(allocations[0]["lotId"].as_i64(), Some(older));
    assert_eq!(allocations[0]["quantity"], 3);
    assert_eq!(allocations[1]["lotId"].as_i64(), Some(newer));
    assert_eq!(allocations[1]["quantity"], 1);
    assert!(sale["data"]["number"].as_str().unwrap().starts_with("SL"));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_insufficient_stock_changes_nothing() {
    let pool = pool().await;
    let admin = login_as(&pool, Role::Admin).await;
    let (warehouse, product) = warehouse_and_product(&admin, 10).await;

    let lot = receive(&admin, warehouse, product, 2, "2026-10-01T09:00:00Z").await;

    let (status, body) = post(
        &admin,
        "/sales",
        &json!({
            "location": { "kind": "warehouse", "id": warehouse },
            "items": [{ "productId": product, "quantity": 5 }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "insufficient_stock");

    let (_, lot) = get(&admin, &format!("/stock/{lot}")).await;
    assert_eq!(lot["data"]["quantity"], 2);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_totals_discount_and_due() {
    let pool = pool().await;
    let admin = login_as(&pool, Role::Admin).await;
    let (warehouse, tea) = warehouse_and_product(&admin, 100).await;
    let (_, cups) = warehouse_and_product(&admin, 50).await;

    receive(&admin, warehouse, tea, 2, "2026-10-01T09:00:00Z").await;
    receive(&admin, warehouse, cups, 1, "2026-10-01T09:00:00Z").await;

    let (status, sale) = post(
        &admin,
        "/sales",
        &json!({
            "location": { "kind": "warehouse", "id": warehouse },
            "items": [
                { "productId": tea, "quantity": 2 },
                { "productId": cups, "quantity": 1 }
            ],
            "discount": "20",
            "payments": [{ "method": "card", "amount": "200" }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{sale}");

    let data = &sale["data"];
    assert_eq!(money(&data["subtotal"]), Decimal::from(250));
    assert_eq!(money(&data["total"]), Decimal::from(230));
    assert_eq!(money(&data["due"]), Decimal::from(30));
    assert_eq!(data["paymentStatus"], "partial");
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_failed_later_line_rolls_back_earlier_lines() {
    let pool = pool().await;
    let admin = login_as(&pool, Role::Admin).await;
    let (warehouse, tea) = warehouse_and_product(&admin, 20).await;
    let (_, cups) = warehouse_and_product(&admin, 5).await;

    let tea_lot = receive(&admin, warehouse, tea, 5, "2026-10-01T09:00:00Z").await;
    let cups_lot = receive(&admin, warehouse, cups, 1, "2026-10-01T09:00:00Z").await;

    let (status, body) = post(
        &admin,
        "/sales",
        &json!({
            "location": { "kind": "warehouse", "id": warehouse },
            "items": [
                { "productId": tea, "quantity": 2 },
                { "productId": cups, "quantity": 5 }
            ]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["error"], "insufficient_stock");
    assert!(
        body["message"].as_str().unwrap().starts_with("line 1:"),
        "{body}"
    );

    let (_, lot) = get(&admin, &format!("/stock/{tea_lot}")).await;
    assert_eq!(lot["data"]["quantity"], 5);
    let (_, lot) = get(&admin, &format!("/stock/{cups_lot}")).await;
    assert_eq!(lot["data"]["quantity"], 1);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_concurrent_sales_in_opposite_line_order_all_succeed() {
    let pool = pool().await;
    let admin = login_as(&pool, Role::Admin).await;
    let (warehouse, tea) = warehouse_and_product(&admin, 20).await;
    let (_, cups) = warehouse_and_product(&admin, 5).await;

    let sales = 20;
    let tea_lot = receive(&admin, warehouse, tea, sales, "2026-10-01T09:00:00Z").await;
    let cups_lot = receive(&admin, warehouse, cups, sales, "2026-10-01T09:00:00Z").await;

    let mut handles = Vec::new();
    for n in 0..sales {
        let client = login_as(&pool, Role::Staff).await;
        let items = if n % 2 == 0 {
            json!([{ "productId": tea, "quantity": 1 }, { "productId": cups, "quantity": 1 }])
        } else {
            json!([{ "productId": cups, "quantity": 1 }, { "productId": tea, "quantity": 1 }])
        };
        handles.push(tokio::spawn(async move {
            post(
                &client,
                "/sales",
                &json!({
                    "location": { "kind": "warehouse", "id": warehouse },
                    "items": items,
                    "payments": [{ "method": "cash", "amount": "25.00" }]
                }),
            )
            .await
        }));
    }

    for handle in handles {
        let (status, body) = handle.await.unwrap();
        assert_eq!(status, StatusCode::CREATED, "{body}");
    }

    for lot in [tea_lot, cups_lot] {
        let (_, lot) = get(&admin, &format!("/stock/{lot}")).await;
        assert_eq!(lot["data"]["quantity"], 0);
    }
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_sub_cent_amounts_are_rounded() {
    let pool = pool().await;
    let admin = login_as(&pool, Role::Admin).await;
    let (warehouse, tea) = warehouse_and_product(&admin, 100).await;
    receive(&admin, warehouse, tea, 1, "2026-10-01T09:00:00Z").await;

    let (status, sale) = post(
        &admin,
        "/sales",
        &json!({
            "location": { "kind": "warehouse", "id": warehouse },
            "items": [{ "productId": tea, "quantity": 1 }],
            "discount": "20.005",
            "payments": [{ "method": "card", "amount": "0.004" }]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{sale}");

    let data = &sale["data"];
    assert_eq!(money(&data["discount"]), Decimal::new(2001, 2));
    assert_eq!(money(&data["total"]), Decimal::new(7999, 2));
    assert_eq!(money(&data["paid"]), Decimal::ZERO);
    assert_eq!(money(&data["due"]), Decimal::new(7999, 2));
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_oversized_payment_is_rejected() {
    let pool = pool().await;
    let admin = login_as(&pool, Role::Admin).await;
    let (warehouse, tea) = warehouse_and_product(&admin, 10).await;
    receive(&admin, warehouse, tea, 1, "2026-10-01T09:00:00Z").await;

    let (status, body) = post(
        &admin,
        "/sales",
        &json!({
            "location": { "kind": "warehouse", "id": warehouse },
            "items": [{ "productId": tea, "quantity": 1 }],
            "payments": [
                { "method": "cash", "amount": "79228162514264337593543950335" },
                { "method": "cash", "amount": "79228162514264337593543950335" }
            ]
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(body["error"], "validation_error");
}
