//! Integration tests for authentication and the role gate.
//!
//! These tests require:
//! - A migrated `PostgreSQL` database
//! - The server running (cargo run -p shelfwise-server)
//!
//! Run with: cargo test -p shelfwise-integration-tests -- --ignored

use reqwest::StatusCode;
use serde_json::json;

use shelfwise_core::Role;
use shelfwise_integration_tests::{
    TEST_PASSWORD, client, get, login_as, pool, post, unique, url,
};

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_protected_route_requires_session() {
    let (status, body) = get(&client(), "/products").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_staff_cannot_receive_stock() {
    let pool = pool().await;
    let staff = login_as(&pool, Role::Staff).await;

    let (status, _) = get(&staff, "/products").await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = post(
        &staff,
        "/stock",
        &json!({
            "productId": 1,
            "location": { "kind": "warehouse", "id": 1 },
            "quantity": 1,
            "unitCost": "1.00"
        }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "forbidden");
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_duplicate_registration_is_conflict() {
    let local = unique("dup");
    let email = format!("{local}@shelfwise.test");
    let body = json!({ "email": email, "password": TEST_PASSWORD, "name": "Dup" });

    let (status, _) = post(&client(), "/auth/register", &body).await;
    assert_eq!(status, StatusCode::CREATED);

    let shouted = json!({
        "email": email.to_uppercase(),
        "password": TEST_PASSWORD,
        "name": "Dup Again"
    });
    let (status, body) = post(&client(), "/auth/register", &shouted).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "conflict");
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_self_registered_user_waits_for_activation() {
    // The test database already has users, so this account starts inactive.
    let pool = pool().await;
    let _admin = login_as(&pool, Role::Admin).await;

    let email = format!("{}@shelfwise.test", unique("pending"));
    let client = client();
    let (status, body) = post(
        &client,
        "/auth/register",
        &json!({ "email": email, "password": TEST_PASSWORD, "name": "Pending" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["isActive"], false);
    assert_eq!(body["data"]["role"], "staff");

    let (status, body) = post(
        &client,
        "/auth/login",
        &json!({ "email": email, "password": TEST_PASSWORD }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "account_inactive");
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_admin_cannot_demote_self() {
    let pool = pool().await;
    let admin = login_as(&pool, Role::Admin).await;

    let (_, profile) = get(&admin, "/auth/profile").await;
    let me = profile["data"]["id"].as_i64().unwrap();

    let resp = admin
        .put(url(&format!("/users/{me}")))
        .json(&json!({ "role": "staff" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
#[ignore = "Requires running server and database"]
async fn test_logout_ends_session() {
    let pool = pool().await;
    let staff = login_as(&pool, Role::Staff).await;

    let (status, _) = get(&staff, "/auth/profile").await;
    assert_eq!(status, StatusCode::OK);

    let resp = staff.post(url("/auth/logout")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let (status, _) = get(&staff, "/auth/profile").await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
