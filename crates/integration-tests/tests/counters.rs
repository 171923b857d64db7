//! Concurrency tests for the daily document counter.
//!
//! Requires a migrated `PostgreSQL` database (no server needed).
//!
//! Run with: cargo test -p shelfwise-integration-tests -- --ignored

use std::collections::BTreeSet;

use shelfwise_integration_tests::{pool, unique};
use shelfwise_server::db::counters::next_sequence;

#[tokio::test]
#[ignore = "Requires database"]
async fn test_concurrent_counter_yields_each_number_once() {
    const N: i64 = 40;

    let pool = pool().await;
    let scope = unique("test-scope");

    let mut tasks = Vec::new();
    for _ in 0..N {
        let pool = pool.clone();
        let scope = scope.clone();
        tasks.push(tokio::spawn(async move {
            let mut conn = pool.acquire().await.unwrap();
            next_sequence(&mut conn, &scope, "261019").await.unwrap()
        }));
    }

    let mut seen = BTreeSet::new();
    for task in tasks {
        seen.insert(task.await.unwrap());
    }

    assert_eq!(seen, (1..=N).collect::<BTreeSet<_>>());
}

#[tokio::test]
#[ignore = "Requires database"]
async fn test_counter_resets_per_day() {
    let pool = pool().await;
    let scope = unique("test-scope");
    let mut conn = pool.acquire().await.unwrap();

    assert_eq!(next_sequence(&mut conn, &scope, "261019").await.unwrap(), 1);
    assert_eq!(next_sequence(&mut conn, &scope, "261019").await.unwrap(), 2);
    assert_eq!(next_sequence(&mut conn, &scope, "261020").await.unwrap(), 1);
}
