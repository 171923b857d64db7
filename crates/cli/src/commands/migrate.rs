//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! shelfwise migrate
//! ```
//!
//! # Environment Variables
//!
//! - `SHELFWISE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! # Migration Files
//!
//! Application migrations live in `crates/server/migrations/`. The session
//! table (`tower_sessions.session`) is created by the session store itself.

use tower_sessions_sqlx_store::PostgresStore;

/// Apply application migrations, then the session-store migration.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    tracing::info!("Running application migrations...");
    sqlx::migrate!("../server/migrations").run(&pool).await?;

    tracing::info!("Running session store migration...");
    PostgresStore::new(pool.clone()).migrate().await?;

    tracing::info!("Migrations complete!");
    Ok(())
}
