//! CLI command implementations.

pub mod migrate;
pub mod user;

use secrecy::ExposeSecret;
use sqlx::PgPool;

/// Connect using `SHELFWISE_DATABASE_URL` (or `DATABASE_URL`).
async fn connect() -> Result<PgPool, Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = shelfwise_server::config::get_database_url("SHELFWISE_DATABASE_URL")?;

    tracing::info!("Connecting to database...");
    Ok(PgPool::connect(database_url.expose_secret()).await?)
}
