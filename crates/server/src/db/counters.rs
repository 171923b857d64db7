//! Daily-reset document counters.
//!
//! One row per `(scope, date_key)`. The increment is a single upsert, so
//! concurrent callers for the same day serialize on the row lock and each gets
//! a distinct value. Running it on the caller's transaction means a rolled-back
//! sale gives its number back.

use sqlx::PgConnection;

use super::RepositoryError;

/// Atomically increment and return the counter for `scope` on `date_key`,
/// starting at 1 for a new day.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the upsert fails; the caller's
/// transaction is then aborted.
pub async fn next_sequence(
    conn: &mut PgConnection,
    scope: &str,
    date_key: &str,
) -> Result<i64, RepositoryError> {
    let seq = sqlx::query_scalar::<_, i64>(
        r"
        INSERT INTO document_counter (scope, date_key, seq)
        VALUES ($1, $2, 1)
        ON CONFLICT (scope, date_key)
        DO UPDATE SET seq = document_counter.seq + 1
        RETURNING seq
        ",
    )
    .bind(scope)
    .bind(date_key)
    .fetch_one(conn)
    .await?;

    Ok(seq)
}
