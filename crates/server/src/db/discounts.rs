//! Discount code repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{PgConnection, PgPool};

use shelfwise_core::{DiscountId, DiscountKind};

use super::{Filter, ListSpec, RepositoryError};
use crate::models::Discount;
use crate::models::catalog::ActiveFilter;
use crate::response::ListQuery;

const DISCOUNT_COLUMNS: &str =
    "id, code, kind, value, is_active, starts_at, ends_at, created_at, updated_at";

const DISCOUNT_LIST: ListSpec = ListSpec {
    from: "discount",
    columns: DISCOUNT_COLUMNS,
    search_columns: &["code"],
    sort_columns: &[
        ("code", "code"),
        ("value", "value"),
        ("endsAt", "ends_at"),
        ("createdAt", "created_at"),
    ],
    default_sort: "created_at",
};

const DUPLICATE: &str = "discount code already exists";

/// Discount fields, already validated.
pub struct DiscountFields<'a> {
    pub code: &'a str,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

/// Repository for discount database operations.
pub struct DiscountRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DiscountRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        query: &ListQuery,
        filter: &ActiveFilter,
    ) -> Result<(Vec<Discount>, i64), RepositoryError> {
        let filters: Vec<Filter> = filter
            .is_active
            .map(|active| Filter::new("is_active", active))
            .into_iter()
            .collect();
        super::fetch_page(self.pool, &DISCOUNT_LIST, query, &filters).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: DiscountId) -> Result<Option<Discount>, RepositoryError> {
        let discount = sqlx::query_as::<_, Discount>(&format!(
            "SELECT {DISCOUNT_COLUMNS} FROM discount WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(discount)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the code is taken.
    pub async fn create(&self, fields: &DiscountFields<'_>) -> Result<Discount, RepositoryError> {
        sqlx::query_as::<_, Discount>(&format!(
            r"
            INSERT INTO discount (code, kind, value, is_active, starts_at, ends_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {DISCOUNT_COLUMNS}
            "
        ))
        .bind(fields.code)
        .bind(fields.kind)
        .bind(fields.value)
        .bind(fields.is_active)
        .bind(fields.starts_at)
        .bind(fields.ends_at)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, DUPLICATE))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the discount does not exist and
    /// `RepositoryError::Conflict` if the code is taken.
    pub async fn update(
        &self,
        id: DiscountId,
        fields: &DiscountFields<'_>,
    ) -> Result<Discount, RepositoryError> {
        sqlx::query_as::<_, Discount>(&format!(
            r"
            UPDATE discount
            SET code = $2, kind = $3, value = $4, is_active = $5, starts_at = $6,
                ends_at = $7, updated_at = NOW()
            WHERE id = $1
            RETURNING {DISCOUNT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(fields.code)
        .bind(fields.kind)
        .bind(fields.value)
        .bind(fields.is_active)
        .bind(fields.starts_at)
        .bind(fields.ends_at)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, DUPLICATE))?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the discount does not exist.
    pub async fn delete(&self, id: DiscountId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM discount WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Look up a discount by code (case-insensitive) on `conn`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn find_by_code(
    conn: &mut PgConnection,
    code: &str,
) -> Result<Option<Discount>, RepositoryError> {
    let discount = sqlx::query_as::<_, Discount>(&format!(
        "SELECT {DISCOUNT_COLUMNS} FROM discount WHERE LOWER(code) = LOWER($1)"
    ))
    .bind(code)
    .fetch_optional(conn)
    .await?;
    Ok(discount)
}
