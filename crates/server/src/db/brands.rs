//! Brand repository.

use sqlx::PgPool;

use shelfwise_core::BrandId;

use super::{ListSpec, RepositoryError};
use crate::models::Brand;
use crate::response::ListQuery;

const BRAND_COLUMNS: &str = "id, name, description, created_at, updated_at";

const BRAND_LIST: ListSpec = ListSpec {
    from: "brand",
    columns: BRAND_COLUMNS,
    search_columns: &["name"],
    sort_columns: &[("name", "name"), ("createdAt", "created_at")],
    default_sort: "created_at",
};

const DUPLICATE: &str = "brand name already exists";

/// Repository for brand database operations.
pub struct BrandRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> BrandRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, query: &ListQuery) -> Result<(Vec<Brand>, i64), RepositoryError> {
        super::fetch_page(self.pool, &BRAND_LIST, query, &[]).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: BrandId) -> Result<Option<Brand>, RepositoryError> {
        let brand = sqlx::query_as::<_, Brand>(&format!(
            "SELECT {BRAND_COLUMNS} FROM brand WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(brand)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the name is taken.
    pub async fn create(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Brand, RepositoryError> {
        sqlx::query_as::<_, Brand>(&format!(
            "INSERT INTO brand (name, description) VALUES ($1, $2) RETURNING {BRAND_COLUMNS}"
        ))
        .bind(name)
        .bind(description)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, DUPLICATE))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the brand does not exist and
    /// `RepositoryError::Conflict` if the name is taken.
    pub async fn update(
        &self,
        id: BrandId,
        name: &str,
        description: Option<&str>,
    ) -> Result<Brand, RepositoryError> {
        sqlx::query_as::<_, Brand>(&format!(
            r"
            UPDATE brand SET name = $2, description = $3, updated_at = NOW()
            WHERE id = $1
            RETURNING {BRAND_COLUMNS}
            "
        ))
        .bind(id)
        .bind(name)
        .bind(description)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, DUPLICATE))?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the brand does not exist and
    /// `RepositoryError::Conflict` while products still reference it.
    pub async fn delete(&self, id: BrandId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM brand WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| RepositoryError::from_write(e, DUPLICATE))?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
