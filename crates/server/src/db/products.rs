//! Product repository.

use sqlx::{FromRow, PgConnection, PgPool};

use shelfwise_core::{BrandId, Money, ProductId, VendorId};

use super::{Filter, ListSpec, RepositoryError};
use crate::models::Product;
use crate::models::catalog::ProductFilter;
use crate::response::ListQuery;

const PRODUCT_COLUMNS: &str = "id, name, sku, barcode, brand_id, vendor_id, unit_price, \
                               reorder_level, is_active, created_at, updated_at";

const PRODUCT_LIST: ListSpec = ListSpec {
    from: "product",
    columns: PRODUCT_COLUMNS,
    search_columns: &["name", "sku", "barcode"],
    sort_columns: &[
        ("name", "name"),
        ("sku", "sku"),
        ("unitPrice", "unit_price"),
        ("createdAt", "created_at"),
    ],
    default_sort: "created_at",
};

const DUPLICATE: &str = "SKU already exists";

/// Product fields, already validated.
pub struct ProductFields<'a> {
    pub name: &'a str,
    pub sku: &'a str,
    pub barcode: Option<&'a str>,
    pub brand_id: Option<BrandId>,
    pub vendor_id: Option<VendorId>,
    pub unit_price: Money,
    pub reorder_level: Option<i32>,
    pub is_active: bool,
}

/// The current selling price of a product, read inside a sale or order.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct ProductPrice {
    pub id: ProductId,
    pub unit_price: Money,
    pub is_active: bool,
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
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
        filter: &ProductFilter,
    ) -> Result<(Vec<Product>, i64), RepositoryError> {
        let mut filters = Vec::new();
        if let Some(brand_id) = filter.brand_id {
            filters.push(Filter::new("brand_id", brand_id));
        }
        if let Some(vendor_id) = filter.vendor_id {
            filters.push(Filter::new("vendor_id", vendor_id));
        }
        if let Some(is_active) = filter.is_active {
            filters.push(Filter::new("is_active", is_active));
        }
        super::fetch_page(self.pool, &PRODUCT_LIST, query, &filters).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        get_on(&mut conn, id).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the SKU is taken or the brand or
    /// vendor does not exist.
    pub async fn create(&self, fields: &ProductFields<'_>) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            r"
            INSERT INTO product
                (name, sku, barcode, brand_id, vendor_id, unit_price, reorder_level, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(fields.name)
        .bind(fields.sku)
        .bind(fields.barcode)
        .bind(fields.brand_id)
        .bind(fields.vendor_id)
        .bind(fields.unit_price)
        .bind(fields.reorder_level)
        .bind(fields.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, DUPLICATE))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist and
    /// `RepositoryError::Conflict` if the SKU is taken.
    pub async fn update(
        &self,
        id: ProductId,
        fields: &ProductFields<'_>,
    ) -> Result<Product, RepositoryError> {
        sqlx::query_as::<_, Product>(&format!(
            r"
            UPDATE product
            SET name = $2, sku = $3, barcode = $4, brand_id = $5, vendor_id = $6,
                unit_price = $7, reorder_level = $8, is_active = $9, updated_at = NOW()
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(id)
        .bind(fields.name)
        .bind(fields.sku)
        .bind(fields.barcode)
        .bind(fields.brand_id)
        .bind(fields.vendor_id)
        .bind(fields.unit_price)
        .bind(fields.reorder_level)
        .bind(fields.is_active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, DUPLICATE))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a product that has never been stocked or sold.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product does not exist and
    /// `RepositoryError::Conflict` while lots or document lines reference it.
    pub async fn delete(&self, id: ProductId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM product WHERE id = $1")
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

/// Get a product on `conn`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_on(
    conn: &mut PgConnection,
    id: ProductId,
) -> Result<Option<Product>, RepositoryError> {
    let product = sqlx::query_as::<_, Product>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM product WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(product)
}

/// Current prices for `ids`. Missing products are simply absent from the result.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn prices(
    conn: &mut PgConnection,
    ids: &[ProductId],
) -> Result<Vec<ProductPrice>, RepositoryError> {
    let ids: Vec<i32> = ids.iter().map(ProductId::as_i32).collect();
    let rows = sqlx::query_as::<_, ProductPrice>(
        "SELECT id, unit_price, is_active FROM product WHERE id = ANY($1)",
    )
    .bind(ids)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}
