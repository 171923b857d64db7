//! Warehouse and outlet repository.

use sqlx::{PgConnection, PgPool};

use shelfwise_core::{LocationKind, LocationRef, OutletId, WarehouseId};

use super::{Filter, ListSpec, RepositoryError};
use crate::models::catalog::ActiveFilter;
use crate::models::{Outlet, Warehouse};
use crate::response::ListQuery;

const WAREHOUSE_COLUMNS: &str = "id, name, address, phone, is_active, created_at, updated_at";
const OUTLET_COLUMNS: &str = "id, name, code, address, phone, is_active, created_at, updated_at";

const WAREHOUSE_LIST: ListSpec = ListSpec {
    from: "warehouse",
    columns: WAREHOUSE_COLUMNS,
    search_columns: &["name", "address", "phone"],
    sort_columns: &[("name", "name"), ("createdAt", "created_at")],
    default_sort: "created_at",
};

const OUTLET_LIST: ListSpec = ListSpec {
    from: "outlet",
    columns: OUTLET_COLUMNS,
    search_columns: &["name", "code", "address", "phone"],
    sort_columns: &[("name", "name"), ("code", "code"), ("createdAt", "created_at")],
    default_sort: "created_at",
};

/// Warehouse fields, already validated.
pub struct WarehouseFields<'a> {
    pub name: &'a str,
    pub address: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub is_active: bool,
}

/// Outlet fields, already validated.
pub struct OutletFields<'a> {
    pub name: &'a str,
    pub code: &'a str,
    pub address: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub is_active: bool,
}

/// Repository for warehouses and outlets.
pub struct LocationRepository<'a> {
    pool: &'a PgPool,
}

fn active_filter(filter: &ActiveFilter) -> Vec<Filter> {
    filter
        .is_active
        .map(|active| Filter::new("is_active", active))
        .into_iter()
        .collect()
}

impl<'a> LocationRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    // -------------------------------------------------------------------------
    // Warehouses
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_warehouses(
        &self,
        query: &ListQuery,
        filter: &ActiveFilter,
    ) -> Result<(Vec<Warehouse>, i64), RepositoryError> {
        super::fetch_page(self.pool, &WAREHOUSE_LIST, query, &active_filter(filter)).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_warehouse(&self, id: WarehouseId) -> Result<Option<Warehouse>, RepositoryError> {
        let warehouse = sqlx::query_as::<_, Warehouse>(&format!(
            "SELECT {WAREHOUSE_COLUMNS} FROM warehouse WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(warehouse)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create_warehouse(
        &self,
        fields: &WarehouseFields<'_>,
    ) -> Result<Warehouse, RepositoryError> {
        let warehouse = sqlx::query_as::<_, Warehouse>(&format!(
            r"
            INSERT INTO warehouse (name, address, phone, is_active)
            VALUES ($1, $2, $3, $4)
            RETURNING {WAREHOUSE_COLUMNS}
            "
        ))
        .bind(fields.name)
        .bind(fields.address)
        .bind(fields.phone)
        .bind(fields.is_active)
        .fetch_one(self.pool)
        .await?;
        Ok(warehouse)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the warehouse does not exist.
    pub async fn update_warehouse(
        &self,
        id: WarehouseId,
        fields: &WarehouseFields<'_>,
    ) -> Result<Warehouse, RepositoryError> {
        sqlx::query_as::<_, Warehouse>(&format!(
            r"
            UPDATE warehouse
            SET name = $2, address = $3, phone = $4, is_active = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING {WAREHOUSE_COLUMNS}
            "
        ))
        .bind(id)
        .bind(fields.name)
        .bind(fields.address)
        .bind(fields.phone)
        .bind(fields.is_active)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete a warehouse that holds no stock history.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the warehouse does not exist and
    /// `RepositoryError::Conflict` while lots or demands reference it.
    pub async fn delete_warehouse(&self, id: WarehouseId) -> Result<(), RepositoryError> {
        self.delete_location(LocationRef::warehouse(id)).await
    }

    // -------------------------------------------------------------------------
    // Outlets
    // -------------------------------------------------------------------------

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_outlets(
        &self,
        query: &ListQuery,
        filter: &ActiveFilter,
    ) -> Result<(Vec<Outlet>, i64), RepositoryError> {
        super::fetch_page(self.pool, &OUTLET_LIST, query, &active_filter(filter)).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_outlet(&self, id: OutletId) -> Result<Option<Outlet>, RepositoryError> {
        let outlet = sqlx::query_as::<_, Outlet>(&format!(
            "SELECT {OUTLET_COLUMNS} FROM outlet WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(outlet)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the outlet code is taken.
    pub async fn create_outlet(&self, fields: &OutletFields<'_>) -> Result<Outlet, RepositoryError> {
        sqlx::query_as::<_, Outlet>(&format!(
            r"
            INSERT INTO outlet (name, code, address, phone, is_active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {OUTLET_COLUMNS}
            "
        ))
        .bind(fields.name)
        .bind(fields.code)
        .bind(fields.address)
        .bind(fields.phone)
        .bind(fields.is_active)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "outlet code already exists"))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the outlet does not exist and
    /// `RepositoryError::Conflict` if the outlet code is taken.
    pub async fn update_outlet(
        &self,
        id: OutletId,
        fields: &OutletFields<'_>,
    ) -> Result<Outlet, RepositoryError> {
        sqlx::query_as::<_, Outlet>(&format!(
            r"
            UPDATE outlet
            SET name = $2, code = $3, address = $4, phone = $5, is_active = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {OUTLET_COLUMNS}
            "
        ))
        .bind(id)
        .bind(fields.name)
        .bind(fields.code)
        .bind(fields.address)
        .bind(fields.phone)
        .bind(fields.is_active)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "outlet code already exists"))?
        .ok_or(RepositoryError::NotFound)
    }

    /// Delete an outlet with no stock or sales history.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the outlet does not exist and
    /// `RepositoryError::Conflict` while lots, documents or demands reference it.
    pub async fn delete_outlet(&self, id: OutletId) -> Result<(), RepositoryError> {
        self.delete_location(LocationRef::outlet(id)).await
    }

    /// Lots and documents point at locations without a foreign key, so the
    /// reference check is explicit and runs in the same transaction as the delete.
    async fn delete_location(&self, location: LocationRef) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let table = table_for(location.kind);
        sqlx::query(&format!("SELECT id FROM {table} WHERE id = $1 FOR UPDATE"))
            .bind(location.id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepositoryError::NotFound)?;

        let referenced = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS (
                SELECT 1 FROM stock_lot WHERE location_kind = $1 AND location_id = $2
                UNION ALL
                SELECT 1 FROM sales_document WHERE location_kind = $1 AND location_id = $2
            )
            ",
        )
        .bind(location.kind)
        .bind(location.id)
        .fetch_one(&mut *tx)
        .await?;

        if referenced {
            return Err(RepositoryError::Conflict(
                "record is referenced by other records".to_owned(),
            ));
        }

        sqlx::query(&format!("DELETE FROM {table} WHERE id = $1"))
            .bind(location.id)
            .execute(&mut *tx)
            .await
            .map_err(|e| RepositoryError::from_write(e, "location"))?;

        tx.commit().await?;
        Ok(())
    }
}

const fn table_for(kind: LocationKind) -> &'static str {
    match kind {
        LocationKind::Warehouse => "warehouse",
        LocationKind::Outlet => "outlet",
    }
}

/// Whether `location` exists and is active, checked on `conn`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn is_active(
    conn: &mut PgConnection,
    location: LocationRef,
) -> Result<bool, RepositoryError> {
    let table = table_for(location.kind);
    let active = sqlx::query_scalar::<_, bool>(&format!(
        "SELECT EXISTS (SELECT 1 FROM {table} WHERE id = $1 AND is_active)"
    ))
    .bind(location.id)
    .fetch_one(conn)
    .await?;
    Ok(active)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_for_kind() {
        assert_eq!(table_for(LocationKind::Warehouse), "warehouse");
        assert_eq!(table_for(LocationKind::Outlet), "outlet");
    }
}
