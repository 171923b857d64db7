//! Demand repository.

use sqlx::{PgConnection, PgPool};

use shelfwise_core::{DemandId, DemandStatus, OutletId, ProductId, UserId, WarehouseId};

use super::{Filter, ListSpec, RepositoryError};
use crate::models::Demand;
use crate::models::demand::DemandFilter;
use crate::response::ListQuery;

const DEMAND_COLUMNS: &str = "id, outlet_id, warehouse_id, product_id, quantity, status, note, \
                              requested_by, decided_by, created_at, updated_at";

const DEMAND_LIST: ListSpec = ListSpec {
    from: "demand",
    columns: DEMAND_COLUMNS,
    search_columns: &["note"],
    sort_columns: &[
        ("quantity", "quantity"),
        ("status", "status"),
        ("createdAt", "created_at"),
    ],
    default_sort: "created_at",
};

/// Values for a new demand.
pub struct NewDemand<'a> {
    pub outlet_id: OutletId,
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub note: Option<&'a str>,
    pub requested_by: UserId,
}

/// Read-side repository for demands.
pub struct DemandRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DemandRepository<'a> {
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
        filter: &DemandFilter,
    ) -> Result<(Vec<Demand>, i64), RepositoryError> {
        let mut filters = Vec::new();
        if let Some(outlet_id) = filter.outlet_id {
            filters.push(Filter::new("outlet_id", outlet_id));
        }
        if let Some(warehouse_id) = filter.warehouse_id {
            filters.push(Filter::new("warehouse_id", warehouse_id));
        }
        if let Some(product_id) = filter.product_id {
            filters.push(Filter::new("product_id", product_id));
        }
        if let Some(status) = filter.status {
            filters.push(Filter::new("status", status));
        }
        super::fetch_page(self.pool, &DEMAND_LIST, query, &filters).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: DemandId) -> Result<Option<Demand>, RepositoryError> {
        let demand = sqlx::query_as::<_, Demand>(&format!(
            "SELECT {DEMAND_COLUMNS} FROM demand WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(demand)
    }
}

/// Insert a pending demand.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the insert fails.
pub async fn insert(conn: &mut PgConnection, new: &NewDemand<'_>) -> Result<Demand, RepositoryError> {
    sqlx::query_as::<_, Demand>(&format!(
        r"
        INSERT INTO demand (outlet_id, warehouse_id, product_id, quantity, note, requested_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {DEMAND_COLUMNS}
        "
    ))
    .bind(new.outlet_id)
    .bind(new.warehouse_id)
    .bind(new.product_id)
    .bind(new.quantity)
    .bind(new.note)
    .bind(new.requested_by)
    .fetch_one(conn)
    .await
    .map_err(|e| RepositoryError::from_write(e, "demand"))
}

/// Lock a demand for a status change or deletion.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock(conn: &mut PgConnection, id: DemandId) -> Result<Option<Demand>, RepositoryError> {
    let demand = sqlx::query_as::<_, Demand>(&format!(
        "SELECT {DEMAND_COLUMNS} FROM demand WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(demand)
}

/// Record a decision on a demand.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the demand does not exist.
pub async fn update_status(
    conn: &mut PgConnection,
    id: DemandId,
    status: DemandStatus,
    decided_by: UserId,
) -> Result<Demand, RepositoryError> {
    sqlx::query_as::<_, Demand>(&format!(
        r"
        UPDATE demand SET status = $2, decided_by = $3, updated_at = NOW()
        WHERE id = $1
        RETURNING {DEMAND_COLUMNS}
        "
    ))
    .bind(id)
    .bind(status)
    .bind(decided_by)
    .fetch_optional(conn)
    .await?
    .ok_or(RepositoryError::NotFound)
}

/// # Errors
///
/// Returns `RepositoryError::NotFound` if the demand does not exist.
pub async fn delete(conn: &mut PgConnection, id: DemandId) -> Result<(), RepositoryError> {
    let result = sqlx::query("DELETE FROM demand WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}
