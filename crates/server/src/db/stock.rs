//! Database operations for stock lots.
//!
//! Reads for listing go through [`StockLotRepository`]. Everything that
//! changes quantities takes a `&mut PgConnection` so it runs inside the
//! caller's transaction: lots are locked with `FOR UPDATE` before planning and
//! decremented with a guarded `UPDATE`, so two sales racing for the same lot
//! cannot both take the last unit.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};

use shelfwise_core::fifo::LotAvailability;
use shelfwise_core::{LocationKind, LocationRef, Money, ProductId, StockLotId, UserId, VendorId};

use super::{Filter, ListSpec, RepositoryError};
use crate::models::stock::{NewLot, StockFilter, StockLot, StockSummary};
use crate::response::ListQuery;

const LOT_COLUMNS: &str = "id, product_id, location_kind, location_id, quantity, \
                           initial_quantity, entry_date, unit_cost, unit_price, vendor_id, \
                           reference, created_by, created_at, updated_at";

const LOT_LIST: ListSpec = ListSpec {
    from: "stock_lot",
    columns: LOT_COLUMNS,
    search_columns: &["reference"],
    sort_columns: &[
        ("entryDate", "entry_date"),
        ("quantity", "quantity"),
        ("createdAt", "created_at"),
    ],
    default_sort: "entry_date",
};

const OPEN_LOT_LIST: ListSpec = ListSpec {
    from: "(SELECT * FROM stock_lot WHERE quantity > 0) AS stock_lot",
    ..LOT_LIST
};

const SUMMARY_COLUMNS: &str = "product_id, product_name, sku, location_kind, location_id, \
                               quantity, open_lots, reorder_level";

const SUMMARY_LIST: ListSpec = ListSpec {
    from: r"(
        SELECT l.product_id, p.name AS product_name, p.sku, l.location_kind, l.location_id,
               SUM(l.quantity)::BIGINT AS quantity,
               COUNT(*) FILTER (WHERE l.quantity > 0) AS open_lots,
               p.reorder_level
        FROM stock_lot l
        JOIN product p ON p.id = l.product_id
        GROUP BY l.product_id, p.name, p.sku, l.location_kind, l.location_id, p.reorder_level
    ) AS summary",
    columns: SUMMARY_COLUMNS,
    search_columns: &["product_name", "sku"],
    sort_columns: &[
        ("productName", "product_name"),
        ("sku", "sku"),
        ("quantity", "quantity"),
    ],
    default_sort: "product_name",
};

const IN_STOCK_SUMMARY_LIST: ListSpec = ListSpec {
    from: r"(
        SELECT l.product_id, p.name AS product_name, p.sku, l.location_kind, l.location_id,
               SUM(l.quantity)::BIGINT AS quantity,
               COUNT(*) FILTER (WHERE l.quantity > 0) AS open_lots,
               p.reorder_level
        FROM stock_lot l
        JOIN product p ON p.id = l.product_id
        GROUP BY l.product_id, p.name, p.sku, l.location_kind, l.location_id, p.reorder_level
        HAVING SUM(l.quantity) > 0
    ) AS summary",
    ..SUMMARY_LIST
};

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for stock lot queries.
#[derive(Debug, FromRow)]
struct StockLotRow {
    id: i32,
    product_id: i32,
    location_kind: LocationKind,
    location_id: i32,
    quantity: i32,
    initial_quantity: i32,
    entry_date: DateTime<Utc>,
    unit_cost: Money,
    unit_price: Money,
    vendor_id: Option<i32>,
    reference: Option<String>,
    created_by: Option<i32>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<StockLotRow> for StockLot {
    fn from(row: StockLotRow) -> Self {
        Self {
            id: StockLotId::new(row.id),
            product_id: ProductId::new(row.product_id),
            location: LocationRef {
                kind: row.location_kind,
                id: row.location_id,
            },
            quantity: row.quantity,
            initial_quantity: row.initial_quantity,
            entry_date: row.entry_date,
            unit_cost: row.unit_cost,
            unit_price: row.unit_price,
            vendor_id: row.vendor_id.map(VendorId::new),
            reference: row.reference,
            created_by: row.created_by.map(UserId::new),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct StockSummaryRow {
    product_id: i32,
    product_name: String,
    sku: String,
    location_kind: LocationKind,
    location_id: i32,
    quantity: i64,
    open_lots: i64,
    reorder_level: Option<i32>,
}

impl From<StockSummaryRow> for StockSummary {
    fn from(row: StockSummaryRow) -> Self {
        Self {
            product_id: ProductId::new(row.product_id),
            product_name: row.product_name,
            sku: row.sku,
            location: LocationRef {
                kind: row.location_kind,
                id: row.location_id,
            },
            quantity: row.quantity,
            open_lots: row.open_lots,
            below_reorder_level: row
                .reorder_level
                .is_some_and(|level| row.quantity <= i64::from(level)),
        }
    }
}

/// An open lot read under `FOR UPDATE`.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct LockedLot {
    pub id: StockLotId,
    pub entry_date: DateTime<Utc>,
    pub quantity: i32,
    pub unit_cost: Money,
    pub unit_price: Money,
}

impl LockedLot {
    #[must_use]
    pub const fn availability(&self) -> LotAvailability {
        LotAvailability {
            lot_id: self.id,
            entry_date: self.entry_date,
            quantity: self.quantity,
        }
    }
}

fn stock_filters(filter: &StockFilter) -> Vec<Filter> {
    let mut filters = Vec::new();
    if let Some(product_id) = filter.product_id {
        filters.push(Filter::new("product_id", product_id));
    }
    if let Some(kind) = filter.location_kind {
        filters.push(Filter::new("location_kind", kind));
    }
    if let Some(location_id) = filter.location_id {
        filters.push(Filter::new("location_id", location_id));
    }
    filters
}

// =============================================================================
// Repository
// =============================================================================

/// Read-side repository for stock lots.
pub struct StockLotRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> StockLotRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List lots, optionally only those with stock remaining.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        query: &ListQuery,
        filter: &StockFilter,
    ) -> Result<(Vec<StockLot>, i64), RepositoryError> {
        let spec = if filter.in_stock == Some(true) {
            &OPEN_LOT_LIST
        } else {
            &LOT_LIST
        };
        let (rows, total) =
            super::fetch_page::<StockLotRow>(self.pool, spec, query, &stock_filters(filter))
                .await?;
        Ok((rows.into_iter().map(StockLot::from).collect(), total))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: StockLotId) -> Result<Option<StockLot>, RepositoryError> {
        let row = sqlx::query_as::<_, StockLotRow>(&format!(
            "SELECT {LOT_COLUMNS} FROM stock_lot WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(StockLot::from))
    }

    /// On-hand quantity per product and location.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn summary(
        &self,
        query: &ListQuery,
        filter: &StockFilter,
    ) -> Result<(Vec<StockSummary>, i64), RepositoryError> {
        let spec = if filter.in_stock == Some(true) {
            &IN_STOCK_SUMMARY_LIST
        } else {
            &SUMMARY_LIST
        };
        let (rows, total) =
            super::fetch_page::<StockSummaryRow>(self.pool, spec, query, &stock_filters(filter))
                .await?;
        Ok((rows.into_iter().map(StockSummary::from).collect(), total))
    }
}

// =============================================================================
// Transactional operations
// =============================================================================

/// Lock and return the open lots of `product_id` at `location`, oldest first.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock_available(
    conn: &mut PgConnection,
    product_id: ProductId,
    location: LocationRef,
) -> Result<Vec<LockedLot>, RepositoryError> {
    let lots = sqlx::query_as::<_, LockedLot>(
        r"
        SELECT id, entry_date, quantity, unit_cost, unit_price
        FROM stock_lot
        WHERE product_id = $1 AND location_kind = $2 AND location_id = $3 AND quantity > 0
        ORDER BY entry_date ASC, id ASC
        FOR UPDATE
        ",
    )
    .bind(product_id)
    .bind(location.kind)
    .bind(location.id)
    .fetch_all(conn)
    .await?;
    Ok(lots)
}

/// Take `quantity` units from a lot if it still holds them.
///
/// Returns `false` when the guard fails (the lot no longer holds `quantity`);
/// the caller must then abandon its transaction.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the update fails.
pub async fn decrement(
    conn: &mut PgConnection,
    lot_id: StockLotId,
    quantity: i32,
) -> Result<bool, RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE stock_lot
        SET quantity = quantity - $2, updated_at = NOW()
        WHERE id = $1 AND quantity >= $2
        ",
    )
    .bind(lot_id)
    .bind(quantity)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

/// Insert a new lot.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the product or vendor does not exist.
pub async fn insert(conn: &mut PgConnection, lot: &NewLot) -> Result<StockLot, RepositoryError> {
    let row = sqlx::query_as::<_, StockLotRow>(&format!(
        r"
        INSERT INTO stock_lot
            (product_id, location_kind, location_id, quantity, initial_quantity, entry_date,
             unit_cost, unit_price, vendor_id, reference, created_by)
        VALUES ($1, $2, $3, $4, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {LOT_COLUMNS}
        "
    ))
    .bind(lot.product_id)
    .bind(lot.location.kind)
    .bind(lot.location.id)
    .bind(lot.quantity)
    .bind(lot.entry_date)
    .bind(lot.unit_cost)
    .bind(lot.unit_price)
    .bind(lot.vendor_id)
    .bind(lot.reference.as_deref())
    .bind(lot.created_by)
    .fetch_one(conn)
    .await
    .map_err(|e| RepositoryError::from_write(e, "stock lot"))?;
    Ok(StockLot::from(row))
}

/// Lock a lot for deletion.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn get_for_update(
    conn: &mut PgConnection,
    id: StockLotId,
) -> Result<Option<StockLot>, RepositoryError> {
    let row = sqlx::query_as::<_, StockLotRow>(&format!(
        "SELECT {LOT_COLUMNS} FROM stock_lot WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(StockLot::from))
}

/// Delete a lot.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` while allocations reference the lot.
pub async fn delete(conn: &mut PgConnection, id: StockLotId) -> Result<(), RepositoryError> {
    let result = sqlx::query("DELETE FROM stock_lot WHERE id = $1")
        .bind(id)
        .execute(conn)
        .await
        .map_err(|e| RepositoryError::from_write(e, "stock lot"))?;
    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary_row(quantity: i64, reorder_level: Option<i32>) -> StockSummaryRow {
        StockSummaryRow {
            product_id: 1,
            product_name: "Green tea".to_string(),
            sku: "TEA-1".to_string(),
            location_kind: LocationKind::Outlet,
            location_id: 2,
            quantity,
            open_lots: 1,
            reorder_level,
        }
    }

    #[test]
    fn test_reorder_flag() {
        assert!(StockSummary::from(summary_row(5, Some(5))).below_reorder_level);
        assert!(!StockSummary::from(summary_row(6, Some(5))).below_reorder_level);
        assert!(!StockSummary::from(summary_row(0, None)).below_reorder_level);
    }

    #[test]
    fn test_stock_filters() {
        let filter = StockFilter {
            product_id: Some(4),
            location_kind: Some(LocationKind::Warehouse),
            location_id: None,
            in_stock: Some(true),
        };
        let columns: Vec<_> = stock_filters(&filter).iter().map(|f| f.column).collect();
        assert_eq!(columns, ["product_id", "location_kind"]);
    }
}
