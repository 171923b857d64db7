//! Database operations for sales documents (sales and orders).
//!
//! A document is written in one transaction: header, lines, then one
//! allocation row per lot each line drew from. The allocations are what make
//! cancellation possible later, since they record where the units came from
//! and what they cost.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgConnection, PgPool};

use shelfwise_core::totals::Payment;
use shelfwise_core::{
    CustomerId, DocumentId, DocumentKind, DocumentLineId, DocumentStatus, LocationKind,
    LocationRef, Money, PaymentStatus, ProductId, StockLotId, UserId,
};

use super::{Filter, ListSpec, RepositoryError};
use crate::models::document::{Allocation, DocumentFilter};
use crate::models::{Document, DocumentDetail, DocumentLine};
use crate::response::ListQuery;

const DOCUMENT_COLUMNS: &str = "id, kind, number, location_kind, location_id, customer_id, \
                                subtotal, discount, discount_code, total, paid, change_amount, \
                                due, payments, status, note, created_by, created_at, updated_at";

const DOCUMENT_LIST: ListSpec = ListSpec {
    from: "sales_document",
    columns: DOCUMENT_COLUMNS,
    search_columns: &["number", "note"],
    sort_columns: &[
        ("number", "number"),
        ("total", "total"),
        ("due", "due"),
        ("createdAt", "created_at"),
    ],
    default_sort: "created_at",
};

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, FromRow)]
struct DocumentRow {
    id: i32,
    kind: DocumentKind,
    number: String,
    location_kind: LocationKind,
    location_id: i32,
    customer_id: Option<i32>,
    subtotal: Money,
    discount: Money,
    discount_code: Option<String>,
    total: Money,
    paid: Money,
    change_amount: Money,
    due: Money,
    payments: Json<Vec<Payment>>,
    status: DocumentStatus,
    note: Option<String>,
    created_by: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Self {
            id: DocumentId::new(row.id),
            kind: row.kind,
            number: row.number,
            location: LocationRef {
                kind: row.location_kind,
                id: row.location_id,
            },
            customer_id: row.customer_id.map(CustomerId::new),
            subtotal: row.subtotal,
            discount: row.discount,
            discount_code: row.discount_code,
            total: row.total,
            paid: row.paid,
            change: row.change_amount,
            due: row.due,
            payment_status: PaymentStatus::from_balance(row.total, row.due),
            payments: row.payments.0,
            status: row.status,
            note: row.note,
            created_by: UserId::new(row.created_by),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct LineRow {
    id: i32,
    product_id: i32,
    quantity: i32,
    unit_price: Money,
    line_total: Money,
}

#[derive(Debug, FromRow)]
struct AllocationRow {
    line_id: i32,
    lot_id: i32,
    quantity: i32,
    unit_cost: Money,
}

/// Units a document line drew from one lot, with what is needed to put them back.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct ReturnableAllocation {
    pub product_id: ProductId,
    pub lot_id: StockLotId,
    pub quantity: i32,
    pub unit_cost: Money,
    pub unit_price: Money,
}

/// Header values for a new document.
pub struct NewDocument<'a> {
    pub kind: DocumentKind,
    pub number: &'a str,
    pub location: LocationRef,
    pub customer_id: Option<CustomerId>,
    pub subtotal: Money,
    pub discount: Money,
    pub discount_code: Option<&'a str>,
    pub total: Money,
    pub paid: Money,
    pub change: Money,
    pub due: Money,
    pub payments: &'a [Payment],
    pub status: DocumentStatus,
    pub note: Option<&'a str>,
    pub created_by: UserId,
}

/// A line and the lots it drew from.
pub struct NewLine<'a> {
    pub product_id: ProductId,
    pub quantity: i32,
    pub unit_price: Money,
    pub line_total: Money,
    pub allocations: &'a [Allocation],
}

// =============================================================================
// Repository
// =============================================================================

/// Read-side repository for sales documents.
pub struct DocumentRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> DocumentRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List sales or orders.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(
        &self,
        kind: DocumentKind,
        query: &ListQuery,
        filter: &DocumentFilter,
    ) -> Result<(Vec<Document>, i64), RepositoryError> {
        let mut filters = vec![Filter::new("kind", kind)];
        if let Some(customer_id) = filter.customer_id {
            filters.push(Filter::new("customer_id", customer_id));
        }
        if let Some(location_kind) = filter.location_kind {
            filters.push(Filter::new("location_kind", location_kind));
        }
        if let Some(location_id) = filter.location_id {
            filters.push(Filter::new("location_id", location_id));
        }
        if let Some(status) = filter.status {
            filters.push(Filter::new("status", status));
        }

        let (rows, total) =
            super::fetch_page::<DocumentRow>(self.pool, &DOCUMENT_LIST, query, &filters).await?;
        Ok((rows.into_iter().map(Document::from).collect(), total))
    }

    /// Get a document of `kind` with its lines and allocations.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(
        &self,
        kind: DocumentKind,
        id: DocumentId,
    ) -> Result<Option<DocumentDetail>, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        let Some(document) = get_on(&mut conn, kind, id, false).await? else {
            return Ok(None);
        };
        Ok(Some(detail_on(&mut conn, document).await?))
    }
}

// =============================================================================
// Transactional operations
// =============================================================================

async fn get_on(
    conn: &mut PgConnection,
    kind: DocumentKind,
    id: DocumentId,
    for_update: bool,
) -> Result<Option<Document>, RepositoryError> {
    let lock = if for_update { " FOR UPDATE" } else { "" };
    let row = sqlx::query_as::<_, DocumentRow>(&format!(
        "SELECT {DOCUMENT_COLUMNS} FROM sales_document WHERE id = $1 AND kind = $2{lock}"
    ))
    .bind(id)
    .bind(kind)
    .fetch_optional(conn)
    .await?;
    Ok(row.map(Document::from))
}

/// Lock a document for a payment or status change.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn lock(
    conn: &mut PgConnection,
    kind: DocumentKind,
    id: DocumentId,
) -> Result<Option<Document>, RepositoryError> {
    get_on(conn, kind, id, true).await
}

/// Load the lines and allocations of `document`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if a query fails.
pub async fn detail_on(
    conn: &mut PgConnection,
    document: Document,
) -> Result<DocumentDetail, RepositoryError> {
    let lines = sqlx::query_as::<_, LineRow>(
        r"
        SELECT id, product_id, quantity, unit_price, line_total
        FROM sales_document_line
        WHERE document_id = $1
        ORDER BY id
        ",
    )
    .bind(document.id)
    .fetch_all(&mut *conn)
    .await?;

    let allocations = sqlx::query_as::<_, AllocationRow>(
        r"
        SELECT a.line_id, a.lot_id, a.quantity, a.unit_cost
        FROM lot_allocation a
        JOIN sales_document_line l ON l.id = a.line_id
        WHERE l.document_id = $1
        ORDER BY a.id
        ",
    )
    .bind(document.id)
    .fetch_all(&mut *conn)
    .await?;

    let mut by_line: HashMap<i32, Vec<Allocation>> = HashMap::new();
    for a in allocations {
        by_line.entry(a.line_id).or_default().push(Allocation {
            lot_id: StockLotId::new(a.lot_id),
            quantity: a.quantity,
            unit_cost: a.unit_cost,
        });
    }

    let lines = lines
        .into_iter()
        .map(|line| DocumentLine {
            id: DocumentLineId::new(line.id),
            product_id: ProductId::new(line.product_id),
            quantity: line.quantity,
            unit_price: line.unit_price,
            line_total: line.line_total,
            allocations: by_line.remove(&line.id).unwrap_or_default(),
        })
        .collect();

    Ok(DocumentDetail { document, lines })
}

/// Insert a document header.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the number is already taken.
pub async fn insert_header(
    conn: &mut PgConnection,
    doc: &NewDocument<'_>,
) -> Result<Document, RepositoryError> {
    let row = sqlx::query_as::<_, DocumentRow>(&format!(
        r"
        INSERT INTO sales_document
            (kind, number, location_kind, location_id, customer_id, subtotal, discount,
             discount_code, total, paid, change_amount, due, payments, status, note, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
        RETURNING {DOCUMENT_COLUMNS}
        "
    ))
    .bind(doc.kind)
    .bind(doc.number)
    .bind(doc.location.kind)
    .bind(doc.location.id)
    .bind(doc.customer_id)
    .bind(doc.subtotal)
    .bind(doc.discount)
    .bind(doc.discount_code)
    .bind(doc.total)
    .bind(doc.paid)
    .bind(doc.change)
    .bind(doc.due)
    .bind(Json(doc.payments))
    .bind(doc.status)
    .bind(doc.note)
    .bind(doc.created_by)
    .fetch_one(conn)
    .await
    .map_err(|e| RepositoryError::from_write(e, "document number already exists"))?;
    Ok(Document::from(row))
}

/// Insert a line and its allocations.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if an insert fails.
pub async fn insert_line(
    conn: &mut PgConnection,
    document_id: DocumentId,
    line: &NewLine<'_>,
) -> Result<DocumentLine, RepositoryError> {
    let line_id = sqlx::query_scalar::<_, i32>(
        r"
        INSERT INTO sales_document_line (document_id, product_id, quantity, unit_price, line_total)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
        ",
    )
    .bind(document_id)
    .bind(line.product_id)
    .bind(line.quantity)
    .bind(line.unit_price)
    .bind(line.line_total)
    .fetch_one(&mut *conn)
    .await?;

    for allocation in line.allocations {
        sqlx::query(
            r"
            INSERT INTO lot_allocation (line_id, lot_id, quantity, unit_cost)
            VALUES ($1, $2, $3, $4)
            ",
        )
        .bind(line_id)
        .bind(allocation.lot_id)
        .bind(allocation.quantity)
        .bind(allocation.unit_cost)
        .execute(&mut *conn)
        .await?;
    }

    Ok(DocumentLine {
        id: DocumentLineId::new(line_id),
        product_id: line.product_id,
        quantity: line.quantity,
        unit_price: line.unit_price,
        line_total: line.line_total,
        allocations: line.allocations.to_vec(),
    })
}

/// Store a new payment state.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the document does not exist.
pub async fn update_payment(
    conn: &mut PgConnection,
    id: DocumentId,
    paid: Money,
    change: Money,
    due: Money,
    payments: &[Payment],
) -> Result<Document, RepositoryError> {
    let row = sqlx::query_as::<_, DocumentRow>(&format!(
        r"
        UPDATE sales_document
        SET paid = $2, change_amount = $3, due = $4, payments = $5, updated_at = NOW()
        WHERE id = $1
        RETURNING {DOCUMENT_COLUMNS}
        "
    ))
    .bind(id)
    .bind(paid)
    .bind(change)
    .bind(due)
    .bind(Json(payments))
    .fetch_optional(conn)
    .await?
    .ok_or(RepositoryError::NotFound)?;
    Ok(Document::from(row))
}

/// Store a new status.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the document does not exist.
pub async fn update_status(
    conn: &mut PgConnection,
    id: DocumentId,
    status: DocumentStatus,
) -> Result<Document, RepositoryError> {
    let row = sqlx::query_as::<_, DocumentRow>(&format!(
        r"
        UPDATE sales_document SET status = $2, updated_at = NOW()
        WHERE id = $1
        RETURNING {DOCUMENT_COLUMNS}
        "
    ))
    .bind(id)
    .bind(status)
    .fetch_optional(conn)
    .await?
    .ok_or(RepositoryError::NotFound)?;
    Ok(Document::from(row))
}

/// Every allocation of a document, with the source lot's selling price.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn allocations(
    conn: &mut PgConnection,
    id: DocumentId,
) -> Result<Vec<ReturnableAllocation>, RepositoryError> {
    let rows = sqlx::query_as::<_, ReturnableAllocation>(
        r"
        SELECT l.product_id, a.lot_id, a.quantity, a.unit_cost, s.unit_price
        FROM lot_allocation a
        JOIN sales_document_line l ON l.id = a.line_id
        JOIN stock_lot s ON s.id = a.lot_id
        WHERE l.document_id = $1
        ORDER BY a.id
        ",
    )
    .bind(id)
    .fetch_all(conn)
    .await?;
    Ok(rows)
}
