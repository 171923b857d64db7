//! Database operations for Shelfwise `PostgreSQL`.
//!
//! ## Tables
//!
//! - `app_user` - Staff accounts (argon2 password hashes, roles)
//! - `tower_sessions.session` - Session storage (created by `shelfwise migrate`)
//! - `brand`, `vendor`, `product`, `discount` - Catalog
//! - `warehouse`, `outlet`, `customer`
//! - `stock_lot` - FIFO lots per product and location
//! - `document_counter` - Daily-reset document sequences
//! - `sales_document`, `sales_document_line`, `lot_allocation` - Sales and orders
//! - `demand` - Outlet stock requests
//!
//! # Migrations
//!
//! Migrations are stored in `crates/server/migrations/` and run via:
//! ```bash
//! cargo run -p shelfwise-cli -- migrate
//! ```
//!
//! Queries are built at runtime (`sqlx::query_as::<_, Row>`), so the crate
//! compiles without a live database.

pub mod brands;
pub mod counters;
pub mod customers;
pub mod demands;
pub mod discounts;
pub mod documents;
pub mod locations;
pub mod products;
pub mod stock;
pub mod users;
pub mod vendors;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::error::ErrorKind;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use thiserror::Error;

use shelfwise_core::{DemandStatus, DocumentKind, DocumentStatus, LocationKind};

use crate::response::ListQuery;

pub use brands::BrandRepository;
pub use customers::CustomerRepository;
pub use demands::DemandRepository;
pub use discounts::DiscountRepository;
pub use documents::DocumentRepository;
pub use locations::LocationRepository;
pub use products::ProductRepository;
pub use stock::StockLotRepository;
pub use users::UserRepository;
pub use vendors::VendorRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email, row still referenced).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// The database rejected a value (check constraint, numeric overflow).
    #[error("invalid value: {0}")]
    Invalid(String),
}

/// SQLSTATE `numeric_value_out_of_range`.
const NUMERIC_OUT_OF_RANGE: &str = "22003";

impl RepositoryError {
    /// Map constraint violations to `Conflict` or `Invalid`.
    ///
    /// `what` names the offending value for unique violations
    /// (e.g. "email already exists").
    pub(crate) fn from_write(err: sqlx::Error, what: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = err
            && let Some(mapped) = Self::violation(&db_err.kind(), db_err.code().as_deref(), what)
        {
            return mapped;
        }
        Self::Database(err)
    }

    fn violation(kind: &ErrorKind, code: Option<&str>, what: &str) -> Option<Self> {
        match kind {
            ErrorKind::UniqueViolation => Some(Self::Conflict(what.to_owned())),
            ErrorKind::ForeignKeyViolation => Some(Self::Conflict(
                "record is referenced by other records".to_owned(),
            )),
            ErrorKind::CheckViolation => {
                Some(Self::Invalid("value violates a data constraint".to_owned()))
            }
            _ if code == Some(NUMERIC_OUT_OF_RANGE) => {
                Some(Self::Invalid("amount is outside the supported range".to_owned()))
            }
            _ => None,
        }
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

// =============================================================================
// Paginated listing
// =============================================================================

/// Static description of a listable table.
pub struct ListSpec {
    /// Table (or join expression) to select from.
    pub from: &'static str,
    /// Columns to select, matching the row type.
    pub columns: &'static str,
    /// Columns matched with `ILIKE` against `search`.
    pub search_columns: &'static [&'static str],
    /// `(sortBy value, SQL column)` pairs a client may sort by.
    pub sort_columns: &'static [(&'static str, &'static str)],
    /// Column used when `sortBy` is absent or not allowed.
    pub default_sort: &'static str,
}

/// An equality filter value.
#[derive(Debug, Clone)]
pub enum FilterValue {
    Int(i32),
    Bool(bool),
    Location(LocationKind),
    DocumentKind(DocumentKind),
    DocumentStatus(DocumentStatus),
    DemandStatus(DemandStatus),
}

/// `column = value` restriction applied to a list query.
#[derive(Debug, Clone)]
pub struct Filter {
    pub column: &'static str,
    pub value: FilterValue,
}

impl Filter {
    #[must_use]
    pub fn new(column: &'static str, value: impl Into<FilterValue>) -> Self {
        Self {
            column,
            value: value.into(),
        }
    }
}

impl From<i32> for FilterValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for FilterValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<LocationKind> for FilterValue {
    fn from(v: LocationKind) -> Self {
        Self::Location(v)
    }
}

impl From<DocumentKind> for FilterValue {
    fn from(v: DocumentKind) -> Self {
        Self::DocumentKind(v)
    }
}

impl From<DocumentStatus> for FilterValue {
    fn from(v: DocumentStatus) -> Self {
        Self::DocumentStatus(v)
    }
}

impl From<DemandStatus> for FilterValue {
    fn from(v: DemandStatus) -> Self {
        Self::DemandStatus(v)
    }
}

/// Escape `%`, `_` and `\` so user input matches literally inside `ILIKE`.
fn like_pattern(search: &str) -> String {
    let mut escaped = String::with_capacity(search.len() + 2);
    escaped.push('%');
    for c in search.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn push_conditions(
    qb: &mut QueryBuilder<'_, Postgres>,
    spec: &ListSpec,
    query: &ListQuery,
    filters: &[Filter],
) {
    qb.push(" WHERE TRUE");

    for filter in filters {
        qb.push(" AND ").push(filter.column).push(" = ");
        match filter.value.clone() {
            FilterValue::Int(v) => qb.push_bind(v),
            FilterValue::Bool(v) => qb.push_bind(v),
            FilterValue::Location(v) => qb.push_bind(v),
            FilterValue::DocumentKind(v) => qb.push_bind(v),
            FilterValue::DocumentStatus(v) => qb.push_bind(v),
            FilterValue::DemandStatus(v) => qb.push_bind(v),
        };
    }

    if let Some(search) = query.search()
        && !spec.search_columns.is_empty()
    {
        let pattern = like_pattern(search);
        qb.push(" AND (");
        for (i, column) in spec.search_columns.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            qb.push(*column)
                .push(" ILIKE ")
                .push_bind(pattern.clone());
        }
        qb.push(")");
    }
}

/// Run a filtered, searched, sorted and paginated list query.
///
/// Returns the page of rows and the total number of matching rows.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if either query fails.
pub async fn fetch_page<T>(
    pool: &PgPool,
    spec: &ListSpec,
    query: &ListQuery,
    filters: &[Filter],
) -> Result<(Vec<T>, i64), RepositoryError>
where
    T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
{
    let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM ");
    count.push(spec.from);
    push_conditions(&mut count, spec, query, filters);
    let total: i64 = count.build_query_scalar().fetch_one(pool).await?;

    let sort_column = query.sort_column(spec.sort_columns, spec.default_sort);

    let mut select = QueryBuilder::<Postgres>::new("SELECT ");
    select.push(spec.columns).push(" FROM ").push(spec.from);
    push_conditions(&mut select, spec, query, filters);
    select
        .push(" ORDER BY ")
        .push(sort_column)
        .push(" ")
        .push(query.sort_direction())
        .push(" LIMIT ")
        .push_bind(query.limit())
        .push(" OFFSET ")
        .push_bind(query.offset());

    let rows = select.build_query_as::<T>().fetch_all(pool).await?;

    Ok((rows, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_violations() {
        assert!(matches!(
            RepositoryError::violation(&ErrorKind::UniqueViolation, Some("23505"), "sku already exists"),
            Some(RepositoryError::Conflict(msg)) if msg == "sku already exists"
        ));
        assert!(matches!(
            RepositoryError::violation(&ErrorKind::ForeignKeyViolation, Some("23503"), "x"),
            Some(RepositoryError::Conflict(_))
        ));
        assert!(matches!(
            RepositoryError::violation(&ErrorKind::CheckViolation, Some("23514"), "x"),
            Some(RepositoryError::Invalid(_))
        ));
        assert!(matches!(
            RepositoryError::violation(&ErrorKind::Other, Some("22003"), "x"),
            Some(RepositoryError::Invalid(msg)) if msg == "amount is outside the supported range"
        ));
        assert!(RepositoryError::violation(&ErrorKind::Other, Some("40P01"), "x").is_none());
    }

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("tea"), "%tea%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn test_conditions_sql() {
        let spec = ListSpec {
            from: "product",
            columns: "id, name",
            search_columns: &["name", "sku"],
            sort_columns: &[("name", "name")],
            default_sort: "id",
        };
        let query = ListQuery {
            search: Some("  soap ".to_string()),
            ..ListQuery::default()
        };

        let mut qb = QueryBuilder::<Postgres>::new("SELECT id FROM product");
        push_conditions(&mut qb, &spec, &query, &[Filter::new("brand_id", 3)]);

        assert_eq!(
            qb.sql(),
            "SELECT id FROM product WHERE TRUE AND brand_id = $1 AND (name ILIKE $2 OR sku ILIKE $3)"
        );
    }
}
