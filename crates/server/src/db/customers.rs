//! Customer repository.
//!
//! Accumulated dues change only through [`add_due`] and [`reduce_due`], which
//! run on the caller's transaction alongside the sale or payment that causes
//! the change.

use sqlx::{PgConnection, PgPool};

use shelfwise_core::{CustomerId, Money};

use super::{ListSpec, RepositoryError};
use crate::models::Customer;
use crate::models::customer::CustomerFilter;
use crate::response::ListQuery;

const CUSTOMER_COLUMNS: &str =
    "id, name, phone, email, address, total_due, created_at, updated_at";

const CUSTOMER_LIST: ListSpec = ListSpec {
    from: "customer",
    columns: CUSTOMER_COLUMNS,
    search_columns: &["name", "phone", "email"],
    sort_columns: &[
        ("name", "name"),
        ("totalDue", "total_due"),
        ("createdAt", "created_at"),
    ],
    default_sort: "created_at",
};

const WITH_DUE_LIST: ListSpec = ListSpec {
    from: "(SELECT * FROM customer WHERE total_due > 0) AS customer",
    ..CUSTOMER_LIST
};

const DUPLICATE: &str = "phone number already exists";

/// Customer fields, already validated.
pub struct CustomerFields<'a> {
    pub name: &'a str,
    pub phone: &'a str,
    pub email: Option<&'a str>,
    pub address: Option<&'a str>,
}

/// Repository for customer database operations.
pub struct CustomerRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CustomerRepository<'a> {
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
        filter: &CustomerFilter,
    ) -> Result<(Vec<Customer>, i64), RepositoryError> {
        let spec = if filter.has_due == Some(true) {
            &WITH_DUE_LIST
        } else {
            &CUSTOMER_LIST
        };
        super::fetch_page(self.pool, spec, query, &[]).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: CustomerId) -> Result<Option<Customer>, RepositoryError> {
        let customer = sqlx::query_as::<_, Customer>(&format!(
            "SELECT {CUSTOMER_COLUMNS} FROM customer WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(customer)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the phone number is taken.
    pub async fn create(&self, fields: &CustomerFields<'_>) -> Result<Customer, RepositoryError> {
        sqlx::query_as::<_, Customer>(&format!(
            r"
            INSERT INTO customer (name, phone, email, address)
            VALUES ($1, $2, $3, $4)
            RETURNING {CUSTOMER_COLUMNS}
            "
        ))
        .bind(fields.name)
        .bind(fields.phone)
        .bind(fields.email)
        .bind(fields.address)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, DUPLICATE))
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer does not exist and
    /// `RepositoryError::Conflict` if the phone number is taken.
    pub async fn update(
        &self,
        id: CustomerId,
        fields: &CustomerFields<'_>,
    ) -> Result<Customer, RepositoryError> {
        sqlx::query_as::<_, Customer>(&format!(
            r"
            UPDATE customer
            SET name = $2, phone = $3, email = $4, address = $5, updated_at = NOW()
            WHERE id = $1
            RETURNING {CUSTOMER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(fields.name)
        .bind(fields.phone)
        .bind(fields.email)
        .bind(fields.address)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, DUPLICATE))?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the customer does not exist and
    /// `RepositoryError::Conflict` while sales reference them.
    pub async fn delete(&self, id: CustomerId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM customer WHERE id = $1")
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

/// Whether a customer exists, checked on `conn`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn exists(conn: &mut PgConnection, id: CustomerId) -> Result<bool, RepositoryError> {
    let found = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM customer WHERE id = $1)")
        .bind(id)
        .fetch_one(conn)
        .await?;
    Ok(found)
}

/// Increase a customer's accumulated due.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the customer does not exist.
pub async fn add_due(
    conn: &mut PgConnection,
    id: CustomerId,
    amount: Money,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        "UPDATE customer SET total_due = total_due + $2, updated_at = NOW() WHERE id = $1",
    )
    .bind(id)
    .bind(amount)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}

/// Decrease a customer's accumulated due, never below zero.
///
/// # Errors
///
/// Returns `RepositoryError::NotFound` if the customer does not exist.
pub async fn reduce_due(
    conn: &mut PgConnection,
    id: CustomerId,
    amount: Money,
) -> Result<(), RepositoryError> {
    let result = sqlx::query(
        r"
        UPDATE customer
        SET total_due = GREATEST(total_due - $2, 0), updated_at = NOW()
        WHERE id = $1
        ",
    )
    .bind(id)
    .bind(amount)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(RepositoryError::NotFound);
    }
    Ok(())
}
