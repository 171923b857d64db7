//! Vendor repository.

use sqlx::PgPool;

use shelfwise_core::VendorId;

use super::{ListSpec, RepositoryError};
use crate::models::Vendor;
use crate::response::ListQuery;

const VENDOR_COLUMNS: &str =
    "id, name, contact_person, phone, email, address, created_at, updated_at";

const VENDOR_LIST: ListSpec = ListSpec {
    from: "vendor",
    columns: VENDOR_COLUMNS,
    search_columns: &["name", "contact_person", "phone", "email"],
    sort_columns: &[("name", "name"), ("createdAt", "created_at")],
    default_sort: "created_at",
};

/// Vendor fields, already validated.
pub struct VendorFields<'a> {
    pub name: &'a str,
    pub contact_person: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub email: Option<&'a str>,
    pub address: Option<&'a str>,
}

/// Repository for vendor database operations.
pub struct VendorRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> VendorRepository<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, query: &ListQuery) -> Result<(Vec<Vendor>, i64), RepositoryError> {
        super::fetch_page(self.pool, &VENDOR_LIST, query, &[]).await
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: VendorId) -> Result<Option<Vendor>, RepositoryError> {
        let vendor = sqlx::query_as::<_, Vendor>(&format!(
            "SELECT {VENDOR_COLUMNS} FROM vendor WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(vendor)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn create(&self, fields: &VendorFields<'_>) -> Result<Vendor, RepositoryError> {
        let vendor = sqlx::query_as::<_, Vendor>(&format!(
            r"
            INSERT INTO vendor (name, contact_person, phone, email, address)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {VENDOR_COLUMNS}
            "
        ))
        .bind(fields.name)
        .bind(fields.contact_person)
        .bind(fields.phone)
        .bind(fields.email)
        .bind(fields.address)
        .fetch_one(self.pool)
        .await?;
        Ok(vendor)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the vendor does not exist.
    pub async fn update(
        &self,
        id: VendorId,
        fields: &VendorFields<'_>,
    ) -> Result<Vendor, RepositoryError> {
        sqlx::query_as::<_, Vendor>(&format!(
            r"
            UPDATE vendor
            SET name = $2, contact_person = $3, phone = $4, email = $5, address = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {VENDOR_COLUMNS}
            "
        ))
        .bind(id)
        .bind(fields.name)
        .bind(fields.contact_person)
        .bind(fields.phone)
        .bind(fields.email)
        .bind(fields.address)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the vendor does not exist and
    /// `RepositoryError::Conflict` while products still reference it.
    pub async fn delete(&self, id: VendorId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM vendor WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| RepositoryError::from_write(e, "vendor"))?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
