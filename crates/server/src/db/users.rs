//! User repository for database operations.
//!
//! Password hashes are only ever returned by [`UserRepository::get_with_password_hash`],
//! which the login flow uses; every other query yields a [`User`].

use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};

use shelfwise_core::{Email, Role, UserId};

use super::{ListSpec, RepositoryError};
use crate::models::user::User;
use crate::response::ListQuery;

const USER_COLUMNS: &str = "id, email, name, role, is_active, created_at, updated_at";

const USER_LIST: ListSpec = ListSpec {
    from: "app_user",
    columns: USER_COLUMNS,
    search_columns: &["email", "name"],
    sort_columns: &[
        ("name", "name"),
        ("email", "email"),
        ("role", "role"),
        ("createdAt", "created_at"),
    ],
    default_sort: "created_at",
};

/// Internal row type for user queries.
#[derive(FromRow)]
struct UserRow {
    id: i32,
    email: String,
    name: String,
    role: Role,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            email,
            name: row.name,
            role: row.role,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(FromRow)]
struct UserWithHashRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

/// Fields for a new user.
pub struct NewUser<'a> {
    pub email: &'a Email,
    pub name: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
    pub is_active: bool,
}

/// Changes to an existing user; `None` leaves a column unchanged.
#[derive(Default)]
pub struct UserChanges<'a> {
    pub name: Option<&'a str>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub password_hash: Option<&'a str>,
}

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the email in the database is invalid.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM app_user WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    /// Get a user and their password hash by email, for login.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithHashRow>(&format!(
            "SELECT {USER_COLUMNS}, password_hash FROM app_user WHERE LOWER(email) = $1"
        ))
        .bind(email.as_str())
        .fetch_optional(self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some((User::try_from(r.user)?, r.password_hash))),
            None => Ok(None),
        }
    }

    /// List users with search, sorting and pagination.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, query: &ListQuery) -> Result<(Vec<User>, i64), RepositoryError> {
        let (rows, total) = super::fetch_page::<UserRow>(self.pool, &USER_LIST, query, &[]).await?;
        let users = rows
            .into_iter()
            .map(User::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((users, total))
    }

    /// Create a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the email already exists.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn create(&self, new: &NewUser<'_>) -> Result<User, RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        insert(&mut conn, new).await
    }

    /// Apply `changes` to a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist.
    pub async fn update(
        &self,
        id: UserId,
        changes: &UserChanges<'_>,
    ) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            UPDATE app_user
            SET name = COALESCE($2, name),
                role = COALESCE($3, role),
                is_active = COALESCE($4, is_active),
                password_hash = COALESCE($5, password_hash),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(id)
        .bind(changes.name)
        .bind(changes.role)
        .bind(changes.is_active)
        .bind(changes.password_hash)
        .fetch_optional(self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        User::try_from(row)
    }

    /// Delete a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user does not exist, and
    /// `RepositoryError::Conflict` if sales or stock records still reference them.
    pub async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM app_user WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await
            .map_err(|e| RepositoryError::from_write(e, "user"))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}

/// Count all users on `conn`.
///
/// # Errors
///
/// Returns `RepositoryError::Database` if the query fails.
pub async fn count(conn: &mut PgConnection) -> Result<i64, RepositoryError> {
    let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM app_user")
        .fetch_one(conn)
        .await?;
    Ok(total)
}

/// Insert a user on `conn`.
///
/// # Errors
///
/// Returns `RepositoryError::Conflict` if the email already exists.
pub async fn insert(conn: &mut PgConnection, new: &NewUser<'_>) -> Result<User, RepositoryError> {
    let row = sqlx::query_as::<_, UserRow>(&format!(
        r"
        INSERT INTO app_user (email, name, password_hash, role, is_active)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {USER_COLUMNS}
        "
    ))
    .bind(new.email.as_str())
    .bind(new.name)
    .bind(new.password_hash)
    .bind(new.role)
    .bind(new.is_active)
    .fetch_one(conn)
    .await
    .map_err(|e| RepositoryError::from_write(e, "email already exists"))?;

    User::try_from(row)
}
