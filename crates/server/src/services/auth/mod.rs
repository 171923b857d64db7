//! Authentication service.
//!
//! Password login for staff accounts, plus the user administration that
//! needs password hashing.
//!
//! Registration is open, but only the very first account becomes an active
//! admin. Everyone after that registers as inactive staff and waits for an
//! admin to activate them.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use sqlx::PgPool;
use tracing::instrument;

use shelfwise_core::{Email, Role, UserId};

use crate::db::RepositoryError;
use crate::db::users::{self, NewUser, UserChanges, UserRepository};
use crate::models::user::{CreateUserInput, UpdateUserInput, User};

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Advisory lock key serializing registrations, so two simultaneous first
/// registrations cannot both become admin.
const REGISTRATION_LOCK: i64 = 0x5348_454C_4657_4953;

/// Authentication service.
pub struct AuthService<'a> {
    pool: &'a PgPool,
    users: UserRepository<'a>,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            pool,
            users: UserRepository::new(pool),
        }
    }

    /// Self-register with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidEmail` if the email format is invalid.
    /// Returns `AuthError::WeakPassword` if the password doesn't meet requirements.
    /// Returns `AuthError::UserAlreadyExists` if the email is already registered.
    #[instrument(skip(self, password))]
    pub async fn register(&self, email: &str, password: &str, name: &str) -> Result<User, AuthError> {
        let email = Email::parse(email)?;
        let name = validate_name(name)?;
        validate_password(password)?;
        let password_hash = hash_password(password)?;

        let mut tx = self.pool.begin().await.map_err(RepositoryError::from)?;

        sqlx::query("SELECT pg_advisory_xact_lock($1)")
            .bind(REGISTRATION_LOCK)
            .execute(&mut *tx)
            .await
            .map_err(RepositoryError::from)?;

        let first = users::count(&mut tx).await? == 0;
        let (role, is_active) = if first {
            (Role::Admin, true)
        } else {
            (Role::Staff, false)
        };

        let user = users::insert(
            &mut tx,
            &NewUser {
                email: &email,
                name,
                password_hash: &password_hash,
                role,
                is_active,
            },
        )
        .await
        .map_err(conflict_is_duplicate)?;

        tx.commit().await.map_err(RepositoryError::from)?;

        tracing::info!(user_id = %user.id, role = %user.role, "User registered");
        Ok(user)
    }

    /// Login with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    /// Returns `AuthError::AccountInactive` if the account has not been activated.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_with_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        if !user.is_active {
            return Err(AuthError::AccountInactive);
        }

        Ok(user)
    }

    /// Create a user directly (admin or CLI).
    ///
    /// # Errors
    ///
    /// Returns validation errors as for [`Self::register`], and
    /// `AuthError::UserAlreadyExists` if the email is taken.
    pub async fn create_user(&self, input: &CreateUserInput) -> Result<User, AuthError> {
        let email = Email::parse(&input.email)?;
        let name = validate_name(&input.name)?;
        validate_password(&input.password)?;
        let password_hash = hash_password(&input.password)?;

        let user = self
            .users
            .create(&NewUser {
                email: &email,
                name,
                password_hash: &password_hash,
                role: input.role,
                is_active: input.is_active,
            })
            .await
            .map_err(conflict_is_duplicate)?;

        tracing::info!(user_id = %user.id, role = %user.role, "User created");
        Ok(user)
    }

    /// Apply an admin update to a user, re-hashing the password if one is given.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::WeakPassword` or `AuthError::MissingName` for invalid
    /// values and `AuthError::Repository` if the user does not exist.
    pub async fn update_user(&self, id: UserId, input: &UpdateUserInput) -> Result<User, AuthError> {
        let name = input.name.as_deref().map(validate_name).transpose()?;
        let password_hash = match input.password.as_deref() {
            Some(password) => {
                validate_password(password)?;
                Some(hash_password(password)?)
            }
            None => None,
        };

        let user = self
            .users
            .update(
                id,
                &UserChanges {
                    name,
                    role: input.role,
                    is_active: input.is_active,
                    password_hash: password_hash.as_deref(),
                },
            )
            .await?;

        tracing::info!(user_id = %user.id, role = %user.role, active = user.is_active, "User updated");
        Ok(user)
    }
}

fn conflict_is_duplicate(err: RepositoryError) -> AuthError {
    match err {
        RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
        other => AuthError::Repository(other),
    }
}

fn validate_name(name: &str) -> Result<&str, AuthError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthError::MissingName);
    }
    Ok(name)
}

/// Validate password meets requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` for passwords shorter than
/// [`MIN_PASSWORD_LENGTH`] characters.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_password_roundtrip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("correct horse battery", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong password", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_garbage_hash_is_invalid_credentials() {
        assert!(matches!(
            verify_password("whatever1", "not-a-hash"),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn test_validate_password_length() {
        assert!(matches!(
            validate_password("short"),
            Err(AuthError::WeakPassword(_))
        ));
        assert!(validate_password("long enough").is_ok());
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(validate_name("  Ada ").unwrap(), "Ada");
        assert!(matches!(validate_name("   "), Err(AuthError::MissingName)));
    }
}
