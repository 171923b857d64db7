//! User bootstrap commands.
//!
//! # Usage
//!
//! ```bash
//! SHELFWISE_USER_PASSWORD=... shelfwise user create -e owner@example.com -n "Owner" -r admin
//! ```
//!
//! Users created here are active immediately, unlike self-registered
//! accounts after the first.

use shelfwise_core::Role;
use shelfwise_server::models::user::CreateUserInput;
use shelfwise_server::services::AuthService;

/// Create an active user with `role`.
///
/// # Errors
///
/// Returns an error for an invalid email, a short password, a duplicate
/// email or a database failure.
pub async fn create(
    email: &str,
    name: &str,
    role: Role,
    password: String,
) -> Result<(), Box<dyn std::error::Error>> {
    let pool = super::connect().await?;

    let input = CreateUserInput {
        email: email.to_owned(),
        password,
        name: name.to_owned(),
        role,
        is_active: true,
    };

    let user = AuthService::new(&pool).create_user(&input).await?;

    tracing::info!(
        "User created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email.as_str(),
        user.role
    );
    Ok(())
}
