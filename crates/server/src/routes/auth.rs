//! Registration, login, logout and profile handlers.

use axum::{Json, extract::State};
use tower_sessions::Session;

use crate::error::{Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{Authenticated, clear_current_user, set_current_user};
use crate::models::CurrentUser;
use crate::models::user::{LoginInput, RegisterInput, User};
use crate::response::ApiResponse;
use crate::services::AuthService;
use crate::state::AppState;

use super::session_error;

/// Register a new account.
///
/// The very first account becomes an active admin; later accounts wait
/// inactive until an admin enables them.
pub async fn register(
    State(state): State<AppState>,
    Json(input): Json<RegisterInput>,
) -> Result<ApiResponse<User>> {
    let user = AuthService::new(state.pool())
        .register(&input.email, &input.password, &input.name)
        .await?;

    let message = if user.is_active {
        "Account created"
    } else {
        "Account created; an administrator must activate it before you can log in"
    };
    Ok(ApiResponse::created(user).with_message(message))
}

/// Log in and start a session.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(input): Json<LoginInput>,
) -> Result<ApiResponse<User>> {
    let user = AuthService::new(state.pool())
        .login(&input.email, &input.password)
        .await?;

    set_current_user(&session, &CurrentUser::from(&user))
        .await
        .map_err(|e| session_error(&e))?;
    set_sentry_user(&user.id, Some(user.email.as_str()));

    Ok(ApiResponse::ok(user).with_message("Logged in"))
}

/// End the current session.
pub async fn logout(session: Session) -> Result<ApiResponse<()>> {
    clear_current_user(&session)
        .await
        .map_err(|e| session_error(&e))?;
    clear_sentry_user();
    Ok(ApiResponse::message("Logged out"))
}

/// The logged-in user, as currently stored.
pub async fn profile(Authenticated(user): Authenticated) -> ApiResponse<CurrentUser> {
    ApiResponse::ok(user)
}
