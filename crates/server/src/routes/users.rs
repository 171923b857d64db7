//! User administration handlers (admin only).

use axum::{
    Json,
    extract::{Path, Query, State},
};

use shelfwise_core::UserId;
use shelfwise_core::permissions::policy;

use crate::db::UserRepository;
use crate::error::{AppError, Result};
use crate::middleware::Authorized;
use crate::models::User;
use crate::models::user::{CreateUserInput, UpdateUserInput};
use crate::response::{ApiResponse, ListQuery};
use crate::services::AuthService;
use crate::state::AppState;

use super::not_found;

pub async fn list(
    State(state): State<AppState>,
    _auth: Authorized<policy::ManageUsers>,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse<Vec<User>>> {
    let (users, total) = UserRepository::new(state.pool()).list(&query).await?;
    Ok(ApiResponse::page(users, total, &query))
}

pub async fn get(
    State(state): State<AppState>,
    _auth: Authorized<policy::ManageUsers>,
    Path(id): Path<UserId>,
) -> Result<ApiResponse<User>> {
    let user = UserRepository::new(state.pool())
        .get_by_id(id)
        .await?
        .ok_or_else(|| not_found("user", id))?;
    Ok(ApiResponse::ok(user))
}

pub async fn create(
    State(state): State<AppState>,
    _auth: Authorized<policy::ManageUsers>,
    Json(input): Json<CreateUserInput>,
) -> Result<ApiResponse<User>> {
    let user = AuthService::new(state.pool()).create_user(&input).await?;
    Ok(ApiResponse::created(user).with_message("User created"))
}

/// Change a user's name, role, activation or password.
///
/// Admins cannot demote or deactivate themselves, so the system always keeps
/// at least the caller as an active admin.
pub async fn update(
    State(state): State<AppState>,
    auth: Authorized<policy::ManageUsers>,
    Path(id): Path<UserId>,
    Json(input): Json<UpdateUserInput>,
) -> Result<ApiResponse<User>> {
    if id == auth.user.id {
        let me = UserRepository::new(state.pool())
            .get_by_id(id)
            .await?
            .ok_or_else(|| not_found("user", id))?;
        if input.demotes_or_deactivates(&me) {
            tracing::warn!(user_id = %id, "Admin tried to demote or deactivate themselves");
            return Err(AppError::Forbidden(
                "You cannot demote or deactivate your own account".into(),
            ));
        }
    }

    let user = AuthService::new(state.pool())
        .update_user(id, &input)
        .await?;
    Ok(ApiResponse::ok(user).with_message("User updated"))
}

pub async fn delete(
    State(state): State<AppState>,
    auth: Authorized<policy::ManageUsers>,
    Path(id): Path<UserId>,
) -> Result<ApiResponse<()>> {
    if id == auth.user.id {
        return Err(AppError::Forbidden(
            "You cannot delete your own account".into(),
        ));
    }
    UserRepository::new(state.pool()).delete(id).await?;
    tracing::info!(user_id = %id, deleted_by = %auth.user.id, "User deleted");
    Ok(ApiResponse::message("User deleted"))
}
