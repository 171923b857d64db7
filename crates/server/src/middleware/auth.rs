//! Authentication and authorization extractors.
//!
//! The session only says who logged in. Both extractors re-load the user row
//! on every request, so a deactivated account or a changed role takes effect
//! immediately without waiting for the session to expire.

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use shelfwise_core::{Operation, Policy};

use crate::db::UserRepository;
use crate::error::{AppError, set_sentry_user};
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

/// What a request needs in order to proceed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// Any logged-in, active user.
    Authenticated,
    /// A user whose role permits the operation.
    Operation(Operation),
}

/// Why a request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthRejection {
    /// No session, or the session's user is gone or inactive.
    Unauthenticated,
    /// Logged in, but the role does not permit the operation.
    Forbidden(Operation),
}

impl From<AuthRejection> for AppError {
    fn from(rejection: AuthRejection) -> Self {
        match rejection {
            AuthRejection::Unauthenticated => Self::Unauthorized("Authentication required".into()),
            AuthRejection::Forbidden(_) => {
                Self::Forbidden("You do not have permission to perform this action".into())
            }
        }
    }
}

/// Decide whether `user` may proceed under `access`.
///
/// `user` is the freshly loaded account, or `None` when there is no session
/// or the account no longer exists.
///
/// # Errors
///
/// Returns `AuthRejection::Unauthenticated` for a missing or inactive user and
/// `AuthRejection::Forbidden` when the role lacks the operation.
pub fn authorize(user: Option<CurrentUser>, access: Access) -> Result<CurrentUser, AuthRejection> {
    let user = user.ok_or(AuthRejection::Unauthenticated)?;
    match access {
        Access::Authenticated => Ok(user),
        Access::Operation(op) if user.role.can(op) => Ok(user),
        Access::Operation(op) => Err(AuthRejection::Forbidden(op)),
    }
}

/// Load the session user and refresh it from the database.
async fn load_user(parts: &Parts, state: &AppState) -> Result<Option<CurrentUser>, AppError> {
    let Some(session) = parts.extensions.get::<Session>() else {
        return Ok(None);
    };

    let Some(current) = session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
    else {
        return Ok(None);
    };

    let user = UserRepository::new(state.pool())
        .get_by_id(current.id)
        .await?
        .filter(|u| u.is_active)
        .map(|u| CurrentUser::from(&u));

    if let Some(user) = &user {
        set_sentry_user(&user.id, Some(user.email.as_str()));
    }

    Ok(user)
}

async fn extract(
    parts: &Parts,
    state: &AppState,
    access: Access,
) -> Result<CurrentUser, AppError> {
    let user = load_user(parts, state).await?;
    authorize(user, access).map_err(|rejection| {
        if let AuthRejection::Forbidden(op) = rejection {
            tracing::warn!(operation = ?op, path = %parts.uri.path(), "Operation forbidden");
        }
        AppError::from(rejection)
    })
}

/// Extractor that requires a logged-in, active user.
///
/// # Example
///
/// ```rust,ignore
/// async fn profile(Authenticated(user): Authenticated) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct Authenticated(pub CurrentUser);

impl FromRequestParts<AppState> for Authenticated {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        extract(parts, state, Access::Authenticated).await.map(Self)
    }
}

/// Extractor that requires the user's role to permit `P::OPERATION`.
///
/// # Example
///
/// ```rust,ignore
/// use shelfwise_core::permissions::policy;
///
/// async fn receive(auth: Authorized<policy::ReceiveStock>) -> Result<...> {
///     let user = auth.user;
///     ...
/// }
/// ```
pub struct Authorized<P: Policy> {
    pub user: CurrentUser,
    policy: PhantomData<fn() -> P>,
}

impl<P: Policy> FromRequestParts<AppState> for Authorized<P> {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = extract(parts, state, Access::Operation(P::OPERATION)).await?;
        Ok(Self {
            user,
            policy: PhantomData,
        })
    }
}

/// Helper to set the current user in the session.
///
/// Cycles the session ID first so a pre-login session cannot be fixated.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Helper to clear the current user from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shelfwise_core::{Email, Role, UserId};

    use super::*;

    fn user(role: Role) -> CurrentUser {
        CurrentUser {
            id: UserId::new(1),
            email: Email::parse("clerk@example.com").unwrap(),
            name: "Clerk".to_string(),
            role,
        }
    }

    #[test]
    fn test_missing_user_is_unauthenticated() {
        assert_eq!(
            authorize(None, Access::Authenticated).unwrap_err(),
            AuthRejection::Unauthenticated
        );
        assert_eq!(
            authorize(None, Access::Operation(Operation::ViewCatalog)).unwrap_err(),
            AuthRejection::Unauthenticated
        );
    }

    #[test]
    fn test_role_gate() {
        let staff = Some(user(Role::Staff));
        assert!(authorize(staff.clone(), Access::Operation(Operation::CreateSale)).is_ok());
        assert_eq!(
            authorize(staff, Access::Operation(Operation::ReceiveStock)).unwrap_err(),
            AuthRejection::Forbidden(Operation::ReceiveStock)
        );

        let admin = Some(user(Role::Admin));
        assert_eq!(
            authorize(admin, Access::Operation(Operation::ManageUsers))
                .unwrap()
                .role,
            Role::Admin
        );
    }

    #[test]
    fn test_any_role_is_authenticated() {
        for role in [Role::Admin, Role::Manager, Role::Staff] {
            assert!(authorize(Some(user(role)), Access::Authenticated).is_ok());
        }
    }

    #[test]
    fn test_rejection_status() {
        use axum::{http::StatusCode, response::IntoResponse};

        let status = AppError::from(AuthRejection::Unauthenticated)
            .into_response()
            .status();
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let status = AppError::from(AuthRejection::Forbidden(Operation::ManageUsers))
            .into_response()
            .status();
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
