//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`, and every error renders as the JSON envelope
//! `{ "success": false, "message": ..., "error": <code> }`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use shelfwise_core::totals::TotalsError;

use crate::db::RepositoryError;
use crate::services::auth::AuthError;
use crate::services::demands::DemandError;
use crate::services::documents::DocumentError;
use crate::services::stock::StockError;
use crate::validation::ValidationError;

const INTERNAL_MESSAGE: &str = "Internal server error";

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Stock receipt, transfer or allocation failed.
    #[error("Stock error: {0}")]
    Stock(#[from] StockError),

    /// Sale or order operation failed.
    #[error("Document error: {0}")]
    Document(#[from] DocumentError),

    /// Demand workflow operation failed.
    #[error("Demand error: {0}")]
    Demand(#[from] DemandError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// User is authenticated but lacks the required role.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Duplicate or conflicting state.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Rate limited.
    #[error("Rate limited")]
    RateLimited,

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::BadRequest(err.to_string())
    }
}

/// Status, machine-readable code and client message for an error.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Classified {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl Classified {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    fn bad_request(code: &'static str, message: impl ToString) -> Self {
        Self::new(StatusCode::BAD_REQUEST, code, message.to_string())
    }

    fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            INTERNAL_MESSAGE,
        )
    }

    fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }
}

fn classify_repository(err: &RepositoryError) -> Classified {
    match err {
        RepositoryError::NotFound => {
            Classified::new(StatusCode::NOT_FOUND, "not_found", "Resource not found")
        }
        RepositoryError::Conflict(msg) => {
            Classified::new(StatusCode::CONFLICT, "conflict", msg.clone())
        }
        RepositoryError::Invalid(msg) => Classified::bad_request("validation_error", msg),
        RepositoryError::Database(_) | RepositoryError::DataCorruption(_) => {
            Classified::internal()
        }
    }
}

fn classify_auth(err: &AuthError) -> Classified {
    match err {
        AuthError::InvalidEmail(_) => {
            Classified::bad_request("invalid_email", "Invalid email address")
        }
        AuthError::WeakPassword(msg) => Classified::bad_request("weak_password", msg),
        AuthError::MissingName => Classified::bad_request("validation_error", err),
        AuthError::InvalidCredentials => Classified::new(
            StatusCode::UNAUTHORIZED,
            "invalid_credentials",
            "Invalid credentials",
        ),
        AuthError::AccountInactive => Classified::new(
            StatusCode::FORBIDDEN,
            "account_inactive",
            "Account is awaiting activation by an administrator",
        ),
        AuthError::UserAlreadyExists => Classified::new(
            StatusCode::CONFLICT,
            "conflict",
            "An account with this email already exists",
        ),
        AuthError::Repository(inner) => classify_repository(inner),
        AuthError::PasswordHash => Classified::internal(),
    }
}

fn classify_stock(err: &StockError) -> Classified {
    match err {
        StockError::InvalidQuantity(_) => Classified::bad_request("invalid_quantity", err),
        StockError::InvalidAmount(_) => Classified::bad_request("validation_error", err),
        StockError::InsufficientStock { .. } => {
            Classified::bad_request("insufficient_stock", err)
        }
        StockError::UnknownProduct(_) => Classified::bad_request("unknown_product", err),
        StockError::UnknownLocation(_) => Classified::bad_request("unknown_location", err),
        StockError::SameLocation => Classified::bad_request("same_location", err),
        StockError::LotContention(_) => {
            Classified::new(StatusCode::CONFLICT, "stock_conflict", err.to_string())
        }
        StockError::LotInUse(_) => {
            Classified::new(StatusCode::CONFLICT, "lot_in_use", err.to_string())
        }
        StockError::Repository(inner) => classify_repository(inner),
    }
}

fn classify_totals(err: &TotalsError) -> Classified {
    match err {
        TotalsError::PaymentExceedsTotal { .. } => {
            Classified::bad_request("payment_exceeds_total", err)
        }
        _ => Classified::bad_request("validation_error", err),
    }
}

fn classify_document(err: &DocumentError) -> Classified {
    match err {
        DocumentError::Totals(inner) => classify_totals(inner),
        DocumentError::Line { index, source } => {
            let inner = classify_stock(source);
            if inner.is_server_error() {
                inner
            } else {
                Classified::new(
                    inner.status,
                    inner.code,
                    format!("line {index}: {}", inner.message),
                )
            }
        }
        DocumentError::Status(inner) => Classified::bad_request("invalid_status_transition", inner),
        DocumentError::UnknownProduct { .. }
        | DocumentError::InactiveProduct { .. }
        | DocumentError::UnknownCustomer(_)
        | DocumentError::UnknownLocation(_)
        | DocumentError::InvalidDiscountCode(_)
        | DocumentError::ConflictingDiscount
        | DocumentError::NothingDue => Classified::bad_request("validation_error", err),
        DocumentError::Repository(inner) => classify_repository(inner),
    }
}

fn classify_demand(err: &DemandError) -> Classified {
    match err {
        DemandError::Status(inner) => Classified::bad_request("invalid_status_transition", inner),
        DemandError::NotPending => {
            Classified::new(StatusCode::CONFLICT, "conflict", err.to_string())
        }
        DemandError::InvalidQuantity(_)
        | DemandError::UnknownOutlet(_)
        | DemandError::UnknownWarehouse(_)
        | DemandError::UnknownProduct(_) => Classified::bad_request("validation_error", err),
        DemandError::Stock(inner) => classify_stock(inner),
        DemandError::Repository(inner) => classify_repository(inner),
    }
}

impl AppError {
    fn classify(&self) -> Classified {
        match self {
            Self::Database(err) => classify_repository(err),
            Self::Auth(err) => classify_auth(err),
            Self::Stock(err) => classify_stock(err),
            Self::Document(err) => classify_document(err),
            Self::Demand(err) => classify_demand(err),
            Self::NotFound(msg) => Classified::new(StatusCode::NOT_FOUND, "not_found", msg.clone()),
            Self::Unauthorized(msg) => {
                Classified::new(StatusCode::UNAUTHORIZED, "unauthorized", msg.clone())
            }
            Self::Forbidden(msg) => Classified::new(StatusCode::FORBIDDEN, "forbidden", msg.clone()),
            Self::BadRequest(msg) => Classified::bad_request("validation_error", msg),
            Self::Conflict(msg) => Classified::new(StatusCode::CONFLICT, "conflict", msg.clone()),
            Self::RateLimited => Classified::new(
                StatusCode::TOO_MANY_REQUESTS,
                "rate_limited",
                "Too many requests",
            ),
            Self::Internal(_) => Classified::internal(),
        }
    }
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    success: bool,
    message: String,
    error: &'static str,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let classified = self.classify();

        // Capture server errors to Sentry
        if classified.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = classified.status.as_u16(), "Request rejected");
        }

        let body = ErrorBody {
            success: false,
            message: classified.message,
            error: classified.code,
        };

        (classified.status, Json(body)).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context after authentication.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use shelfwise_core::{Money, ProductId};

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    async fn body_json(err: AppError) -> serde_json::Value {
        let bytes = err.into_response().into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("product 123".to_string());
        assert_eq!(err.to_string(), "Not found: product 123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::Forbidden("test".to_string())),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            get_status(AppError::Conflict("test".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(get_status(AppError::RateLimited), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_repository_error_mapping() {
        assert_eq!(
            get_status(RepositoryError::NotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(RepositoryError::Conflict("sku already exists".into()).into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(RepositoryError::Invalid("value violates a data constraint".into()).into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(RepositoryError::DataCorruption("bad".into()).into()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_duplicate_registration_is_conflict() {
        assert_eq!(
            get_status(AuthError::UserAlreadyExists.into()),
            StatusCode::CONFLICT
        );
    }

    #[tokio::test]
    async fn test_internal_details_hidden() {
        let json = body_json(AppError::Internal("connection refused at 10.0.0.3".into())).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["message"], INTERNAL_MESSAGE);
        assert_eq!(json["error"], "internal_error");
    }

    #[tokio::test]
    async fn test_line_error_names_index() {
        let err = DocumentError::Line {
            index: 1,
            source: StockError::InsufficientStock {
                product_id: ProductId::new(7),
                requested: 5,
                available: 2,
            },
        };
        let json = body_json(err.into()).await;
        assert_eq!(json["error"], "insufficient_stock");
        assert_eq!(
            json["message"],
            "line 1: insufficient stock for product 7: requested 5, available 2"
        );
    }

    #[tokio::test]
    async fn test_payment_exceeds_total_code() {
        let err = DocumentError::Totals(TotalsError::PaymentExceedsTotal {
            paid: Money::whole(100),
            total: Money::whole(95),
        });
        let json = body_json(err.into()).await;
        assert_eq!(json["error"], "payment_exceeds_total");
    }
}
