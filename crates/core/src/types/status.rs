//! Status and kind enums for various entities.
//!
//! Enums that are persisted map to `PostgreSQL` enum types (with the `postgres`
//! feature); the type names match the migration in `crates/server/migrations`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where a stock lot lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "location_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum LocationKind {
    Warehouse,
    Outlet,
}

impl std::fmt::Display for LocationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Warehouse => write!(f, "warehouse"),
            Self::Outlet => write!(f, "outlet"),
        }
    }
}

/// A reference to a warehouse or an outlet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRef {
    /// Warehouse or outlet.
    pub kind: LocationKind,
    /// ID within the kind's table.
    pub id: i32,
}

impl LocationRef {
    /// Reference a warehouse.
    #[must_use]
    pub const fn warehouse(id: crate::WarehouseId) -> Self {
        Self {
            kind: LocationKind::Warehouse,
            id: id.as_i32(),
        }
    }

    /// Reference an outlet.
    #[must_use]
    pub const fn outlet(id: crate::OutletId) -> Self {
        Self {
            kind: LocationKind::Outlet,
            id: id.as_i32(),
        }
    }
}

impl std::fmt::Display for LocationRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// The two kinds of numbered sales documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "document_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Point-of-sale sale, completed at creation.
    Sale,
    /// Customer order, fulfilled through a status workflow.
    Order,
}

impl DocumentKind {
    /// Prefix of the human-readable document number.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Sale => "SL",
            Self::Order => "OD",
        }
    }

    /// Status a freshly finalized document starts in.
    #[must_use]
    pub const fn initial_status(self) -> DocumentStatus {
        match self {
            Self::Sale => DocumentStatus::Completed,
            Self::Order => DocumentStatus::Pending,
        }
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sale => write!(f, "sale"),
            Self::Order => write!(f, "order"),
        }
    }
}

/// Lifecycle status of a sale or order.
///
/// Sales are `Completed` from the start and never move. Orders follow:
///
/// ```text
/// pending ──► processing ──► delivered
///    │             │
///    └─────────────┴──► cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "document_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    Completed,
    Pending,
    Processing,
    Delivered,
    Cancelled,
}

impl DocumentStatus {
    /// Check whether `self → next` is a legal order transition.
    ///
    /// # Errors
    ///
    /// Returns `StatusTransitionError` naming both states otherwise.
    pub fn transition_to(self, next: Self) -> Result<Self, StatusTransitionError> {
        let allowed = matches!(
            (self, next),
            (Self::Pending, Self::Processing | Self::Cancelled)
                | (Self::Processing, Self::Delivered | Self::Cancelled)
        );

        if allowed {
            Ok(next)
        } else {
            Err(StatusTransitionError {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl std::fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Completed => "completed",
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

/// How settled a document is, derived from its due balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Paid,
    Partial,
    Unpaid,
}

impl PaymentStatus {
    /// Derive the payment status from the total and the outstanding due.
    #[must_use]
    pub fn from_balance(total: crate::Money, due: crate::Money) -> Self {
        if due.is_zero() || due.is_negative() {
            Self::Paid
        } else if due >= total {
            Self::Unpaid
        } else {
            Self::Partial
        }
    }
}

/// Discount calculation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "discount_kind", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// `value` is a percentage of the subtotal.
    Percentage,
    /// `value` is a fixed amount.
    Fixed,
}

/// Status of an outlet's stock request to a warehouse.
///
/// ```text
/// pending ──► approved ──► fulfilled
///    │
///    └──► rejected
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "demand_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum DemandStatus {
    Pending,
    Approved,
    Rejected,
    Fulfilled,
}

impl DemandStatus {
    /// Check whether `self → next` is a legal demand transition.
    ///
    /// # Errors
    ///
    /// Returns `StatusTransitionError` naming both states otherwise.
    pub fn transition_to(self, next: Self) -> Result<Self, StatusTransitionError> {
        let allowed = matches!(
            (self, next),
            (Self::Pending, Self::Approved | Self::Rejected) | (Self::Approved, Self::Fulfilled)
        );

        if allowed {
            Ok(next)
        } else {
            Err(StatusTransitionError {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }
}

impl std::fmt::Display for DemandStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
            Self::Fulfilled => "fulfilled",
        };
        f.write_str(s)
    }
}

/// An illegal status change.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot move from {from} to {to}")]
pub struct StatusTransitionError {
    /// Current status.
    pub from: String,
    /// Requested status.
    pub to: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Money;

    #[test]
    fn test_order_transitions() {
        use DocumentStatus::*;
        assert_eq!(Pending.transition_to(Processing), Ok(Processing));
        assert_eq!(Pending.transition_to(Cancelled), Ok(Cancelled));
        assert_eq!(Processing.transition_to(Delivered), Ok(Delivered));
        assert_eq!(Processing.transition_to(Cancelled), Ok(Cancelled));

        assert!(Pending.transition_to(Delivered).is_err());
        assert!(Delivered.transition_to(Cancelled).is_err());
        assert!(Cancelled.transition_to(Pending).is_err());
        assert!(Completed.transition_to(Cancelled).is_err());
    }

    #[test]
    fn test_transition_error_message() {
        let err = DocumentStatus::Delivered
            .transition_to(DocumentStatus::Pending)
            .unwrap_err();
        assert_eq!(err.to_string(), "cannot move from delivered to pending");
    }

    #[test]
    fn test_demand_transitions() {
        use DemandStatus::*;
        assert!(Pending.transition_to(Approved).is_ok());
        assert!(Pending.transition_to(Rejected).is_ok());
        assert!(Approved.transition_to(Fulfilled).is_ok());

        assert!(Pending.transition_to(Fulfilled).is_err());
        assert!(Rejected.transition_to(Approved).is_err());
        assert!(Fulfilled.transition_to(Pending).is_err());
    }

    #[test]
    fn test_initial_status() {
        assert_eq!(DocumentKind::Sale.initial_status(), DocumentStatus::Completed);
        assert_eq!(DocumentKind::Order.initial_status(), DocumentStatus::Pending);
    }

    #[test]
    fn test_payment_status_from_balance() {
        let total = Money::whole(230);
        assert_eq!(PaymentStatus::from_balance(total, Money::ZERO), PaymentStatus::Paid);
        assert_eq!(
            PaymentStatus::from_balance(total, Money::whole(30)),
            PaymentStatus::Partial
        );
        assert_eq!(PaymentStatus::from_balance(total, total), PaymentStatus::Unpaid);
    }

    #[test]
    fn test_location_ref_display() {
        let loc = LocationRef::outlet(crate::OutletId::new(3));
        assert_eq!(loc.to_string(), "outlet:3");
    }
}
