//! Sales documents: point-of-sale sales and customer orders.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shelfwise_core::totals::Payment;
use shelfwise_core::{
    CustomerId, DocumentId, DocumentKind, DocumentLineId, DocumentStatus, LocationKind,
    LocationRef, Money, PaymentStatus, ProductId, StockLotId, UserId,
};

/// A persisted sale or order header (domain type).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: DocumentId,
    pub kind: DocumentKind,
    /// e.g. `SL2610190007`.
    pub number: String,
    pub location: LocationRef,
    pub customer_id: Option<CustomerId>,
    pub subtotal: Money,
    pub discount: Money,
    pub discount_code: Option<String>,
    pub total: Money,
    pub paid: Money,
    pub change: Money,
    pub due: Money,
    pub payment_status: PaymentStatus,
    pub payments: Vec<Payment>,
    pub status: DocumentStatus,
    pub note: Option<String>,
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A document with its lines and lot allocations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDetail {
    #[serde(flatten)]
    pub document: Document,
    pub lines: Vec<DocumentLine>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentLine {
    pub id: DocumentLineId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub unit_price: Money,
    pub line_total: Money,
    pub allocations: Vec<Allocation>,
}

/// Units of a line drawn from one stock lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Allocation {
    pub lot_id: StockLotId,
    pub quantity: i32,
    pub unit_cost: Money,
}

/// A line as submitted by the client. Prices come from the catalog.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftItem {
    pub product_id: ProductId,
    pub quantity: i32,
}

/// Sale or order creation payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDraft {
    pub location: LocationRef,
    pub customer_id: Option<CustomerId>,
    pub items: Vec<DraftItem>,
    /// Fixed discount amount. Mutually exclusive with `discount_code`.
    pub discount: Option<Money>,
    pub discount_code: Option<String>,
    #[serde(default)]
    pub payments: Vec<Payment>,
    pub note: Option<String>,
}

/// Order status change payload.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct StatusUpdate {
    pub status: DocumentStatus,
}

/// List filters for sales and orders.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFilter {
    pub customer_id: Option<i32>,
    pub location_kind: Option<LocationKind>,
    pub location_id: Option<i32>,
    pub status: Option<DocumentStatus>,
}
