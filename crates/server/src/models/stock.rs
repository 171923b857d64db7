//! Stock lot types.
//!
//! A lot is a quantity of one product received at one location on one date.
//! Lots are drawn down oldest first and never refilled once exhausted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shelfwise_core::{LocationKind, LocationRef, Money, ProductId, StockLotId, UserId, VendorId};

/// A stock lot (domain type).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLot {
    pub id: StockLotId,
    pub product_id: ProductId,
    pub location: LocationRef,
    /// Units still on hand.
    pub quantity: i32,
    /// Units the lot was created with.
    pub initial_quantity: i32,
    /// FIFO ordering key.
    pub entry_date: DateTime<Utc>,
    pub unit_cost: Money,
    pub unit_price: Money,
    pub vendor_id: Option<VendorId>,
    pub reference: Option<String>,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockLot {
    /// A lot nothing has been drawn from yet.
    #[must_use]
    pub const fn is_untouched(&self) -> bool {
        self.quantity == self.initial_quantity
    }
}

/// Receive new stock into a location.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveStockInput {
    pub product_id: ProductId,
    pub location: LocationRef,
    pub quantity: i32,
    pub unit_cost: Money,
    /// Defaults to the product's current retail price.
    pub unit_price: Option<Money>,
    pub vendor_id: Option<VendorId>,
    pub reference: Option<String>,
    /// Defaults to now. Backdating places the lot earlier in FIFO order.
    pub entry_date: Option<DateTime<Utc>>,
}

/// Values for a lot about to be inserted.
#[derive(Debug, Clone)]
pub struct NewLot {
    pub product_id: ProductId,
    pub location: LocationRef,
    pub quantity: i32,
    pub entry_date: DateTime<Utc>,
    pub unit_cost: Money,
    pub unit_price: Money,
    pub vendor_id: Option<VendorId>,
    pub reference: Option<String>,
    pub created_by: UserId,
}

/// Move stock between two locations.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferInput {
    pub product_id: ProductId,
    pub from: LocationRef,
    pub to: LocationRef,
    pub quantity: i32,
    pub reference: Option<String>,
}

/// One source lot drawn by a transfer and the lot it became.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferredLot {
    pub source_lot_id: StockLotId,
    pub destination_lot_id: StockLotId,
    pub quantity: i32,
}

/// Outcome of a completed transfer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub product_id: ProductId,
    pub from: LocationRef,
    pub to: LocationRef,
    pub quantity: i32,
    pub lots: Vec<TransferredLot>,
}

/// On-hand quantity of a product at a location.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StockSummary {
    pub product_id: ProductId,
    pub product_name: String,
    pub sku: String,
    pub location: LocationRef,
    pub quantity: i64,
    /// Lots with stock remaining.
    pub open_lots: i64,
    /// Set when the quantity is at or below the product's reorder level.
    pub below_reorder_level: bool,
}

/// List filters for lots and the stock summary.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockFilter {
    pub product_id: Option<i32>,
    pub location_kind: Option<LocationKind>,
    pub location_id: Option<i32>,
    /// Only lots with quantity remaining.
    pub in_stock: Option<bool>,
}
