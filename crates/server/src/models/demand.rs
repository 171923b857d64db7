//! Demand requests: an outlet asking a warehouse for stock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use shelfwise_core::{DemandId, DemandStatus, OutletId, ProductId, UserId, WarehouseId};

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Demand {
    pub id: DemandId,
    pub outlet_id: OutletId,
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub status: DemandStatus,
    pub note: Option<String>,
    pub requested_by: UserId,
    pub decided_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemandInput {
    pub outlet_id: OutletId,
    pub warehouse_id: WarehouseId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct DemandStatusUpdate {
    pub status: DemandStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemandFilter {
    pub outlet_id: Option<i32>,
    pub warehouse_id: Option<i32>,
    pub product_id: Option<i32>,
    pub status: Option<DemandStatus>,
}
