//! Stock lot handlers: receiving, listing, summaries and transfers.

use axum::{
    Json,
    extract::{Path, Query, State},
};

use shelfwise_core::StockLotId;
use shelfwise_core::permissions::policy;

use crate::db::StockLotRepository;
use crate::error::Result;
use crate::middleware::Authorized;
use crate::models::stock::{ReceiveStockInput, StockFilter, Transfer, TransferInput};
use crate::models::{StockLot, StockSummary};
use crate::response::{ApiResponse, ListQuery};
use crate::services::StockService;
use crate::state::AppState;

use super::not_found;

/// List lots (`?productId=&locationKind=&locationId=&inStock=`).
pub async fn list(
    State(state): State<AppState>,
    _auth: Authorized<policy::ViewStock>,
    Query(query): Query<ListQuery>,
    Query(filter): Query<StockFilter>,
) -> Result<ApiResponse<Vec<StockLot>>> {
    let (lots, total) = StockLotRepository::new(state.pool())
        .list(&query, &filter)
        .await?;
    Ok(ApiResponse::page(lots, total, &query))
}

pub async fn get(
    State(state): State<AppState>,
    _auth: Authorized<policy::ViewStock>,
    Path(id): Path<StockLotId>,
) -> Result<ApiResponse<StockLot>> {
    let lot = StockLotRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| not_found("stock lot", id))?;
    Ok(ApiResponse::ok(lot))
}

/// Receive a new lot at a warehouse or outlet.
pub async fn receive(
    State(state): State<AppState>,
    auth: Authorized<policy::ReceiveStock>,
    Json(input): Json<ReceiveStockInput>,
) -> Result<ApiResponse<StockLot>> {
    let lot = StockService::new(state.pool())
        .receive(&input, auth.user.id)
        .await?;
    Ok(ApiResponse::created(lot).with_message("Stock received"))
}

/// Delete a lot nothing has been drawn from.
pub async fn delete(
    State(state): State<AppState>,
    _auth: Authorized<policy::DeleteStockLot>,
    Path(id): Path<StockLotId>,
) -> Result<ApiResponse<()>> {
    StockService::new(state.pool()).delete_lot(id).await?;
    Ok(ApiResponse::message("Stock lot deleted"))
}

/// On-hand quantity per product and location.
pub async fn summary(
    State(state): State<AppState>,
    _auth: Authorized<policy::ViewStock>,
    Query(query): Query<ListQuery>,
    Query(filter): Query<StockFilter>,
) -> Result<ApiResponse<Vec<StockSummary>>> {
    let (rows, total) = StockLotRepository::new(state.pool())
        .summary(&query, &filter)
        .await?;
    Ok(ApiResponse::page(rows, total, &query))
}

/// Move stock between locations, oldest lots first.
pub async fn transfer(
    State(state): State<AppState>,
    auth: Authorized<policy::TransferStock>,
    Json(input): Json<TransferInput>,
) -> Result<ApiResponse<Transfer>> {
    let transfer = StockService::new(state.pool())
        .transfer(&input, auth.user.id)
        .await?;
    Ok(ApiResponse::created(transfer).with_message("Stock transferred"))
}
