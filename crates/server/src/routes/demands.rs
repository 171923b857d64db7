//! Outlet demand (stock request) handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};

use shelfwise_core::DemandId;
use shelfwise_core::permissions::policy;

use crate::db::DemandRepository;
use crate::error::Result;
use crate::middleware::Authorized;
use crate::models::Demand;
use crate::models::demand::{DemandFilter, DemandInput, DemandStatusUpdate};
use crate::response::{ApiResponse, ListQuery};
use crate::services::DemandService;
use crate::state::AppState;

use super::not_found;

pub async fn list(
    State(state): State<AppState>,
    _auth: Authorized<policy::ViewDemands>,
    Query(query): Query<ListQuery>,
    Query(filter): Query<DemandFilter>,
) -> Result<ApiResponse<Vec<Demand>>> {
    let (demands, total) = DemandRepository::new(state.pool())
        .list(&query, &filter)
        .await?;
    Ok(ApiResponse::page(demands, total, &query))
}

pub async fn get(
    State(state): State<AppState>,
    _auth: Authorized<policy::ViewDemands>,
    Path(id): Path<DemandId>,
) -> Result<ApiResponse<Demand>> {
    let demand = DemandRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| not_found("demand", id))?;
    Ok(ApiResponse::ok(demand))
}

pub async fn create(
    State(state): State<AppState>,
    auth: Authorized<policy::CreateDemand>,
    Json(input): Json<DemandInput>,
) -> Result<ApiResponse<Demand>> {
    let demand = DemandService::new(state.pool())
        .create(&input, auth.user.id)
        .await?;
    Ok(ApiResponse::created(demand).with_message("Demand submitted"))
}

/// Approve, reject or fulfil a demand. Fulfilling transfers the stock from
/// the warehouse to the outlet.
pub async fn update_status(
    State(state): State<AppState>,
    auth: Authorized<policy::DecideDemand>,
    Path(id): Path<DemandId>,
    Json(update): Json<DemandStatusUpdate>,
) -> Result<ApiResponse<Demand>> {
    let demand = DemandService::new(state.pool())
        .set_status(id, update.status, auth.user.id)
        .await?;
    Ok(ApiResponse::ok(demand).with_message("Demand updated"))
}

/// Withdraw a demand that is still pending.
pub async fn delete(
    State(state): State<AppState>,
    _auth: Authorized<policy::CreateDemand>,
    Path(id): Path<DemandId>,
) -> Result<ApiResponse<()>> {
    DemandService::new(state.pool()).delete(id).await?;
    Ok(ApiResponse::message("Demand deleted"))
}
