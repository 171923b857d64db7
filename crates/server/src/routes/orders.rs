//! Customer order handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};

use shelfwise_core::permissions::policy;
use shelfwise_core::{DocumentId, DocumentKind};

use crate::db::DocumentRepository;
use crate::error::Result;
use crate::middleware::Authorized;
use crate::models::document::{DocumentDraft, DocumentFilter, StatusUpdate};
use crate::models::{Document, DocumentDetail};
use crate::response::{ApiResponse, ListQuery};
use crate::services::DocumentService;
use crate::state::AppState;

use super::not_found;

pub async fn list(
    State(state): State<AppState>,
    _auth: Authorized<policy::ViewOrders>,
    Query(query): Query<ListQuery>,
    Query(filter): Query<DocumentFilter>,
) -> Result<ApiResponse<Vec<Document>>> {
    let (orders, total) = DocumentRepository::new(state.pool())
        .list(DocumentKind::Order, &query, &filter)
        .await?;
    Ok(ApiResponse::page(orders, total, &query))
}

pub async fn get(
    State(state): State<AppState>,
    _auth: Authorized<policy::ViewOrders>,
    Path(id): Path<DocumentId>,
) -> Result<ApiResponse<DocumentDetail>> {
    let order = DocumentRepository::new(state.pool())
        .get(DocumentKind::Order, id)
        .await?
        .ok_or_else(|| not_found("order", id))?;
    Ok(ApiResponse::ok(order))
}

/// Place an order. Stock is reserved (drawn FIFO) at creation.
pub async fn create(
    State(state): State<AppState>,
    auth: Authorized<policy::CreateOrder>,
    Json(draft): Json<DocumentDraft>,
) -> Result<ApiResponse<DocumentDetail>> {
    let order = DocumentService::new(state.pool())
        .finalize(DocumentKind::Order, &draft, auth.user.id)
        .await?;
    Ok(ApiResponse::created(order).with_message("Order placed"))
}

/// Move an order along its workflow; cancelling puts its stock back.
pub async fn update_status(
    State(state): State<AppState>,
    auth: Authorized<policy::UpdateOrderStatus>,
    Path(id): Path<DocumentId>,
    Json(update): Json<StatusUpdate>,
) -> Result<ApiResponse<Document>> {
    let order = DocumentService::new(state.pool())
        .update_order_status(id, update.status, auth.user.id)
        .await?;
    Ok(ApiResponse::ok(order).with_message("Order status updated"))
}
