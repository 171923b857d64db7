//! Point-of-sale handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};

use shelfwise_core::permissions::policy;
use shelfwise_core::totals::Payment;
use shelfwise_core::{DocumentId, DocumentKind};

use crate::db::DocumentRepository;
use crate::error::Result;
use crate::middleware::Authorized;
use crate::models::document::{DocumentDraft, DocumentFilter};
use crate::models::{Document, DocumentDetail};
use crate::response::{ApiResponse, ListQuery};
use crate::services::DocumentService;
use crate::state::AppState;

use super::not_found;

pub async fn list(
    State(state): State<AppState>,
    _auth: Authorized<policy::ViewSales>,
    Query(query): Query<ListQuery>,
    Query(filter): Query<DocumentFilter>,
) -> Result<ApiResponse<Vec<Document>>> {
    let (sales, total) = DocumentRepository::new(state.pool())
        .list(DocumentKind::Sale, &query, &filter)
        .await?;
    Ok(ApiResponse::page(sales, total, &query))
}

pub async fn get(
    State(state): State<AppState>,
    _auth: Authorized<policy::ViewSales>,
    Path(id): Path<DocumentId>,
) -> Result<ApiResponse<DocumentDetail>> {
    let sale = DocumentRepository::new(state.pool())
        .get(DocumentKind::Sale, id)
        .await?
        .ok_or_else(|| not_found("sale", id))?;
    Ok(ApiResponse::ok(sale))
}

/// Ring up a sale: price, allocate stock FIFO, number and settle it in one
/// transaction.
pub async fn create(
    State(state): State<AppState>,
    auth: Authorized<policy::CreateSale>,
    Json(draft): Json<DocumentDraft>,
) -> Result<ApiResponse<DocumentDetail>> {
    let sale = DocumentService::new(state.pool())
        .finalize(DocumentKind::Sale, &draft, auth.user.id)
        .await?;
    Ok(ApiResponse::created(sale).with_message("Sale completed"))
}

/// Record a payment against a sale's outstanding due.
pub async fn collect_payment(
    State(state): State<AppState>,
    _auth: Authorized<policy::CollectDue>,
    Path(id): Path<DocumentId>,
    Json(payment): Json<Payment>,
) -> Result<ApiResponse<Document>> {
    let sale = DocumentService::new(state.pool())
        .collect_payment(id, payment)
        .await?;
    Ok(ApiResponse::ok(sale).with_message("Payment recorded"))
}
