//! Sale and order finalization.
//!
//! A sale or order is priced, settled, drawn from stock, numbered and stored
//! inside a single transaction. The order of checks matters:
//!
//! 1. prices are read from the catalog (client totals are never trusted)
//! 2. the discount is resolved and the payments are settled
//! 3. every line is drawn FIFO from the document's location, in product id
//!    order so that concurrent documents lock lots in the same sequence
//! 4. the daily counter issues the document number
//! 5. header, lines and allocations are written, then the transaction commits
//!
//! Payment problems surface before any stock moves, and a failure at any step
//! drops the transaction, which returns every lot and the counter to where
//! they were.

use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use shelfwise_core::numbering::{date_key, document_number};
use shelfwise_core::totals::{DiscountRule, LineInput, Payment, TotalsError, collect_due, settle};
use shelfwise_core::{
    CustomerId, DocumentId, DocumentKind, DocumentStatus, LocationRef, ProductId,
    StatusTransitionError, UserId,
};

use crate::db::RepositoryError;
use crate::db::documents::{self, NewDocument, NewLine};
use crate::db::products::ProductPrice;
use crate::db::{counters, customers, discounts, locations, products, stock};
use crate::models::document::{Allocation, DocumentDraft, DraftItem};
use crate::models::stock::NewLot;
use crate::models::{Document, DocumentDetail};
use crate::services::stock::{StockError, allocate};

/// Errors from sale and order operations.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Totals(#[from] TotalsError),

    #[error("line {index}: {source}")]
    Line { index: usize, source: StockError },

    #[error(transparent)]
    Status(#[from] StatusTransitionError),

    #[error("line {index}: product {product_id} does not exist")]
    UnknownProduct { index: usize, product_id: ProductId },

    #[error("line {index}: product {product_id} is not for sale")]
    InactiveProduct { index: usize, product_id: ProductId },

    #[error("customer {0} does not exist")]
    UnknownCustomer(CustomerId),

    #[error("location {0} does not exist or is inactive")]
    UnknownLocation(LocationRef),

    #[error("discount code {0:?} is not valid")]
    InvalidDiscountCode(String),

    #[error("send either a discount amount or a discount code, not both")]
    ConflictingDiscount,

    #[error("nothing is due on this sale")]
    NothingDue,

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for DocumentError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

/// Price each draft item from the catalog.
fn price_lines(
    items: &[DraftItem],
    prices: &HashMap<ProductId, ProductPrice>,
) -> Result<Vec<LineInput>, DocumentError> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let price = prices
                .get(&item.product_id)
                .ok_or(DocumentError::UnknownProduct {
                    index,
                    product_id: item.product_id,
                })?;
            if !price.is_active {
                return Err(DocumentError::InactiveProduct {
                    index,
                    product_id: item.product_id,
                });
            }
            Ok(LineInput {
                unit_price: price.unit_price,
                quantity: item.quantity,
            })
        })
        .collect()
}

/// Lines in the order their lots are locked: by product id, then position.
fn allocation_order(items: &[DraftItem]) -> Vec<(usize, &DraftItem)> {
    let mut order: Vec<(usize, &DraftItem)> = items.iter().enumerate().collect();
    order.sort_by_key(|&(index, item)| (item.product_id, index));
    order
}

/// Normalize an optional discount code, rejecting drafts that also carry an amount.
fn discount_code(draft: &DocumentDraft) -> Result<Option<&str>, DocumentError> {
    let code = draft
        .discount_code
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    if code.is_some() && draft.discount.is_some() {
        return Err(DocumentError::ConflictingDiscount);
    }
    Ok(code)
}

/// Service for sales and orders.
pub struct DocumentService<'a> {
    pool: &'a PgPool,
}

impl<'a> DocumentService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Price, settle, allocate, number and persist a sale or order.
    ///
    /// A sale with a customer and an unpaid balance adds that balance to the
    /// customer's accumulated due in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError::Totals` for cart and payment problems,
    /// `DocumentError::Line` naming a line that could not be drawn from stock, and validation variants for unknown references. Nothing
    /// is persisted on error.
    #[instrument(skip(self, draft), fields(location = %draft.location, items = draft.items.len()))]
    pub async fn finalize(
        &self,
        kind: DocumentKind,
        draft: &DocumentDraft,
        created_by: UserId,
    ) -> Result<DocumentDetail, DocumentError> {
        let code = discount_code(draft)?;
        if draft.items.is_empty() {
            return Err(TotalsError::EmptyCart.into());
        }

        let mut tx = self.pool.begin().await?;

        let ids: Vec<ProductId> = draft.items.iter().map(|item| item.product_id).collect();
        let prices: HashMap<ProductId, ProductPrice> = products::prices(&mut tx, &ids)
            .await?
            .into_iter()
            .map(|price| (price.id, price))
            .collect();
        let lines = price_lines(&draft.items, &prices)?;

        let rule = match code {
            Some(code) => {
                let discount = discounts::find_by_code(&mut tx, code)
                    .await?
                    .filter(|d| d.is_redeemable_at(Utc::now()))
                    .ok_or_else(|| DocumentError::InvalidDiscountCode(code.to_string()))?;
                Some(discount.rule())
            }
            None => draft.discount.map(DiscountRule::Amount),
        };

        let settlement = settle(&lines, rule, &draft.payments).inspect_err(|e| {
            tracing::warn!(error = %e, "Settlement rejected");
        })?;

        if !locations::is_active(&mut tx, draft.location).await? {
            return Err(DocumentError::UnknownLocation(draft.location));
        }
        if let Some(customer_id) = draft.customer_id
            && !customers::exists(&mut tx, customer_id).await?
        {
            return Err(DocumentError::UnknownCustomer(customer_id));
        }

        let mut allocations: BTreeMap<usize, Vec<Allocation>> = BTreeMap::new();
        for (index, item) in allocation_order(&draft.items) {
            let drawn = allocate(&mut tx, item.product_id, draft.location, item.quantity)
                .await
                .map_err(|source| {
                    tracing::warn!(index, product_id = %item.product_id, error = %source, "Line allocation failed");
                    DocumentError::Line { index, source }
                })?;
            allocations.insert(
                index,
                drawn
                    .into_iter()
                    .map(|d| Allocation {
                        lot_id: d.lot_id,
                        quantity: d.quantity,
                        unit_cost: d.unit_cost,
                    })
                    .collect(),
            );
        }

        let key = date_key(Utc::now().date_naive());
        let sequence = counters::next_sequence(&mut tx, kind.prefix(), &key).await?;
        let number = document_number(kind, &key, sequence);

        let document = documents::insert_header(
            &mut tx,
            &NewDocument {
                kind,
                number: &number,
                location: draft.location,
                customer_id: draft.customer_id,
                subtotal: settlement.subtotal,
                discount: settlement.discount,
                discount_code: code,
                total: settlement.total,
                paid: settlement.paid,
                change: settlement.change,
                due: settlement.due,
                payments: &draft.payments,
                status: kind.initial_status(),
                note: draft.note.as_deref(),
                created_by,
            },
        )
        .await?;

        let mut stored_lines = Vec::with_capacity(lines.len());
        for ((item, line), line_allocations) in
            draft.items.iter().zip(&lines).zip(allocations.values())
        {
            let stored = documents::insert_line(
                &mut tx,
                document.id,
                &NewLine {
                    product_id: item.product_id,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                    line_total: line.line_total(),
                    allocations: line_allocations,
                },
            )
            .await?;
            stored_lines.push(stored);
        }

        if kind == DocumentKind::Sale
            && let Some(customer_id) = document.customer_id
            && !document.due.is_zero()
        {
            customers::add_due(&mut tx, customer_id, document.due).await?;
        }

        tx.commit().await?;

        tracing::info!(
            document_id = %document.id,
            number = %document.number,
            total = %document.total,
            due = %document.due,
            "{kind} finalized"
        );

        Ok(DocumentDetail {
            document,
            lines: stored_lines,
        })
    }

    /// Apply a later payment to a sale's outstanding due.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError::NothingDue` for settled sales,
    /// `DocumentError::Totals` for non-positive or over-large non-cash payments,
    /// and `RepositoryError::NotFound` for unknown sales.
    #[instrument(skip(self, payment))]
    pub async fn collect_payment(
        &self,
        id: DocumentId,
        payment: Payment,
    ) -> Result<Document, DocumentError> {
        let mut tx = self.pool.begin().await?;

        let sale = documents::lock(&mut tx, DocumentKind::Sale, id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        if sale.due.is_zero() {
            return Err(DocumentError::NothingDue);
        }

        let collection = collect_due(sale.due, payment)?;

        let mut payments = sale.payments.clone();
        payments.push(payment);
        let updated = documents::update_payment(
            &mut tx,
            id,
            sale.paid + payment.amount,
            sale.change + collection.change,
            collection.remaining,
            &payments,
        )
        .await?;

        if let Some(customer_id) = sale.customer_id {
            customers::reduce_due(&mut tx, customer_id, collection.applied).await?;
        }

        tx.commit().await?;

        tracing::info!(
            document_id = %id,
            applied = %collection.applied,
            remaining = %collection.remaining,
            "Due collected"
        );
        Ok(updated)
    }

    /// Move an order through its status workflow.
    ///
    /// Cancelling puts every allocated unit back at the order's location as a
    /// new lot dated now, carrying the original unit cost. Exhausted lots are
    /// never refilled.
    ///
    /// # Errors
    ///
    /// Returns `DocumentError::Status` for transitions the workflow does not
    /// allow and `RepositoryError::NotFound` for unknown orders.
    #[instrument(skip(self))]
    pub async fn update_order_status(
        &self,
        id: DocumentId,
        next: DocumentStatus,
        user: UserId,
    ) -> Result<Document, DocumentError> {
        let mut tx = self.pool.begin().await?;

        let order = documents::lock(&mut tx, DocumentKind::Order, id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let status = order.status.transition_to(next)?;

        if status == DocumentStatus::Cancelled {
            let now = Utc::now();
            let reference = format!("Return of {}", order.number);
            for allocation in documents::allocations(&mut tx, id).await? {
                stock::insert(
                    &mut tx,
                    &NewLot {
                        product_id: allocation.product_id,
                        location: order.location,
                        quantity: allocation.quantity,
                        entry_date: now,
                        unit_cost: allocation.unit_cost,
                        unit_price: allocation.unit_price,
                        vendor_id: None,
                        reference: Some(reference.clone()),
                        created_by: user,
                    },
                )
                .await?;
            }
        }

        let updated = documents::update_status(&mut tx, id, status).await?;
        tx.commit().await?;

        tracing::info!(document_id = %id, from = %order.status, to = %status, "Order status changed");
        Ok(updated)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use shelfwise_core::{LocationKind, Money};

    use super::*;

    fn price(id: i32, whole: i64, is_active: bool) -> (ProductId, ProductPrice) {
        let id = ProductId::new(id);
        (
            id,
            ProductPrice {
                id,
                unit_price: Money::whole(whole),
                is_active,
            },
        )
    }

    fn item(product: i32, quantity: i32) -> DraftItem {
        DraftItem {
            product_id: ProductId::new(product),
            quantity,
        }
    }

    fn draft(discount: Option<Money>, code: Option<&str>) -> DocumentDraft {
        DocumentDraft {
            location: LocationRef {
                kind: LocationKind::Outlet,
                id: 1,
            },
            customer_id: None,
            items: vec![item(1, 2)],
            discount,
            discount_code: code.map(String::from),
            payments: Vec::new(),
            note: None,
        }
    }

    #[test]
    fn test_allocation_order_is_by_product_then_position() {
        let forward = [item(4, 1), item(9, 1)];
        let reverse = [item(9, 1), item(4, 1)];

        let products = |items: &[DraftItem]| -> Vec<i32> {
            allocation_order(items)
                .into_iter()
                .map(|(_, item)| item.product_id.as_i32())
                .collect()
        };
        assert_eq!(products(&forward), vec![4, 9]);
        assert_eq!(products(&reverse), vec![4, 9]);

        let indices: Vec<usize> = allocation_order(&[item(9, 1), item(4, 2), item(9, 3), item(1, 1)])
            .into_iter()
            .map(|(index, _)| index)
            .collect();
        assert_eq!(indices, vec![3, 1, 0, 2]);
    }

    #[test]
    fn test_lines_priced_from_catalog() {
        let prices: HashMap<_, _> = [price(1, 100, true), price(2, 50, true)].into();
        let lines = price_lines(&[item(1, 2), item(2, 1)], &prices).unwrap();
        assert_eq!(lines[0].unit_price, Money::whole(100));

        let settlement = settle(&lines, Some(DiscountRule::Amount(Money::whole(20))), &[]).unwrap();
        assert_eq!(settlement.total, Money::whole(230));
    }

    #[test]
    fn test_unknown_and_inactive_products_name_their_line() {
        let prices: HashMap<_, _> = [price(1, 100, true), price(2, 50, false)].into();

        let err = price_lines(&[item(1, 1), item(3, 1)], &prices).unwrap_err();
        assert!(matches!(err, DocumentError::UnknownProduct { index: 1, .. }));

        let err = price_lines(&[item(2, 1)], &prices).unwrap_err();
        assert_eq!(err.to_string(), "line 0: product 2 is not for sale");
    }

    #[test]
    fn test_discount_amount_and_code_conflict() {
        assert!(matches!(
            discount_code(&draft(Some(Money::whole(5)), Some("SPRING"))),
            Err(DocumentError::ConflictingDiscount)
        ));
        assert_eq!(discount_code(&draft(None, Some(" SPRING "))).unwrap(), Some("SPRING"));
        assert_eq!(discount_code(&draft(Some(Money::whole(5)), Some("  "))).unwrap(), None);
    }

    #[test]
    fn test_line_error_message() {
        let err = DocumentError::Line {
            index: 2,
            source: StockError::InvalidQuantity(0),
        };
        assert_eq!(err.to_string(), "line 2: quantity must be positive, got 0");
    }
}
