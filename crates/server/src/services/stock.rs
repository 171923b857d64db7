//! Stock service: receiving, FIFO allocation and transfers.
//!
//! [`allocate`] and [`transfer_on`] take the caller's connection so that a
//! sale, an order cancellation or a demand fulfilment can include them in its
//! own transaction. Nothing here commits on behalf of a caller.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use thiserror::Error;
use tracing::instrument;

use shelfwise_core::fifo::{AllocationError, LotAvailability, plan_fifo};
use shelfwise_core::{LocationRef, Money, ProductId, StockLotId, UserId};

use crate::db::RepositoryError;
use crate::db::{locations, products, stock};
use crate::models::stock::{
    NewLot, ReceiveStockInput, StockLot, Transfer, TransferInput, TransferredLot,
};

/// Errors from stock operations.
#[derive(Debug, Error)]
pub enum StockError {
    #[error("quantity must be positive, got {0}")]
    InvalidQuantity(i32),

    #[error("{0} must be a non-negative amount within the supported range")]
    InvalidAmount(&'static str),

    #[error(
        "insufficient stock for product {product_id}: requested {requested}, available {available}"
    )]
    InsufficientStock {
        product_id: ProductId,
        requested: i32,
        available: i64,
    },

    #[error("product {0} does not exist")]
    UnknownProduct(ProductId),

    #[error("location {0} does not exist or is inactive")]
    UnknownLocation(LocationRef),

    #[error("source and destination locations must differ")]
    SameLocation,

    #[error("stock lot {0} changed during allocation")]
    LotContention(StockLotId),

    #[error("stock lot {0} has already been drawn from")]
    LotInUse(StockLotId),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for StockError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

fn check_amount(field: &'static str, amount: Money) -> Result<(), StockError> {
    if amount.is_negative() || !amount.is_in_range() {
        return Err(StockError::InvalidAmount(field));
    }
    Ok(())
}

/// Units drawn from one lot by [`allocate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawnLot {
    pub lot_id: StockLotId,
    pub quantity: i32,
    pub entry_date: DateTime<Utc>,
    pub unit_cost: Money,
    pub unit_price: Money,
}

fn allocation_error(product_id: ProductId, err: AllocationError) -> StockError {
    match err {
        AllocationError::NonPositiveQuantity(quantity) => StockError::InvalidQuantity(quantity),
        AllocationError::Insufficient {
            requested,
            available,
        } => StockError::InsufficientStock {
            product_id,
            requested,
            available,
        },
    }
}

/// Draw `requested` units of `product_id` at `location`, oldest lots first.
///
/// Open lots are locked for the rest of the caller's transaction, the draw is
/// planned, then each lot is decremented with a guarded update.
///
/// # Errors
///
/// Returns `StockError::InvalidQuantity` for `requested <= 0`,
/// `StockError::InsufficientStock` when the open lots hold too little (no lot
/// is touched), and `StockError::LotContention` if a guarded decrement fails.
/// On any error the caller must drop its transaction.
pub async fn allocate(
    conn: &mut PgConnection,
    product_id: ProductId,
    location: LocationRef,
    requested: i32,
) -> Result<Vec<DrawnLot>, StockError> {
    if requested <= 0 {
        return Err(StockError::InvalidQuantity(requested));
    }

    let lots = stock::lock_available(&mut *conn, product_id, location).await?;
    let availability: Vec<LotAvailability> = lots.iter().map(stock::LockedLot::availability).collect();
    let plan = plan_fifo(&availability, requested).map_err(|e| allocation_error(product_id, e))?;

    let mut drawn = Vec::with_capacity(plan.len());
    for draw in plan {
        if !stock::decrement(&mut *conn, draw.lot_id, draw.quantity).await? {
            return Err(StockError::LotContention(draw.lot_id));
        }
        if let Some(lot) = lots.iter().find(|lot| lot.id == draw.lot_id) {
            drawn.push(DrawnLot {
                lot_id: lot.id,
                quantity: draw.quantity,
                entry_date: lot.entry_date,
                unit_cost: lot.unit_cost,
                unit_price: lot.unit_price,
            });
        }
    }

    tracing::debug!(%product_id, %location, requested, lots = drawn.len(), "Stock allocated");
    Ok(drawn)
}

async fn require_location(conn: &mut PgConnection, location: LocationRef) -> Result<(), StockError> {
    if locations::is_active(conn, location).await? {
        Ok(())
    } else {
        Err(StockError::UnknownLocation(location))
    }
}

/// Move `input.quantity` units from one location to another on `conn`.
///
/// Source lots are drawn FIFO. Each drawn portion becomes a new lot at the
/// destination that keeps the source lot's entry date and unit cost, so the
/// moved units keep their place in FIFO order.
///
/// # Errors
///
/// Returns `StockError::SameLocation`, `StockError::UnknownLocation`,
/// `StockError::UnknownProduct`, or any error from [`allocate`].
pub async fn transfer_on(
    conn: &mut PgConnection,
    input: &TransferInput,
    user: UserId,
) -> Result<Transfer, StockError> {
    if input.quantity <= 0 {
        return Err(StockError::InvalidQuantity(input.quantity));
    }
    if input.from == input.to {
        return Err(StockError::SameLocation);
    }
    require_location(&mut *conn, input.from).await?;
    require_location(&mut *conn, input.to).await?;
    if products::get_on(&mut *conn, input.product_id).await?.is_none() {
        return Err(StockError::UnknownProduct(input.product_id));
    }

    let drawn = allocate(&mut *conn, input.product_id, input.from, input.quantity).await?;

    let mut lots = Vec::with_capacity(drawn.len());
    for source in drawn {
        let destination = stock::insert(
            &mut *conn,
            &NewLot {
                product_id: input.product_id,
                location: input.to,
                quantity: source.quantity,
                entry_date: source.entry_date,
                unit_cost: source.unit_cost,
                unit_price: source.unit_price,
                vendor_id: None,
                reference: input.reference.clone(),
                created_by: user,
            },
        )
        .await?;

        lots.push(TransferredLot {
            source_lot_id: source.lot_id,
            destination_lot_id: destination.id,
            quantity: source.quantity,
        });
    }

    Ok(Transfer {
        product_id: input.product_id,
        from: input.from,
        to: input.to,
        quantity: input.quantity,
        lots,
    })
}

/// Stock service for operations that own their transaction.
pub struct StockService<'a> {
    pool: &'a PgPool,
}

impl<'a> StockService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Receive a new lot.
    ///
    /// # Errors
    ///
    /// Returns `StockError::InvalidQuantity`, `StockError::UnknownProduct` or
    /// `StockError::UnknownLocation` for invalid input.
    #[instrument(skip(self, input), fields(product_id = %input.product_id, location = %input.location))]
    pub async fn receive(
        &self,
        input: &ReceiveStockInput,
        user: UserId,
    ) -> Result<StockLot, StockError> {
        if input.quantity <= 0 {
            return Err(StockError::InvalidQuantity(input.quantity));
        }
        check_amount("unitCost", input.unit_cost)?;
        if let Some(price) = input.unit_price {
            check_amount("unitPrice", price)?;
        }

        let mut tx = self.pool.begin().await?;

        let product = products::get_on(&mut tx, input.product_id)
            .await?
            .ok_or(StockError::UnknownProduct(input.product_id))?;
        require_location(&mut tx, input.location).await?;

        let lot = stock::insert(
            &mut tx,
            &NewLot {
                product_id: product.id,
                location: input.location,
                quantity: input.quantity,
                entry_date: input.entry_date.unwrap_or_else(Utc::now),
                unit_cost: input.unit_cost,
                unit_price: input.unit_price.unwrap_or(product.unit_price),
                vendor_id: input.vendor_id,
                reference: input.reference.clone(),
                created_by: user,
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(lot_id = %lot.id, quantity = lot.quantity, "Stock received");
        Ok(lot)
    }

    /// Transfer stock between two locations in one transaction.
    ///
    /// # Errors
    ///
    /// See [`transfer_on`]. Nothing is persisted on error.
    #[instrument(skip(self, input), fields(product_id = %input.product_id, from = %input.from, to = %input.to))]
    pub async fn transfer(&self, input: &TransferInput, user: UserId) -> Result<Transfer, StockError> {
        let mut tx = self.pool.begin().await?;
        let transfer = transfer_on(&mut tx, input, user).await.inspect_err(|e| {
            tracing::warn!(error = %e, "Transfer rejected");
        })?;
        tx.commit().await?;

        tracing::info!(quantity = transfer.quantity, lots = transfer.lots.len(), "Stock transferred");
        Ok(transfer)
    }

    /// Delete a lot nothing has been drawn from.
    ///
    /// # Errors
    ///
    /// Returns `StockError::LotInUse` once any unit has left the lot, and
    /// `StockError::Repository(RepositoryError::NotFound)` for unknown lots.
    #[instrument(skip(self))]
    pub async fn delete_lot(&self, id: StockLotId) -> Result<(), StockError> {
        let mut tx = self.pool.begin().await?;

        let lot = stock::get_for_update(&mut tx, id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        if !lot.is_untouched() {
            return Err(StockError::LotInUse(id));
        }
        stock::delete(&mut tx, id).await?;

        tx.commit().await?;

        tracing::info!(lot_id = %id, "Stock lot deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_error_mapping() {
        let err = allocation_error(
            ProductId::new(7),
            AllocationError::Insufficient {
                requested: 5,
                available: 2,
            },
        );
        assert_eq!(
            err.to_string(),
            "insufficient stock for product 7: requested 5, available 2"
        );

        let err = allocation_error(ProductId::new(7), AllocationError::NonPositiveQuantity(0));
        assert!(matches!(err, StockError::InvalidQuantity(0)));
    }

    #[test]
    fn test_receipt_amounts_checked() {
        assert!(check_amount("unitCost", Money::from_minor(1050)).is_ok());
        assert!(matches!(
            check_amount("unitCost", Money::whole(-1)),
            Err(StockError::InvalidAmount("unitCost"))
        ));
        assert!(matches!(
            check_amount("unitPrice", Money::new(rust_decimal::Decimal::MAX)),
            Err(StockError::InvalidAmount("unitPrice"))
        ));
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            StockError::UnknownLocation(LocationRef {
                kind: shelfwise_core::LocationKind::Outlet,
                id: 3
            })
            .to_string(),
            "location outlet:3 does not exist or is inactive"
        );
        assert_eq!(
            StockError::LotInUse(StockLotId::new(9)).to_string(),
            "stock lot 9 has already been drawn from"
        );
    }
}
