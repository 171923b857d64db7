//! Demand workflow: outlets request stock from warehouses.
//!
//! `pending → approved → fulfilled`, or `pending → rejected`. Fulfilling a
//! demand transfers the stock from the warehouse to the outlet in the same
//! transaction as the status change, so a demand is never marked fulfilled
//! without the stock having moved.

use sqlx::PgPool;
use thiserror::Error;
use tracing::instrument;

use shelfwise_core::{
    DemandId, DemandStatus, LocationRef, OutletId, ProductId, StatusTransitionError, UserId,
    WarehouseId,
};

use crate::db::RepositoryError;
use crate::db::demands::{self, NewDemand};
use crate::db::{locations, products};
use crate::models::Demand;
use crate::models::demand::DemandInput;
use crate::models::stock::TransferInput;
use crate::services::stock::{StockError, transfer_on};

/// Errors from the demand workflow.
#[derive(Debug, Error)]
pub enum DemandError {
    #[error(transparent)]
    Status(#[from] StatusTransitionError),

    #[error("only pending demands can be changed")]
    NotPending,

    #[error("quantity must be positive, got {0}")]
    InvalidQuantity(i32),

    #[error("outlet {0} does not exist or is inactive")]
    UnknownOutlet(OutletId),

    #[error("warehouse {0} does not exist or is inactive")]
    UnknownWarehouse(WarehouseId),

    #[error("product {0} does not exist")]
    UnknownProduct(ProductId),

    #[error(transparent)]
    Stock(#[from] StockError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<sqlx::Error> for DemandError {
    fn from(err: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(err))
    }
}

/// Service for demand requests.
pub struct DemandService<'a> {
    pool: &'a PgPool,
}

impl<'a> DemandService<'a> {
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// File a pending demand.
    ///
    /// # Errors
    ///
    /// Returns `DemandError::InvalidQuantity` or an unknown-reference variant
    /// for invalid input.
    #[instrument(skip(self, input), fields(outlet_id = %input.outlet_id, product_id = %input.product_id))]
    pub async fn create(&self, input: &DemandInput, user: UserId) -> Result<Demand, DemandError> {
        if input.quantity <= 0 {
            return Err(DemandError::InvalidQuantity(input.quantity));
        }

        let mut tx = self.pool.begin().await?;

        if !locations::is_active(&mut tx, LocationRef::outlet(input.outlet_id)).await? {
            return Err(DemandError::UnknownOutlet(input.outlet_id));
        }
        if !locations::is_active(&mut tx, LocationRef::warehouse(input.warehouse_id)).await? {
            return Err(DemandError::UnknownWarehouse(input.warehouse_id));
        }
        if products::get_on(&mut tx, input.product_id).await?.is_none() {
            return Err(DemandError::UnknownProduct(input.product_id));
        }

        let note = input.note.as_deref().map(str::trim).filter(|n| !n.is_empty());
        let demand = demands::insert(
            &mut tx,
            &NewDemand {
                outlet_id: input.outlet_id,
                warehouse_id: input.warehouse_id,
                product_id: input.product_id,
                quantity: input.quantity,
                note,
                requested_by: user,
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(demand_id = %demand.id, quantity = demand.quantity, "Demand created");
        Ok(demand)
    }

    /// Approve, reject or fulfil a demand.
    ///
    /// # Errors
    ///
    /// Returns `DemandError::Status` for transitions the workflow does not
    /// allow, and `DemandError::Stock` when the warehouse cannot cover a
    /// fulfilment (the demand then stays approved).
    #[instrument(skip(self))]
    pub async fn set_status(
        &self,
        id: DemandId,
        next: DemandStatus,
        user: UserId,
    ) -> Result<Demand, DemandError> {
        let mut tx = self.pool.begin().await?;

        let demand = demands::lock(&mut tx, id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let status = demand.status.transition_to(next)?;

        if status == DemandStatus::Fulfilled {
            let transfer = transfer_on(
                &mut tx,
                &TransferInput {
                    product_id: demand.product_id,
                    from: LocationRef::warehouse(demand.warehouse_id),
                    to: LocationRef::outlet(demand.outlet_id),
                    quantity: demand.quantity,
                    reference: Some(format!("Demand #{}", demand.id)),
                },
                user,
            )
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "Demand fulfilment failed"))?;
            tracing::debug!(lots = transfer.lots.len(), "Demand stock transferred");
        }

        let updated = demands::update_status(&mut tx, id, status, user).await?;
        tx.commit().await?;

        tracing::info!(demand_id = %id, from = %demand.status, to = %status, "Demand status changed");
        Ok(updated)
    }

    /// Withdraw a demand that has not been decided yet.
    ///
    /// # Errors
    ///
    /// Returns `DemandError::NotPending` once the demand has been decided.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: DemandId) -> Result<(), DemandError> {
        let mut tx = self.pool.begin().await?;

        let demand = demands::lock(&mut tx, id)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        if demand.status != DemandStatus::Pending {
            return Err(DemandError::NotPending);
        }
        demands::delete(&mut tx, id).await?;

        tx.commit().await?;

        tracing::info!(demand_id = %id, "Demand deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            DemandError::UnknownWarehouse(WarehouseId::new(4)).to_string(),
            "warehouse 4 does not exist or is inactive"
        );
        assert_eq!(
            DemandError::NotPending.to_string(),
            "only pending demands can be changed"
        );
    }

    #[test]
    fn test_stock_errors_pass_through() {
        let err = DemandError::from(StockError::InsufficientStock {
            product_id: ProductId::new(2),
            requested: 10,
            available: 4,
        });
        assert_eq!(
            err.to_string(),
            "insufficient stock for product 2: requested 10, available 4"
        );
    }
}
