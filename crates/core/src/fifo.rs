//! First-in-first-out lot allocation.
//!
//! Stock for a product at a location is held in lots, each with the date it
//! entered that location. Fulfilling a quantity draws from the oldest lot first,
//! then the next oldest, until the quantity is covered. This module only plans
//! the draw; applying it (row locks and conditional decrements) is the server's
//! job.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::StockLotId;

/// A lot's remaining quantity, as read under lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LotAvailability {
    pub lot_id: StockLotId,
    pub entry_date: DateTime<Utc>,
    pub quantity: i32,
}

/// Quantity to take from a single lot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LotDraw {
    pub lot_id: StockLotId,
    pub quantity: i32,
}

/// Why a quantity could not be allocated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocationError {
    /// Zero or negative quantity requested.
    #[error("quantity must be positive, got {0}")]
    NonPositiveQuantity(i32),

    /// The lots together hold less than requested.
    #[error("insufficient stock: requested {requested}, available {available}")]
    Insufficient { requested: i32, available: i64 },
}

/// Plan a FIFO draw of `requested` units from `lots`.
///
/// Lots are visited by `(entry_date, lot_id)` ascending regardless of input
/// order. Empty lots are skipped. The returned draws sum to `requested`, and no
/// draw exceeds its lot's quantity.
///
/// # Errors
///
/// Returns `AllocationError::NonPositiveQuantity` when `requested <= 0`, and
/// `AllocationError::Insufficient` when the lots cannot cover it. No partial
/// plan is returned.
pub fn plan_fifo(
    lots: &[LotAvailability],
    requested: i32,
) -> Result<Vec<LotDraw>, AllocationError> {
    if requested <= 0 {
        return Err(AllocationError::NonPositiveQuantity(requested));
    }

    let mut ordered: Vec<&LotAvailability> = lots.iter().filter(|l| l.quantity > 0).collect();
    ordered.sort_by_key(|l| (l.entry_date, l.lot_id));

    let mut remaining = requested;
    let mut draws = Vec::new();

    for lot in ordered {
        if remaining == 0 {
            break;
        }
        let take = lot.quantity.min(remaining);
        draws.push(LotDraw {
            lot_id: lot.lot_id,
            quantity: take,
        });
        remaining -= take;
    }

    if remaining > 0 {
        return Err(AllocationError::Insufficient {
            requested,
            available: available(lots),
        });
    }

    Ok(draws)
}

/// Total quantity on hand across `lots`, ignoring non-positive entries.
#[must_use]
pub fn available(lots: &[LotAvailability]) -> i64 {
    lots.iter()
        .filter(|l| l.quantity > 0)
        .map(|l| i64::from(l.quantity))
        .sum()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn lot(id: i32, day: u32, quantity: i32) -> LotAvailability {
        LotAvailability {
            lot_id: StockLotId::new(id),
            entry_date: Utc.with_ymd_and_hms(2026, 3, day, 9, 0, 0).unwrap(),
            quantity,
        }
    }

    #[test]
    fn test_oldest_lot_first() {
        let lots = [lot(1, 10, 5), lot(2, 3, 4), lot(3, 7, 10)];
        let plan = plan_fifo(&lots, 8).unwrap();
        assert_eq!(
            plan,
            vec![
                LotDraw { lot_id: StockLotId::new(2), quantity: 4 },
                LotDraw { lot_id: StockLotId::new(3), quantity: 4 },
            ]
        );
    }

    #[test]
    fn test_draws_sum_to_request_and_respect_lot_sizes() {
        let lots = [lot(1, 1, 3), lot(2, 2, 3), lot(3, 3, 3)];
        let plan = plan_fifo(&lots, 7).unwrap();
        assert_eq!(plan.iter().map(|d| d.quantity).sum::<i32>(), 7);
        for draw in &plan {
            let source = lots.iter().find(|l| l.lot_id == draw.lot_id).unwrap();
            assert!(draw.quantity <= source.quantity);
        }
    }

    #[test]
    fn test_same_date_ties_broken_by_id() {
        let lots = [lot(9, 5, 2), lot(4, 5, 2)];
        let plan = plan_fifo(&lots, 3).unwrap();
        assert_eq!(plan[0].lot_id, StockLotId::new(4));
        assert_eq!(plan[0].quantity, 2);
        assert_eq!(plan[1].lot_id, StockLotId::new(9));
        assert_eq!(plan[1].quantity, 1);
    }

    #[test]
    fn test_skips_empty_lots() {
        let lots = [lot(1, 1, 0), lot(2, 2, 5)];
        let plan = plan_fifo(&lots, 5).unwrap();
        assert_eq!(plan, vec![LotDraw { lot_id: StockLotId::new(2), quantity: 5 }]);
    }

    #[test]
    fn test_exact_fit_uses_no_extra_lots() {
        let lots = [lot(1, 1, 5), lot(2, 2, 5)];
        let plan = plan_fifo(&lots, 5).unwrap();
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn test_insufficient_reports_available() {
        let lots = [lot(1, 1, 2), lot(2, 2, 3)];
        assert_eq!(
            plan_fifo(&lots, 6),
            Err(AllocationError::Insufficient {
                requested: 6,
                available: 5
            })
        );
        assert_eq!(
            plan_fifo(&[], 1),
            Err(AllocationError::Insufficient {
                requested: 1,
                available: 0
            })
        );
    }

    #[test]
    fn test_rejects_non_positive_request() {
        let lots = [lot(1, 1, 2)];
        assert_eq!(plan_fifo(&lots, 0), Err(AllocationError::NonPositiveQuantity(0)));
        assert_eq!(plan_fifo(&lots, -3), Err(AllocationError::NonPositiveQuantity(-3)));
    }
}
