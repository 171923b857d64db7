//! Sale and order totals.
//!
//! Totals are always recomputed on the server from resolved unit prices; any
//! totals a client sends are ignored. The rules:
//!
//! - `subtotal = Σ unit_price × quantity`
//! - the discount is clamped to `[0, subtotal]`
//! - `total = subtotal − discount`
//! - payments above the total are accepted only as change handed back in cash
//! - `due = total − (paid − change)`, never negative
//! - every amount, including the subtotal and the sum of payments, must fit
//!   [`Money::MAX`]

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Money;

/// How a payment was tendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Cash,
    Card,
    MobileBanking,
    BankTransfer,
}

/// One tendered payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub method: PaymentMethod,
    pub amount: Money,
}

/// A priced line ready for totalling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineInput {
    pub unit_price: Money,
    pub quantity: i32,
}

impl LineInput {
    /// `unit_price × quantity`.
    #[must_use]
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}

/// A discount before it is evaluated against a subtotal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscountRule {
    /// A fixed amount off.
    Amount(Money),
    /// A percentage of the subtotal.
    Percentage(Decimal),
}

impl DiscountRule {
    /// The discount for `subtotal`, clamped to `[0, subtotal]`.
    #[must_use]
    pub fn amount_for(&self, subtotal: Money) -> Money {
        let raw = match *self {
            Self::Amount(amount) => amount,
            Self::Percentage(percent) => {
                subtotal.percent(percent.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED))
            }
        };
        raw.clamp_to(Money::ZERO, subtotal)
    }
}

/// Computed totals for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Settlement {
    pub subtotal: Money,
    pub discount: Money,
    pub total: Money,
    pub paid: Money,
    pub change: Money,
    pub due: Money,
}

/// Result of applying a later payment to an outstanding due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DueCollection {
    /// Portion of the payment that reduced the due.
    pub applied: Money,
    /// Cash handed back.
    pub change: Money,
    /// Due after the payment.
    pub remaining: Money,
}

/// Totals validation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TotalsError {
    #[error("at least one line item is required")]
    EmptyCart,

    #[error("line {index}: quantity must be positive")]
    NonPositiveQuantity { index: usize },

    #[error("line {index}: unit price cannot be negative")]
    NegativePrice { index: usize },

    #[error("payment {index}: amount cannot be negative")]
    NegativePayment { index: usize },

    #[error("payment amount must be positive")]
    NonPositivePayment,

    #[error("payments of {paid} exceed the total of {total}")]
    PaymentExceedsTotal { paid: Money, total: Money },

    #[error("amount is outside the supported range")]
    AmountOutOfRange,
}

fn sum_checked(amounts: impl IntoIterator<Item = Option<Money>>) -> Result<Money, TotalsError> {
    amounts
        .into_iter()
        .try_fold(Money::ZERO, |acc, amount| amount.and_then(|a| acc.checked_add(a)))
        .ok_or(TotalsError::AmountOutOfRange)
}

/// Compute the settlement for `lines`, an optional discount and `payments`.
///
/// # Errors
///
/// Returns a `TotalsError` when there are no lines, a line has a non-positive
/// quantity or negative price, a payment is negative, an amount or sum leaves
/// the storable range, or the payments exceed the total by more than the cash
/// tendered.
pub fn settle(
    lines: &[LineInput],
    discount: Option<DiscountRule>,
    payments: &[Payment],
) -> Result<Settlement, TotalsError> {
    if lines.is_empty() {
        return Err(TotalsError::EmptyCart);
    }

    for (index, line) in lines.iter().enumerate() {
        if line.quantity <= 0 {
            return Err(TotalsError::NonPositiveQuantity { index });
        }
        if line.unit_price.is_negative() {
            return Err(TotalsError::NegativePrice { index });
        }
    }

    if let Some(index) = payments.iter().position(|p| p.amount.is_negative()) {
        return Err(TotalsError::NegativePayment { index });
    }

    let subtotal = sum_checked(
        lines
            .iter()
            .map(|line| line.unit_price.checked_times(line.quantity)),
    )?;
    let discount = discount.map_or(Money::ZERO, |rule| rule.amount_for(subtotal));
    let total = subtotal - discount;

    let paid = sum_checked(
        payments
            .iter()
            .map(|p| Some(p.amount).filter(Money::is_in_range)),
    )?;
    let change = change_for(payments, paid, total)?;
    let due = total.saturating_sub(paid - change);

    Ok(Settlement {
        subtotal,
        discount,
        total,
        paid,
        change,
        due,
    })
}

/// Apply a later payment against an outstanding `due`.
///
/// # Errors
///
/// Returns `TotalsError::NonPositivePayment` for a zero or negative amount and
/// `TotalsError::PaymentExceedsTotal` when a non-cash payment exceeds the due.
/// Amounts that cannot be stored give `TotalsError::AmountOutOfRange`.
pub fn collect_due(due: Money, payment: Payment) -> Result<DueCollection, TotalsError> {
    if payment.amount.is_negative() || payment.amount.is_zero() {
        return Err(TotalsError::NonPositivePayment);
    }
    if !payment.amount.is_in_range() {
        return Err(TotalsError::AmountOutOfRange);
    }

    let change = change_for(std::slice::from_ref(&payment), payment.amount, due)?;
    let applied = payment.amount - change;

    Ok(DueCollection {
        applied,
        change,
        remaining: due.saturating_sub(applied),
    })
}

fn change_for(payments: &[Payment], paid: Money, total: Money) -> Result<Money, TotalsError> {
    if paid <= total {
        return Ok(Money::ZERO);
    }

    let excess = paid - total;
    let cash: Money = payments
        .iter()
        .filter(|p| p.method == PaymentMethod::Cash)
        .map(|p| p.amount)
        .sum();

    if cash >= excess {
        Ok(excess)
    } else {
        Err(TotalsError::PaymentExceedsTotal { paid, total })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn line(price: i64, quantity: i32) -> LineInput {
        LineInput {
            unit_price: Money::whole(price),
            quantity,
        }
    }

    fn pay(method: PaymentMethod, amount: i64) -> Payment {
        Payment {
            method,
            amount: Money::whole(amount),
        }
    }

    #[test]
    fn test_partial_payment_leaves_due() {
        let lines = [line(100, 2), line(50, 1)];
        let s = settle(
            &lines,
            Some(DiscountRule::Amount(Money::whole(20))),
            &[pay(PaymentMethod::Cash, 200)],
        )
        .unwrap();

        assert_eq!(s.subtotal, Money::whole(250));
        assert_eq!(s.discount, Money::whole(20));
        assert_eq!(s.total, Money::whole(230));
        assert_eq!(s.paid, Money::whole(200));
        assert_eq!(s.change, Money::ZERO);
        assert_eq!(s.due, Money::whole(30));
    }

    #[test]
    fn test_discount_clamped_to_subtotal() {
        let s = settle(&[line(40, 1)], Some(DiscountRule::Amount(Money::whole(75))), &[]).unwrap();
        assert_eq!(s.discount, Money::whole(40));
        assert_eq!(s.total, Money::ZERO);
        assert_eq!(s.due, Money::ZERO);

        let s = settle(&[line(40, 1)], Some(DiscountRule::Amount(Money::whole(-5))), &[]).unwrap();
        assert_eq!(s.discount, Money::ZERO);
    }

    #[test]
    fn test_percentage_discount() {
        let s = settle(
            &[line(100, 2), line(50, 1)],
            Some(DiscountRule::Percentage(Decimal::new(10, 0))),
            &[],
        )
        .unwrap();
        assert_eq!(s.discount, Money::whole(25));
        assert_eq!(s.total, Money::whole(225));
        assert_eq!(s.due, Money::whole(225));

        let s = settle(&[line(10, 1)], Some(DiscountRule::Percentage(Decimal::new(150, 0))), &[])
            .unwrap();
        assert_eq!(s.total, Money::ZERO);
    }

    #[test]
    fn test_cash_overpayment_becomes_change() {
        let s = settle(
            &[line(95, 1)],
            None,
            &[pay(PaymentMethod::Card, 50), pay(PaymentMethod::Cash, 50)],
        )
        .unwrap();
        assert_eq!(s.paid, Money::whole(100));
        assert_eq!(s.change, Money::whole(5));
        assert_eq!(s.due, Money::ZERO);
    }

    #[test]
    fn test_card_overpayment_rejected() {
        let err = settle(&[line(95, 1)], None, &[pay(PaymentMethod::Card, 100)]).unwrap_err();
        assert_eq!(
            err,
            TotalsError::PaymentExceedsTotal {
                paid: Money::whole(100),
                total: Money::whole(95)
            }
        );
    }

    #[test]
    fn test_validation_errors() {
        assert_eq!(settle(&[], None, &[]), Err(TotalsError::EmptyCart));
        assert_eq!(
            settle(&[line(10, 1), line(10, 0)], None, &[]),
            Err(TotalsError::NonPositiveQuantity { index: 1 })
        );
        assert_eq!(
            settle(&[line(-1, 1)], None, &[]),
            Err(TotalsError::NegativePrice { index: 0 })
        );
        assert_eq!(
            settle(&[line(10, 1)], None, &[pay(PaymentMethod::Cash, -1)]),
            Err(TotalsError::NegativePayment { index: 0 })
        );
    }

    #[test]
    fn test_sub_cent_amounts_settle_in_cents() {
        let discount: Money = serde_json::from_str("\"20.005\"").unwrap();
        let payment: Payment =
            serde_json::from_str(r#"{"method":"card","amount":"0.004"}"#).unwrap();
        let s = settle(
            &[line(100, 2), line(50, 1)],
            Some(DiscountRule::Amount(discount)),
            &[payment],
        )
        .unwrap();

        assert_eq!(s.discount, Money::from_minor(2001));
        assert_eq!(s.total, Money::from_minor(22999));
        assert_eq!(s.paid, Money::ZERO);
        assert_eq!(s.due, s.total - s.paid);
    }

    #[test]
    fn test_huge_amounts_rejected() {
        let huge = Payment {
            method: PaymentMethod::Cash,
            amount: Money::new(Decimal::MAX),
        };
        assert_eq!(
            settle(&[line(10, 1)], None, &[huge, huge]),
            Err(TotalsError::AmountOutOfRange)
        );

        let near_max = Payment {
            method: PaymentMethod::Cash,
            amount: Money::MAX,
        };
        assert_eq!(
            settle(&[line(10, 1)], None, &[near_max, near_max]),
            Err(TotalsError::AmountOutOfRange)
        );

        let pricey = LineInput {
            unit_price: Money::MAX,
            quantity: 2,
        };
        assert_eq!(settle(&[pricey], None, &[]), Err(TotalsError::AmountOutOfRange));

        assert_eq!(
            collect_due(Money::whole(30), huge),
            Err(TotalsError::AmountOutOfRange)
        );
    }

    #[test]
    fn test_percentage_over_hundred_is_clamped() {
        let rule = DiscountRule::Percentage(Decimal::MAX);
        assert_eq!(rule.amount_for(Money::whole(80)), Money::whole(80));
    }

    #[test]
    fn test_collect_due() {
        let c = collect_due(Money::whole(30), pay(PaymentMethod::Card, 20)).unwrap();
        assert_eq!(c.applied, Money::whole(20));
        assert_eq!(c.remaining, Money::whole(10));

        let c = collect_due(Money::whole(30), pay(PaymentMethod::Cash, 50)).unwrap();
        assert_eq!(c.applied, Money::whole(30));
        assert_eq!(c.change, Money::whole(20));
        assert_eq!(c.remaining, Money::ZERO);

        assert!(collect_due(Money::whole(30), pay(PaymentMethod::Card, 50)).is_err());
        assert_eq!(
            collect_due(Money::whole(30), pay(PaymentMethod::Cash, 0)),
            Err(TotalsError::NonPositivePayment)
        );
    }
}
