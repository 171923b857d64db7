//! Monetary amounts using decimal arithmetic.
//!
//! Every price, discount, payment and balance in Shelfwise is a [`Money`]. The
//! store runs in a single currency, so the type carries only the amount, kept
//! at two decimal places.

use core::fmt;
use core::iter::Sum;
use core::ops::{Add, AddAssign, Sub, SubAssign};

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// A monetary amount in the store currency's standard unit (e.g. dollars).
///
/// Serialized as a decimal string (`"12.50"`) so clients never see binary
/// floating point. Deserializing rounds to cents; the range is checked where
/// an amount is used, see [`Money::is_in_range`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Money(Decimal);

/// An amount does not fit the stored `NUMERIC(12, 2)` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("amount is outside the supported range")]
pub struct MoneyRangeError;

impl Money {
    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Largest storable amount, `9999999999.99`.
    pub const MAX: Self = Self(Decimal::from_parts(0xD4A5_0FFF, 0xE8, 0, false, 2));

    /// Number of decimal places amounts are rounded to.
    pub const SCALE: u32 = 2;

    /// Create an amount from a decimal value, rounded half-away-from-zero to cents.
    #[must_use]
    pub fn new(amount: Decimal) -> Self {
        Self(amount.round_dp_with_strategy(Self::SCALE, RoundingStrategy::MidpointAwayFromZero))
    }

    /// Like [`Money::new`], but rejects amounts outside `[-MAX, MAX]`.
    ///
    /// # Errors
    ///
    /// Returns `MoneyRangeError` when the rounded amount cannot be stored.
    pub fn try_new(amount: Decimal) -> Result<Self, MoneyRangeError> {
        let money = Self::new(amount);
        if money.is_in_range() {
            Ok(money)
        } else {
            Err(MoneyRangeError)
        }
    }

    /// Whether the amount fits the stored column.
    #[must_use]
    pub fn is_in_range(&self) -> bool {
        self.0.abs() <= Self::MAX.0
    }

    /// Add, returning `None` when the sum leaves `[-MAX, MAX]`.
    #[must_use]
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0.checked_add(rhs.0).map(Self).filter(Self::is_in_range)
    }

    /// Multiply a unit amount by a quantity, returning `None` when the product
    /// leaves `[-MAX, MAX]`.
    #[must_use]
    pub fn checked_times(self, quantity: i32) -> Option<Self> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .map(Self)
            .filter(Self::is_in_range)
    }

    /// Create an amount from a whole number of units.
    #[must_use]
    pub fn whole(units: i64) -> Self {
        Self(Decimal::from(units))
    }

    /// Create an amount from minor units (cents).
    #[must_use]
    pub fn from_minor(cents: i64) -> Self {
        Self(Decimal::new(cents, Self::SCALE))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// Whether the amount is below zero.
    #[must_use]
    pub fn is_negative(&self) -> bool {
        self.0.is_sign_negative() && !self.0.is_zero()
    }

    /// Whether the amount is exactly zero.
    #[must_use]
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Multiply a unit amount by a quantity.
    #[must_use]
    pub fn times(self, quantity: i32) -> Self {
        Self(self.0 * Decimal::from(quantity))
    }

    /// Take `percent` percent of this amount, rounded to cents.
    #[must_use]
    pub fn percent(self, percent: Decimal) -> Self {
        Self::new(self.0 * percent / Decimal::ONE_HUNDRED)
    }

    /// Restrict the amount to `[min, max]`.
    #[must_use]
    pub fn clamp_to(self, min: Self, max: Self) -> Self {
        if self < min {
            min
        } else if self > max {
            max
        } else {
            self
        }
    }

    /// Subtract, flooring the result at zero.
    #[must_use]
    pub fn saturating_sub(self, other: Self) -> Self {
        if other >= self {
            Self::ZERO
        } else {
            Self(self.0 - other.0)
        }
    }
}

impl From<Decimal> for Money {
    fn from(amount: Decimal) -> Self {
        Self::new(amount)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        <Decimal as Deserialize>::deserialize(deserializer).map(Self::new)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl Add for Money {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Money {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Money {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Add::add)
    }
}

impl<'a> Sum<&'a Self> for Money {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// SQLx support (with postgres feature): stored as NUMERIC(12, 2)
#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Money {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Money {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self(amount))
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Money {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_times_and_sum() {
        let lines = [Money::whole(100).times(2), Money::whole(50).times(1)];
        let subtotal: Money = lines.iter().sum();
        assert_eq!(subtotal, Money::whole(250));
    }

    #[test]
    fn test_new_rounds_to_cents() {
        let m = Money::new(Decimal::new(10_005, 3)); // 10.005
        assert_eq!(m, Money::from_minor(1001));
    }

    #[test]
    fn test_percent() {
        assert_eq!(
            Money::whole(250).percent(Decimal::new(10, 0)),
            Money::whole(25)
        );
        assert_eq!(
            Money::from_minor(999).percent(Decimal::new(15, 0)),
            Money::from_minor(150)
        );
    }

    #[test]
    fn test_clamp_to() {
        let max = Money::whole(100);
        assert_eq!(Money::whole(-5).clamp_to(Money::ZERO, max), Money::ZERO);
        assert_eq!(Money::whole(150).clamp_to(Money::ZERO, max), max);
        assert_eq!(Money::whole(40).clamp_to(Money::ZERO, max), Money::whole(40));
    }

    #[test]
    fn test_saturating_sub() {
        assert_eq!(Money::whole(30).saturating_sub(Money::whole(50)), Money::ZERO);
        assert_eq!(Money::whole(50).saturating_sub(Money::whole(30)), Money::whole(20));
    }

    #[test]
    fn test_is_negative() {
        assert!(Money::whole(-1).is_negative());
        assert!(!Money::ZERO.is_negative());
        assert!(!Money::whole(1).is_negative());
    }

    #[test]
    fn test_serializes_as_string() {
        let json = serde_json::to_string(&Money::from_minor(1250)).unwrap();
        assert_eq!(json, "\"12.50\"");
        let parsed: Money = serde_json::from_str("\"12.50\"").unwrap();
        assert_eq!(parsed, Money::from_minor(1250));
    }

    #[test]
    fn test_deserialize_rounds_to_cents() {
        let discount: Money = serde_json::from_str("\"20.005\"").unwrap();
        assert_eq!(discount, Money::from_minor(2001));
        let payment: Money = serde_json::from_str("\"0.004\"").unwrap();
        assert_eq!(payment, Money::ZERO);
    }

    #[test]
    fn test_range() {
        assert_eq!(Money::MAX.to_string(), "9999999999.99");
        assert!(Money::MAX.is_in_range());
        assert!(Money::new(-Money::MAX.amount()).is_in_range());
        assert!(!Money::new(Decimal::MAX).is_in_range());
        assert_eq!(Money::try_new(Decimal::MAX), Err(MoneyRangeError));
        assert_eq!(
            Money::try_new(Decimal::new(1_999, 3)),
            Ok(Money::from_minor(200))
        );
    }

    #[test]
    fn test_checked_arithmetic() {
        assert_eq!(Money::MAX.checked_add(Money::from_minor(1)), None);
        assert_eq!(
            Money::whole(2).checked_add(Money::whole(3)),
            Some(Money::whole(5))
        );
        assert_eq!(Money::MAX.checked_times(2), None);
        assert_eq!(Money::whole(50).checked_times(3), Some(Money::whole(150)));
        let huge = Money::new(Decimal::MAX);
        assert_eq!(huge.checked_add(huge), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::whole(230).to_string(), "230.00");
    }
}
