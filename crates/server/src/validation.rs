//! Request payload validation helpers.

use rust_decimal::Decimal;
use thiserror::Error;

use shelfwise_core::Money;

/// A payload field failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} {problem}")]
pub struct ValidationError {
    pub field: &'static str,
    pub problem: &'static str,
}

impl ValidationError {
    #[must_use]
    pub const fn new(field: &'static str, problem: &'static str) -> Self {
        Self { field, problem }
    }
}

/// Trim `value` and require it to be non-empty.
///
/// # Errors
///
/// Returns `ValidationError` when the trimmed value is empty.
pub fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::new(field, "is required"));
    }
    Ok(trimmed.to_string())
}

/// Trim an optional value, mapping blank strings to `None`.
#[must_use]
pub fn optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Like [`required`], but `None` passes through (for partial updates).
///
/// # Errors
///
/// Returns `ValidationError` when a present value is blank.
pub fn required_if_present(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<String>, ValidationError> {
    value.map(|v| required(field, v)).transpose()
}

/// Require a non-negative amount that fits the stored column.
///
/// # Errors
///
/// Returns `ValidationError` for negative or oversized amounts.
pub fn non_negative(field: &'static str, amount: Money) -> Result<Money, ValidationError> {
    if amount.is_negative() {
        return Err(ValidationError::new(field, "cannot be negative"));
    }
    if !amount.is_in_range() {
        return Err(ValidationError::new(field, "is too large"));
    }
    Ok(amount)
}

/// Require a percentage in `0..=100`.
///
/// # Errors
///
/// Returns `ValidationError` outside that range.
pub fn percentage(field: &'static str, value: Decimal) -> Result<Decimal, ValidationError> {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(ValidationError::new(field, "must be between 0 and 100"));
    }
    Ok(value)
}

/// Require a strictly positive quantity.
///
/// # Errors
///
/// Returns `ValidationError` for zero or negative quantities.
pub const fn positive(field: &'static str, quantity: i32) -> Result<i32, ValidationError> {
    if quantity <= 0 {
        return Err(ValidationError::new(field, "must be greater than zero"));
    }
    Ok(quantity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_trims() {
        assert_eq!(required("name", "  Tea  "), Ok("Tea".to_string()));
        assert_eq!(
            required("name", "   "),
            Err(ValidationError::new("name", "is required"))
        );
    }

    #[test]
    fn test_optional_blank_is_none() {
        assert_eq!(optional(Some("  ")), None);
        assert_eq!(optional(Some(" x ")), Some("x".to_string()));
        assert_eq!(optional(None), None);
    }

    #[test]
    fn test_required_if_present() {
        assert_eq!(required_if_present("name", None), Ok(None));
        assert!(required_if_present("name", Some("")).is_err());
    }

    #[test]
    fn test_numeric_rules() {
        assert!(non_negative("price", Money::whole(-1)).is_err());
        assert!(non_negative("price", Money::ZERO).is_ok());
        assert!(non_negative("price", Money::MAX).is_ok());
        assert_eq!(
            non_negative("price", Money::new(Decimal::MAX)),
            Err(ValidationError::new("price", "is too large"))
        );
        assert!(percentage("value", Decimal::new(101, 0)).is_err());
        assert!(percentage("value", Decimal::new(-1, 0)).is_err());
        assert!(percentage("value", Decimal::new(15, 0)).is_ok());
        assert!(positive("quantity", 0).is_err());
        assert_eq!(positive("quantity", 3), Ok(3));
    }

    #[test]
    fn test_message() {
        assert_eq!(
            ValidationError::new("sku", "is required").to_string(),
            "sku is required"
        );
    }
}
