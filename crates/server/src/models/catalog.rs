//! Catalog types: products, brands, vendors and discounts.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use shelfwise_core::{BrandId, DiscountId, DiscountKind, Money, ProductId, VendorId};
use shelfwise_core::totals::DiscountRule;

/// A sellable product. Stock is tracked separately in lots.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub sku: String,
    pub barcode: Option<String>,
    pub brand_id: Option<BrandId>,
    pub vendor_id: Option<VendorId>,
    /// Retail price used for every sale and order line.
    pub unit_price: Money,
    pub reorder_level: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Product create/replace payload.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    pub name: String,
    pub sku: String,
    pub barcode: Option<String>,
    pub brand_id: Option<BrandId>,
    pub vendor_id: Option<VendorId>,
    pub unit_price: Money,
    pub reorder_level: Option<i32>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

/// List filters for products.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFilter {
    pub brand_id: Option<i32>,
    pub vendor_id: Option<i32>,
    pub is_active: Option<bool>,
}

/// List filter for resources with an active flag.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveFilter {
    pub is_active: Option<bool>,
}

/// Product brand.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BrandInput {
    pub name: String,
    pub description: Option<String>,
}

/// Supplier that stock lots are received from.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Vendor {
    pub id: VendorId,
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorInput {
    pub name: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

/// A discount code that can be applied to a sale or order.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Discount {
    pub id: DiscountId,
    pub code: String,
    pub kind: DiscountKind,
    /// Percentage (0-100) or fixed amount, depending on `kind`.
    pub value: Decimal,
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Discount {
    /// Whether the code may be used at `now`.
    #[must_use]
    pub fn is_redeemable_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active
            && self.starts_at.is_none_or(|start| start <= now)
            && self.ends_at.is_none_or(|end| now <= end)
    }

    /// The rule to evaluate against a subtotal.
    #[must_use]
    pub fn rule(&self) -> DiscountRule {
        match self.kind {
            DiscountKind::Percentage => DiscountRule::Percentage(self.value),
            DiscountKind::Fixed => DiscountRule::Amount(Money::new(self.value)),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscountInput {
    pub code: String,
    pub kind: DiscountKind,
    pub value: Decimal,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

pub(crate) const fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn discount(kind: DiscountKind, value: i64) -> Discount {
        let now = Utc::now();
        Discount {
            id: DiscountId::new(1),
            code: "SPRING".to_string(),
            kind,
            value: Decimal::new(value, 0),
            is_active: true,
            starts_at: None,
            ends_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_redeemable_window() {
        let now = Utc::now();
        let mut d = discount(DiscountKind::Fixed, 10);
        assert!(d.is_redeemable_at(now));

        d.starts_at = Some(now + Duration::days(1));
        assert!(!d.is_redeemable_at(now));

        d.starts_at = Some(now - Duration::days(2));
        d.ends_at = Some(now - Duration::days(1));
        assert!(!d.is_redeemable_at(now));

        d.ends_at = None;
        d.is_active = false;
        assert!(!d.is_redeemable_at(now));
    }

    #[test]
    fn test_rule_by_kind() {
        let subtotal = Money::whole(200);
        assert_eq!(
            discount(DiscountKind::Percentage, 10).rule().amount_for(subtotal),
            Money::whole(20)
        );
        assert_eq!(
            discount(DiscountKind::Fixed, 500).rule().amount_for(subtotal),
            subtotal
        );
    }
}
