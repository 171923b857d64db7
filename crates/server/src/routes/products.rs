//! Product catalog handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};

use shelfwise_core::ProductId;
use shelfwise_core::permissions::policy;

use crate::db::ProductRepository;
use crate::db::products::ProductFields;
use crate::error::Result;
use crate::middleware::Authorized;
use crate::models::Product;
use crate::models::catalog::{ProductFilter, ProductInput};
use crate::response::{ApiResponse, ListQuery};
use crate::state::AppState;
use crate::validation::{ValidationError, non_negative, optional, required};

use super::not_found;

/// Owned, validated product fields.
struct ValidProduct {
    name: String,
    sku: String,
    barcode: Option<String>,
    input: ProductInput,
}

impl ValidProduct {
    fn parse(input: ProductInput) -> std::result::Result<Self, ValidationError> {
        let name = required("name", &input.name)?;
        let sku = required("sku", &input.sku)?;
        let barcode = optional(input.barcode.as_deref());
        non_negative("unitPrice", input.unit_price)?;
        if input.reorder_level.is_some_and(|level| level < 0) {
            return Err(ValidationError::new("reorderLevel", "cannot be negative"));
        }
        Ok(Self {
            name,
            sku,
            barcode,
            input,
        })
    }

    fn fields(&self) -> ProductFields<'_> {
        ProductFields {
            name: &self.name,
            sku: &self.sku,
            barcode: self.barcode.as_deref(),
            brand_id: self.input.brand_id,
            vendor_id: self.input.vendor_id,
            unit_price: self.input.unit_price,
            reorder_level: self.input.reorder_level,
            is_active: self.input.is_active,
        }
    }
}

/// List products (`?brandId=&vendorId=&isActive=` plus paging).
pub async fn list(
    State(state): State<AppState>,
    _auth: Authorized<policy::ViewCatalog>,
    Query(query): Query<ListQuery>,
    Query(filter): Query<ProductFilter>,
) -> Result<ApiResponse<Vec<Product>>> {
    let (products, total) = ProductRepository::new(state.pool())
        .list(&query, &filter)
        .await?;
    Ok(ApiResponse::page(products, total, &query))
}

pub async fn get(
    State(state): State<AppState>,
    _auth: Authorized<policy::ViewCatalog>,
    Path(id): Path<ProductId>,
) -> Result<ApiResponse<Product>> {
    let product = ProductRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| not_found("product", id))?;
    Ok(ApiResponse::ok(product))
}

pub async fn create(
    State(state): State<AppState>,
    auth: Authorized<policy::ManageCatalog>,
    Json(input): Json<ProductInput>,
) -> Result<ApiResponse<Product>> {
    let valid = ValidProduct::parse(input)?;
    let product = ProductRepository::new(state.pool())
        .create(&valid.fields())
        .await?;
    tracing::info!(product_id = %product.id, sku = %product.sku, user_id = %auth.user.id, "Product created");
    Ok(ApiResponse::created(product).with_message("Product created"))
}

pub async fn update(
    State(state): State<AppState>,
    _auth: Authorized<policy::ManageCatalog>,
    Path(id): Path<ProductId>,
    Json(input): Json<ProductInput>,
) -> Result<ApiResponse<Product>> {
    let valid = ValidProduct::parse(input)?;
    let product = ProductRepository::new(state.pool())
        .update(id, &valid.fields())
        .await?;
    Ok(ApiResponse::ok(product).with_message("Product updated"))
}

/// Delete a product; products with stock or sales history are kept (409).
pub async fn delete(
    State(state): State<AppState>,
    _auth: Authorized<policy::ManageCatalog>,
    Path(id): Path<ProductId>,
) -> Result<ApiResponse<()>> {
    ProductRepository::new(state.pool()).delete(id).await?;
    tracing::info!(product_id = %id, "Product deleted");
    Ok(ApiResponse::message("Product deleted"))
}

#[cfg(test)]
mod tests {
    use shelfwise_core::Money;

    use super::*;

    fn input() -> ProductInput {
        ProductInput {
            name: " Green Tea ".to_string(),
            sku: "TEA-01".to_string(),
            barcode: Some("  ".to_string()),
            brand_id: None,
            vendor_id: None,
            unit_price: Money::whole(120),
            reorder_level: Some(5),
            is_active: true,
        }
    }

    #[test]
    fn test_parse_trims_and_blanks() {
        let valid = ValidProduct::parse(input()).ok();
        let fields = valid.as_ref().map(ValidProduct::fields);
        assert_eq!(fields.as_ref().map(|f| f.name), Some("Green Tea"));
        assert_eq!(fields.and_then(|f| f.barcode), None);
    }

    #[test]
    fn test_parse_rejects_bad_values() {
        let mut bad = input();
        bad.unit_price = Money::whole(-1);
        assert!(ValidProduct::parse(bad).is_err());

        let mut bad = input();
        bad.reorder_level = Some(-2);
        assert!(ValidProduct::parse(bad).is_err());

        let mut bad = input();
        bad.sku = String::new();
        assert!(ValidProduct::parse(bad).is_err());
    }
}
