//! Discount code handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};

use shelfwise_core::permissions::policy;
use shelfwise_core::{DiscountId, DiscountKind, Money};

use crate::db::DiscountRepository;
use crate::db::discounts::DiscountFields;
use crate::error::Result;
use crate::middleware::Authorized;
use crate::models::Discount;
use crate::models::catalog::{ActiveFilter, DiscountInput};
use crate::response::{ApiResponse, ListQuery};
use crate::state::AppState;
use crate::validation::{ValidationError, non_negative, percentage, required};

use super::not_found;

fn validate(input: &DiscountInput) -> std::result::Result<String, ValidationError> {
    let code = required("code", &input.code)?;
    if code.chars().any(char::is_whitespace) {
        return Err(ValidationError::new("code", "cannot contain spaces"));
    }
    match input.kind {
        DiscountKind::Percentage => {
            percentage("value", input.value)?;
        }
        DiscountKind::Fixed => {
            non_negative("value", Money::new(input.value))?;
        }
    }
    if let (Some(start), Some(end)) = (input.starts_at, input.ends_at)
        && end < start
    {
        return Err(ValidationError::new("endsAt", "must not be before startsAt"));
    }
    Ok(code)
}

fn fields<'a>(code: &'a str, input: &DiscountInput) -> DiscountFields<'a> {
    DiscountFields {
        code,
        kind: input.kind,
        value: input.value,
        is_active: input.is_active,
        starts_at: input.starts_at,
        ends_at: input.ends_at,
    }
}

pub async fn list(
    State(state): State<AppState>,
    _auth: Authorized<policy::ViewCatalog>,
    Query(query): Query<ListQuery>,
    Query(filter): Query<ActiveFilter>,
) -> Result<ApiResponse<Vec<Discount>>> {
    let (discounts, total) = DiscountRepository::new(state.pool())
        .list(&query, &filter)
        .await?;
    Ok(ApiResponse::page(discounts, total, &query))
}

pub async fn get(
    State(state): State<AppState>,
    _auth: Authorized<policy::ViewCatalog>,
    Path(id): Path<DiscountId>,
) -> Result<ApiResponse<Discount>> {
    let discount = DiscountRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| not_found("discount", id))?;
    Ok(ApiResponse::ok(discount))
}

pub async fn create(
    State(state): State<AppState>,
    _auth: Authorized<policy::ManageCatalog>,
    Json(input): Json<DiscountInput>,
) -> Result<ApiResponse<Discount>> {
    let code = validate(&input)?;
    let discount = DiscountRepository::new(state.pool())
        .create(&fields(&code, &input))
        .await?;
    Ok(ApiResponse::created(discount).with_message("Discount created"))
}

pub async fn update(
    State(state): State<AppState>,
    _auth: Authorized<policy::ManageCatalog>,
    Path(id): Path<DiscountId>,
    Json(input): Json<DiscountInput>,
) -> Result<ApiResponse<Discount>> {
    let code = validate(&input)?;
    let discount = DiscountRepository::new(state.pool())
        .update(id, &fields(&code, &input))
        .await?;
    Ok(ApiResponse::ok(discount).with_message("Discount updated"))
}

pub async fn delete(
    State(state): State<AppState>,
    _auth: Authorized<policy::ManageCatalog>,
    Path(id): Path<DiscountId>,
) -> Result<ApiResponse<()>> {
    DiscountRepository::new(state.pool()).delete(id).await?;
    Ok(ApiResponse::message("Discount deleted"))
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;

    use super::*;

    fn input(kind: DiscountKind, value: i64) -> DiscountInput {
        DiscountInput {
            code: "SPRING10".to_string(),
            kind,
            value: Decimal::new(value, 0),
            is_active: true,
            starts_at: None,
            ends_at: None,
        }
    }

    #[test]
    fn test_percentage_bounds() {
        assert!(validate(&input(DiscountKind::Percentage, 10)).is_ok());
        assert!(validate(&input(DiscountKind::Percentage, 110)).is_err());
        assert!(validate(&input(DiscountKind::Fixed, 110)).is_ok());
        assert!(validate(&input(DiscountKind::Fixed, -5)).is_err());
    }

    #[test]
    fn test_window_and_code_shape() {
        let mut bad = input(DiscountKind::Fixed, 5);
        let now = Utc::now();
        bad.starts_at = Some(now);
        bad.ends_at = Some(now - Duration::days(1));
        assert!(validate(&bad).is_err());

        let mut bad = input(DiscountKind::Fixed, 5);
        bad.code = "TWO WORDS".to_string();
        assert!(validate(&bad).is_err());
    }
}
