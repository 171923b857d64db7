//! Brand handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};

use shelfwise_core::BrandId;
use shelfwise_core::permissions::policy;

use crate::db::BrandRepository;
use crate::error::Result;
use crate::middleware::Authorized;
use crate::models::Brand;
use crate::models::catalog::BrandInput;
use crate::response::{ApiResponse, ListQuery};
use crate::state::AppState;
use crate::validation::{optional, required};

use super::not_found;

pub async fn list(
    State(state): State<AppState>,
    _auth: Authorized<policy::ViewCatalog>,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse<Vec<Brand>>> {
    let (brands, total) = BrandRepository::new(state.pool()).list(&query).await?;
    Ok(ApiResponse::page(brands, total, &query))
}

pub async fn get(
    State(state): State<AppState>,
    _auth: Authorized<policy::ViewCatalog>,
    Path(id): Path<BrandId>,
) -> Result<ApiResponse<Brand>> {
    let brand = BrandRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| not_found("brand", id))?;
    Ok(ApiResponse::ok(brand))
}

pub async fn create(
    State(state): State<AppState>,
    _auth: Authorized<policy::ManageCatalog>,
    Json(input): Json<BrandInput>,
) -> Result<ApiResponse<Brand>> {
    let name = required("name", &input.name)?;
    let description = optional(input.description.as_deref());
    let brand = BrandRepository::new(state.pool())
        .create(&name, description.as_deref())
        .await?;
    Ok(ApiResponse::created(brand).with_message("Brand created"))
}

pub async fn update(
    State(state): State<AppState>,
    _auth: Authorized<policy::ManageCatalog>,
    Path(id): Path<BrandId>,
    Json(input): Json<BrandInput>,
) -> Result<ApiResponse<Brand>> {
    let name = required("name", &input.name)?;
    let description = optional(input.description.as_deref());
    let brand = BrandRepository::new(state.pool())
        .update(id, &name, description.as_deref())
        .await?;
    Ok(ApiResponse::ok(brand).with_message("Brand updated"))
}

pub async fn delete(
    State(state): State<AppState>,
    _auth: Authorized<policy::ManageCatalog>,
    Path(id): Path<BrandId>,
) -> Result<ApiResponse<()>> {
    BrandRepository::new(state.pool()).delete(id).await?;
    Ok(ApiResponse::message("Brand deleted"))
}
