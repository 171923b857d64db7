//! Outlet and warehouse handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};

use shelfwise_core::permissions::policy;
use shelfwise_core::{OutletId, WarehouseId};

use crate::db::LocationRepository;
use crate::db::locations::{OutletFields, WarehouseFields};
use crate::error::Result;
use crate::middleware::Authorized;
use crate::models::catalog::ActiveFilter;
use crate::models::location::{OutletInput, WarehouseInput};
use crate::models::{Outlet, Warehouse};
use crate::response::{ApiResponse, ListQuery};
use crate::state::AppState;
use crate::validation::{ValidationError, optional, required};

use super::not_found;

struct ValidOutlet {
    name: String,
    code: String,
    address: Option<String>,
    phone: Option<String>,
    is_active: bool,
}

impl ValidOutlet {
    fn parse(input: &OutletInput) -> std::result::Result<Self, ValidationError> {
        Ok(Self {
            name: required("name", &input.name)?,
            code: required("code", &input.code)?.to_uppercase(),
            address: optional(input.address.as_deref()),
            phone: optional(input.phone.as_deref()),
            is_active: input.is_active,
        })
    }

    fn fields(&self) -> OutletFields<'_> {
        OutletFields {
            name: &self.name,
            code: &self.code,
            address: self.address.as_deref(),
            phone: self.phone.as_deref(),
            is_active: self.is_active,
        }
    }
}

struct ValidWarehouse {
    name: String,
    address: Option<String>,
    phone: Option<String>,
    is_active: bool,
}

impl ValidWarehouse {
    fn parse(input: &WarehouseInput) -> std::result::Result<Self, ValidationError> {
        Ok(Self {
            name: required("name", &input.name)?,
            address: optional(input.address.as_deref()),
            phone: optional(input.phone.as_deref()),
            is_active: input.is_active,
        })
    }

    fn fields(&self) -> WarehouseFields<'_> {
        WarehouseFields {
            name: &self.name,
            address: self.address.as_deref(),
            phone: self.phone.as_deref(),
            is_active: self.is_active,
        }
    }
}

// =============================================================================
// Outlets
// =============================================================================

pub async fn list_outlets(
    State(state): State<AppState>,
    _auth: Authorized<policy::ViewLocations>,
    Query(query): Query<ListQuery>,
    Query(filter): Query<ActiveFilter>,
) -> Result<ApiResponse<Vec<Outlet>>> {
    let (outlets, total) = LocationRepository::new(state.pool())
        .list_outlets(&query, &filter)
        .await?;
    Ok(ApiResponse::page(outlets, total, &query))
}

pub async fn get_outlet(
    State(state): State<AppState>,
    _auth: Authorized<policy::ViewLocations>,
    Path(id): Path<OutletId>,
) -> Result<ApiResponse<Outlet>> {
    let outlet = LocationRepository::new(state.pool())
        .get_outlet(id)
        .await?
        .ok_or_else(|| not_found("outlet", id))?;
    Ok(ApiResponse::ok(outlet))
}

pub async fn create_outlet(
    State(state): State<AppState>,
    _auth: Authorized<policy::ManageLocations>,
    Json(input): Json<OutletInput>,
) -> Result<ApiResponse<Outlet>> {
    let valid = ValidOutlet::parse(&input)?;
    let outlet = LocationRepository::new(state.pool())
        .create_outlet(&valid.fields())
        .await?;
    tracing::info!(outlet_id = %outlet.id, code = %outlet.code, "Outlet created");
    Ok(ApiResponse::created(outlet).with_message("Outlet created"))
}

pub async fn update_outlet(
    State(state): State<AppState>,
    _auth: Authorized<policy::ManageLocations>,
    Path(id): Path<OutletId>,
    Json(input): Json<OutletInput>,
) -> Result<ApiResponse<Outlet>> {
    let valid = ValidOutlet::parse(&input)?;
    let outlet = LocationRepository::new(state.pool())
        .update_outlet(id, &valid.fields())
        .await?;
    Ok(ApiResponse::ok(outlet).with_message("Outlet updated"))
}

/// Delete an outlet that holds no stock and has no sales (409 otherwise).
pub async fn delete_outlet(
    State(state): State<AppState>,
    _auth: Authorized<policy::ManageLocations>,
    Path(id): Path<OutletId>,
) -> Result<ApiResponse<()>> {
    LocationRepository::new(state.pool())
        .delete_outlet(id)
        .await?;
    Ok(ApiResponse::message("Outlet deleted"))
}

// =============================================================================
// Warehouses
// =============================================================================

pub async fn list_warehouses(
    State(state): State<AppState>,
    _auth: Authorized<policy::ViewLocations>,
    Query(query): Query<ListQuery>,
    Query(filter): Query<ActiveFilter>,
) -> Result<ApiResponse<Vec<Warehouse>>> {
    let (warehouses, total) = LocationRepository::new(state.pool())
        .list_warehouses(&query, &filter)
        .await?;
    Ok(ApiResponse::page(warehouses, total, &query))
}

pub async fn get_warehouse(
    State(state): State<AppState>,
    _auth: Authorized<policy::ViewLocations>,
    Path(id): Path<WarehouseId>,
) -> Result<ApiResponse<Warehouse>> {
    let warehouse = LocationRepository::new(state.pool())
        .get_warehouse(id)
        .await?
        .ok_or_else(|| not_found("warehouse", id))?;
    Ok(ApiResponse::ok(warehouse))
}

pub async fn create_warehouse(
    State(state): State<AppState>,
    _auth: Authorized<policy::ManageLocations>,
    Json(input): Json<WarehouseInput>,
) -> Result<ApiResponse<Warehouse>> {
    let valid = ValidWarehouse::parse(&input)?;
    let warehouse = LocationRepository::new(state.pool())
        .create_warehouse(&valid.fields())
        .await?;
    tracing::info!(warehouse_id = %warehouse.id, "Warehouse created");
    Ok(ApiResponse::created(warehouse).with_message("Warehouse created"))
}

pub async fn update_warehouse(
    State(state): State<AppState>,
    _auth: Authorized<policy::ManageLocations>,
    Path(id): Path<WarehouseId>,
    Json(input): Json<WarehouseInput>,
) -> Result<ApiResponse<Warehouse>> {
    let valid = ValidWarehouse::parse(&input)?;
    let warehouse = LocationRepository::new(state.pool())
        .update_warehouse(id, &valid.fields())
        .await?;
    Ok(ApiResponse::ok(warehouse).with_message("Warehouse updated"))
}

pub async fn delete_warehouse(
    State(state): State<AppState>,
    _auth: Authorized<policy::ManageLocations>,
    Path(id): Path<WarehouseId>,
) -> Result<ApiResponse<()>> {
    LocationRepository::new(state.pool())
        .delete_warehouse(id)
        .await?;
    Ok(ApiResponse::message("Warehouse deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outlet_code_uppercased() {
        let input = OutletInput {
            name: "Main Street".to_string(),
            code: " ms1 ".to_string(),
            address: None,
            phone: Some(String::new()),
            is_active: true,
        };
        let valid = ValidOutlet::parse(&input).ok();
        assert_eq!(valid.as_ref().map(|v| v.code.as_str()), Some("MS1"));
        assert_eq!(valid.and_then(|v| v.phone), None);
    }
}
