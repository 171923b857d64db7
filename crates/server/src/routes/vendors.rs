//! Vendor (supplier) handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};

use shelfwise_core::{Email, VendorId};
use shelfwise_core::permissions::policy;

use crate::db::VendorRepository;
use crate::db::vendors::VendorFields;
use crate::error::{AppError, Result};
use crate::middleware::Authorized;
use crate::models::Vendor;
use crate::models::catalog::VendorInput;
use crate::response::{ApiResponse, ListQuery};
use crate::state::AppState;
use crate::validation::{optional, required};

use super::not_found;

struct ValidVendor {
    name: String,
    contact_person: Option<String>,
    phone: Option<String>,
    email: Option<String>,
    address: Option<String>,
}

impl ValidVendor {
    fn parse(input: &VendorInput) -> Result<Self> {
        let email = optional(input.email.as_deref())
            .map(|e| Email::parse(&e).map(Email::into_inner))
            .transpose()
            .map_err(|_| AppError::BadRequest("email is invalid".into()))?;
        Ok(Self {
            name: required("name", &input.name)?,
            contact_person: optional(input.contact_person.as_deref()),
            phone: optional(input.phone.as_deref()),
            email,
            address: optional(input.address.as_deref()),
        })
    }

    fn fields(&self) -> VendorFields<'_> {
        VendorFields {
            name: &self.name,
            contact_person: self.contact_person.as_deref(),
            phone: self.phone.as_deref(),
            email: self.email.as_deref(),
            address: self.address.as_deref(),
        }
    }
}

pub async fn list(
    State(state): State<AppState>,
    _auth: Authorized<policy::ViewCatalog>,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse<Vec<Vendor>>> {
    let (vendors, total) = VendorRepository::new(state.pool()).list(&query).await?;
    Ok(ApiResponse::page(vendors, total, &query))
}

pub async fn get(
    State(state): State<AppState>,
    _auth: Authorized<policy::ViewCatalog>,
    Path(id): Path<VendorId>,
) -> Result<ApiResponse<Vendor>> {
    let vendor = VendorRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| not_found("vendor", id))?;
    Ok(ApiResponse::ok(vendor))
}

pub async fn create(
    State(state): State<AppState>,
    _auth: Authorized<policy::ManageCatalog>,
    Json(input): Json<VendorInput>,
) -> Result<ApiResponse<Vendor>> {
    let valid = ValidVendor::parse(&input)?;
    let vendor = VendorRepository::new(state.pool())
        .create(&valid.fields())
        .await?;
    Ok(ApiResponse::created(vendor).with_message("Vendor created"))
}

pub async fn update(
    State(state): State<AppState>,
    _auth: Authorized<policy::ManageCatalog>,
    Path(id): Path<VendorId>,
    Json(input): Json<VendorInput>,
) -> Result<ApiResponse<Vendor>> {
    let valid = ValidVendor::parse(&input)?;
    let vendor = VendorRepository::new(state.pool())
        .update(id, &valid.fields())
        .await?;
    Ok(ApiResponse::ok(vendor).with_message("Vendor updated"))
}

pub async fn delete(
    State(state): State<AppState>,
    _auth: Authorized<policy::ManageCatalog>,
    Path(id): Path<VendorId>,
) -> Result<ApiResponse<()>> {
    VendorRepository::new(state.pool()).delete(id).await?;
    Ok(ApiResponse::message("Vendor deleted"))
}
