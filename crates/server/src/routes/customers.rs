//! Customer handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
};

use shelfwise_core::permissions::policy;
use shelfwise_core::{CustomerId, Email};

use crate::db::CustomerRepository;
use crate::db::customers::CustomerFields;
use crate::error::{AppError, Result};
use crate::middleware::Authorized;
use crate::models::Customer;
use crate::models::customer::{CustomerFilter, CustomerInput};
use crate::response::{ApiResponse, ListQuery};
use crate::state::AppState;
use crate::validation::{optional, required};

use super::not_found;

struct ValidCustomer {
    name: String,
    phone: String,
    email: Option<String>,
    address: Option<String>,
}

impl ValidCustomer {
    fn parse(input: &CustomerInput) -> Result<Self> {
        let email = optional(input.email.as_deref())
            .map(|e| Email::parse(&e).map(Email::into_inner))
            .transpose()
            .map_err(|_| AppError::BadRequest("email is invalid".into()))?;
        Ok(Self {
            name: required("name", &input.name)?,
            phone: required("phone", &input.phone)?,
            email,
            address: optional(input.address.as_deref()),
        })
    }

    fn fields(&self) -> CustomerFields<'_> {
        CustomerFields {
            name: &self.name,
            phone: &self.phone,
            email: self.email.as_deref(),
            address: self.address.as_deref(),
        }
    }
}

/// List customers; `?hasDue=true` keeps only those owing money.
pub async fn list(
    State(state): State<AppState>,
    _auth: Authorized<policy::ViewCustomers>,
    Query(query): Query<ListQuery>,
    Query(filter): Query<CustomerFilter>,
) -> Result<ApiResponse<Vec<Customer>>> {
    let (customers, total) = CustomerRepository::new(state.pool())
        .list(&query, &filter)
        .await?;
    Ok(ApiResponse::page(customers, total, &query))
}

pub async fn get(
    State(state): State<AppState>,
    _auth: Authorized<policy::ViewCustomers>,
    Path(id): Path<CustomerId>,
) -> Result<ApiResponse<Customer>> {
    let customer = CustomerRepository::new(state.pool())
        .get(id)
        .await?
        .ok_or_else(|| not_found("customer", id))?;
    Ok(ApiResponse::ok(customer))
}

pub async fn create(
    State(state): State<AppState>,
    _auth: Authorized<policy::ManageCustomers>,
    Json(input): Json<CustomerInput>,
) -> Result<ApiResponse<Customer>> {
    let valid = ValidCustomer::parse(&input)?;
    let customer = CustomerRepository::new(state.pool())
        .create(&valid.fields())
        .await?;
    Ok(ApiResponse::created(customer).with_message("Customer created"))
}

/// Update contact details. The outstanding due only changes through sales
/// and payments.
pub async fn update(
    State(state): State<AppState>,
    _auth: Authorized<policy::ManageCustomers>,
    Path(id): Path<CustomerId>,
    Json(input): Json<CustomerInput>,
) -> Result<ApiResponse<Customer>> {
    let valid = ValidCustomer::parse(&input)?;
    let customer = CustomerRepository::new(state.pool())
        .update(id, &valid.fields())
        .await?;
    Ok(ApiResponse::ok(customer).with_message("Customer updated"))
}

pub async fn delete(
    State(state): State<AppState>,
    _auth: Authorized<policy::ManageCustomers>,
    Path(id): Path<CustomerId>,
) -> Result<ApiResponse<()>> {
    CustomerRepository::new(state.pool()).delete(id).await?;
    Ok(ApiResponse::message("Customer deleted"))
}
