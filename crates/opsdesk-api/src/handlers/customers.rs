//! Customer endpoints.
//!
//! Company names are unique ignoring case. Deleting a customer only marks
//! it `inactive`; projects and shipments keep pointing at it.

use std::sync::Arc;

use axum::extract::{Path, State};
use chrono::Utc;
use opsdesk_core::PageRequest;
use opsdesk_db::{Filter, ScalarKind};
use opsdesk_types::{
    ActivityAction, Address, Customer, CustomerId, CustomerStatus, EntityType,
};
use serde::Deserialize;
use validator::Validate;

use crate::activity::{self, Entry};
use crate::envelope::{Created, Envelope};
use crate::error::ApiError;
use crate::extract::{ApiQuery, AuthUser, ValidatedJson};
use crate::handlers::{
    already_exists, clean, find_page, load, parse_id, parse_sort, MANAGERS,
};
use crate::state::AppState;

const SORT_FIELDS: &[(&str, ScalarKind)] = &[
    ("createdAt", ScalarKind::Timestamp),
    ("companyName", ScalarKind::Text),
    ("contactName", ScalarKind::Text),
    ("industry", ScalarKind::Text),
];

/// Query parameters for `GET /api/customers`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomersQuery {
    /// Filter by status.
    pub status: Option<CustomerStatus>,
    /// Filter by industry.
    pub industry: Option<String>,
    /// Substring of company name, contact name, or email.
    pub search: Option<String>,
    /// Sort field, `-` prefix for descending.
    pub sort: Option<String>,
    /// Page number.
    pub page: Option<u64>,
    /// Page size.
    pub limit: Option<u64>,
}

/// Body of `POST /api/customers`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerRequest {
    /// Company name.
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "Please add a company name"))]
    pub company_name: String,
    /// Contact person.
    pub contact_name: Option<String>,
    /// Contact email.
    #[validate(email(message = "Please add a valid email"))]
    pub email: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Postal address.
    pub address: Option<Address>,
    /// Industry.
    pub industry: Option<String>,
    /// Status, `active` when absent.
    pub status: Option<CustomerStatus>,
    /// Notes.
    pub notes: Option<String>,
}

/// Body of `PUT /api/customers/:id`. Absent fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerRequest {
    /// Company name.
    #[validate(length(min = 1, max = 200, message = "Company name cannot be empty"))]
    pub company_name: Option<String>,
    /// Contact person.
    pub contact_name: Option<String>,
    /// Contact email.
    #[validate(email(message = "Please add a valid email"))]
    pub email: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Postal address (replaces the stored one).
    pub address: Option<Address>,
    /// Industry.
    pub industry: Option<String>,
    /// Status.
    pub status: Option<CustomerStatus>,
    /// Notes.
    pub notes: Option<String>,
}

async fn ensure_name_free(
    state: &AppState,
    name: &str,
    except: Option<CustomerId>,
) -> Result<(), ApiError> {
    let mut filter = Filter::new().eq_ignore_case("companyName", name);
    if let Some(id) = except {
        filter = filter.ne("id", id);
    }
    if state.store.collection::<Customer>().exists(&filter).await? {
        return Err(already_exists(format!("Customer with company name '{name}'")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// GET /api/customers
// ---------------------------------------------------------------------------

/// List customers.
pub async fn list_customers(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    ApiQuery(query): ApiQuery<CustomersQuery>,
) -> Result<Envelope<Vec<Customer>>, ApiError> {
    let filter = Filter::new()
        .eq_opt("status", query.status)
        .eq_opt("industry", clean(query.industry))
        .search(
            &["companyName", "contactName", "email"],
            query.search.as_deref(),
        );
    let sort = parse_sort(query.sort.as_deref(), SORT_FIELDS)?;
    let page = PageRequest::new(query.page, query.limit, &state.pagination);

    find_page(&state.store, filter, sort, &page).await
}

// ---------------------------------------------------------------------------
// GET /api/customers/:id
// ---------------------------------------------------------------------------

/// Fetch one customer.
pub async fn get_customer(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Envelope<Customer>, ApiError> {
    let id: CustomerId = parse_id("customer", &id)?;
    Ok(Envelope::data(load(&state.store, "Customer", id).await?))
}

// ---------------------------------------------------------------------------
// POST /api/customers
// ---------------------------------------------------------------------------

/// Create a customer.
pub async fn create_customer(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(body): ValidatedJson<CreateCustomerRequest>,
) -> Result<Created<Customer>, ApiError> {
    let company_name = body.company_name.trim().to_owned();
    ensure_name_free(&state, &company_name, None).await?;

    let now = Utc::now();
    let customer = Customer {
        id: CustomerId::new(),
        company_name,
        contact_name: clean(body.contact_name),
        email: clean(body.email).map(|e| e.to_lowercase()),
        phone: clean(body.phone),
        address: body.address,
        industry: clean(body.industry),
        status: body.status.unwrap_or(CustomerStatus::Active),
        notes: clean(body.notes),
        created_by: auth.id(),
        created_at: now,
        updated_at: now,
    };
    state.store.collection::<Customer>().insert(&customer).await?;

    activity::record(
        &state.store,
        Entry::new(
            auth.id(),
            ActivityAction::Create,
            EntityType::Customer,
            customer.id,
            format!("Created customer {}", customer.company_name),
        ),
    )
    .await?;

    Ok(Envelope::data(customer).created())
}

// ---------------------------------------------------------------------------
// PUT /api/customers/:id
// ---------------------------------------------------------------------------

/// Update a customer.
pub async fn update_customer(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateCustomerRequest>,
) -> Result<Envelope<Customer>, ApiError> {
    let id: CustomerId = parse_id("customer", &id)?;
    let mut customer: Customer = load(&state.store, "Customer", id).await?;

    if let Some(name) = body.company_name.map(|n| n.trim().to_owned()) {
        if name.to_lowercase() != customer.company_name.to_lowercase() {
            ensure_name_free(&state, &name, Some(id)).await?;
        }
        customer.company_name = name;
    }
    if body.contact_name.is_some() {
        customer.contact_name = clean(body.contact_name);
    }
    if body.email.is_some() {
        customer.email = clean(body.email).map(|e| e.to_lowercase());
    }
    if body.phone.is_some() {
        customer.phone = clean(body.phone);
    }
    if body.address.is_some() {
        customer.address = body.address;
    }
    if body.industry.is_some() {
        customer.industry = clean(body.industry);
    }
    if let Some(status) = body.status {
        customer.status = status;
    }
    if body.notes.is_some() {
        customer.notes = clean(body.notes);
    }
    customer.updated_at = Utc::now();
    state.store.collection::<Customer>().replace(&customer).await?;

    activity::record(
        &state.store,
        Entry::new(
            auth.id(),
            ActivityAction::Update,
            EntityType::Customer,
            id,
            format!("Updated customer {}", customer.company_name),
        ),
    )
    .await?;

    Ok(Envelope::data(customer))
}

// ---------------------------------------------------------------------------
// DELETE /api/customers/:id
// ---------------------------------------------------------------------------

/// Deactivate a customer. Admins and managers only.
pub async fn delete_customer(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Envelope<Customer>, ApiError> {
    auth.require_role(MANAGERS)?;
    let id: CustomerId = parse_id("customer", &id)?;
    let mut customer: Customer = load(&state.store, "Customer", id).await?;

    customer.status = CustomerStatus::Inactive;
    customer.updated_at = Utc::now();
    state.store.collection::<Customer>().replace(&customer).await?;

    activity::record(
        &state.store,
        Entry::new(
            auth.id(),
            ActivityAction::Delete,
            EntityType::Customer,
            id,
            format!("Deactivated customer {}", customer.company_name),
        ),
    )
    .await?;

    Ok(Envelope::data(customer).with_message("Customer deactivated"))
}
