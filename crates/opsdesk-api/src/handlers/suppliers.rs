//! Supplier endpoints.

use std::sync::Arc;

use axum::extract::{Path, State};
use chrono::Utc;
use opsdesk_core::PageRequest;
use opsdesk_db::{Filter, ScalarKind};
use opsdesk_types::{
    ActivityAction, Address, EntityType, PurchaseOrder, Supplier, SupplierId, SupplierStatus,
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
    ("rating", ScalarKind::Integer),
];

/// Query parameters for `GET /api/suppliers`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuppliersQuery {
    /// Filter by status.
    pub status: Option<SupplierStatus>,
    /// Filter by exact rating.
    pub rating: Option<u8>,
    /// Substring of company name, contact name, or email.
    pub search: Option<String>,
    /// Sort field, `-` prefix for descending.
    pub sort: Option<String>,
    /// Page number.
    pub page: Option<u64>,
    /// Page size.
    pub limit: Option<u64>,
}

/// Body of `POST /api/suppliers`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSupplierRequest {
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
    /// Payment terms.
    pub payment_terms: Option<String>,
    /// Rating from 1 to 5.
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<u8>,
    /// Status, `active` when absent.
    pub status: Option<SupplierStatus>,
    /// Notes.
    pub notes: Option<String>,
}

/// Body of `PUT /api/suppliers/:id`. Absent fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSupplierRequest {
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
    /// Payment terms.
    pub payment_terms: Option<String>,
    /// Rating from 1 to 5.
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: Option<u8>,
    /// Status.
    pub status: Option<SupplierStatus>,
    /// Notes.
    pub notes: Option<String>,
}

async fn ensure_name_free(
    state: &AppState,
    name: &str,
    except: Option<SupplierId>,
) -> Result<(), ApiError> {
    let mut filter = Filter::new().eq_ignore_case("companyName", name);
    if let Some(id) = except {
        filter = filter.ne("id", id);
    }
    if state.store.collection::<Supplier>().exists(&filter).await? {
        return Err(already_exists(format!("Supplier with company name '{name}'")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// GET /api/suppliers
// ---------------------------------------------------------------------------

/// List suppliers.
pub async fn list_suppliers(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    ApiQuery(query): ApiQuery<SuppliersQuery>,
) -> Result<Envelope<Vec<Supplier>>, ApiError> {
    let filter = Filter::new()
        .eq_opt("status", query.status)
        .eq_opt("rating", query.rating)
        .search(
            &["companyName", "contactName", "email"],
            query.search.as_deref(),
        );
    let sort = parse_sort(query.sort.as_deref(), SORT_FIELDS)?;
    let page = PageRequest::new(query.page, query.limit, &state.pagination);

    find_page(&state.store, filter, sort, &page).await
}

// ---------------------------------------------------------------------------
// GET /api/suppliers/:id
// ---------------------------------------------------------------------------

/// Fetch one supplier.
pub async fn get_supplier(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Envelope<Supplier>, ApiError> {
    let id: SupplierId = parse_id("supplier", &id)?;
    Ok(Envelope::data(load(&state.store, "Supplier", id).await?))
}

// ---------------------------------------------------------------------------
// POST /api/suppliers
// ---------------------------------------------------------------------------

/// Create a supplier.
pub async fn create_supplier(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(body): ValidatedJson<CreateSupplierRequest>,
) -> Result<Created<Supplier>, ApiError> {
    let company_name = body.company_name.trim().to_owned();
    ensure_name_free(&state, &company_name, None).await?;

    let now = Utc::now();
    let supplier = Supplier {
        id: SupplierId::new(),
        company_name,
        contact_name: clean(body.contact_name),
        email: clean(body.email).map(|e| e.to_lowercase()),
        phone: clean(body.phone),
        address: body.address,
        payment_terms: clean(body.payment_terms),
        rating: body.rating,
        status: body.status.unwrap_or(SupplierStatus::Active),
        notes: clean(body.notes),
        created_by: auth.id(),
        created_at: now,
        updated_at: now,
    };
    state.store.collection::<Supplier>().insert(&supplier).await?;

    activity::record(
        &state.store,
        Entry::new(
            auth.id(),
            ActivityAction::Create,
            EntityType::Supplier,
            supplier.id,
            format!("Created supplier {}", supplier.company_name),
        ),
    )
    .await?;

    Ok(Envelope::data(supplier).created())
}

// ---------------------------------------------------------------------------
// PUT /api/suppliers/:id
// ---------------------------------------------------------------------------

/// Update a supplier.
pub async fn update_supplier(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateSupplierRequest>,
) -> Result<Envelope<Supplier>, ApiError> {
    let id: SupplierId = parse_id("supplier", &id)?;
    let mut supplier: Supplier = load(&state.store, "Supplier", id).await?;

    if let Some(name) = body.company_name.map(|n| n.trim().to_owned()) {
        if name.to_lowercase() != supplier.company_name.to_lowercase() {
            ensure_name_free(&state, &name, Some(id)).await?;
        }
        supplier.company_name = name;
    }
    if body.contact_name.is_some() {
        supplier.contact_name = clean(body.contact_name);
    }
    if body.email.is_some() {
        supplier.email = clean(body.email).map(|e| e.to_lowercase());
    }
    if body.phone.is_some() {
        supplier.phone = clean(body.phone);
    }
    if body.address.is_some() {
        supplier.address = body.address;
    }
    if body.payment_terms.is_some() {
        supplier.payment_terms = clean(body.payment_terms);
    }
    if body.rating.is_some() {
        supplier.rating = body.rating;
    }
    if let Some(status) = body.status {
        supplier.status = status;
    }
    if body.notes.is_some() {
        supplier.notes = clean(body.notes);
    }
    supplier.updated_at = Utc::now();
    state.store.collection::<Supplier>().replace(&supplier).await?;

    activity::record(
        &state.store,
        Entry::new(
            auth.id(),
            ActivityAction::Update,
            EntityType::Supplier,
            id,
            format!("Updated supplier {}", supplier.company_name),
        ),
    )
    .await?;

    Ok(Envelope::data(supplier))
}

// ---------------------------------------------------------------------------
// DELETE /api/suppliers/:id
// ---------------------------------------------------------------------------

/// Delete a supplier no purchase order references. Admins and managers only.
pub async fn delete_supplier(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Envelope<()>, ApiError> {
    auth.require_role(MANAGERS)?;
    let id: SupplierId = parse_id("supplier", &id)?;
    let supplier: Supplier = load(&state.store, "Supplier", id).await?;

    let ordered_from = Filter::new().eq("supplier", id);
    if state
        .store
        .collection::<PurchaseOrder>()
        .exists(&ordered_from)
        .await?
    {
        return Err(ApiError::BadRequest(String::from(
            "Cannot delete supplier with existing purchase orders",
        )));
    }

    state.store.collection::<Supplier>().delete(id).await?;

    activity::record(
        &state.store,
        Entry::new(
            auth.id(),
            ActivityAction::Delete,
            EntityType::Supplier,
            id,
            format!("Deleted supplier {}", supplier.company_name),
        ),
    )
    .await?;

    Ok(Envelope::message("Supplier deleted"))
}
