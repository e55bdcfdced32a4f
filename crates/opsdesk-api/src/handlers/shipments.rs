//! Shipment endpoints, including lookup by tracking number.
//!
//! Status changes stamp `shippedAt` the first time a shipment goes
//! `in-transit` and `deliveredAt` the first time it is `delivered`.

use std::sync::Arc;

use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use opsdesk_core::lifecycle::first_reached;
use opsdesk_core::numbering::tracking_number;
use opsdesk_core::PageRequest;
use opsdesk_db::{Filter, ScalarKind};
use opsdesk_types::{
    ActivityAction, Customer, CustomerId, EntityType, InventoryItem, InventoryItemId,
    PurchaseOrder, PurchaseOrderId, Shipment, ShipmentDirection, ShipmentId, ShipmentLine,
    ShipmentStatus, Supplier, SupplierId,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use validator::Validate;

use crate::activity::{self, Entry};
use crate::envelope::{Created, Envelope};
use crate::error::ApiError;
use crate::extract::{ApiQuery, AuthUser, ValidatedJson};
use crate::handlers::{
    already_exists, clean, ensure_exists, find_page, load, parse_id, parse_sort, MANAGERS,
};
use crate::state::AppState;

const SORT_FIELDS: &[(&str, ScalarKind)] = &[
    ("createdAt", ScalarKind::Timestamp),
    ("estimatedDelivery", ScalarKind::Timestamp),
    ("shippedAt", ScalarKind::Timestamp),
    ("deliveredAt", ScalarKind::Timestamp),
    ("carrier", ScalarKind::Text),
    ("shippingCost", ScalarKind::Decimal),
];

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/shipments`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentsQuery {
    /// Filter by status.
    pub status: Option<ShipmentStatus>,
    /// Filter by direction.
    pub direction: Option<ShipmentDirection>,
    /// Filter by carrier.
    pub carrier: Option<String>,
    /// Filter by customer.
    pub customer: Option<CustomerId>,
    /// Filter by supplier.
    pub supplier: Option<SupplierId>,
    /// Filter by purchase order.
    pub purchase_order: Option<PurchaseOrderId>,
    /// Substring of tracking number, carrier, or destination.
    pub search: Option<String>,
    /// Sort field, `-` prefix for descending.
    pub sort: Option<String>,
    /// Page number.
    pub page: Option<u64>,
    /// Page size.
    pub limit: Option<u64>,
}

/// One shipped line in a request body.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentLineInput {
    /// Stocked item, if any.
    pub item: Option<InventoryItemId>,
    /// What is shipped.
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "Each line needs a description"))]
    pub description: String,
    /// Units shipped.
    #[validate(range(min = 1, message = "Line quantity must be at least 1"))]
    pub quantity: u32,
}

/// Body of `POST /api/shipments`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateShipmentRequest {
    /// Carrier tracking number; generated when absent.
    #[validate(length(min = 1, max = 100, message = "Tracking number cannot be empty"))]
    pub tracking_number: Option<String>,
    /// Inbound or outbound.
    pub direction: ShipmentDirection,
    /// Status, `pending` when absent.
    pub status: Option<ShipmentStatus>,
    /// Carrier.
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Please add a carrier"))]
    pub carrier: String,
    /// Receiving customer.
    pub customer: Option<CustomerId>,
    /// Sending supplier.
    pub supplier: Option<SupplierId>,
    /// Fulfilled purchase order.
    pub purchase_order: Option<PurchaseOrderId>,
    /// Origin address.
    pub origin: Option<String>,
    /// Destination address.
    #[serde(default)]
    #[validate(length(min = 1, max = 500, message = "Please add a destination"))]
    pub destination: String,
    /// Shipped lines.
    #[serde(default)]
    #[validate(nested)]
    pub items: Vec<ShipmentLineInput>,
    /// Shipping cost.
    pub shipping_cost: Option<Decimal>,
    /// Expected delivery.
    pub estimated_delivery: Option<DateTime<Utc>>,
    /// Notes.
    pub notes: Option<String>,
}

/// Body of `PUT /api/shipments/:id`. Absent fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateShipmentRequest {
    /// Carrier tracking number.
    #[validate(length(min = 1, max = 100, message = "Tracking number cannot be empty"))]
    pub tracking_number: Option<String>,
    /// Inbound or outbound.
    pub direction: Option<ShipmentDirection>,
    /// Status.
    pub status: Option<ShipmentStatus>,
    /// Carrier.
    #[validate(length(min = 1, max = 100, message = "Carrier cannot be empty"))]
    pub carrier: Option<String>,
    /// Receiving customer.
    pub customer: Option<CustomerId>,
    /// Sending supplier.
    pub supplier: Option<SupplierId>,
    /// Fulfilled purchase order.
    pub purchase_order: Option<PurchaseOrderId>,
    /// Origin address.
    pub origin: Option<String>,
    /// Destination address.
    #[validate(length(min = 1, max = 500, message = "Destination cannot be empty"))]
    pub destination: Option<String>,
    /// Shipped lines (replaces the list).
    #[validate(nested)]
    pub items: Option<Vec<ShipmentLineInput>>,
    /// Shipping cost.
    pub shipping_cost: Option<Decimal>,
    /// Expected delivery.
    pub estimated_delivery: Option<DateTime<Utc>>,
    /// Notes.
    pub notes: Option<String>,
}

fn normalize_tracking(number: &str) -> String {
    number.trim().to_uppercase()
}

async fn ensure_tracking_free(
    state: &AppState,
    number: &str,
    except: Option<ShipmentId>,
) -> Result<(), ApiError> {
    let mut filter = Filter::new().eq("trackingNumber", number);
    if let Some(id) = except {
        filter = filter.ne("id", id);
    }
    if state.store.collection::<Shipment>().exists(&filter).await? {
        return Err(already_exists(format!(
            "Shipment with tracking number {number}"
        )));
    }
    Ok(())
}

async fn check_references(
    state: &AppState,
    customer: Option<CustomerId>,
    supplier: Option<SupplierId>,
    purchase_order: Option<PurchaseOrderId>,
    lines: &[ShipmentLineInput],
) -> Result<(), ApiError> {
    ensure_exists::<Customer, _>(&state.store, "Customer", customer).await?;
    ensure_exists::<Supplier, _>(&state.store, "Supplier", supplier).await?;
    ensure_exists::<PurchaseOrder, _>(&state.store, "Purchase order", purchase_order).await?;
    for line in lines {
        ensure_exists::<InventoryItem, _>(&state.store, "Inventory item", line.item).await?;
    }
    Ok(())
}

fn check_cost(cost: Option<Decimal>) -> Result<(), ApiError> {
    if cost.is_some_and(|c| c.is_sign_negative()) {
        return Err(ApiError::BadRequest(String::from(
            "Shipping cost cannot be negative",
        )));
    }
    Ok(())
}

fn to_lines(lines: Vec<ShipmentLineInput>) -> Vec<ShipmentLine> {
    lines
        .into_iter()
        .map(|line| ShipmentLine {
            item: line.item,
            description: line.description.trim().to_owned(),
            quantity: line.quantity,
        })
        .collect()
}

/// Copy the fields present in `body` onto `shipment`. The tracking number
/// is handled by the caller.
fn apply_changes(shipment: &mut Shipment, body: UpdateShipmentRequest) {
    if let Some(direction) = body.direction {
        shipment.direction = direction;
    }
    if let Some(status) = body.status {
        shipment.status = status;
    }
    if let Some(carrier) = body.carrier {
        shipment.carrier = carrier.trim().to_owned();
    }
    if body.customer.is_some() {
        shipment.customer = body.customer;
    }
    if body.supplier.is_some() {
        shipment.supplier = body.supplier;
    }
    if body.purchase_order.is_some() {
        shipment.purchase_order = body.purchase_order;
    }
    if body.origin.is_some() {
        shipment.origin = clean(body.origin);
    }
    if let Some(destination) = body.destination {
        shipment.destination = destination.trim().to_owned();
    }
    if let Some(items) = body.items {
        shipment.items = to_lines(items);
    }
    if body.shipping_cost.is_some() {
        shipment.shipping_cost = body.shipping_cost;
    }
    if body.estimated_delivery.is_some() {
        shipment.estimated_delivery = body.estimated_delivery;
    }
    if body.notes.is_some() {
        shipment.notes = clean(body.notes);
    }
}

/// Apply the status timestamps for `shipment.status`.
fn stamp_status(shipment: &mut Shipment, now: DateTime<Utc>) {
    let status = shipment.status;
    shipment.shipped_at = first_reached(
        shipment.shipped_at,
        matches!(status, ShipmentStatus::InTransit | ShipmentStatus::Delivered),
        now,
    );
    shipment.delivered_at = first_reached(
        shipment.delivered_at,
        status == ShipmentStatus::Delivered,
        now,
    );
}

// ---------------------------------------------------------------------------
// GET /api/shipments
// ---------------------------------------------------------------------------

/// List shipments.
pub async fn list_shipments(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    ApiQuery(query): ApiQuery<ShipmentsQuery>,
) -> Result<Envelope<Vec<Shipment>>, ApiError> {
    let filter = Filter::new()
        .eq_opt("status", query.status)
        .eq_opt("direction", query.direction)
        .eq_opt("carrier", clean(query.carrier))
        .eq_opt("customer", query.customer)
        .eq_opt("supplier", query.supplier)
        .eq_opt("purchaseOrder", query.purchase_order)
        .search(
            &["trackingNumber", "carrier", "destination"],
            query.search.as_deref(),
        );
    let sort = parse_sort(query.sort.as_deref(), SORT_FIELDS)?;
    let page = PageRequest::new(query.page, query.limit, &state.pagination);

    find_page(&state.store, filter, sort, &page).await
}

// ---------------------------------------------------------------------------
// GET /api/shipments/:id
// ---------------------------------------------------------------------------

/// Fetch one shipment.
pub async fn get_shipment(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Envelope<Shipment>, ApiError> {
    let id: ShipmentId = parse_id("shipment", &id)?;
    Ok(Envelope::data(load(&state.store, "Shipment", id).await?))
}

// ---------------------------------------------------------------------------
// GET /api/shipments/track/:trackingNumber
// ---------------------------------------------------------------------------

/// Look a shipment up by tracking number.
pub async fn track_shipment(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(number): Path<String>,
) -> Result<Envelope<Shipment>, ApiError> {
    let number = normalize_tracking(&number);
    let shipment = state
        .store
        .collection::<Shipment>()
        .find_one(Filter::new().eq("trackingNumber", &number))
        .await?
        .ok_or_else(|| {
            ApiError::NotFound(format!("Shipment not found with tracking number {number}"))
        })?;
    Ok(Envelope::data(shipment))
}

// ---------------------------------------------------------------------------
// POST /api/shipments
// ---------------------------------------------------------------------------

/// Create a shipment.
pub async fn create_shipment(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(body): ValidatedJson<CreateShipmentRequest>,
) -> Result<Created<Shipment>, ApiError> {
    check_cost(body.shipping_cost)?;
    check_references(
        &state,
        body.customer,
        body.supplier,
        body.purchase_order,
        &body.items,
    )
    .await?;

    let now = Utc::now();
    let number = body
        .tracking_number
        .as_deref()
        .map_or_else(|| tracking_number(now), normalize_tracking);
    ensure_tracking_free(&state, &number, None).await?;

    let mut shipment = Shipment {
        id: ShipmentId::new(),
        tracking_number: number,
        direction: body.direction,
        status: body.status.unwrap_or(ShipmentStatus::Pending),
        carrier: body.carrier.trim().to_owned(),
        customer: body.customer,
        supplier: body.supplier,
        purchase_order: body.purchase_order,
        origin: clean(body.origin),
        destination: body.destination.trim().to_owned(),
        items: to_lines(body.items),
        shipping_cost: body.shipping_cost,
        estimated_delivery: body.estimated_delivery,
        shipped_at: None,
        delivered_at: None,
        notes: clean(body.notes),
        created_by: auth.id(),
        created_at: now,
        updated_at: now,
    };
    stamp_status(&mut shipment, now);
    state
        .store
        .collection::<Shipment>()
        .insert(&shipment)
        .await?;

    activity::record(
        &state.store,
        Entry::new(
            auth.id(),
            ActivityAction::Create,
            EntityType::Shipment,
            shipment.id,
            format!("Created {} shipment {}", shipment.direction, shipment.tracking_number),
        ),
    )
    .await?;

    Ok(Envelope::data(shipment).created())
}

// ---------------------------------------------------------------------------
// PUT /api/shipments/:id
// ---------------------------------------------------------------------------

/// Update a shipment.
pub async fn update_shipment(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateShipmentRequest>,
) -> Result<Envelope<Shipment>, ApiError> {
    let id: ShipmentId = parse_id("shipment", &id)?;
    let mut shipment: Shipment = load(&state.store, "Shipment", id).await?;

    check_cost(body.shipping_cost)?;
    check_references(
        &state,
        body.customer,
        body.supplier,
        body.purchase_order,
        body.items.as_deref().unwrap_or_default(),
    )
    .await?;
    let new_number = body
        .tracking_number
        .as_deref()
        .map(normalize_tracking)
        .filter(|number| *number != shipment.tracking_number);
    if let Some(number) = new_number {
        ensure_tracking_free(&state, &number, Some(id)).await?;
        shipment.tracking_number = number;
    }

    let previous_status = shipment.status;
    apply_changes(&mut shipment, body);

    let now = Utc::now();
    stamp_status(&mut shipment, now);
    shipment.updated_at = now;
    state
        .store
        .collection::<Shipment>()
        .replace(&shipment)
        .await?;

    let entry = if shipment.status == previous_status {
        Entry::new(
            auth.id(),
            ActivityAction::Update,
            EntityType::Shipment,
            id,
            format!("Updated shipment {}", shipment.tracking_number),
        )
    } else {
        Entry::new(
            auth.id(),
            ActivityAction::StatusChange,
            EntityType::Shipment,
            id,
            format!(
                "Shipment {} moved from {previous_status} to {}",
                shipment.tracking_number, shipment.status
            ),
        )
        .metadata(json!({ "from": previous_status, "to": shipment.status }))
    };
    activity::record(&state.store, entry).await?;

    Ok(Envelope::data(shipment))
}

// ---------------------------------------------------------------------------
// DELETE /api/shipments/:id
// ---------------------------------------------------------------------------

/// Delete a shipment. Admins and managers only.
pub async fn delete_shipment(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Envelope<()>, ApiError> {
    auth.require_role(MANAGERS)?;
    let id: ShipmentId = parse_id("shipment", &id)?;
    let shipment: Shipment = load(&state.store, "Shipment", id).await?;

    state.store.collection::<Shipment>().delete(id).await?;

    activity::record(
        &state.store,
        Entry::new(
            auth.id(),
            ActivityAction::Delete,
            EntityType::Shipment,
            id,
            format!("Deleted shipment {}", shipment.tracking_number),
        ),
    )
    .await?;

    Ok(Envelope::message("Shipment deleted"))
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use opsdesk_types::UserId;

    use super::*;

    fn shipment(status: ShipmentStatus) -> Shipment {
        let now = Utc::now();
        Shipment {
            id: ShipmentId::new(),
            tracking_number: String::from("TRK-1"),
            direction: ShipmentDirection::Outbound,
            status,
            carrier: String::from("DHL"),
            customer: None,
            supplier: None,
            purchase_order: None,
            origin: None,
            destination: String::from("Oslo"),
            items: Vec::new(),
            shipping_cost: None,
            estimated_delivery: None,
            shipped_at: None,
            delivered_at: None,
            notes: None,
            created_by: UserId::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn in_transit_stamps_shipped_only() {
        let now = Utc::now();
        let mut s = shipment(ShipmentStatus::InTransit);
        stamp_status(&mut s, now);
        assert_eq!(s.shipped_at, Some(now));
        assert_eq!(s.delivered_at, None);
    }

    #[test]
    fn delivery_keeps_the_original_ship_time() {
        let shipped = Utc::now();
        let later = shipped
            .checked_add_signed(Duration::hours(5))
            .unwrap_or(shipped);
        let mut s = shipment(ShipmentStatus::InTransit);
        stamp_status(&mut s, shipped);
        s.status = ShipmentStatus::Delivered;
        stamp_status(&mut s, later);
        assert_eq!(s.shipped_at, Some(shipped));
        assert_eq!(s.delivered_at, Some(later));
    }

    #[test]
    fn tracking_numbers_are_uppercased() {
        assert_eq!(normalize_tracking("  trk-abc "), "TRK-ABC");
    }
}
