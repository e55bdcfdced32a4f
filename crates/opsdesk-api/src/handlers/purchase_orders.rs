//! Purchase order endpoints and the order workflow.
//!
//! ```text
//! draft / pending --approve--> approved --order--> ordered
//!        |                        |                   |
//!        |                        +------receive------+--> received
//!        +--------------cancel (any state but received)--> cancelled
//! ```
//!
//! Receiving adds every line's quantity to its item's stock and runs the
//! stock-alert rule for each item touched.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use chrono::{DateTime, Utc};
use opsdesk_core::numbering::purchase_order_number;
use opsdesk_core::PageRequest;
use opsdesk_db::{Filter, ScalarKind};
use opsdesk_types::{
    ActivityAction, EntityType, InventoryAlert, InventoryItem, InventoryItemId, PurchaseOrder,
    PurchaseOrderId, PurchaseOrderLine, PurchaseOrderStatus, Supplier, SupplierId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::activity::{self, Entry};
use crate::envelope::{Created, Envelope};
use crate::error::ApiError;
use crate::extract::{ApiQuery, AuthUser, ValidatedJson};
use crate::handlers::inventory::raise_stock_alert;
use crate::handlers::{clean, find_page, load, parse_id, parse_sort, ADMINS, MANAGERS};
use crate::state::AppState;

const SORT_FIELDS: &[(&str, ScalarKind)] = &[
    ("createdAt", ScalarKind::Timestamp),
    ("expectedDelivery", ScalarKind::Timestamp),
    ("totalAmount", ScalarKind::Decimal),
    ("poNumber", ScalarKind::Text),
    ("status", ScalarKind::Text),
];

/// Statuses in which an order can still be edited or approved.
const EDITABLE: &[PurchaseOrderStatus] =
    &[PurchaseOrderStatus::Draft, PurchaseOrderStatus::Pending];

/// Statuses from which an order can be received.
const RECEIVABLE: &[PurchaseOrderStatus] =
    &[PurchaseOrderStatus::Approved, PurchaseOrderStatus::Ordered];

/// Statuses in which an order can be deleted.
const DELETABLE: &[PurchaseOrderStatus] =
    &[PurchaseOrderStatus::Draft, PurchaseOrderStatus::Cancelled];

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/purchase-orders`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseOrdersQuery {
    /// Filter by status.
    pub status: Option<PurchaseOrderStatus>,
    /// Filter by supplier.
    pub supplier: Option<SupplierId>,
    /// Substring of PO number or notes.
    pub search: Option<String>,
    /// Sort field, `-` prefix for descending.
    pub sort: Option<String>,
    /// Page number.
    pub page: Option<u64>,
    /// Page size.
    pub limit: Option<u64>,
}

/// One ordered line in a request body.
#[derive(Debug, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OrderLineInput {
    /// Ordered item.
    pub item: InventoryItemId,
    /// Units ordered.
    #[validate(range(min = 1, message = "Line quantity must be at least 1"))]
    pub quantity: u32,
    /// Cost per unit; the item's unit cost when absent.
    pub unit_cost: Option<Decimal>,
}

/// Body of `POST /api/purchase-orders`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePurchaseOrderRequest {
    /// Supplier ordered from.
    pub supplier: SupplierId,
    /// Ordered lines.
    #[validate(length(min = 1, message = "Please add at least one item"), nested)]
    pub items: Vec<OrderLineInput>,
    /// Initial status, `draft` or `pending`; `draft` when absent.
    pub status: Option<PurchaseOrderStatus>,
    /// Expected delivery.
    pub expected_delivery: Option<DateTime<Utc>>,
    /// Notes.
    pub notes: Option<String>,
}

/// Body of `PUT /api/purchase-orders/:id`. Absent fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePurchaseOrderRequest {
    /// Supplier ordered from.
    pub supplier: Option<SupplierId>,
    /// Ordered lines (replaces the list and recomputes the total).
    #[validate(length(min = 1, message = "Please add at least one item"), nested)]
    pub items: Option<Vec<OrderLineInput>>,
    /// `draft` or `pending`.
    pub status: Option<PurchaseOrderStatus>,
    /// Expected delivery.
    pub expected_delivery: Option<DateTime<Utc>>,
    /// Notes.
    pub notes: Option<String>,
}

/// Response of `PUT /api/purchase-orders/:id/receive`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceivedOrder {
    /// The order, now `received`.
    pub purchase_order: PurchaseOrder,
    /// Alerts raised by the stock increase.
    pub alerts: Vec<InventoryAlert>,
}

fn check_editable_status(status: Option<PurchaseOrderStatus>) -> Result<(), ApiError> {
    match status {
        Some(status) if !EDITABLE.contains(&status) => Err(ApiError::BadRequest(format!(
            "Status cannot be set to {status} directly; use the order workflow"
        ))),
        _ => Ok(()),
    }
}

/// Price the requested lines against the stored items.
async fn price_lines(
    state: &AppState,
    lines: Vec<OrderLineInput>,
) -> Result<(Vec<PurchaseOrderLine>, Decimal), ApiError> {
    let mut priced = Vec::with_capacity(lines.len());
    let mut total = Decimal::ZERO;
    for line in lines {
        let item: InventoryItem = load(&state.store, "Inventory item", line.item).await?;
        let unit_cost = line.unit_cost.unwrap_or(item.unit_cost);
        if unit_cost.is_sign_negative() {
            return Err(ApiError::BadRequest(String::from(
                "Unit cost cannot be negative",
            )));
        }
        let line_total = unit_cost
            .checked_mul(Decimal::from(line.quantity))
            .ok_or_else(|| ApiError::BadRequest(format!("Line total for {} overflows", item.sku)))?;
        total = total
            .checked_add(line_total)
            .ok_or_else(|| ApiError::BadRequest(String::from("Order total overflows")))?;
        priced.push(PurchaseOrderLine {
            item: item.id,
            quantity: line.quantity,
            unit_cost,
            line_total,
        });
    }
    Ok((priced, total))
}

/// Sum ordered quantities per item, so repeated lines restock once.
fn quantities_per_item(
    lines: &[PurchaseOrderLine],
) -> Result<BTreeMap<InventoryItemId, u32>, ApiError> {
    let mut per_item: BTreeMap<InventoryItemId, u32> = BTreeMap::new();
    for line in lines {
        let slot = per_item.entry(line.item).or_insert(0);
        *slot = slot.checked_add(line.quantity).ok_or_else(|| {
            ApiError::BadRequest(format!("Quantity for item {} overflows", line.item))
        })?;
    }
    Ok(per_item)
}

async fn save(state: &AppState, order: &PurchaseOrder) -> Result<(), ApiError> {
    state
        .store
        .collection::<PurchaseOrder>()
        .replace(order)
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// GET /api/purchase-orders
// ---------------------------------------------------------------------------

/// List purchase orders.
pub async fn list_purchase_orders(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    ApiQuery(query): ApiQuery<PurchaseOrdersQuery>,
) -> Result<Envelope<Vec<PurchaseOrder>>, ApiError> {
    let filter = Filter::new()
        .eq_opt("status", query.status)
        .eq_opt("supplier", query.supplier)
        .search(&["poNumber", "notes"], query.search.as_deref());
    let sort = parse_sort(query.sort.as_deref(), SORT_FIELDS)?;
    let page = PageRequest::new(query.page, query.limit, &state.pagination);

    find_page(&state.store, filter, sort, &page).await
}

// ---------------------------------------------------------------------------
// GET /api/purchase-orders/:id
// ---------------------------------------------------------------------------

/// Fetch one purchase order.
pub async fn get_purchase_order(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Envelope<PurchaseOrder>, ApiError> {
    let id: PurchaseOrderId = parse_id("purchase order", &id)?;
    Ok(Envelope::data(load(&state.store, "Purchase order", id).await?))
}

// ---------------------------------------------------------------------------
// POST /api/purchase-orders
// ---------------------------------------------------------------------------

/// Create a purchase order. Admins and managers only.
pub async fn create_purchase_order(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(body): ValidatedJson<CreatePurchaseOrderRequest>,
) -> Result<Created<PurchaseOrder>, ApiError> {
    auth.require_role(MANAGERS)?;
    check_editable_status(body.status)?;
    let supplier: Supplier = load(&state.store, "Supplier", body.supplier).await?;
    let (items, total_amount) = price_lines(&state, body.items).await?;

    let now = Utc::now();
    let order = PurchaseOrder {
        id: PurchaseOrderId::new(),
        po_number: purchase_order_number(now),
        supplier: supplier.id,
        items,
        total_amount,
        status: body.status.unwrap_or(PurchaseOrderStatus::Draft),
        expected_delivery: body.expected_delivery,
        notes: clean(body.notes),
        approved_by: None,
        approved_at: None,
        received_at: None,
        created_by: auth.id(),
        created_at: now,
        updated_at: now,
    };
    state
        .store
        .collection::<PurchaseOrder>()
        .insert(&order)
        .await?;

    activity::record(
        &state.store,
        Entry::new(
            auth.id(),
            ActivityAction::Create,
            EntityType::PurchaseOrder,
            order.id,
            format!(
                "Created purchase order {} with {} for {}",
                order.po_number, supplier.company_name, order.total_amount
            ),
        ),
    )
    .await?;

    Ok(Envelope::data(order).created())
}

// ---------------------------------------------------------------------------
// PUT /api/purchase-orders/:id
// ---------------------------------------------------------------------------

/// Edit a draft or pending purchase order. Admins and managers only.
pub async fn update_purchase_order(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdatePurchaseOrderRequest>,
) -> Result<Envelope<PurchaseOrder>, ApiError> {
    auth.require_role(MANAGERS)?;
    let id: PurchaseOrderId = parse_id("purchase order", &id)?;
    let mut order: PurchaseOrder = load(&state.store, "Purchase order", id).await?;

    if !EDITABLE.contains(&order.status) {
        return Err(ApiError::BadRequest(format!(
            "Cannot update a purchase order that is {}",
            order.status
        )));
    }
    check_editable_status(body.status)?;

    if let Some(supplier) = body.supplier {
        let supplier: Supplier = load(&state.store, "Supplier", supplier).await?;
        order.supplier = supplier.id;
    }
    if let Some(lines) = body.items {
        let (items, total_amount) = price_lines(&state, lines).await?;
        order.items = items;
        order.total_amount = total_amount;
    }
    if let Some(status) = body.status {
        order.status = status;
    }
    if body.expected_delivery.is_some() {
        order.expected_delivery = body.expected_delivery;
    }
    if body.notes.is_some() {
        order.notes = clean(body.notes);
    }
    order.updated_at = Utc::now();
    save(&state, &order).await?;

    activity::record(
        &state.store,
        Entry::new(
            auth.id(),
            ActivityAction::Update,
            EntityType::PurchaseOrder,
            id,
            format!("Updated purchase order {}", order.po_number),
        ),
    )
    .await?;

    Ok(Envelope::data(order))
}

// ---------------------------------------------------------------------------
// PUT /api/purchase-orders/:id/approve
// ---------------------------------------------------------------------------

/// Approve a draft or pending order. Admins and managers only.
pub async fn approve_purchase_order(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Envelope<PurchaseOrder>, ApiError> {
    auth.require_role(MANAGERS)?;
    let id: PurchaseOrderId = parse_id("purchase order", &id)?;
    let mut order: PurchaseOrder = load(&state.store, "Purchase order", id).await?;

    if !EDITABLE.contains(&order.status) {
        return Err(ApiError::BadRequest(format!(
            "Only draft or pending purchase orders can be approved (status is {})",
            order.status
        )));
    }

    let now = Utc::now();
    order.status = PurchaseOrderStatus::Approved;
    order.approved_by = Some(auth.id());
    order.approved_at = Some(now);
    order.updated_at = now;
    save(&state, &order).await?;

    activity::record(
        &state.store,
        Entry::new(
            auth.id(),
            ActivityAction::Approve,
            EntityType::PurchaseOrder,
            id,
            format!("Approved purchase order {}", order.po_number),
        ),
    )
    .await?;

    Ok(Envelope::data(order))
}

// ---------------------------------------------------------------------------
// PUT /api/purchase-orders/:id/order
// ---------------------------------------------------------------------------

/// Mark an approved order as sent to the supplier. Admins and managers only.
pub async fn place_purchase_order(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Envelope<PurchaseOrder>, ApiError> {
    auth.require_role(MANAGERS)?;
    let id: PurchaseOrderId = parse_id("purchase order", &id)?;
    let mut order: PurchaseOrder = load(&state.store, "Purchase order", id).await?;

    if order.status != PurchaseOrderStatus::Approved {
        return Err(ApiError::BadRequest(format!(
            "Only approved purchase orders can be ordered (status is {})",
            order.status
        )));
    }

    order.status = PurchaseOrderStatus::Ordered;
    order.updated_at = Utc::now();
    save(&state, &order).await?;

    activity::record(
        &state.store,
        Entry::new(
            auth.id(),
            ActivityAction::StatusChange,
            EntityType::PurchaseOrder,
            id,
            format!("Sent purchase order {} to the supplier", order.po_number),
        )
        .metadata(json!({
            "from": PurchaseOrderStatus::Approved,
            "to": PurchaseOrderStatus::Ordered,
        })),
    )
    .await?;

    Ok(Envelope::data(order))
}

// ---------------------------------------------------------------------------
// PUT /api/purchase-orders/:id/receive
// ---------------------------------------------------------------------------

/// Receive an approved or ordered purchase order into stock. Admins and
/// managers only.
pub async fn receive_purchase_order(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Envelope<ReceivedOrder>, ApiError> {
    auth.require_role(MANAGERS)?;
    let id: PurchaseOrderId = parse_id("purchase order", &id)?;
    let mut order: PurchaseOrder = load(&state.store, "Purchase order", id).await?;

    if !RECEIVABLE.contains(&order.status) {
        return Err(ApiError::BadRequest(format!(
            "Only approved or ordered purchase orders can be received (status is {})",
            order.status
        )));
    }

    // Load and check everything before the first write.
    let per_item = quantities_per_item(&order.items)?;
    let mut restocked = Vec::with_capacity(per_item.len());
    for (item_id, quantity) in per_item {
        let mut item: InventoryItem = load(&state.store, "Inventory item", item_id).await?;
        item.stock_quantity = item.stock_quantity.checked_add(quantity).ok_or_else(|| {
            ApiError::BadRequest(format!("Stock of {} would overflow", item.sku))
        })?;
        restocked.push(item);
    }

    let now = Utc::now();
    let mut alerts = Vec::new();
    for mut item in restocked {
        item.last_restocked = Some(now);
        item.updated_at = now;
        state
            .store
            .collection::<InventoryItem>()
            .replace(&item)
            .await?;
        if let Some(alert) = raise_stock_alert(&state.store, &item, auth.id()).await? {
            alerts.push(alert);
        }
    }

    order.status = PurchaseOrderStatus::Received;
    order.received_at = Some(now);
    order.updated_at = now;
    save(&state, &order).await?;

    tracing::info!(
        purchase_order = %order.po_number,
        lines = order.items.len(),
        alerts = alerts.len(),
        "Purchase order received"
    );

    activity::record(
        &state.store,
        Entry::new(
            auth.id(),
            ActivityAction::Receive,
            EntityType::PurchaseOrder,
            id,
            format!("Received purchase order {}", order.po_number),
        )
        .metadata(json!({
            "items": order.items.len(),
            "alerts": alerts.iter().map(|a| a.id).collect::<Vec<_>>(),
        })),
    )
    .await?;

    Ok(Envelope::data(ReceivedOrder {
        purchase_order: order,
        alerts,
    }))
}

// ---------------------------------------------------------------------------
// PUT /api/purchase-orders/:id/cancel
// ---------------------------------------------------------------------------

/// Cancel an order that has not been received. Admins and managers only.
pub async fn cancel_purchase_order(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Envelope<PurchaseOrder>, ApiError> {
    auth.require_role(MANAGERS)?;
    let id: PurchaseOrderId = parse_id("purchase order", &id)?;
    let mut order: PurchaseOrder = load(&state.store, "Purchase order", id).await?;

    match order.status {
        PurchaseOrderStatus::Received => {
            return Err(ApiError::BadRequest(String::from(
                "Cannot cancel a received purchase order",
            )));
        }
        PurchaseOrderStatus::Cancelled => {
            return Err(ApiError::BadRequest(String::from(
                "Purchase order is already cancelled",
            )));
        }
        _ => {}
    }

    let previous_status = order.status;
    order.status = PurchaseOrderStatus::Cancelled;
    order.updated_at = Utc::now();
    save(&state, &order).await?;

    activity::record(
        &state.store,
        Entry::new(
            auth.id(),
            ActivityAction::Cancel,
            EntityType::PurchaseOrder,
            id,
            format!("Cancelled purchase order {}", order.po_number),
        )
        .metadata(json!({ "from": previous_status })),
    )
    .await?;

    Ok(Envelope::data(order))
}

// ---------------------------------------------------------------------------
// DELETE /api/purchase-orders/:id
// ---------------------------------------------------------------------------

/// Delete a draft or cancelled purchase order. Admins only.
pub async fn delete_purchase_order(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Envelope<()>, ApiError> {
    auth.require_role(ADMINS)?;
    let id: PurchaseOrderId = parse_id("purchase order", &id)?;
    let order: PurchaseOrder = load(&state.store, "Purchase order", id).await?;

    if !DELETABLE.contains(&order.status) {
        return Err(ApiError::BadRequest(format!(
            "Only draft or cancelled purchase orders can be deleted (status is {})",
            order.status
        )));
    }

    state
        .store
        .collection::<PurchaseOrder>()
        .delete(id)
        .await?;

    activity::record(
        &state.store,
        Entry::new(
            auth.id(),
            ActivityAction::Delete,
            EntityType::PurchaseOrder,
            id,
            format!("Deleted purchase order {}", order.po_number),
        ),
    )
    .await?;

    Ok(Envelope::message("Purchase order deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(item: InventoryItemId, quantity: u32) -> PurchaseOrderLine {
        PurchaseOrderLine {
            item,
            quantity,
            unit_cost: Decimal::ONE,
            line_total: Decimal::from(quantity),
        }
    }

    #[test]
    fn repeated_lines_are_summed_per_item() {
        let (a, b) = (InventoryItemId::new(), InventoryItemId::new());
        let per_item = quantities_per_item(&[line(a, 3), line(b, 1), line(a, 4)]);
        let per_item = per_item.ok().unwrap_or_default();
        assert_eq!(per_item.get(&a), Some(&7));
        assert_eq!(per_item.get(&b), Some(&1));
    }

    #[test]
    fn quantity_overflow_is_rejected() {
        let a = InventoryItemId::new();
        assert!(matches!(
            quantities_per_item(&[line(a, u32::MAX), line(a, 1)]),
            Err(ApiError::BadRequest(_))
        ));
    }

    #[test]
    fn only_draft_and_pending_can_be_set_directly() {
        assert!(check_editable_status(None).is_ok());
        assert!(check_editable_status(Some(PurchaseOrderStatus::Pending)).is_ok());
        assert!(matches!(
            check_editable_status(Some(PurchaseOrderStatus::Received)),
            Err(ApiError::BadRequest(_))
        ));
    }
}
