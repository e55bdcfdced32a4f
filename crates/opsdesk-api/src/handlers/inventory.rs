//! Inventory item endpoints and the stock-alert side effect.
//!
//! Every write that changes an item's `stockQuantity` (adjustments, direct
//! updates, purchase order receipts) goes through [`raise_stock_alert`],
//! which stores a new [`InventoryAlert`] whenever the new quantity is at or
//! below the reorder point. Existing active alerts for the item are not
//! consulted, so repeated writes below the threshold raise repeated alerts.

use std::sync::Arc;

use axum::extract::{Path, State};
use chrono::Utc;
use opsdesk_core::inventory::{alert_for, alert_message, apply_adjustment};
use opsdesk_core::PageRequest;
use opsdesk_db::{CompareOp, DocumentStore, Filter, ScalarKind};
use opsdesk_types::{
    ActivityAction, AdjustmentType, AlertStatus, EntityType, InventoryAlert, InventoryAlertId,
    InventoryItem, InventoryItemId, PurchaseOrder, PurchaseOrderStatus, Supplier, SupplierId,
    UserId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
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

/// Reorder point for items created without one.
const DEFAULT_REORDER_POINT: u32 = 10;

/// Reorder quantity for items created without one.
const DEFAULT_REORDER_QUANTITY: u32 = 50;

const SORT_FIELDS: &[(&str, ScalarKind)] = &[
    ("createdAt", ScalarKind::Timestamp),
    ("name", ScalarKind::Text),
    ("sku", ScalarKind::Text),
    ("category", ScalarKind::Text),
    ("stockQuantity", ScalarKind::Integer),
    ("unitCost", ScalarKind::Decimal),
    ("unitPrice", ScalarKind::Decimal),
];

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Query parameters for `GET /api/inventory`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryQuery {
    /// Filter by category.
    pub category: Option<String>,
    /// Filter by supplier.
    pub supplier: Option<SupplierId>,
    /// Only items at or below their reorder point.
    pub low_stock: Option<bool>,
    /// Filter by active flag.
    pub is_active: Option<bool>,
    /// Substring of name, SKU, or description.
    pub search: Option<String>,
    /// Sort field, `-` prefix for descending.
    pub sort: Option<String>,
    /// Page number.
    pub page: Option<u64>,
    /// Page size.
    pub limit: Option<u64>,
}

/// Body of `POST /api/inventory`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateItemRequest {
    /// Stock keeping unit; stored uppercased.
    #[serde(default)]
    #[validate(length(min = 1, max = 50, message = "Please add a SKU"))]
    pub sku: String,
    /// Item name.
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "Please add an item name"))]
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Category.
    #[serde(default)]
    #[validate(length(min = 1, max = 100, message = "Please add a category"))]
    pub category: String,
    /// Preferred supplier.
    pub supplier: Option<SupplierId>,
    /// Opening stock, zero when absent.
    pub stock_quantity: Option<u32>,
    /// Low-stock threshold.
    pub reorder_point: Option<u32>,
    /// Suggested reorder size.
    pub reorder_quantity: Option<u32>,
    /// Cost per unit.
    pub unit_cost: Option<Decimal>,
    /// Price per unit.
    pub unit_price: Option<Decimal>,
    /// Warehouse location.
    pub location: Option<String>,
    /// Active flag, `true` when absent.
    pub is_active: Option<bool>,
}

/// Body of `PUT /api/inventory/:id`. Absent fields are left unchanged.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    /// Stock keeping unit.
    #[validate(length(min = 1, max = 50, message = "SKU cannot be empty"))]
    pub sku: Option<String>,
    /// Item name.
    #[validate(length(min = 1, max = 200, message = "Item name cannot be empty"))]
    pub name: Option<String>,
    /// Description.
    pub description: Option<String>,
    /// Category.
    #[validate(length(min = 1, max = 100, message = "Category cannot be empty"))]
    pub category: Option<String>,
    /// Preferred supplier.
    pub supplier: Option<SupplierId>,
    /// Stock on hand.
    pub stock_quantity: Option<u32>,
    /// Low-stock threshold.
    pub reorder_point: Option<u32>,
    /// Suggested reorder size.
    pub reorder_quantity: Option<u32>,
    /// Cost per unit.
    pub unit_cost: Option<Decimal>,
    /// Price per unit.
    pub unit_price: Option<Decimal>,
    /// Warehouse location.
    pub location: Option<String>,
    /// Active flag.
    pub is_active: Option<bool>,
}

/// Body of `POST /api/inventory/:id/adjust`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AdjustStockRequest {
    /// How `quantity` applies to the current stock.
    pub adjustment_type: AdjustmentType,
    /// Units to add, subtract, or set.
    pub quantity: i64,
    /// Why the stock changed.
    #[validate(length(max = 500, message = "Reason cannot exceed 500 characters"))]
    pub reason: Option<String>,
}

/// Result of a stock adjustment.
#[derive(Debug, Serialize)]
pub struct StockAdjustment {
    /// The item after the adjustment.
    pub item: InventoryItem,
    /// The alert raised by the adjustment, if any.
    pub alert: Option<InventoryAlert>,
}

fn normalize_sku(sku: &str) -> String {
    sku.trim().to_uppercase()
}

async fn ensure_sku_free(
    state: &AppState,
    sku: &str,
    except: Option<InventoryItemId>,
) -> Result<(), ApiError> {
    let mut filter = Filter::new().eq("sku", sku);
    if let Some(id) = except {
        filter = filter.ne("id", id);
    }
    if state
        .store
        .collection::<InventoryItem>()
        .exists(&filter)
        .await?
    {
        return Err(already_exists(format!("Item with SKU {sku}")));
    }
    Ok(())
}

fn check_money(cost: Option<Decimal>, price: Option<Decimal>) -> Result<(), ApiError> {
    if cost.is_some_and(|c| c.is_sign_negative()) || price.is_some_and(|p| p.is_sign_negative())
    {
        return Err(ApiError::BadRequest(String::from(
            "Unit cost and price cannot be negative",
        )));
    }
    Ok(())
}

/// Store a new alert if `item`'s current stock calls for one.
pub(crate) async fn raise_stock_alert(
    store: &DocumentStore,
    item: &InventoryItem,
    actor: UserId,
) -> Result<Option<InventoryAlert>, ApiError> {
    let Some(alert_type) = alert_for(item.stock_quantity, item.reorder_point) else {
        return Ok(None);
    };

    let now = Utc::now();
    let alert = InventoryAlert {
        id: InventoryAlertId::new(),
        item: item.id,
        item_name: item.name.clone(),
        sku: item.sku.clone(),
        alert_type,
        status: AlertStatus::Active,
        current_quantity: item.stock_quantity,
        reorder_point: item.reorder_point,
        message: alert_message(
            alert_type,
            &item.name,
            &item.sku,
            item.stock_quantity,
            item.reorder_point,
        ),
        created_by: actor,
        resolved_by: None,
        resolved_at: None,
        resolution_notes: None,
        created_at: now,
        updated_at: now,
    };
    store.collection::<InventoryAlert>().insert(&alert).await?;

    tracing::info!(
        item_id = %item.id,
        sku = %item.sku,
        alert_type = %alert_type,
        quantity = item.stock_quantity,
        reorder_point = item.reorder_point,
        "Inventory alert raised"
    );
    Ok(Some(alert))
}

// ---------------------------------------------------------------------------
// GET /api/inventory
// ---------------------------------------------------------------------------

/// List inventory items.
pub async fn list_items(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    ApiQuery(query): ApiQuery<InventoryQuery>,
) -> Result<Envelope<Vec<InventoryItem>>, ApiError> {
    let mut filter = Filter::new()
        .eq_opt("category", clean(query.category))
        .eq_opt("supplier", query.supplier)
        .eq_opt("isActive", query.is_active)
        .search(&["name", "sku", "description"], query.search.as_deref());
    if query.low_stock == Some(true) {
        filter = filter.field_compare(
            "stockQuantity",
            CompareOp::Lte,
            "reorderPoint",
            ScalarKind::Integer,
        );
    }
    let sort = parse_sort(query.sort.as_deref(), SORT_FIELDS)?;
    let page = PageRequest::new(query.page, query.limit, &state.pagination);

    find_page(&state.store, filter, sort, &page).await
}

// ---------------------------------------------------------------------------
// GET /api/inventory/:id
// ---------------------------------------------------------------------------

/// Fetch one item.
pub async fn get_item(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Envelope<InventoryItem>, ApiError> {
    let id: InventoryItemId = parse_id("inventory item", &id)?;
    Ok(Envelope::data(load(&state.store, "Inventory item", id).await?))
}

// ---------------------------------------------------------------------------
// POST /api/inventory
// ---------------------------------------------------------------------------

/// Create an item. Admins and managers only.
pub async fn create_item(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    ValidatedJson(body): ValidatedJson<CreateItemRequest>,
) -> Result<Created<InventoryItem>, ApiError> {
    auth.require_role(MANAGERS)?;
    check_money(body.unit_cost, body.unit_price)?;
    let sku = normalize_sku(&body.sku);
    ensure_sku_free(&state, &sku, None).await?;
    ensure_exists::<Supplier, _>(&state.store, "Supplier", body.supplier).await?;

    let now = Utc::now();
    let item = InventoryItem {
        id: InventoryItemId::new(),
        sku,
        name: body.name.trim().to_owned(),
        description: clean(body.description),
        category: body.category.trim().to_owned(),
        supplier: body.supplier,
        stock_quantity: body.stock_quantity.unwrap_or(0),
        reorder_point: body.reorder_point.unwrap_or(DEFAULT_REORDER_POINT),
        reorder_quantity: body.reorder_quantity.unwrap_or(DEFAULT_REORDER_QUANTITY),
        unit_cost: body.unit_cost.unwrap_or(Decimal::ZERO),
        unit_price: body.unit_price.unwrap_or(Decimal::ZERO),
        location: clean(body.location),
        is_active: body.is_active.unwrap_or(true),
        last_restocked: None,
        created_by: auth.id(),
        created_at: now,
        updated_at: now,
    };
    state
        .store
        .collection::<InventoryItem>()
        .insert(&item)
        .await?;

    activity::record(
        &state.store,
        Entry::new(
            auth.id(),
            ActivityAction::Create,
            EntityType::InventoryItem,
            item.id,
            format!("Created inventory item {} ({})", item.name, item.sku),
        ),
    )
    .await?;

    Ok(Envelope::data(item).created())
}

// ---------------------------------------------------------------------------
// PUT /api/inventory/:id
// ---------------------------------------------------------------------------

/// Update an item. Admins and managers only.
///
/// A changed `stockQuantity` runs the stock alert rule.
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<UpdateItemRequest>,
) -> Result<Envelope<InventoryItem>, ApiError> {
    auth.require_role(MANAGERS)?;
    let id: InventoryItemId = parse_id("inventory item", &id)?;
    let mut item: InventoryItem = load(&state.store, "Inventory item", id).await?;

    check_money(body.unit_cost, body.unit_price)?;
    ensure_exists::<Supplier, _>(&state.store, "Supplier", body.supplier).await?;
    let new_sku = body
        .sku
        .as_deref()
        .map(normalize_sku)
        .filter(|sku| *sku != item.sku);
    if let Some(sku) = new_sku {
        ensure_sku_free(&state, &sku, Some(id)).await?;
        item.sku = sku;
    }

    let previous_quantity = item.stock_quantity;
    if let Some(name) = body.name {
        item.name = name.trim().to_owned();
    }
    if body.description.is_some() {
        item.description = clean(body.description);
    }
    if let Some(category) = body.category {
        item.category = category.trim().to_owned();
    }
    if body.supplier.is_some() {
        item.supplier = body.supplier;
    }
    if let Some(quantity) = body.stock_quantity {
        item.stock_quantity = quantity;
    }
    if let Some(point) = body.reorder_point {
        item.reorder_point = point;
    }
    if let Some(quantity) = body.reorder_quantity {
        item.reorder_quantity = quantity;
    }
    if let Some(cost) = body.unit_cost {
        item.unit_cost = cost;
    }
    if let Some(price) = body.unit_price {
        item.unit_price = price;
    }
    if body.location.is_some() {
        item.location = clean(body.location);
    }
    if let Some(active) = body.is_active {
        item.is_active = active;
    }
    item.updated_at = Utc::now();
    state
        .store
        .collection::<InventoryItem>()
        .replace(&item)
        .await?;

    let alert = if item.stock_quantity == previous_quantity {
        None
    } else {
        raise_stock_alert(&state.store, &item, auth.id()).await?
    };

    activity::record(
        &state.store,
        Entry::new(
            auth.id(),
            ActivityAction::Update,
            EntityType::InventoryItem,
            id,
            format!("Updated inventory item {} ({})", item.name, item.sku),
        )
        .metadata(json!({
            "previousQuantity": previous_quantity,
            "newQuantity": item.stock_quantity,
            "alert": alert.as_ref().map(|a| a.id),
        })),
    )
    .await?;

    Ok(Envelope::data(item))
}

// ---------------------------------------------------------------------------
// DELETE /api/inventory/:id
// ---------------------------------------------------------------------------

/// Delete an item no open purchase order references. Admins and managers
/// only.
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Envelope<()>, ApiError> {
    auth.require_role(MANAGERS)?;
    let id: InventoryItemId = parse_id("inventory item", &id)?;
    let item: InventoryItem = load(&state.store, "Inventory item", id).await?;

    let open_orders = Filter::new()
        .is_in("status", PurchaseOrderStatus::OPEN.iter().copied())
        .contains("items", json!([{ "item": id }]));
    if state
        .store
        .collection::<PurchaseOrder>()
        .exists(&open_orders)
        .await?
    {
        return Err(ApiError::BadRequest(String::from(
            "Cannot delete item referenced by open purchase orders",
        )));
    }

    state.store.collection::<InventoryItem>().delete(id).await?;

    activity::record(
        &state.store,
        Entry::new(
            auth.id(),
            ActivityAction::Delete,
            EntityType::InventoryItem,
            id,
            format!("Deleted inventory item {} ({})", item.name, item.sku),
        ),
    )
    .await?;

    Ok(Envelope::message("Inventory item deleted"))
}

// ---------------------------------------------------------------------------
// POST /api/inventory/:id/adjust
// ---------------------------------------------------------------------------

/// Add to, subtract from, or set an item's stock. Open to every user.
pub async fn adjust_stock(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    ValidatedJson(body): ValidatedJson<AdjustStockRequest>,
) -> Result<Envelope<StockAdjustment>, ApiError> {
    let id: InventoryItemId = parse_id("inventory item", &id)?;
    let mut item: InventoryItem = load(&state.store, "Inventory item", id).await?;

    let previous_quantity = item.stock_quantity;
    item.stock_quantity = apply_adjustment(previous_quantity, body.adjustment_type, body.quantity)?;
    item.updated_at = Utc::now();
    state
        .store
        .collection::<InventoryItem>()
        .replace(&item)
        .await?;

    let alert = raise_stock_alert(&state.store, &item, auth.id()).await?;
    let reason = clean(body.reason);

    activity::record(
        &state.store,
        Entry::new(
            auth.id(),
            ActivityAction::StockAdjust,
            EntityType::InventoryItem,
            id,
            format!(
                "Adjusted stock of {} ({}) from {previous_quantity} to {}",
                item.name, item.sku, item.stock_quantity
            ),
        )
        .metadata(json!({
            "adjustmentType": body.adjustment_type,
            "quantity": body.quantity,
            "previousQuantity": previous_quantity,
            "newQuantity": item.stock_quantity,
            "reason": reason,
            "alert": alert.as_ref().map(|a| a.id),
        })),
    )
    .await?;

    Ok(Envelope::data(StockAdjustment { item, alert }))
}
