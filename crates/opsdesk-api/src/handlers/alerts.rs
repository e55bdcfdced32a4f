//! Inventory alert endpoints. Alerts are created only by stock writes; this
//! module lists, resolves, and deletes them.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use chrono::Utc;
use opsdesk_core::PageRequest;
use opsdesk_db::{Filter, ScalarKind};
use opsdesk_types::{
    ActivityAction, AlertStatus, AlertType, EntityType, InventoryAlert, InventoryAlertId,
    InventoryItemId,
};
use serde::Deserialize;
use validator::Validate;

use crate::activity::{self, Entry};
use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::extract::{ApiQuery, AuthUser};
use crate::handlers::{clean, find_page, load, parse_id, parse_sort, ADMINS};
use crate::state::AppState;

const SORT_FIELDS: &[(&str, ScalarKind)] = &[
    ("createdAt", ScalarKind::Timestamp),
    ("currentQuantity", ScalarKind::Integer),
    ("resolvedAt", ScalarKind::Timestamp),
];

/// Query parameters for `GET /api/inventory-alerts`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertsQuery {
    /// Filter by status.
    pub status: Option<AlertStatus>,
    /// Filter by alert type.
    pub alert_type: Option<AlertType>,
    /// Filter by item.
    pub item: Option<InventoryItemId>,
    /// Sort field, `-` prefix for descending.
    pub sort: Option<String>,
    /// Page number.
    pub page: Option<u64>,
    /// Page size.
    pub limit: Option<u64>,
}

/// Optional body of `PUT /api/inventory-alerts/:id/resolve`.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct ResolveAlertRequest {
    /// Resolution notes.
    #[validate(length(max = 1000, message = "Notes cannot exceed 1000 characters"))]
    pub notes: Option<String>,
}

/// Parse an optional JSON body; an empty body means all defaults.
fn optional_body<T>(bytes: &Bytes) -> Result<T, ApiError>
where
    T: Default + for<'de> Deserialize<'de> + Validate,
{
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    let value: T = serde_json::from_slice(bytes)
        .map_err(|e| ApiError::BadRequest(format!("Invalid JSON body: {e}")))?;
    value.validate()?;
    Ok(value)
}

// ---------------------------------------------------------------------------
// GET /api/inventory-alerts
// ---------------------------------------------------------------------------

/// List alerts, newest first.
pub async fn list_alerts(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    ApiQuery(query): ApiQuery<AlertsQuery>,
) -> Result<Envelope<Vec<InventoryAlert>>, ApiError> {
    let filter = Filter::new()
        .eq_opt("status", query.status)
        .eq_opt("alertType", query.alert_type)
        .eq_opt("item", query.item);
    let sort = parse_sort(query.sort.as_deref(), SORT_FIELDS)?;
    let page = PageRequest::new(query.page, query.limit, &state.pagination);

    find_page(&state.store, filter, sort, &page).await
}

// ---------------------------------------------------------------------------
// GET /api/inventory-alerts/:id
// ---------------------------------------------------------------------------

/// Fetch one alert.
pub async fn get_alert(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Envelope<InventoryAlert>, ApiError> {
    let id: InventoryAlertId = parse_id("alert", &id)?;
    Ok(Envelope::data(load(&state.store, "Alert", id).await?))
}

// ---------------------------------------------------------------------------
// PUT /api/inventory-alerts/:id/resolve
// ---------------------------------------------------------------------------

/// Mark an active alert resolved.
pub async fn resolve_alert(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Envelope<InventoryAlert>, ApiError> {
    let id: InventoryAlertId = parse_id("alert", &id)?;
    let body: ResolveAlertRequest = optional_body(&body)?;
    let mut alert: InventoryAlert = load(&state.store, "Alert", id).await?;

    if alert.status == AlertStatus::Resolved {
        return Err(ApiError::BadRequest(String::from("Alert is already resolved")));
    }

    let now = Utc::now();
    alert.status = AlertStatus::Resolved;
    alert.resolved_by = Some(auth.id());
    alert.resolved_at = Some(now);
    alert.resolution_notes = clean(body.notes);
    alert.updated_at = now;
    state
        .store
        .collection::<InventoryAlert>()
        .replace(&alert)
        .await?;

    activity::record(
        &state.store,
        Entry::new(
            auth.id(),
            ActivityAction::Resolve,
            EntityType::InventoryAlert,
            id,
            format!("Resolved {} alert for {}", alert.alert_type, alert.sku),
        ),
    )
    .await?;

    Ok(Envelope::data(alert))
}

// ---------------------------------------------------------------------------
// DELETE /api/inventory-alerts/:id
// ---------------------------------------------------------------------------

/// Delete an alert. Admins only.
pub async fn delete_alert(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Envelope<()>, ApiError> {
    auth.require_role(ADMINS)?;
    let id: InventoryAlertId = parse_id("alert", &id)?;
    let alert: InventoryAlert = load(&state.store, "Alert", id).await?;

    state
        .store
        .collection::<InventoryAlert>()
        .delete(id)
        .await?;

    activity::record(
        &state.store,
        Entry::new(
            auth.id(),
            ActivityAction::Delete,
            EntityType::InventoryAlert,
            id,
            format!("Deleted {} alert for {}", alert.alert_type, alert.sku),
        ),
    )
    .await?;

    Ok(Envelope::message("Alert deleted"))
}
