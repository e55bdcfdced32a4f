//! Reporting endpoints.
//!
//! Each report runs a handful of grouped counts or full scans against the
//! store and hands them to `opsdesk_core::analytics` for reshaping. The
//! dashboard is open to every user; the detailed reports are for admins
//! and managers.

use std::sync::Arc;

use axum::extract::State;
use chrono::Utc;
use opsdesk_core::analytics::{
    average_progress, completion_rate, inventory_valuation, on_time_rate, order_value,
    percentage, purchase_spend_by_supplier, InventoryValuation, StatusBreakdown, SupplierSpend,
};
use opsdesk_db::{CompareOp, Document, Filter, FindOptions, GroupCount, Scalar, ScalarKind, Sort};
use opsdesk_types::{
    Activity, AlertStatus, AlertType, Customer, CustomerStatus, InventoryAlert, InventoryItem,
    Priority, Project, ProjectStatus, PurchaseOrder, PurchaseOrderStatus, Shipment,
    ShipmentDirection, ShipmentStatus, Task, TaskStatus,
};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::envelope::Envelope;
use crate::error::ApiError;
use crate::extract::AuthUser;
use crate::handlers::MANAGERS;
use crate::state::AppState;

/// Activities shown on the dashboard.
const RECENT_ACTIVITY: u64 = 10;

/// Task statuses that no longer count as open work.
const CLOSED_TASKS: [TaskStatus; 2] = [TaskStatus::Completed, TaskStatus::Cancelled];

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// Headline numbers for the dashboard.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    /// Task counts.
    pub tasks: DashboardTasks,
    /// Number of projects per status.
    pub projects: StatusBreakdown,
    /// Stock health.
    pub inventory: DashboardInventory,
    /// Purchasing pipeline.
    pub purchase_orders: DashboardPurchasing,
    /// Number of shipments per status.
    pub shipments: StatusBreakdown,
    /// Customers with status `active`.
    pub active_customers: u64,
    /// Latest activities visible to the caller.
    pub recent_activity: Vec<Activity>,
}

/// Task section of the dashboard.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardTasks {
    /// Tasks per status.
    #[serde(flatten)]
    pub breakdown: StatusBreakdown,
    /// Open tasks past their due date.
    pub overdue: u64,
    /// Open tasks assigned to the caller.
    pub assigned_to_me: u64,
}

/// Inventory section of the dashboard.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardInventory {
    /// Active items.
    pub total_items: u64,
    /// Items at or below their reorder point.
    pub low_stock_items: u64,
    /// Alerts not yet resolved.
    pub active_alerts: u64,
}

/// Purchasing section of the dashboard.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardPurchasing {
    /// Orders waiting for approval (draft or pending).
    pub awaiting_approval: u64,
    /// Orders not yet received or cancelled.
    pub open: u64,
}

/// `GET /api/analytics/tasks`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskReport {
    /// Tasks per status.
    pub by_status: StatusBreakdown,
    /// Tasks per priority.
    pub by_priority: StatusBreakdown,
    /// Open tasks per assignee, largest first.
    pub by_assignee: Vec<GroupCount>,
    /// Completed share of all tasks, in percent.
    pub completion_rate: Decimal,
    /// Completed-by-due-date share of completed tasks with a due date.
    pub on_time_rate: Decimal,
    /// Open tasks past their due date.
    pub overdue: u64,
}

/// `GET /api/analytics/inventory`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryReport {
    /// Stock value of active items.
    pub valuation: InventoryValuation,
    /// Alerts per type.
    pub alerts_by_type: StatusBreakdown,
    /// Alerts per status.
    pub alerts_by_status: StatusBreakdown,
}

/// `GET /api/analytics/projects`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectReport {
    /// Projects per status.
    pub by_status: StatusBreakdown,
    /// Projects per priority.
    pub by_priority: StatusBreakdown,
    /// Mean progress of active projects.
    pub average_progress: Decimal,
    /// Σ budget of projects that are not cancelled.
    pub total_budget: Decimal,
}

/// `GET /api/analytics/purchase-orders`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchasingReport {
    /// Orders per status.
    pub by_status: StatusBreakdown,
    /// Value of open orders.
    pub open_value: Decimal,
    /// Value of received orders.
    pub received_value: Decimal,
    /// Spend per supplier, largest first.
    pub by_supplier: Vec<SupplierSpend>,
}

/// `GET /api/analytics/shipments`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShipmentReport {
    /// Shipments per status.
    pub by_status: StatusBreakdown,
    /// Shipments per direction.
    pub by_direction: StatusBreakdown,
    /// Shipments per carrier, largest first.
    pub by_carrier: Vec<GroupCount>,
    /// Share of delivered shipments with an estimate that arrived by it.
    pub on_time_delivery_rate: Decimal,
    /// Σ shipping cost.
    pub total_shipping_cost: Decimal,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn wire_names<T: Copy + core::fmt::Display>(all: &[T]) -> Vec<String> {
    all.iter().map(ToString::to_string).collect()
}

async fn breakdown<T: Document>(
    state: &AppState,
    filter: &Filter,
    field: &str,
    known: &[String],
) -> Result<StatusBreakdown, ApiError> {
    let counts = state
        .store
        .collection::<T>()
        .group_count(filter, field)
        .await?;
    let known: Vec<&str> = known.iter().map(String::as_str).collect();
    Ok(StatusBreakdown::from_counts(
        &known,
        counts.into_iter().map(|g| (g.key, g.count)),
    ))
}

/// Grouped counts as a list, largest first.
fn ranked(mut counts: Vec<GroupCount>) -> Vec<GroupCount> {
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.key.cmp(&b.key)));
    counts
}

fn overdue_tasks() -> Filter {
    Filter::new()
        .compare("dueDate", CompareOp::Lt, Scalar::Timestamp(Utc::now()))
        .not_in("status", CLOSED_TASKS)
}

// ---------------------------------------------------------------------------
// GET /api/analytics/dashboard
// ---------------------------------------------------------------------------

/// Headline numbers across every area.
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Envelope<Dashboard>, ApiError> {
    let all = Filter::new();

    let tasks = DashboardTasks {
        breakdown: breakdown::<Task>(&state, &all, "status", &wire_names(TaskStatus::ALL)).await?,
        overdue: state.store.collection::<Task>().count(&overdue_tasks()).await?,
        assigned_to_me: state
            .store
            .collection::<Task>()
            .count(
                &Filter::new()
                    .eq("assignedTo", auth.id())
                    .not_in("status", CLOSED_TASKS),
            )
            .await?,
    };

    let projects =
        breakdown::<Project>(&state, &all, "status", &wire_names(ProjectStatus::ALL)).await?;
    let shipments =
        breakdown::<Shipment>(&state, &all, "status", &wire_names(ShipmentStatus::ALL)).await?;

    let active_items = Filter::new().eq("isActive", true);
    let inventory = DashboardInventory {
        total_items: state
            .store
            .collection::<InventoryItem>()
            .count(&active_items)
            .await?,
        low_stock_items: state
            .store
            .collection::<InventoryItem>()
            .count(&active_items.clone().field_compare(
                "stockQuantity",
                CompareOp::Lte,
                "reorderPoint",
                ScalarKind::Integer,
            ))
            .await?,
        active_alerts: state
            .store
            .collection::<InventoryAlert>()
            .count(&Filter::new().eq("status", AlertStatus::Active))
            .await?,
    };

    let orders = breakdown::<PurchaseOrder>(
        &state,
        &all,
        "status",
        &wire_names(PurchaseOrderStatus::ALL),
    )
    .await?;
    let purchase_orders = DashboardPurchasing {
        awaiting_approval: orders
            .get(PurchaseOrderStatus::Draft.as_str())
            .saturating_add(orders.get(PurchaseOrderStatus::Pending.as_str())),
        open: PurchaseOrderStatus::OPEN
            .iter()
            .map(|s| orders.get(s.as_str()))
            .fold(0_u64, u64::saturating_add),
    };

    let active_customers = state
        .store
        .collection::<Customer>()
        .count(&Filter::new().eq("status", CustomerStatus::Active))
        .await?;

    let visible = if auth.actor().sees_everything() {
        Filter::new()
    } else {
        Filter::new().eq("user", auth.id())
    };
    let recent_activity = state
        .store
        .collection::<Activity>()
        .find(
            &FindOptions::new(visible)
                .sort(Sort::newest_first())
                .limit(RECENT_ACTIVITY),
        )
        .await?;

    Ok(Envelope::data(Dashboard {
        tasks,
        projects,
        inventory,
        purchase_orders,
        shipments,
        active_customers,
        recent_activity,
    }))
}

// ---------------------------------------------------------------------------
// GET /api/analytics/tasks
// ---------------------------------------------------------------------------

/// Task throughput and workload.
pub async fn task_report(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Envelope<TaskReport>, ApiError> {
    auth.require_role(MANAGERS)?;
    let all = Filter::new();
    let tasks = state.store.collection::<Task>();

    let by_status = breakdown::<Task>(&state, &all, "status", &wire_names(TaskStatus::ALL)).await?;
    let by_priority =
        breakdown::<Task>(&state, &all, "priority", &wire_names(Priority::ALL)).await?;
    let open = Filter::new().not_in("status", CLOSED_TASKS);
    let by_assignee = ranked(tasks.group_count(&open, "assignedTo").await?);
    let completed = tasks
        .find_all(Filter::new().eq("status", TaskStatus::Completed))
        .await?;
    let overdue = tasks.count(&overdue_tasks()).await?;

    Ok(Envelope::data(TaskReport {
        completion_rate: completion_rate(
            by_status.get(TaskStatus::Completed.as_str()),
            by_status.total,
        ),
        on_time_rate: on_time_rate(&completed),
        by_status,
        by_priority,
        by_assignee,
        overdue,
    }))
}

// ---------------------------------------------------------------------------
// GET /api/analytics/inventory
// ---------------------------------------------------------------------------

/// Stock valuation and alert counts.
pub async fn inventory_report(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Envelope<InventoryReport>, ApiError> {
    auth.require_role(MANAGERS)?;
    let items = state
        .store
        .collection::<InventoryItem>()
        .find_all(Filter::new().eq("isActive", true))
        .await?;
    let all = Filter::new();

    Ok(Envelope::data(InventoryReport {
        valuation: inventory_valuation(&items),
        alerts_by_type: breakdown::<InventoryAlert>(
            &state,
            &all,
            "alertType",
            &wire_names(AlertType::ALL),
        )
        .await?,
        alerts_by_status: breakdown::<InventoryAlert>(
            &state,
            &all,
            "status",
            &wire_names(AlertStatus::ALL),
        )
        .await?,
    }))
}

// ---------------------------------------------------------------------------
// GET /api/analytics/projects
// ---------------------------------------------------------------------------

/// Project portfolio summary.
pub async fn project_report(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Envelope<ProjectReport>, ApiError> {
    auth.require_role(MANAGERS)?;
    let all = Filter::new();
    let projects = state.store.collection::<Project>().find_all(all.clone()).await?;

    let active: Vec<Project> = projects
        .iter()
        .filter(|p| p.status == ProjectStatus::Active)
        .cloned()
        .collect();
    let total_budget = projects
        .iter()
        .filter(|p| p.status != ProjectStatus::Cancelled)
        .filter_map(|p| p.budget)
        .fold(Decimal::ZERO, Decimal::saturating_add);

    Ok(Envelope::data(ProjectReport {
        by_status: breakdown::<Project>(&state, &all, "status", &wire_names(ProjectStatus::ALL))
            .await?,
        by_priority: breakdown::<Project>(&state, &all, "priority", &wire_names(Priority::ALL))
            .await?,
        average_progress: average_progress(&active),
        total_budget,
    }))
}

// ---------------------------------------------------------------------------
// GET /api/analytics/purchase-orders
// ---------------------------------------------------------------------------

/// Purchasing pipeline and spend per supplier.
pub async fn purchasing_report(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Envelope<PurchasingReport>, ApiError> {
    auth.require_role(MANAGERS)?;
    let all = Filter::new();
    let orders = state
        .store
        .collection::<PurchaseOrder>()
        .find_all(all.clone())
        .await?;

    Ok(Envelope::data(PurchasingReport {
        by_status: breakdown::<PurchaseOrder>(
            &state,
            &all,
            "status",
            &wire_names(PurchaseOrderStatus::ALL),
        )
        .await?,
        open_value: order_value(&orders, PurchaseOrderStatus::OPEN),
        received_value: order_value(&orders, &[PurchaseOrderStatus::Received]),
        by_supplier: purchase_spend_by_supplier(&orders),
    }))
}

// ---------------------------------------------------------------------------
// GET /api/analytics/shipments
// ---------------------------------------------------------------------------

/// Shipment volume and delivery performance.
pub async fn shipment_report(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Envelope<ShipmentReport>, ApiError> {
    auth.require_role(MANAGERS)?;
    let all = Filter::new();
    let collection = state.store.collection::<Shipment>();
    let shipments = collection.find_all(all.clone()).await?;

    let (on_time, estimated) = shipments
        .iter()
        .filter_map(|s| Some((s.delivered_at?, s.estimated_delivery?)))
        .fold((0_u64, 0_u64), |(hit, total), (delivered, estimate)| {
            (
                hit.saturating_add(u64::from(delivered <= estimate)),
                total.saturating_add(1),
            )
        });
    let total_shipping_cost = shipments
        .iter()
        .filter_map(|s| s.shipping_cost)
        .fold(Decimal::ZERO, Decimal::saturating_add);

    Ok(Envelope::data(ShipmentReport {
        by_status: breakdown::<Shipment>(&state, &all, "status", &wire_names(ShipmentStatus::ALL))
            .await?,
        by_direction: breakdown::<Shipment>(
            &state,
            &all,
            "direction",
            &wire_names(ShipmentDirection::ALL),
        )
        .await?,
        by_carrier: ranked(collection.group_count(&all, "carrier").await?),
        on_time_delivery_rate: percentage(on_time, estimated),
        total_shipping_cost,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranked_sorts_largest_first() {
        let counts = vec![
            GroupCount {
                key: Some(String::from("UPS")),
                count: 2,
            },
            GroupCount {
                key: Some(String::from("DHL")),
                count: 5,
            },
            GroupCount {
                key: None,
                count: 2,
            },
        ];
        let ranked = ranked(counts);
        let keys: Vec<Option<&str>> = ranked.iter().map(|k| k.key.as_deref()).collect();
        assert_eq!(keys, vec![Some("DHL"), None, Some("UPS")]);
    }

    #[test]
    fn wire_names_use_kebab_case() {
        assert_eq!(
            wire_names(ShipmentStatus::ALL).get(1).map(String::as_str),
            Some("in-transit")
        );
    }
}
