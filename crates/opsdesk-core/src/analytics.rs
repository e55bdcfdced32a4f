//! Reshaping of grouped counts and document sets into report summaries.
//!
//! The API gathers raw grouped counts and document lists from the store;
//! everything here is pure arithmetic over them.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use opsdesk_types::{
    AlertType, InventoryItem, Project, PurchaseOrder, PurchaseOrderStatus, SupplierId, Task,
    TaskStatus,
};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::inventory::alert_for;

/// Key used for documents whose grouped field is missing.
const MISSING_KEY: &str = "none";

/// Counts per status value plus their total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusBreakdown {
    /// Sum of all buckets.
    pub total: u64,
    /// Count per status. Every known status is present, even at zero.
    pub by_status: BTreeMap<String, u64>,
}

impl StatusBreakdown {
    /// Build from grouped counts, pre-filling `known` statuses with zero.
    pub fn from_counts<I>(known: &[&str], counts: I) -> Self
    where
        I: IntoIterator<Item = (Option<String>, u64)>,
    {
        let mut by_status: BTreeMap<String, u64> =
            known.iter().map(|status| ((*status).to_owned(), 0)).collect();
        let mut total: u64 = 0;
        for (key, count) in counts {
            let slot = by_status
                .entry(key.unwrap_or_else(|| MISSING_KEY.to_owned()))
                .or_insert(0);
            *slot = slot.saturating_add(count);
            total = total.saturating_add(count);
        }
        Self { total, by_status }
    }

    /// Count for one status (zero if absent).
    pub fn get(&self, status: &str) -> u64 {
        self.by_status.get(status).copied().unwrap_or(0)
    }
}

/// Stock value of one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryValuation {
    /// Category name.
    pub category: String,
    /// Number of items.
    pub item_count: u64,
    /// Units on hand.
    pub total_units: u64,
    /// Σ quantity × unit cost.
    pub cost_value: Decimal,
    /// Σ quantity × unit price.
    pub retail_value: Decimal,
}

/// Stock value across all items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryValuation {
    /// Number of items.
    pub total_items: u64,
    /// Units on hand.
    pub total_units: u64,
    /// Σ quantity × unit cost.
    pub total_cost_value: Decimal,
    /// Σ quantity × unit price.
    pub total_retail_value: Decimal,
    /// Items above zero but at or below their reorder point.
    pub low_stock_items: u64,
    /// Items with zero stock.
    pub out_of_stock_items: u64,
    /// Per-category breakdown, highest cost value first.
    pub by_category: Vec<CategoryValuation>,
}

/// Value the given items in one pass.
pub fn inventory_valuation(items: &[InventoryItem]) -> InventoryValuation {
    let mut categories: BTreeMap<&str, CategoryValuation> = BTreeMap::new();
    let mut low_stock_items: u64 = 0;
    let mut out_of_stock_items: u64 = 0;

    for item in items {
        let units = Decimal::from(item.stock_quantity);
        let cost = units.saturating_mul(item.unit_cost);
        let retail = units.saturating_mul(item.unit_price);

        let entry = categories
            .entry(item.category.as_str())
            .or_insert_with(|| CategoryValuation {
                category: item.category.clone(),
                item_count: 0,
                total_units: 0,
                cost_value: Decimal::ZERO,
                retail_value: Decimal::ZERO,
            });
        entry.item_count = entry.item_count.saturating_add(1);
        entry.total_units = entry
            .total_units
            .saturating_add(u64::from(item.stock_quantity));
        entry.cost_value = entry.cost_value.saturating_add(cost);
        entry.retail_value = entry.retail_value.saturating_add(retail);

        match alert_for(item.stock_quantity, item.reorder_point) {
            Some(AlertType::OutOfStock) => {
                out_of_stock_items = out_of_stock_items.saturating_add(1);
            }
            Some(AlertType::LowStock) => {
                low_stock_items = low_stock_items.saturating_add(1);
            }
            None => {}
        }
    }

    let mut by_category: Vec<CategoryValuation> = categories.into_values().collect();
    by_category.sort_by(|a, b| {
        b.cost_value
            .cmp(&a.cost_value)
            .then_with(|| a.category.cmp(&b.category))
    });

    InventoryValuation {
        total_items: by_category.iter().map(|c| c.item_count).sum(),
        total_units: by_category.iter().map(|c| c.total_units).sum(),
        total_cost_value: by_category
            .iter()
            .fold(Decimal::ZERO, |acc, c| acc.saturating_add(c.cost_value)),
        total_retail_value: by_category
            .iter()
            .fold(Decimal::ZERO, |acc, c| acc.saturating_add(c.retail_value)),
        low_stock_items,
        out_of_stock_items,
        by_category,
    }
}

/// `part / whole` as a percentage with one decimal place; zero when
/// `whole` is zero.
pub fn percentage(part: u64, whole: u64) -> Decimal {
    Decimal::from(part)
        .checked_div(Decimal::from(whole))
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .map_or(Decimal::ZERO, |pct| pct.round_dp(1))
}

/// Share of tasks (in percent) that are completed.
pub fn completion_rate(completed: u64, total: u64) -> Decimal {
    percentage(completed, total)
}

/// Share of completed tasks with a due date that were completed on or
/// before it.
pub fn on_time_rate(tasks: &[Task]) -> Decimal {
    let (on_time, with_due) = tasks
        .iter()
        .filter_map(|task| Some((task.completed_at?, task.due_date?)))
        .fold((0_u64, 0_u64), |(on_time, total), (done, due)| {
            let hit = u64::from(done <= due);
            (on_time.saturating_add(hit), total.saturating_add(1))
        });
    percentage(on_time, with_due)
}

/// Tasks past their due date that are not completed or cancelled.
pub fn is_overdue(task: &Task, now: DateTime<Utc>) -> bool {
    !matches!(task.status, TaskStatus::Completed | TaskStatus::Cancelled)
        && task.due_date.is_some_and(|due| due < now)
}

/// Mean progress of the given projects, one decimal place.
pub fn average_progress(projects: &[Project]) -> Decimal {
    let count = u64::try_from(projects.len()).unwrap_or(u64::MAX);
    let sum = projects
        .iter()
        .fold(0_u64, |acc, p| acc.saturating_add(u64::from(p.progress)));
    Decimal::from(sum)
        .checked_div(Decimal::from(count))
        .map_or(Decimal::ZERO, |avg| avg.round_dp(1))
}

/// Purchasing volume with one supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierSpend {
    /// Supplier.
    pub supplier: SupplierId,
    /// Number of non-cancelled orders.
    pub order_count: u64,
    /// Σ order totals.
    pub total_spend: Decimal,
}

/// Spend per supplier over non-cancelled orders, largest first.
pub fn purchase_spend_by_supplier(orders: &[PurchaseOrder]) -> Vec<SupplierSpend> {
    let mut spend: BTreeMap<SupplierId, SupplierSpend> = BTreeMap::new();
    for order in orders
        .iter()
        .filter(|o| o.status != PurchaseOrderStatus::Cancelled)
    {
        let entry = spend.entry(order.supplier).or_insert(SupplierSpend {
            supplier: order.supplier,
            order_count: 0,
            total_spend: Decimal::ZERO,
        });
        entry.order_count = entry.order_count.saturating_add(1);
        entry.total_spend = entry.total_spend.saturating_add(order.total_amount);
    }

    let mut spend: Vec<SupplierSpend> = spend.into_values().collect();
    spend.sort_by(|a, b| {
        b.total_spend
            .cmp(&a.total_spend)
            .then_with(|| a.supplier.cmp(&b.supplier))
    });
    spend
}

/// Σ `total_amount` over orders in the given statuses.
pub fn order_value(orders: &[PurchaseOrder], statuses: &[PurchaseOrderStatus]) -> Decimal {
    orders
        .iter()
        .filter(|o| statuses.contains(&o.status))
        .fold(Decimal::ZERO, |acc, o| acc.saturating_add(o.total_amount))
}
