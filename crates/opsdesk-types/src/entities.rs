//! Persisted documents for the Opsdesk backend.
//!
//! Each struct is stored as one JSON document in the document store and is
//! also the body returned by the REST API, so field names are camelCase.
//! References between documents are plain typed IDs; nothing enforces that
//! the referenced document still exists.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::enums::{
    ActivityAction, AlertStatus, AlertType, CustomerStatus, EntityType, MilestoneStatus,
    Priority, ProjectStatus, PurchaseOrderStatus, Role, ShipmentDirection, ShipmentStatus,
    SupplierStatus, TaskStatus,
};
use crate::ids::{
    ActivityId, CustomerId, InventoryAlertId, InventoryItemId, MilestoneId, ProjectId,
    PurchaseOrderId, ShipmentId, SupplierId, TaskId, UserId,
};

// ---------------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------------

/// A user account as exposed through the API.
///
/// The password hash lives only on [`UserRecord`] so it can never leak into
/// a response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct User {
    /// Unique identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Login email, stored lowercased. Unique.
    pub email: String,
    /// Authorization role.
    pub role: Role,
    /// Optional department name.
    pub department: Option<String>,
    /// Deactivated users cannot log in or use existing tokens.
    pub is_active: bool,
    /// When the user last logged in.
    pub last_login: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Storage form of a user: the public profile plus the password hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Public profile fields, flattened into the same document.
    #[serde(flatten)]
    pub user: User,
    /// PHC-format password hash.
    pub password_hash: String,
}

// ---------------------------------------------------------------------------
// Work management
// ---------------------------------------------------------------------------

/// A unit of work, optionally attached to a project and an assignee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Task {
    /// Unique identifier.
    pub id: TaskId,
    /// Short title.
    pub title: String,
    /// Longer description.
    pub description: Option<String>,
    /// Workflow status.
    pub status: TaskStatus,
    /// Priority.
    pub priority: Priority,
    /// Owning project, if any.
    pub project: Option<ProjectId>,
    /// User the task is assigned to, if any.
    pub assigned_to: Option<UserId>,
    /// User who created the task (its owner).
    pub created_by: UserId,
    /// Due date.
    pub due_date: Option<DateTime<Utc>>,
    /// Set while the task is completed.
    pub completed_at: Option<DateTime<Utc>>,
    /// Estimated effort in hours.
    #[ts(as = "Option<String>")]
    pub estimated_hours: Option<Decimal>,
    /// Free-form labels.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A project grouping tasks and milestones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Project {
    /// Unique identifier.
    pub id: ProjectId,
    /// Project name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Lifecycle status.
    pub status: ProjectStatus,
    /// Priority.
    pub priority: Priority,
    /// Managing user; may update the project.
    pub manager: UserId,
    /// Team members.
    #[serde(default)]
    pub team_members: Vec<UserId>,
    /// Customer the project is delivered for.
    pub customer: Option<CustomerId>,
    /// Planned start.
    pub start_date: Option<DateTime<Utc>>,
    /// Planned end.
    pub end_date: Option<DateTime<Utc>>,
    /// Budget.
    #[ts(as = "Option<String>")]
    pub budget: Option<Decimal>,
    /// Completion percentage, 0 to 100.
    pub progress: u8,
    /// Set while the project is completed.
    pub completed_at: Option<DateTime<Utc>>,
    /// User who created the project.
    pub created_by: UserId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A checkpoint within a project. Milestones may depend on other
/// milestones of the same project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Milestone {
    /// Unique identifier.
    pub id: MilestoneId,
    /// Owning project.
    pub project: ProjectId,
    /// Title.
    pub title: String,
    /// Description.
    pub description: Option<String>,
    /// Target date.
    pub due_date: Option<DateTime<Utc>>,
    /// Status.
    pub status: MilestoneStatus,
    /// Milestones that must be reached before this one.
    #[serde(default)]
    pub dependencies: Vec<MilestoneId>,
    /// Set while the milestone is completed.
    pub completed_at: Option<DateTime<Utc>>,
    /// User who created the milestone.
    pub created_by: UserId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Partners
// ---------------------------------------------------------------------------

/// Postal address embedded in customers and suppliers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Address {
    /// Street and number.
    pub street: Option<String>,
    /// City.
    pub city: Option<String>,
    /// State or province.
    pub state: Option<String>,
    /// Postal code.
    pub postal_code: Option<String>,
    /// Country.
    pub country: Option<String>,
}

/// A customer company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Customer {
    /// Unique identifier.
    pub id: CustomerId,
    /// Company name. Unique, case-insensitively.
    pub company_name: String,
    /// Primary contact person.
    pub contact_name: Option<String>,
    /// Contact email.
    pub email: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Postal address.
    pub address: Option<Address>,
    /// Industry.
    pub industry: Option<String>,
    /// Relationship status.
    pub status: CustomerStatus,
    /// Free-form notes.
    pub notes: Option<String>,
    /// User who created the customer.
    pub created_by: UserId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// A supplier company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Supplier {
    /// Unique identifier.
    pub id: SupplierId,
    /// Company name. Unique, case-insensitively.
    pub company_name: String,
    /// Primary contact person.
    pub contact_name: Option<String>,
    /// Contact email.
    pub email: Option<String>,
    /// Contact phone.
    pub phone: Option<String>,
    /// Postal address.
    pub address: Option<Address>,
    /// Payment terms, e.g. `"net-30"`.
    pub payment_terms: Option<String>,
    /// Rating from 1 to 5.
    pub rating: Option<u8>,
    /// Relationship status.
    pub status: SupplierStatus,
    /// Free-form notes.
    pub notes: Option<String>,
    /// User who created the supplier.
    pub created_by: UserId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Inventory
// ---------------------------------------------------------------------------

/// A stocked item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct InventoryItem {
    /// Unique identifier.
    pub id: InventoryItemId,
    /// Stock keeping unit, stored uppercased. Unique.
    pub sku: String,
    /// Item name.
    pub name: String,
    /// Description.
    pub description: Option<String>,
    /// Category used for grouping in reports.
    pub category: String,
    /// Preferred supplier.
    pub supplier: Option<SupplierId>,
    /// Quantity on hand.
    pub stock_quantity: u32,
    /// Threshold at or below which a low-stock alert is raised.
    pub reorder_point: u32,
    /// Suggested quantity to reorder.
    pub reorder_quantity: u32,
    /// Cost per unit.
    #[ts(as = "String")]
    pub unit_cost: Decimal,
    /// Selling price per unit.
    #[ts(as = "String")]
    pub unit_price: Decimal,
    /// Warehouse location.
    pub location: Option<String>,
    /// Inactive items are hidden from default listings.
    pub is_active: bool,
    /// When stock was last received from a purchase order.
    pub last_restocked: Option<DateTime<Utc>>,
    /// User who created the item.
    pub created_by: UserId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// An alert raised when an item's stock crosses its reorder point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct InventoryAlert {
    /// Unique identifier.
    pub id: InventoryAlertId,
    /// The item whose stock triggered the alert.
    pub item: InventoryItemId,
    /// Item name at the time the alert was raised.
    pub item_name: String,
    /// Item SKU at the time the alert was raised.
    pub sku: String,
    /// Kind of alert.
    pub alert_type: AlertType,
    /// Whether the alert has been handled.
    pub status: AlertStatus,
    /// Stock quantity that triggered the alert.
    pub current_quantity: u32,
    /// Reorder point at the time the alert was raised.
    pub reorder_point: u32,
    /// Human-readable message.
    pub message: String,
    /// User whose stock write raised the alert.
    pub created_by: UserId,
    /// User who resolved the alert.
    pub resolved_by: Option<UserId>,
    /// When the alert was resolved.
    pub resolved_at: Option<DateTime<Utc>>,
    /// Notes recorded on resolution.
    pub resolution_notes: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Logistics and purchasing
// ---------------------------------------------------------------------------

/// One line of a shipment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct ShipmentLine {
    /// Inventory item shipped, when it is a stocked item.
    pub item: Option<InventoryItemId>,
    /// What is shipped.
    pub description: String,
    /// Number of units.
    pub quantity: u32,
}

/// A shipment of goods in either direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Shipment {
    /// Unique identifier.
    pub id: ShipmentId,
    /// Carrier tracking number. Unique.
    pub tracking_number: String,
    /// Inbound or outbound.
    pub direction: ShipmentDirection,
    /// Delivery status.
    pub status: ShipmentStatus,
    /// Carrier name.
    pub carrier: String,
    /// Receiving customer for outbound shipments.
    pub customer: Option<CustomerId>,
    /// Sending supplier for inbound shipments.
    pub supplier: Option<SupplierId>,
    /// Purchase order the shipment fulfils.
    pub purchase_order: Option<PurchaseOrderId>,
    /// Origin address.
    pub origin: Option<String>,
    /// Destination address.
    pub destination: String,
    /// Shipped goods.
    #[serde(default)]
    pub items: Vec<ShipmentLine>,
    /// Shipping cost.
    #[ts(as = "Option<String>")]
    pub shipping_cost: Option<Decimal>,
    /// Expected delivery date.
    pub estimated_delivery: Option<DateTime<Utc>>,
    /// When the shipment went in transit.
    pub shipped_at: Option<DateTime<Utc>>,
    /// When the shipment was delivered.
    pub delivered_at: Option<DateTime<Utc>>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// User who created the shipment.
    pub created_by: UserId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// One line of a purchase order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct PurchaseOrderLine {
    /// Ordered inventory item.
    pub item: InventoryItemId,
    /// Ordered units.
    pub quantity: u32,
    /// Agreed cost per unit.
    #[ts(as = "String")]
    pub unit_cost: Decimal,
    /// `quantity * unit_cost`.
    #[ts(as = "String")]
    pub line_total: Decimal,
}

/// An order placed with a supplier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct PurchaseOrder {
    /// Unique identifier.
    pub id: PurchaseOrderId,
    /// Human-readable order number. Unique.
    pub po_number: String,
    /// Supplier the order is placed with.
    pub supplier: SupplierId,
    /// Ordered lines.
    pub items: Vec<PurchaseOrderLine>,
    /// Sum of all line totals.
    #[ts(as = "String")]
    pub total_amount: Decimal,
    /// Order status.
    pub status: PurchaseOrderStatus,
    /// Expected delivery date.
    pub expected_delivery: Option<DateTime<Utc>>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Approving user.
    pub approved_by: Option<UserId>,
    /// Approval time.
    pub approved_at: Option<DateTime<Utc>>,
    /// Receipt time.
    pub received_at: Option<DateTime<Utc>>,
    /// User who created the order.
    pub created_by: UserId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Audit
// ---------------------------------------------------------------------------

/// Append-only audit record written as a side effect of mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export, export_to = "bindings/")]
pub struct Activity {
    /// Unique identifier.
    pub id: ActivityId,
    /// Acting user.
    pub user: UserId,
    /// What happened.
    pub action: ActivityAction,
    /// Kind of document affected.
    pub entity_type: EntityType,
    /// ID of the document affected.
    pub entity_id: Uuid,
    /// Human-readable description.
    pub description: String,
    /// Structured details (previous/new values and the like).
    #[serde(default)]
    pub metadata: serde_json::Value,
    /// When it happened.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_user() -> User {
        let now = Utc::now();
        User {
            id: UserId::new(),
            name: String::from("Dana"),
            email: String::from("dana@example.com"),
            role: Role::Manager,
            department: None,
            is_active: true,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn user_record_flattens_profile() {
        let record = UserRecord {
            user: sample_user(),
            password_hash: String::from("$argon2id$stub"),
        };
        let json = serde_json::to_value(&record).unwrap_or_default();
        assert_eq!(json["email"], "dana@example.com");
        assert_eq!(json["passwordHash"], "$argon2id$stub");

        let back: Result<UserRecord, _> = serde_json::from_value(json);
        assert_eq!(back.ok(), Some(record));
    }

    #[test]
    fn public_user_has_no_password_field() {
        let json = serde_json::to_value(sample_user()).unwrap_or_default();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["isActive"], true);
        assert_eq!(json["role"], "manager");
    }

    #[test]
    fn decimal_fields_serialize_as_strings() {
        let line = PurchaseOrderLine {
            item: InventoryItemId::new(),
            quantity: 3,
            unit_cost: Decimal::new(1250, 2),
            line_total: Decimal::new(3750, 2),
        };
        let json = serde_json::to_value(&line).unwrap_or_default();
        assert_eq!(json["unitCost"], "12.50");
        assert_eq!(json["lineTotal"], "37.50");
        assert_eq!(json["quantity"], 3);
    }
}
