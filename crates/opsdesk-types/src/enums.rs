//! Enumeration types for the Opsdesk backend.
//!
//! Every enum travels over the wire (and is stored in documents) under its
//! kebab-case name, e.g. `TaskStatus::InProgress` is `"in-progress"`.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Declares a wire enum with its kebab-case names listed once.
///
/// The generated `as_str` must agree with serde's `rename_all`; the
/// `wire_names_match_serde` test checks that for every enum.
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident => $wire:literal
            ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
        )]
        #[serde(rename_all = "kebab-case")]
        #[ts(export, export_to = "bindings/")]
        pub enum $name {
            $(
                $(#[$vmeta])*
                $variant,
            )+
        }

        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The wire (and storage) name of this variant.
            pub const fn as_str(self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

wire_enum! {
    /// Authorization role of a user account.
    Role {
        /// Full access, including user management and system status.
        Admin => "admin",
        /// Manages projects, inventory, suppliers and purchasing.
        Manager => "manager",
        /// Regular staff member.
        Employee => "employee",
    }
}

wire_enum! {
    /// Workflow status of a task. Transitions are unconstrained.
    TaskStatus {
        /// Not started.
        Todo => "todo",
        /// Being worked on.
        InProgress => "in-progress",
        /// Awaiting review.
        Review => "review",
        /// Done. Entering this status stamps `completedAt`.
        Completed => "completed",
        /// Abandoned.
        Cancelled => "cancelled",
    }
}

wire_enum! {
    /// Priority shared by tasks and projects.
    Priority {
        /// Low priority.
        Low => "low",
        /// Default priority.
        Medium => "medium",
        /// High priority.
        High => "high",
        /// Needs immediate attention.
        Urgent => "urgent",
    }
}

wire_enum! {
    /// Lifecycle status of a project.
    ProjectStatus {
        /// Scoping and planning.
        Planning => "planning",
        /// In execution.
        Active => "active",
        /// Temporarily paused.
        OnHold => "on-hold",
        /// Finished. Entering this status stamps `completedAt`.
        Completed => "completed",
        /// Abandoned.
        Cancelled => "cancelled",
    }
}

wire_enum! {
    /// Relationship status of a customer.
    CustomerStatus {
        /// Currently doing business.
        Active => "active",
        /// No longer active; also the result of deleting a customer.
        Inactive => "inactive",
        /// Potential customer.
        Prospect => "prospect",
    }
}

wire_enum! {
    /// Relationship status of a supplier.
    SupplierStatus {
        /// Currently supplying.
        Active => "active",
        /// Not currently used.
        Inactive => "inactive",
    }
}

wire_enum! {
    /// Kind of inventory alert.
    AlertType {
        /// Stock is at or below the reorder point.
        LowStock => "low-stock",
        /// Stock reached zero.
        OutOfStock => "out-of-stock",
    }
}

wire_enum! {
    /// Status of an inventory alert.
    AlertStatus {
        /// Not yet handled.
        Active => "active",
        /// Handled by a user.
        Resolved => "resolved",
    }
}

wire_enum! {
    /// Delivery status of a shipment.
    ShipmentStatus {
        /// Created, not yet dispatched.
        Pending => "pending",
        /// Dispatched. Entering this status stamps `shippedAt`.
        InTransit => "in-transit",
        /// Arrived. Entering this status stamps `deliveredAt`.
        Delivered => "delivered",
        /// Will not ship.
        Cancelled => "cancelled",
        /// Sent back.
        Returned => "returned",
    }
}

wire_enum! {
    /// Direction of a shipment relative to the business.
    ShipmentDirection {
        /// Goods arriving (e.g. from a supplier).
        Inbound => "inbound",
        /// Goods leaving (e.g. to a customer).
        Outbound => "outbound",
    }
}

wire_enum! {
    /// Status of a project milestone.
    MilestoneStatus {
        /// Not started.
        Pending => "pending",
        /// Being worked on.
        InProgress => "in-progress",
        /// Reached. Entering this status stamps `completedAt`.
        Completed => "completed",
        /// Due date passed without completion.
        Missed => "missed",
    }
}

wire_enum! {
    /// Status of a purchase order.
    PurchaseOrderStatus {
        /// Being drafted; editable.
        Draft => "draft",
        /// Submitted for approval; editable.
        Pending => "pending",
        /// Approved by a manager.
        Approved => "approved",
        /// Sent to the supplier.
        Ordered => "ordered",
        /// Goods received and added to stock.
        Received => "received",
        /// Abandoned.
        Cancelled => "cancelled",
    }
}

wire_enum! {
    /// What a logged activity did.
    ActivityAction {
        /// A document was created.
        Create => "create",
        /// A document was updated.
        Update => "update",
        /// A document was deleted (hard or soft).
        Delete => "delete",
        /// A document's status field changed.
        StatusChange => "status-change",
        /// A user logged in.
        Login => "login",
        /// Inventory stock was adjusted.
        StockAdjust => "stock-adjust",
        /// An alert was resolved.
        Resolve => "resolve",
        /// A purchase order was approved.
        Approve => "approve",
        /// A purchase order was received.
        Receive => "receive",
        /// A purchase order was cancelled.
        Cancel => "cancel",
    }
}

wire_enum! {
    /// Kind of document an activity refers to.
    EntityType {
        /// A [`crate::User`].
        User => "user",
        /// A [`crate::Task`].
        Task => "task",
        /// A [`crate::Project`].
        Project => "project",
        /// A [`crate::Customer`].
        Customer => "customer",
        /// A [`crate::Supplier`].
        Supplier => "supplier",
        /// An [`crate::InventoryItem`].
        InventoryItem => "inventory-item",
        /// An [`crate::InventoryAlert`].
        InventoryAlert => "inventory-alert",
        /// A [`crate::Shipment`].
        Shipment => "shipment",
        /// A [`crate::Milestone`].
        Milestone => "milestone",
        /// A [`crate::PurchaseOrder`].
        PurchaseOrder => "purchase-order",
    }
}

wire_enum! {
    /// How a stock adjustment changes the quantity on hand.
    AdjustmentType {
        /// Increase by the given quantity.
        Add => "add",
        /// Decrease by the given quantity.
        Subtract => "subtract",
        /// Replace with the given quantity.
        Set => "set",
    }
}

impl PurchaseOrderStatus {
    /// Statuses in which the order is still open (not received or cancelled).
    pub const OPEN: &'static [Self] = &[Self::Draft, Self::Pending, Self::Approved, Self::Ordered];
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_wire_names<T>(all: &[T])
    where
        T: Serialize + core::fmt::Display + Copy,
    {
        for variant in all {
            let json = serde_json::to_value(variant).ok();
            assert_eq!(
                json,
                Some(serde_json::Value::String(variant.to_string())),
                "serde name and as_str disagree"
            );
        }
    }

    #[test]
    fn wire_names_match_serde() {
        assert_wire_names(Role::ALL);
        assert_wire_names(TaskStatus::ALL);
        assert_wire_names(Priority::ALL);
        assert_wire_names(ProjectStatus::ALL);
        assert_wire_names(CustomerStatus::ALL);
        assert_wire_names(SupplierStatus::ALL);
        assert_wire_names(AlertType::ALL);
        assert_wire_names(AlertStatus::ALL);
        assert_wire_names(ShipmentStatus::ALL);
        assert_wire_names(ShipmentDirection::ALL);
        assert_wire_names(MilestoneStatus::ALL);
        assert_wire_names(PurchaseOrderStatus::ALL);
        assert_wire_names(ActivityAction::ALL);
        assert_wire_names(EntityType::ALL);
        assert_wire_names(AdjustmentType::ALL);
    }

    #[test]
    fn kebab_case_parses() {
        let status: Result<TaskStatus, _> = serde_json::from_str("\"in-progress\"");
        assert_eq!(status.ok(), Some(TaskStatus::InProgress));
        let alert: Result<AlertType, _> = serde_json::from_str("\"low-stock\"");
        assert_eq!(alert.ok(), Some(AlertType::LowStock));
    }

    #[test]
    fn open_purchase_order_statuses() {
        assert!(PurchaseOrderStatus::OPEN.contains(&PurchaseOrderStatus::Approved));
        assert!(!PurchaseOrderStatus::OPEN.contains(&PurchaseOrderStatus::Received));
        assert!(!PurchaseOrderStatus::OPEN.contains(&PurchaseOrderStatus::Cancelled));
    }
}
