//! Shared type definitions for the Opsdesk backend.
//!
//! This crate is the single source of truth for the documents persisted in
//! the document store and returned by the REST API. Types flow downstream
//! to `TypeScript` via `ts-rs` for the web client.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for all document identifiers
//! - [`enums`] -- Status, role, and classification enums (kebab-case on the wire)
//! - [`entities`] -- The persisted documents themselves

pub mod entities;
pub mod enums;
pub mod ids;

// Re-export all public types at crate root for convenience.
pub use entities::{
    Activity, Address, Customer, InventoryAlert, InventoryItem, Milestone, Project,
    PurchaseOrder, PurchaseOrderLine, Shipment, ShipmentLine, Supplier, Task, User, UserRecord,
};
pub use enums::{
    ActivityAction, AdjustmentType, AlertStatus, AlertType, CustomerStatus, EntityType,
    MilestoneStatus, Priority, ProjectStatus, PurchaseOrderStatus, Role, ShipmentDirection,
    ShipmentStatus, SupplierStatus, TaskStatus,
};
pub use ids::{
    ActivityId, CustomerId, InventoryAlertId, InventoryItemId, MilestoneId, ProjectId,
    PurchaseOrderId, ShipmentId, SupplierId, TaskId, UserId,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation for the web client.

    #[test]
    fn export_bindings() {
        // Files are written to `bindings/` relative to the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::UserId::export_all();
        let _ = crate::ids::TaskId::export_all();
        let _ = crate::ids::ProjectId::export_all();
        let _ = crate::ids::CustomerId::export_all();
        let _ = crate::ids::SupplierId::export_all();
        let _ = crate::ids::InventoryItemId::export_all();
        let _ = crate::ids::InventoryAlertId::export_all();
        let _ = crate::ids::ShipmentId::export_all();
        let _ = crate::ids::MilestoneId::export_all();
        let _ = crate::ids::PurchaseOrderId::export_all();
        let _ = crate::ids::ActivityId::export_all();

        // Enums
        let _ = crate::enums::Role::export_all();
        let _ = crate::enums::TaskStatus::export_all();
        let _ = crate::enums::Priority::export_all();
        let _ = crate::enums::ProjectStatus::export_all();
        let _ = crate::enums::CustomerStatus::export_all();
        let _ = crate::enums::SupplierStatus::export_all();
        let _ = crate::enums::AlertType::export_all();
        let _ = crate::enums::AlertStatus::export_all();
        let _ = crate::enums::ShipmentStatus::export_all();
        let _ = crate::enums::ShipmentDirection::export_all();
        let _ = crate::enums::MilestoneStatus::export_all();
        let _ = crate::enums::PurchaseOrderStatus::export_all();
        let _ = crate::enums::ActivityAction::export_all();
        let _ = crate::enums::EntityType::export_all();
        let _ = crate::enums::AdjustmentType::export_all();

        // Documents
        let _ = crate::entities::User::export_all();
        let _ = crate::entities::Task::export_all();
        let _ = crate::entities::Project::export_all();
        let _ = crate::entities::Milestone::export_all();
        let _ = crate::entities::Address::export_all();
        let _ = crate::entities::Customer::export_all();
        let _ = crate::entities::Supplier::export_all();
        let _ = crate::entities::InventoryItem::export_all();
        let _ = crate::entities::InventoryAlert::export_all();
        let _ = crate::entities::ShipmentLine::export_all();
        let _ = crate::entities::Shipment::export_all();
        let _ = crate::entities::PurchaseOrderLine::export_all();
        let _ = crate::entities::PurchaseOrder::export_all();
        let _ = crate::entities::Activity::export_all();
    }
}
