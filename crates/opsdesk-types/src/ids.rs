//! Type-safe identifier wrappers around [`Uuid`].
//!
//! Every persisted document has a strongly-typed ID so a `TaskId` can never
//! be passed where a `ProjectId` is expected. All IDs use UUID v7
//! (time-ordered), which also gives list queries a stable tie-breaker.

use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS,
        )]
        #[serde(transparent)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl core::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<Uuid>().map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl From<$name> for Uuid {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id! {
    /// Unique identifier for a user account.
    UserId
}

define_id! {
    /// Unique identifier for a task.
    TaskId
}

define_id! {
    /// Unique identifier for a project.
    ProjectId
}

define_id! {
    /// Unique identifier for a customer.
    CustomerId
}

define_id! {
    /// Unique identifier for a supplier.
    SupplierId
}

define_id! {
    /// Unique identifier for an inventory item.
    InventoryItemId
}

define_id! {
    /// Unique identifier for an inventory alert.
    InventoryAlertId
}

define_id! {
    /// Unique identifier for a shipment.
    ShipmentId
}

define_id! {
    /// Unique identifier for a project milestone.
    MilestoneId
}

define_id! {
    /// Unique identifier for a purchase order.
    PurchaseOrderId
}

define_id! {
    /// Unique identifier for an activity log entry.
    ActivityId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_distinct_types() {
        let user = UserId::new();
        let task = TaskId::new();
        // These are different types -- the compiler enforces no mixing.
        assert_ne!(user.into_inner(), Uuid::nil());
        assert_ne!(task.into_inner(), Uuid::nil());
    }

    #[test]
    fn id_serializes_as_bare_uuid() {
        let id = ProjectId::new();
        let json = serde_json::to_value(id).ok();
        assert_eq!(json, Some(serde_json::Value::String(id.to_string())));
    }

    #[test]
    fn id_parses_from_str() {
        let id = SupplierId::new();
        let parsed: Result<SupplierId, _> = id.to_string().parse();
        assert_eq!(parsed.ok(), Some(id));
        assert!("not-a-uuid".parse::<SupplierId>().is_err());
    }

    #[test]
    fn v7_ids_are_time_ordered() {
        let first = ActivityId::new();
        let second = ActivityId::new();
        assert!(first < second);
    }
}
