//! Stock adjustment and the reorder-point alert rule.
//!
//! Every write that changes an item's stock quantity (adjustments, direct
//! updates, purchase order receipts) runs [`alert_for`] on the new quantity.
//! A new alert is raised each time, even if an active alert for the item
//! already exists.

use opsdesk_types::{AdjustmentType, AlertType};

/// Errors from a stock adjustment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum StockError {
    /// A subtraction would take stock below zero.
    #[error("Insufficient stock: {available} available, {requested} requested")]
    Insufficient {
        /// Quantity on hand.
        available: u32,
        /// Quantity asked for.
        requested: u32,
    },

    /// The quantity is not valid for the adjustment type.
    #[error("Quantity must be a positive number")]
    InvalidQuantity,

    /// The result does not fit the stock counter.
    #[error("Stock quantity would exceed the maximum of {max}")]
    Overflow {
        /// Largest representable quantity.
        max: u32,
    },
}

/// Apply an adjustment to `current`, returning the new quantity.
///
/// `add` and `subtract` require a quantity of at least 1; `set` accepts any
/// non-negative quantity.
pub fn apply_adjustment(
    current: u32,
    kind: AdjustmentType,
    quantity: i64,
) -> Result<u32, StockError> {
    let minimum = match kind {
        AdjustmentType::Set => 0,
        AdjustmentType::Add | AdjustmentType::Subtract => 1,
    };
    if quantity < minimum {
        return Err(StockError::InvalidQuantity);
    }
    let Ok(quantity) = u32::try_from(quantity) else {
        return Err(StockError::Overflow { max: u32::MAX });
    };

    match kind {
        AdjustmentType::Add => current
            .checked_add(quantity)
            .ok_or(StockError::Overflow { max: u32::MAX }),
        AdjustmentType::Subtract => {
            current
                .checked_sub(quantity)
                .ok_or(StockError::Insufficient {
                    available: current,
                    requested: quantity,
                })
        }
        AdjustmentType::Set => Ok(quantity),
    }
}

/// The alert a stock write should raise, if any.
///
/// Zero stock is out of stock; anything at or below the reorder point is
/// low stock.
pub const fn alert_for(quantity: u32, reorder_point: u32) -> Option<AlertType> {
    if quantity == 0 {
        Some(AlertType::OutOfStock)
    } else if quantity <= reorder_point {
        Some(AlertType::LowStock)
    } else {
        None
    }
}

/// Human-readable alert message.
pub fn alert_message(
    alert: AlertType,
    name: &str,
    sku: &str,
    quantity: u32,
    reorder_point: u32,
) -> String {
    match alert {
        AlertType::OutOfStock => format!("{name} ({sku}) is out of stock"),
        AlertType::LowStock => format!(
            "{name} ({sku}) is low on stock: {quantity} remaining, reorder point {reorder_point}"
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtract_three_from_ten() {
        assert_eq!(apply_adjustment(10, AdjustmentType::Subtract, 3), Ok(7));
        assert_eq!(alert_for(7, 10), Some(AlertType::LowStock));
    }

    #[test]
    fn add_and_set() {
        assert_eq!(apply_adjustment(10, AdjustmentType::Add, 5), Ok(15));
        assert_eq!(apply_adjustment(10, AdjustmentType::Set, 0), Ok(0));
        assert_eq!(apply_adjustment(10, AdjustmentType::Set, 42), Ok(42));
    }

    #[test]
    fn subtract_beyond_stock_is_insufficient() {
        assert_eq!(
            apply_adjustment(2, AdjustmentType::Subtract, 3),
            Err(StockError::Insufficient {
                available: 2,
                requested: 3
            })
        );
    }

    #[test]
    fn non_positive_quantities_are_invalid() {
        assert_eq!(
            apply_adjustment(2, AdjustmentType::Add, 0),
            Err(StockError::InvalidQuantity)
        );
        assert_eq!(
            apply_adjustment(2, AdjustmentType::Subtract, -1),
            Err(StockError::InvalidQuantity)
        );
        assert_eq!(
            apply_adjustment(2, AdjustmentType::Set, -1),
            Err(StockError::InvalidQuantity)
        );
    }

    #[test]
    fn overflow_is_reported() {
        assert!(matches!(
            apply_adjustment(u32::MAX, AdjustmentType::Add, 1),
            Err(StockError::Overflow { .. })
        ));
        assert!(matches!(
            apply_adjustment(0, AdjustmentType::Set, i64::MAX),
            Err(StockError::Overflow { .. })
        ));
    }

    #[test]
    fn alert_thresholds() {
        assert_eq!(alert_for(0, 10), Some(AlertType::OutOfStock));
        assert_eq!(alert_for(0, 0), Some(AlertType::OutOfStock));
        assert_eq!(alert_for(10, 10), Some(AlertType::LowStock));
        assert_eq!(alert_for(11, 10), None);
        assert_eq!(alert_for(5, 0), None);
    }

    #[test]
    fn messages_name_the_item() {
        let msg = alert_message(AlertType::LowStock, "Bolt", "B-1", 7, 10);
        assert!(msg.contains("Bolt (B-1)"));
        assert!(msg.contains("7 remaining"));
        assert_eq!(
            alert_message(AlertType::OutOfStock, "Bolt", "B-1", 0, 10),
            "Bolt (B-1) is out of stock"
        );
    }
}
