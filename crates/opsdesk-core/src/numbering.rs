//! Human-readable document numbers.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Random upper-case hex suffix of `len` characters.
fn random_suffix(len: usize) -> String {
    Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(len)
        .collect::<String>()
        .to_uppercase()
}

fn number(prefix: &str, now: DateTime<Utc>) -> String {
    format!("{prefix}-{}-{}", now.format("%Y%m%d"), random_suffix(8))
}

/// Purchase order number, `PO-YYYYMMDD-XXXXXXXX`.
pub fn purchase_order_number(now: DateTime<Utc>) -> String {
    number("PO", now)
}

/// Shipment tracking number, `TRK-YYYYMMDD-XXXXXXXX`.
pub fn tracking_number(now: DateTime<Utc>) -> String {
    number("TRK", now)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn day() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 4, 8, 30, 0)
            .single()
            .unwrap_or_default()
    }

    #[test]
    fn purchase_order_number_shape() {
        let n = purchase_order_number(day());
        assert!(n.starts_with("PO-20260704-"));
        assert_eq!(n.len(), "PO-20260704-".len().saturating_add(8));
        assert!(n
            .rsplit('-')
            .next()
            .is_some_and(|s| s.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase())));
    }

    #[test]
    fn tracking_numbers_are_distinct() {
        let a = tracking_number(day());
        let b = tracking_number(day());
        assert!(a.starts_with("TRK-20260704-"));
        assert_ne!(a, b);
    }
}
