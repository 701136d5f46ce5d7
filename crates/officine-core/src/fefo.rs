//! # FEFO Consumption Planning
//!
//! First-Expired-First-Out: a sale draws from the lot expiring soonest.
//!
//! ## Ordering
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Lots for product P (quantity > 0)                                      │
//! │                                                                         │
//! │   LOT-A  expires 2026-11-02  created 09:00  qty 4   ◄── drawn first     │
//! │   LOT-B  expires 2026-11-02  created 11:30  qty 6   ◄── then this       │
//! │   LOT-C  expires 2027-03-15  created 08:00  qty 10  ◄── then this       │
//! │                                                                         │
//! │  Sort key: (expiry_date ASC, created_at ASC, id ASC)                    │
//! │                                                                         │
//! │  consume 7  →  [LOT-A: 4, LOT-B: 3]                                     │
//! │  consume 21 →  InsufficientStock { available: 20, requested: 21 }       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The plan is computed before any write. The database layer applies it
//! inside one transaction, so a failed plan never leaves partial decrements.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::StockLot;
use crate::validation::validate_quantity;

/// Quantity taken from one lot by a consumption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LotDraw {
    pub lot_id: String,
    pub lot_number: String,
    #[ts(as = "String")]
    pub expiry_date: NaiveDate,
    pub quantity: i64,
    /// Lot quantity left after the draw.
    pub remaining: i64,
}

/// Sorts lots in FEFO order.
pub fn sort_fefo(lots: &mut [StockLot]) {
    lots.sort_by(|a, b| {
        a.expiry_date
            .cmp(&b.expiry_date)
            .then_with(|| a.created_at.cmp(&b.created_at))
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// Total quantity available across lots.
pub fn available_quantity(lots: &[StockLot]) -> i64 {
    lots.iter().map(|lot| lot.quantity.max(0)).sum()
}

/// Plans a FEFO consumption of `requested` units of `product_id`.
///
/// Lots of other products and empty lots are ignored.
///
/// ## Returns
/// * `Ok(draws)` - one entry per touched lot, in draw order
/// * `Err(CoreError::InsufficientStock)` - lots hold fewer than `requested` units
pub fn plan_consumption(
    product_id: &str,
    lots: &[StockLot],
    requested: i64,
) -> CoreResult<Vec<LotDraw>> {
    validate_quantity(requested)?;

    let mut candidates: Vec<StockLot> = lots
        .iter()
        .filter(|lot| lot.product_id == product_id && lot.quantity > 0)
        .cloned()
        .collect();

    let available = available_quantity(&candidates);
    if available < requested {
        return Err(CoreError::InsufficientStock {
            product_id: product_id.to_string(),
            available,
            requested,
        });
    }

    sort_fefo(&mut candidates);

    let mut outstanding = requested;
    let mut draws = Vec::new();

    for lot in candidates {
        if outstanding == 0 {
            break;
        }

        let take = lot.quantity.min(outstanding);
        outstanding -= take;

        draws.push(LotDraw {
            lot_id: lot.id,
            lot_number: lot.lot_number,
            expiry_date: lot.expiry_date,
            quantity: take,
            remaining: lot.quantity - take,
        });
    }

    Ok(draws)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LotSourceType;
    use chrono::{Duration, TimeZone, Utc};

    fn lot(id: &str, product: &str, expiry: (i32, u32, u32), created_hour: u32, qty: i64) -> StockLot {
        let created = Utc.with_ymd_and_hms(2026, 1, 1, created_hour, 0, 0).unwrap();
        StockLot {
            id: id.to_string(),
            pharmacy_id: "ph1".to_string(),
            product_id: product.to_string(),
            lot_number: format!("LOT-{}", id),
            expiry_date: NaiveDate::from_ymd_opt(expiry.0, expiry.1, expiry.2).unwrap(),
            quantity: qty,
            source_type: LotSourceType::DeliveryNote,
            source_order_id: None,
            source_item_id: None,
            created_at: created,
            updated_at: created + Duration::minutes(1),
        }
    }

    #[test]
    fn test_small_consumption_only_touches_earliest_lot() {
        let lots = vec![
            lot("c", "p", (2027, 3, 1), 8, 10),
            lot("a", "p", (2026, 11, 1), 8, 5),
            lot("b", "p", (2026, 12, 1), 8, 5),
        ];

        let draws = plan_consumption("p", &lots, 3).unwrap();

        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].lot_id, "a");
        assert_eq!(draws[0].quantity, 3);
        assert_eq!(draws[0].remaining, 2);
    }

    #[test]
    fn test_consumption_spills_over_in_expiry_order() {
        let lots = vec![
            lot("late", "p", (2027, 6, 1), 8, 10),
            lot("early", "p", (2026, 11, 1), 8, 4),
        ];

        let draws = plan_consumption("p", &lots, 7).unwrap();

        assert_eq!(draws.len(), 2);
        assert_eq!((draws[0].lot_id.as_str(), draws[0].quantity), ("early", 4));
        assert_eq!((draws[1].lot_id.as_str(), draws[1].quantity), ("late", 3));
        assert_eq!(draws[0].remaining, 0);
    }

    #[test]
    fn test_same_expiry_breaks_tie_on_creation_time() {
        let lots = vec![
            lot("newer", "p", (2026, 11, 2), 11, 6),
            lot("older", "p", (2026, 11, 2), 9, 4),
        ];

        let draws = plan_consumption("p", &lots, 5).unwrap();

        assert_eq!(draws[0].lot_id, "older");
        assert_eq!(draws[0].quantity, 4);
        assert_eq!(draws[1].lot_id, "newer");
        assert_eq!(draws[1].quantity, 1);
    }

    #[test]
    fn test_insufficient_stock_reports_available() {
        let lots = vec![
            lot("a", "p", (2026, 11, 1), 8, 2),
            lot("b", "p", (2026, 12, 1), 8, 1),
            lot("other", "q", (2026, 10, 1), 8, 50),
        ];

        let err = plan_consumption("p", &lots, 4).unwrap_err();

        match err {
            CoreError::InsufficientStock {
                product_id,
                available,
                requested,
            } => {
                assert_eq!(product_id, "p");
                assert_eq!(available, 3);
                assert_eq!(requested, 4);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_empty_lots_are_skipped() {
        let lots = vec![
            lot("empty", "p", (2026, 10, 1), 8, 0),
            lot("full", "p", (2026, 12, 1), 8, 3),
        ];

        let draws = plan_consumption("p", &lots, 2).unwrap();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].lot_id, "full");
    }

    #[test]
    fn test_exact_quantity_drains_all_lots() {
        let lots = vec![
            lot("a", "p", (2026, 11, 1), 8, 2),
            lot("b", "p", (2026, 12, 1), 8, 3),
        ];

        let draws = plan_consumption("p", &lots, 5).unwrap();
        assert_eq!(draws.iter().map(|d| d.quantity).sum::<i64>(), 5);
        assert!(draws.iter().all(|d| d.remaining == 0));
    }

    #[test]
    fn test_non_positive_request_is_rejected() {
        let lots = vec![lot("a", "p", (2026, 11, 1), 8, 2)];
        assert!(matches!(
            plan_consumption("p", &lots, 0),
            Err(CoreError::Validation(_))
        ));
    }
}
