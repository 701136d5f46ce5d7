//! # Lot Traceability
//!
//! Rebuilds the audit trail of one lot number from the movement log and the
//! receipt / sale join records.
//!
//! ## Balances
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  received_quantity = Σ procurement_item_lots.quantity (> 0 only)        │
//! │  sold_quantity     = Σ sale_item_lots.quantity                          │
//! │  current_balance   = stock_lots.quantity (LIVE value)                   │
//! │                                                                         │
//! │  current_balance is NOT received - sold: a stocktake of -2 after a      │
//! │  breakage shows up here and only here.                                  │
//! │                                                                         │
//! │    received 10, sold 3, stocktake -2  →  current_balance 5              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{MovementType, ProcurementItemLot, SaleItemLot, StockLot, StockMovement};

/// Timeline event kind shown to pharmacists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum TraceEventType {
    /// Goods in (delivery or opening stock).
    Reception,
    /// Goods out through a sale.
    Sortie,
    /// Manual correction or stocktake.
    Ajustement,
}

impl From<MovementType> for TraceEventType {
    fn from(movement_type: MovementType) -> Self {
        match movement_type {
            MovementType::InitialStock | MovementType::DeliverySync => TraceEventType::Reception,
            MovementType::SaleSync => TraceEventType::Sortie,
            MovementType::ManualEdit | MovementType::Stocktake => TraceEventType::Ajustement,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TimelineEntry {
    pub movement_id: String,
    pub event_type: TraceEventType,
    pub movement_type: MovementType,
    pub delta: i64,
    /// Sum of deltas up to and including this entry.
    pub running_balance: i64,
    pub reason: String,
    /// The originating sale / order / stocktake id.
    pub reference: Option<String>,
    pub user_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LotTraceItem {
    pub lot_id: String,
    pub product_id: String,
    pub product_name: String,
    pub lot_number: String,
    #[ts(as = "String")]
    pub expiry_date: NaiveDate,
    pub received_quantity: i64,
    pub sold_quantity: i64,
    pub current_balance: i64,
    pub timeline: Vec<TimelineEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct TraceabilityReport {
    pub lot_number: String,
    pub items: Vec<LotTraceItem>,
}

impl TraceabilityReport {
    pub fn empty(lot_number: impl Into<String>) -> Self {
        TraceabilityReport {
            lot_number: lot_number.into(),
            items: Vec::new(),
        }
    }
}

/// Trims a lot-number query; `None` when blank (no lookup should happen).
pub fn normalize_lot_query(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// The stored casing of the lot number, falling back to the query.
pub fn canonical_lot_number(query: &str, lots: &[StockLot]) -> String {
    lots.iter()
        .find(|lot| lot.lot_number.eq_ignore_ascii_case(query))
        .map(|lot| lot.lot_number.clone())
        .unwrap_or_else(|| query.to_string())
}

pub fn received_quantity(receipts: &[ProcurementItemLot]) -> i64 {
    receipts
        .iter()
        .filter(|r| r.quantity > 0)
        .map(|r| r.quantity)
        .sum()
}

pub fn sold_quantity(sales: &[SaleItemLot]) -> i64 {
    sales.iter().map(|s| s.quantity).sum()
}

/// Sorts movements chronologically and attaches running balances.
pub fn build_timeline(movements: &[StockMovement]) -> Vec<TimelineEntry> {
    let mut ordered: Vec<&StockMovement> = movements.iter().collect();
    ordered.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

    let mut balance = 0;
    ordered
        .into_iter()
        .map(|movement| {
            balance += movement.delta;
            TimelineEntry {
                movement_id: movement.id.clone(),
                event_type: movement.movement_type.into(),
                movement_type: movement.movement_type,
                delta: movement.delta,
                running_balance: balance,
                reason: movement.reason.clone(),
                reference: movement.source_id.clone(),
                user_id: movement.created_by_user_id.clone(),
                created_at: movement.created_at,
            }
        })
        .collect()
}

/// Assembles the trace of one lot.
///
/// `movements` must already be restricted to this lot's product and number.
pub fn trace_lot(
    lot: &StockLot,
    product_name: &str,
    receipts: &[ProcurementItemLot],
    sales: &[SaleItemLot],
    movements: &[StockMovement],
) -> LotTraceItem {
    LotTraceItem {
        lot_id: lot.id.clone(),
        product_id: lot.product_id.clone(),
        product_name: product_name.to_string(),
        lot_number: lot.lot_number.clone(),
        expiry_date: lot.expiry_date,
        received_quantity: received_quantity(receipts),
        sold_quantity: sold_quantity(sales),
        current_balance: lot.quantity,
        timeline: build_timeline(movements),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LotSourceType;
    use chrono::{Duration, TimeZone};

    fn base_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, 1, 8, 0, 0).unwrap()
    }

    fn expiry() -> NaiveDate {
        NaiveDate::from_ymd_opt(2027, 2, 28).unwrap()
    }

    fn lot(quantity: i64) -> StockLot {
        StockLot {
            id: "lot-1".to_string(),
            pharmacy_id: "ph1".to_string(),
            product_id: "p1".to_string(),
            lot_number: "AbC-42".to_string(),
            expiry_date: expiry(),
            quantity,
            source_type: LotSourceType::DeliveryNote,
            source_order_id: Some("bl-1".to_string()),
            source_item_id: None,
            created_at: base_time(),
            updated_at: base_time(),
        }
    }

    fn movement(id: &str, minutes: i64, delta: i64, movement_type: MovementType) -> StockMovement {
        StockMovement {
            id: id.to_string(),
            pharmacy_id: "ph1".to_string(),
            product_id: "p1".to_string(),
            product_name_snapshot: "Doliprane 1000mg".to_string(),
            delta,
            movement_type,
            lot_number: Some("AbC-42".to_string()),
            lot_expiry_date: Some(expiry()),
            reason: "test".to_string(),
            source_id: Some(format!("src-{}", id)),
            created_by_user_id: Some("user-1".to_string()),
            created_at: base_time() + Duration::minutes(minutes),
        }
    }

    fn receipt(quantity: i64) -> ProcurementItemLot {
        ProcurementItemLot {
            id: crate::new_id(),
            order_id: "bl-1".to_string(),
            procurement_item_id: None,
            lot_id: "lot-1".to_string(),
            quantity,
            expiry_date: expiry(),
            created_at: base_time(),
        }
    }

    fn sale(quantity: i64) -> SaleItemLot {
        SaleItemLot {
            id: crate::new_id(),
            sale_id: "sale-1".to_string(),
            sale_item_id: None,
            lot_id: "lot-1".to_string(),
            quantity,
            expiry_date: expiry(),
            created_at: base_time(),
        }
    }

    #[test]
    fn test_event_type_mapping() {
        assert_eq!(TraceEventType::from(MovementType::DeliverySync), TraceEventType::Reception);
        assert_eq!(TraceEventType::from(MovementType::InitialStock), TraceEventType::Reception);
        assert_eq!(TraceEventType::from(MovementType::SaleSync), TraceEventType::Sortie);
        assert_eq!(TraceEventType::from(MovementType::ManualEdit), TraceEventType::Ajustement);
        assert_eq!(TraceEventType::from(MovementType::Stocktake), TraceEventType::Ajustement);
    }

    #[test]
    fn test_normalize_lot_query() {
        assert_eq!(normalize_lot_query("  abc-42 "), Some("abc-42".to_string()));
        assert_eq!(normalize_lot_query("   "), None);
    }

    #[test]
    fn test_canonical_casing_comes_from_storage() {
        assert_eq!(canonical_lot_number("abc-42", &[lot(1)]), "AbC-42");
        assert_eq!(canonical_lot_number("zzz", &[lot(1)]), "zzz");
    }

    #[test]
    fn test_timeline_is_chronological_with_running_balance() {
        let movements = vec![
            movement("m3", 30, -2, MovementType::Stocktake),
            movement("m1", 0, 10, MovementType::DeliverySync),
            movement("m2", 10, -3, MovementType::SaleSync),
        ];

        let timeline = build_timeline(&movements);

        let ids: Vec<&str> = timeline.iter().map(|e| e.movement_id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m3"]);
        let balances: Vec<i64> = timeline.iter().map(|e| e.running_balance).collect();
        assert_eq!(balances, vec![10, 7, 5]);
        assert_eq!(timeline[1].event_type, TraceEventType::Sortie);
        assert_eq!(timeline[1].reference.as_deref(), Some("src-m2"));
    }

    #[test]
    fn test_current_balance_is_live_quantity_not_derived() {
        let movements = vec![
            movement("m1", 0, 10, MovementType::DeliverySync),
            movement("m2", 10, -3, MovementType::SaleSync),
            movement("m3", 30, -2, MovementType::Stocktake),
        ];

        let item = trace_lot(
            &lot(5),
            "Doliprane 1000mg",
            &[receipt(10), receipt(-1)],
            &[sale(3)],
            &movements,
        );

        assert_eq!(item.received_quantity, 10);
        assert_eq!(item.sold_quantity, 3);
        assert_eq!(item.current_balance, 5);
        assert_ne!(item.current_balance, item.received_quantity - item.sold_quantity);
        assert_eq!(item.timeline.len(), 3);
    }
}
