//! # Low-Stock Signature & Draft Reconciliation
//!
//! Keeps one draft purchase order aligned with the set of understocked
//! products.
//!
//! ## Draft Sync
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Draft lines            Low-stock set         Lines after sync          │
//! │  ───────────            ─────────────         ────────────────          │
//! │  P1  qty 5       ┐      P1                    P1  qty 5  (kept qty)     │
//! │  P2  qty 0       ├──►   P3             ──►    P3  qty 0  (new)          │
//! │                  ┘                            P2  removed (recovered)   │
//! │                                                                         │
//! │  Unit prices are re-read from the product's current purchase price.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Signature
//! `"p1|p3"`: sorted, de-duplicated product ids. A sync is only due when the
//! current signature differs from the one stored with the draft.

use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::types::{ProcurementItem, Product};

pub const SIGNATURE_SEPARATOR: &str = "|";

/// Order-independent, duplicate-free fingerprint of a product id set.
///
/// ## Example
/// ```rust
/// use officine_core::low_stock::signature;
///
/// assert_eq!(signature(["b", "a"]), signature(["a", "b", "a"]));
/// assert_eq!(signature(Vec::<String>::new()), "");
/// ```
pub fn signature<I, S>(product_ids: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let ids: BTreeSet<String> = product_ids
        .into_iter()
        .map(|id| id.as_ref().to_string())
        .collect();

    ids.into_iter().collect::<Vec<_>>().join(SIGNATURE_SEPARATOR)
}

/// Signature of the products in `products` that are currently low stock.
pub fn low_stock_signature(products: &[Product]) -> String {
    signature(
        products
            .iter()
            .filter(|p| p.is_low_stock())
            .map(|p| p.id.as_str()),
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LowStockSummary {
    pub count: i64,
    pub signature: String,
    pub has_active_draft: bool,
}

impl LowStockSummary {
    pub fn empty() -> Self {
        LowStockSummary {
            count: 0,
            signature: String::new(),
            has_active_draft: false,
        }
    }
}

/// A line to write on the draft order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftLine {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
}

/// Desired draft content plus what changed, for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftPlan {
    pub lines: Vec<DraftLine>,
    pub kept: usize,
    pub added: usize,
    pub removed: usize,
}

/// Lines for a brand-new draft: every low-stock product at quantity 0.
pub fn initial_draft_lines(low_stock: &[Product]) -> Vec<DraftLine> {
    reconcile_draft_lines(&[], low_stock).lines
}

/// Reconciles existing draft lines against the current low-stock set.
///
/// - still low stock: kept with its entered quantity, price refreshed
/// - no longer low stock: dropped
/// - newly low stock: added at quantity 0
///
/// Several existing lines for one product are merged by summing quantities.
pub fn reconcile_draft_lines(existing: &[ProcurementItem], low_stock: &[Product]) -> DraftPlan {
    let mut entered: HashMap<&str, i64> = HashMap::new();
    for item in existing {
        *entered.entry(item.product_id.as_str()).or_insert(0) += item.quantity;
    }

    let mut seen = BTreeSet::new();
    let mut lines = Vec::new();
    let mut kept = 0;
    let mut added = 0;

    for product in low_stock {
        if !seen.insert(product.id.as_str()) {
            continue;
        }

        let quantity = match entered.get(product.id.as_str()) {
            Some(quantity) => {
                kept += 1;
                *quantity
            }
            None => {
                added += 1;
                0
            }
        };

        lines.push(DraftLine {
            product_id: product.id.clone(),
            quantity,
            unit_price_cents: product.purchase_price_cents,
        });
    }

    let removed = entered.keys().filter(|id| !seen.contains(**id)).count();

    DraftPlan {
        lines,
        kept,
        added,
        removed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(id: &str, stock: i64, threshold: i64, price: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            pharmacy_id: "ph1".to_string(),
            name: format!("Product {}", id),
            category: None,
            purchase_price_cents: price,
            sale_price_cents: price * 2,
            stock_quantity: stock,
            low_stock_threshold: threshold,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    fn line(product_id: &str, quantity: i64) -> ProcurementItem {
        ProcurementItem {
            id: crate::new_id(),
            order_id: "order-1".to_string(),
            product_id: product_id.to_string(),
            quantity,
            unit_price_cents: 1,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_signature_is_order_independent_and_deduplicated() {
        assert_eq!(signature(["A", "B"]), signature(["B", "A"]));
        assert_eq!(signature(["B", "A", "B"]), "A|B");
        assert_ne!(signature(["A", "B"]), signature(["A", "C"]));
        assert_ne!(signature(["A"]), signature(["A", "B"]));
    }

    #[test]
    fn test_low_stock_signature_filters_products() {
        let products = vec![
            product("p2", 0, 3, 100),
            product("p1", 2, 3, 100),
            product("p3", 10, 3, 100),
        ];
        assert_eq!(low_stock_signature(&products), "p1|p2");
    }

    #[test]
    fn test_initial_lines_default_to_zero_at_purchase_price() {
        let lines = initial_draft_lines(&[product("p1", 0, 3, 275)]);
        assert_eq!(
            lines,
            vec![DraftLine {
                product_id: "p1".to_string(),
                quantity: 0,
                unit_price_cents: 275,
            }]
        );
    }

    #[test]
    fn test_sync_preserves_quantity_and_drops_recovered() {
        let existing = vec![line("P1", 5), line("P2", 0)];
        let low_stock = vec![product("P1", 1, 3, 410), product("P3", 0, 3, 90)];

        let plan = reconcile_draft_lines(&existing, &low_stock);

        assert_eq!(plan.lines.len(), 2);
        assert_eq!(plan.lines[0].product_id, "P1");
        assert_eq!(plan.lines[0].quantity, 5);
        assert_eq!(plan.lines[0].unit_price_cents, 410);
        assert_eq!(plan.lines[1].product_id, "P3");
        assert_eq!(plan.lines[1].quantity, 0);
        assert!(plan.lines.iter().all(|l| l.product_id != "P2"));
        assert_eq!((plan.kept, plan.added, plan.removed), (1, 1, 1));
    }

    #[test]
    fn test_duplicate_lines_are_merged() {
        let existing = vec![line("P1", 2), line("P1", 3)];
        let plan = reconcile_draft_lines(&existing, &[product("P1", 0, 3, 10)]);
        assert_eq!(plan.lines.len(), 1);
        assert_eq!(plan.lines[0].quantity, 5);
    }

    #[test]
    fn test_empty_low_stock_set_clears_the_draft() {
        let plan = reconcile_draft_lines(&[line("P1", 4)], &[]);
        assert!(plan.lines.is_empty());
        assert_eq!(plan.removed, 1);
    }
}
