//! # Lot Traceability (query side)
//!
//! "Where did lot ABC-42 come from and where did it go?"
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  "  abc-42 "                                                            │
//! │       │ trim; blank → empty report, no query                           │
//! │       ▼                                                                 │
//! │  stock_lots WHERE lot_number = ? COLLATE NOCASE   (one per product)    │
//! │       │                                                                 │
//! │       ├──► procurement_item_lots  → received_quantity                  │
//! │       ├──► sale_item_lots         → sold_quantity                      │
//! │       └──► stock_movements        → timeline + running balance         │
//! │       ▼                                                                 │
//! │  TraceabilityReport { lot_number: "AbC-42" (stored casing), items }   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::{lot::LotRepository, lot_link::LotLinkRepository};
use crate::repository::{movement::MovementRepository, product::ProductRepository};
use officine_core::traceability::{
    canonical_lot_number, normalize_lot_query, trace_lot, TraceabilityReport,
};

/// Traceability service.
#[derive(Debug, Clone)]
pub struct LotTraceability {
    pool: SqlitePool,
}

impl LotTraceability {
    /// Creates a new LotTraceability.
    pub fn new(pool: SqlitePool) -> Self {
        LotTraceability { pool }
    }

    /// Traces every lot of the pharmacy bearing `lot_number`.
    pub async fn trace(&self, pharmacy_id: &str, lot_number: &str) -> DbResult<TraceabilityReport> {
        let Some(query) = normalize_lot_query(lot_number) else {
            return Ok(TraceabilityReport::empty(""));
        };

        let lots = LotRepository::new(self.pool.clone())
            .find_by_number(pharmacy_id, &query)
            .await?;

        let products = ProductRepository::new(self.pool.clone());
        let links = LotLinkRepository::new(self.pool.clone());
        let movements = MovementRepository::new(self.pool.clone());

        let mut items = Vec::with_capacity(lots.len());
        for lot in &lots {
            let lot_movements = movements
                .list_for_lot(pharmacy_id, &lot.product_id, &lot.lot_number)
                .await?;

            let product_name = match products.get_by_id(&lot.product_id).await? {
                Some(product) => product.name,
                None => lot_movements
                    .last()
                    .map(|m| m.product_name_snapshot.clone())
                    .unwrap_or_else(|| lot.product_id.clone()),
            };

            let receipts = links.receipts_for_lot(&lot.id).await?;
            let sales = links.sales_for_lot(&lot.id).await?;

            items.push(trace_lot(lot, &product_name, &receipts, &sales, &lot_movements));
        }

        items.sort_by(|a, b| {
            a.product_name
                .cmp(&b.product_name)
                .then_with(|| a.product_id.cmp(&b.product_id))
        });

        debug!(
            pharmacy_id = %pharmacy_id,
            lot_number = %query,
            products = items.len(),
            "Lot traced"
        );

        Ok(TraceabilityReport {
            lot_number: canonical_lot_number(&query, &lots),
            items,
        })
    }
}
