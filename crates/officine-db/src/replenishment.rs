//! # Low-Stock Replenishment
//!
//! Keeps one draft purchase order per pharmacy aligned with the products
//! that are at or below their threshold.
//!
//! ## State
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  low_stock_alert_states (1 row / pharmacy)                              │
//! │     order_id  ─────────────►  procurement_orders                        │
//! │     signature "p1|p3"           must still be: same pharmacy,           │
//! │                                 PURCHASE_ORDER, DRAFT                   │
//! │                                                                         │
//! │  Anything else (deleted, confirmed, foreign) reads as "no draft".      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Sync
//! Delete-then-reinsert of the draft lines, the order timestamp and the
//! alert state all commit in one transaction. Quantities the pharmacist
//! entered survive; unit prices are re-read from the catalog.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::pool::begin_immediate;
use crate::repository::{alert_state, procurement, product, supplier};
use officine_core::low_stock::{
    initial_draft_lines, low_stock_signature, reconcile_draft_lines, DraftLine, LowStockSummary,
};
use officine_core::{new_id, OrderType, ProcurementItem, ProcurementOrder};

/// Note written on generated drafts.
pub const DRAFT_NOTE: &str = "Low-stock replenishment";

/// Low-stock summary and draft synchronization service.
#[derive(Debug, Clone)]
pub struct Replenishment {
    pool: SqlitePool,
}

impl Replenishment {
    /// Creates a new Replenishment.
    pub fn new(pool: SqlitePool) -> Self {
        Replenishment { pool }
    }

    /// Count, signature and whether a usable draft exists.
    pub async fn summary(&self, pharmacy_id: &str) -> DbResult<LowStockSummary> {
        let mut conn = self.pool.acquire().await?;
        let products = product::list_low_stock(&mut conn, pharmacy_id).await?;
        let draft = resolve_active_draft(&mut conn, pharmacy_id).await?;

        Ok(LowStockSummary {
            count: products.len() as i64,
            signature: low_stock_signature(&products),
            has_active_draft: draft.is_some(),
        })
    }

    /// The draft the alert state points at, if it is still a draft purchase
    /// order of this pharmacy.
    pub async fn active_draft(&self, pharmacy_id: &str) -> DbResult<Option<ProcurementOrder>> {
        let mut conn = self.pool.acquire().await?;
        Ok(resolve_active_draft(&mut conn, pharmacy_id)
            .await?
            .map(|(order, _)| order))
    }

    /// Creates a draft purchase order for `supplier_id` with one zero-quantity
    /// line per low-stock product, and records it in the alert state.
    ///
    /// Does not check for an existing draft; callers re-check
    /// `has_active_draft` right before calling.
    ///
    /// ## Returns
    /// The new order id.
    pub async fn create_draft(&self, pharmacy_id: &str, supplier_id: &str) -> DbResult<String> {
        let mut tx = begin_immediate(&self.pool).await?;

        if supplier::find_in_pharmacy(&mut tx, pharmacy_id, supplier_id)
            .await?
            .is_none()
        {
            return Err(DbError::not_found("Supplier", supplier_id));
        }

        let products = product::list_low_stock(&mut tx, pharmacy_id).await?;
        let signature = low_stock_signature(&products);

        let order = procurement::new_order(
            pharmacy_id,
            Some(supplier_id),
            OrderType::PurchaseOrder,
            Some(DRAFT_NOTE),
        );
        procurement::insert_order(&mut tx, &order).await?;
        let lines = initial_draft_lines(&products);
        write_lines(&mut tx, &order.id, &lines).await?;
        alert_state::upsert(&mut tx, pharmacy_id, &order.id, &signature).await?;

        tx.commit().await?;

        info!(
            pharmacy_id = %pharmacy_id,
            order_id = %order.id,
            lines = lines.len(),
            "Low-stock draft created"
        );

        Ok(order.id)
    }

    /// Rewrites the lines of draft `order_id` to match the current low-stock
    /// set.
    ///
    /// ## Returns
    /// * `Ok(Some(order_id))` - synced
    /// * `Ok(None)` - order missing, foreign, not a purchase order or no
    ///   longer a draft; nothing written
    pub async fn sync_draft(&self, pharmacy_id: &str, order_id: &str) -> DbResult<Option<String>> {
        let mut tx = begin_immediate(&self.pool).await?;

        let order = match procurement::find_order(&mut tx, pharmacy_id, order_id).await? {
            Some(order) if order.is_draft_purchase_order() => order,
            _ => {
                debug!(order_id = %order_id, "Not a draft purchase order, sync skipped");
                return Ok(None);
            }
        };

        let existing = procurement::list_items(&mut tx, &order.id).await?;
        let products = product::list_low_stock(&mut tx, pharmacy_id).await?;
        let signature = low_stock_signature(&products);
        let plan = reconcile_draft_lines(&existing, &products);

        procurement::delete_items(&mut tx, &order.id).await?;
        write_lines(&mut tx, &order.id, &plan.lines).await?;
        procurement::touch_order(&mut tx, &order.id).await?;
        alert_state::upsert(&mut tx, pharmacy_id, &order.id, &signature).await?;

        tx.commit().await?;

        info!(
            pharmacy_id = %pharmacy_id,
            order_id = %order.id,
            kept = plan.kept,
            added = plan.added,
            removed = plan.removed,
            "Low-stock draft synced"
        );

        Ok(Some(order.id))
    }

    /// Syncs the active draft if the low-stock set changed since its last
    /// sync. Does nothing without an active draft.
    pub async fn reconcile(&self, pharmacy_id: &str) -> DbResult<Option<String>> {
        let mut conn = self.pool.acquire().await?;
        let Some((order, state)) = resolve_active_draft(&mut conn, pharmacy_id).await? else {
            return Ok(None);
        };
        let products = product::list_low_stock(&mut conn, pharmacy_id).await?;
        drop(conn);

        let current = low_stock_signature(&products);
        if state.signature.as_deref() == Some(current.as_str()) {
            debug!(pharmacy_id = %pharmacy_id, "Low-stock set unchanged");
            return Ok(None);
        }

        self.sync_draft(pharmacy_id, &order.id).await
    }
}

async fn resolve_active_draft(
    conn: &mut SqliteConnection,
    pharmacy_id: &str,
) -> DbResult<Option<(ProcurementOrder, officine_core::LowStockAlertState)>> {
    let Some(state) = alert_state::find(conn, pharmacy_id).await? else {
        return Ok(None);
    };
    let Some(order_id) = state.order_id.clone() else {
        return Ok(None);
    };

    match procurement::find_order(conn, pharmacy_id, &order_id).await? {
        Some(order) if order.is_draft_purchase_order() => Ok(Some((order, state))),
        _ => {
            debug!(pharmacy_id = %pharmacy_id, order_id = %order_id, "Stale draft reference");
            Ok(None)
        }
    }
}

async fn write_lines(conn: &mut SqliteConnection, order_id: &str, lines: &[DraftLine]) -> DbResult<()> {
    let now = chrono::Utc::now();
    for line in lines {
        procurement::insert_item(
            conn,
            &ProcurementItem {
                id: new_id(),
                order_id: order_id.to_string(),
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                unit_price_cents: line.unit_price_cents,
                created_at: now,
            },
        )
        .await?;
    }
    Ok(())
}
