//! # Lot Ledger
//!
//! Every stock change goes through here: receipts create or top up lots,
//! sales draw from lots in FEFO order, stocktakes correct one lot.
//!
//! ## One Transaction Per Operation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  BEGIN                                                                  │
//! │    stock_lots        quantity ± n            (guarded, never < 0)      │
//! │    stock_movements   + one row per touched lot (append-only)           │
//! │    *_item_lots       + join row (receipt or sale context)              │
//! │    products          stock_quantity ± n      (aggregate)               │
//! │  COMMIT                                                                 │
//! │                                                                         │
//! │  Any error before COMMIT drops the transaction: nothing is written.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## FEFO Retry
//! Transactions start with `BEGIN IMMEDIATE`, so the consumption plan is
//! computed from lots read under the write lock. Each decrement is still
//! guarded with `quantity >= n`. When the lock stays busy past the pool's
//! `busy_timeout`, or a guard matches no row, the transaction rolls back and
//! the whole consumption is planned again after a short pause, up to
//! [`MAX_CONSUME_ATTEMPTS`] times.

use std::time::Duration;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::pool::begin_immediate;
use crate::repository::{lot, lot_link, movement, procurement, product};
use officine_core::fefo::{plan_consumption, LotDraw};
use officine_core::validation::{
    validate_delta, validate_lot_number, validate_quantity, validate_reason,
};
use officine_core::{
    new_id, CoreError, LotSourceType, MovementType, ProcurementItemLot, Product, SaleItemLot,
    StockLot, StockMovement,
};

/// Attempts made by [`Ledger::consume_fefo`] before reporting a conflict.
pub const MAX_CONSUME_ATTEMPTS: u32 = 3;

/// Pause before retry `n` is `n * CONSUME_RETRY_BACKOFF`.
const CONSUME_RETRY_BACKOFF: Duration = Duration::from_millis(25);

// =============================================================================
// Requests
// =============================================================================

/// Where received goods come from.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotSource {
    pub source_type: LotSourceType,
    /// Purchase order or delivery note the goods arrived with.
    #[serde(default)]
    pub order_id: Option<String>,
    /// Line of that order, when known.
    #[serde(default)]
    pub item_id: Option<String>,
}

impl LotSource {
    /// Opening balance with no originating document.
    pub fn initial_stock() -> Self {
        LotSource {
            source_type: LotSourceType::InitialStock,
            order_id: None,
            item_id: None,
        }
    }

    /// Goods received against a delivery note.
    pub fn delivery_note(order_id: impl Into<String>, item_id: Option<String>) -> Self {
        LotSource {
            source_type: LotSourceType::DeliveryNote,
            order_id: Some(order_id.into()),
            item_id,
        }
    }

    fn default_reason(&self) -> &'static str {
        match self.source_type {
            LotSourceType::DeliveryNote => "Delivery note received",
            LotSourceType::PurchaseOrder => "Purchase order received",
            LotSourceType::InitialStock => "Initial stock",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveLot {
    pub product_id: String,
    pub lot_number: String,
    pub expiry_date: NaiveDate,
    pub quantity: i64,
    pub source: LotSource,
    #[serde(default)]
    pub reason: Option<String>,
}

/// The sale line a consumption belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRef {
    pub sale_id: String,
    #[serde(default)]
    pub sale_item_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeLots {
    pub product_id: String,
    pub quantity: i64,
    #[serde(default)]
    pub sale: Option<SaleRef>,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Movement type recorded by a manual lot correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdjustmentKind {
    #[default]
    Stocktake,
    ManualEdit,
}

impl AdjustmentKind {
    pub fn movement_type(self) -> MovementType {
        match self {
            AdjustmentKind::Stocktake => MovementType::Stocktake,
            AdjustmentKind::ManualEdit => MovementType::ManualEdit,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustLot {
    pub lot_id: String,
    pub delta: i64,
    pub reason: String,
    #[serde(default)]
    pub kind: AdjustmentKind,
    /// Stocktake session or other reference.
    #[serde(default)]
    pub reference: Option<String>,
}

// =============================================================================
// Ledger
// =============================================================================

/// Transactional lot ledger.
#[derive(Debug, Clone)]
pub struct Ledger {
    pool: SqlitePool,
}

impl Ledger {
    /// Creates a new Ledger.
    pub fn new(pool: SqlitePool) -> Self {
        Ledger { pool }
    }

    /// Receives goods into the lot `(product_id, lot_number)`.
    ///
    /// Creates the lot, or tops up an existing one (lot number matched
    /// ignoring case). An existing lot keeps its stored expiry and casing.
    ///
    /// ## Errors
    /// * `Domain(ProductNotFound)` - product missing or in another pharmacy
    /// * `Domain(Validation)` - blank lot number, quantity not in 1..=100000
    /// * `NotFound` - the source order does not belong to the pharmacy
    pub async fn receive_lot(
        &self,
        pharmacy_id: &str,
        user_id: Option<&str>,
        request: &ReceiveLot,
    ) -> DbResult<StockLot> {
        let lot_number = validate_lot_number(&request.lot_number)?;
        validate_quantity(request.quantity)?;
        let reason = match &request.reason {
            Some(reason) => validate_reason(reason)?,
            None => request.source.default_reason().to_string(),
        };

        let mut tx = begin_immediate(&self.pool).await?;

        let product = require_product(&mut tx, pharmacy_id, &request.product_id).await?;

        if let Some(order_id) = &request.source.order_id {
            if procurement::find_order(&mut tx, pharmacy_id, order_id)
                .await?
                .is_none()
            {
                return Err(DbError::not_found("ProcurementOrder", order_id));
            }
        }

        let now = Utc::now();
        let existing = lot::find_by_product_and_number(&mut tx, &product.id, &lot_number).await?;
        let lot_id = match existing {
            Some(existing) => {
                if existing.expiry_date != request.expiry_date {
                    warn!(
                        lot_id = %existing.id,
                        stored = %existing.expiry_date,
                        received = %request.expiry_date,
                        "Received expiry differs from stored lot expiry, keeping stored"
                    );
                }
                if !lot::apply_delta_guarded(&mut tx, &existing.id, request.quantity).await? {
                    return Err(DbError::Conflict(format!("lot {}", existing.id)));
                }
                existing.id
            }
            None => {
                let new_lot = StockLot {
                    id: new_id(),
                    pharmacy_id: pharmacy_id.to_string(),
                    product_id: product.id.clone(),
                    lot_number: lot_number.clone(),
                    expiry_date: request.expiry_date,
                    quantity: request.quantity,
                    source_type: request.source.source_type,
                    source_order_id: request.source.order_id.clone(),
                    source_item_id: request.source.item_id.clone(),
                    created_at: now,
                    updated_at: now,
                };
                lot::insert(&mut tx, &new_lot).await?;
                new_lot.id
            }
        };

        let received = lot::reload(&mut tx, &lot_id).await?;

        movement::insert(
            &mut tx,
            &lot_movement(
                &product,
                &received,
                request.quantity,
                request.source.source_type.receipt_movement(),
                reason,
                request.source.order_id.clone(),
                user_id,
            ),
        )
        .await?;

        if let Some(order_id) = &request.source.order_id {
            lot_link::insert_receipt(
                &mut tx,
                &ProcurementItemLot {
                    id: new_id(),
                    order_id: order_id.clone(),
                    procurement_item_id: request.source.item_id.clone(),
                    lot_id: received.id.clone(),
                    quantity: request.quantity,
                    expiry_date: received.expiry_date,
                    created_at: now,
                },
            )
            .await?;
        }

        product::apply_stock_delta(&mut tx, &product.id, request.quantity).await?;

        tx.commit().await?;

        info!(
            product_id = %product.id,
            lot_number = %received.lot_number,
            quantity = request.quantity,
            balance = received.quantity,
            "Lot received"
        );

        Ok(received)
    }

    /// Draws `quantity` units of a product from its lots, soonest expiry
    /// first.
    ///
    /// ## Returns
    /// One [`LotDraw`] per touched lot, in draw order.
    ///
    /// ## Errors
    /// * `Domain(InsufficientStock)` - lots hold fewer units; nothing written
    /// * `Domain(ProductNotFound)` - product missing or in another pharmacy
    /// * `Conflict` - lots kept changing underneath for every attempt
    pub async fn consume_fefo(
        &self,
        pharmacy_id: &str,
        user_id: Option<&str>,
        request: &ConsumeLots,
    ) -> DbResult<Vec<LotDraw>> {
        validate_quantity(request.quantity)?;
        let reason = match &request.reason {
            Some(reason) => validate_reason(reason)?,
            None => "Sale".to_string(),
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self
                .try_consume(pharmacy_id, user_id, request, &reason)
                .await
            {
                Err(DbError::Conflict(detail)) if attempt < MAX_CONSUME_ATTEMPTS => {
                    warn!(
                        product_id = %request.product_id,
                        attempt,
                        detail = %detail,
                        "FEFO consumption raced another writer, retrying"
                    );
                    tokio::time::sleep(CONSUME_RETRY_BACKOFF * attempt).await;
                }
                other => return other,
            }
        }
    }

    async fn try_consume(
        &self,
        pharmacy_id: &str,
        user_id: Option<&str>,
        request: &ConsumeLots,
        reason: &str,
    ) -> DbResult<Vec<LotDraw>> {
        let mut tx = begin_immediate(&self.pool).await?;

        let product = require_product(&mut tx, pharmacy_id, &request.product_id).await?;
        let lots = lot::list_available(&mut tx, &product.id).await?;
        let draws = plan_consumption(&product.id, &lots, request.quantity)?;

        debug!(product_id = %product.id, lots = draws.len(), "FEFO plan computed");

        for draw in &draws {
            if !lot::apply_delta_guarded(&mut tx, &draw.lot_id, -draw.quantity).await? {
                return Err(DbError::Conflict(format!("lot {}", draw.lot_id)));
            }

            let drawn = lots
                .iter()
                .find(|l| l.id == draw.lot_id)
                .ok_or_else(|| DbError::Internal(format!("planned lot {} vanished", draw.lot_id)))?;

            movement::insert(
                &mut tx,
                &lot_movement(
                    &product,
                    drawn,
                    -draw.quantity,
                    MovementType::SaleSync,
                    reason.to_string(),
                    request.sale.as_ref().map(|s| s.sale_id.clone()),
                    user_id,
                ),
            )
            .await?;

            if let Some(sale) = &request.sale {
                lot_link::insert_sale(
                    &mut tx,
                    &SaleItemLot {
                        id: new_id(),
                        sale_id: sale.sale_id.clone(),
                        sale_item_id: sale.sale_item_id.clone(),
                        lot_id: draw.lot_id.clone(),
                        quantity: draw.quantity,
                        expiry_date: draw.expiry_date,
                        created_at: Utc::now(),
                    },
                )
                .await?;
            }
        }

        product::apply_stock_delta(&mut tx, &product.id, -request.quantity).await?;

        tx.commit().await?;

        info!(
            product_id = %product.id,
            quantity = request.quantity,
            lots = draws.len(),
            "Stock consumed (FEFO)"
        );

        Ok(draws)
    }

    /// Corrects one lot by `delta` (stocktake, breakage, manual fix).
    ///
    /// ## Errors
    /// * `Domain(NegativeStock)` - the lot would drop below zero
    /// * `Domain(LotNotFound)` - lot missing or in another pharmacy
    /// * `Domain(Validation)` - zero delta, blank reason
    pub async fn adjust_lot(
        &self,
        pharmacy_id: &str,
        user_id: Option<&str>,
        request: &AdjustLot,
    ) -> DbResult<StockLot> {
        validate_delta(request.delta)?;
        let reason = validate_reason(&request.reason)?;

        let mut tx = begin_immediate(&self.pool).await?;

        let current = lot::find_in_pharmacy(&mut tx, pharmacy_id, &request.lot_id)
            .await?
            .ok_or_else(|| CoreError::LotNotFound(request.lot_id.clone()))?;

        if current.quantity + request.delta < 0 {
            return Err(CoreError::NegativeStock {
                lot_id: current.id,
                current: current.quantity,
                delta: request.delta,
            }
            .into());
        }

        let product = require_product(&mut tx, pharmacy_id, &current.product_id).await?;

        if !lot::apply_delta_guarded(&mut tx, &current.id, request.delta).await? {
            return Err(DbError::Conflict(format!("lot {}", current.id)));
        }

        movement::insert(
            &mut tx,
            &lot_movement(
                &product,
                &current,
                request.delta,
                request.kind.movement_type(),
                reason,
                request.reference.clone(),
                user_id,
            ),
        )
        .await?;

        product::apply_stock_delta(&mut tx, &product.id, request.delta).await?;

        let adjusted = lot::reload(&mut tx, &current.id).await?;

        tx.commit().await?;

        info!(
            lot_id = %adjusted.id,
            delta = request.delta,
            balance = adjusted.quantity,
            kind = ?request.kind,
            "Lot adjusted"
        );

        Ok(adjusted)
    }
}

async fn require_product(
    conn: &mut SqliteConnection,
    pharmacy_id: &str,
    product_id: &str,
) -> DbResult<Product> {
    product::find_in_pharmacy(conn, pharmacy_id, product_id)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(product_id.to_string()).into())
}

fn lot_movement(
    product: &Product,
    lot: &StockLot,
    delta: i64,
    movement_type: MovementType,
    reason: String,
    source_id: Option<String>,
    user_id: Option<&str>,
) -> StockMovement {
    StockMovement {
        id: new_id(),
        pharmacy_id: product.pharmacy_id.clone(),
        product_id: product.id.clone(),
        product_name_snapshot: product.name.clone(),
        delta,
        movement_type,
        lot_number: Some(lot.lot_number.clone()),
        lot_expiry_date: Some(lot.expiry_date),
        reason,
        source_id,
        created_by_user_id: user_id.map(str::to_string),
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixture, fixture_with, Fixture};
    use crate::DbConfig;
    use chrono::Duration;
    use officine_core::OrderType;

    async fn assert_conserved(fx: &Fixture, product: &Product) {
        let lots = fx.db.lots().total_quantity(&product.id).await.unwrap();
        let movements = fx.db.movements().net_delta(&product.id).await.unwrap();
        let aggregate = fx.reload(product).await.stock_quantity;
        assert_eq!(lots, movements, "lots vs movement log");
        assert_eq!(lots, aggregate, "lots vs product aggregate");
    }

    fn consume(product: &Product, quantity: i64) -> ConsumeLots {
        ConsumeLots {
            product_id: product.id.clone(),
            quantity,
            sale: Some(SaleRef {
                sale_id: "sale-1".to_string(),
                sale_item_id: Some("sale-item-1".to_string()),
            }),
            reason: None,
        }
    }

    #[tokio::test]
    async fn test_receive_creates_lot_movement_and_receipt_link() {
        let fx = fixture().await;
        let order = fx
            .db
            .procurement()
            .create_order(&fx.pharmacy.id, Some(&fx.supplier.id), OrderType::DeliveryNote, None)
            .await
            .unwrap();

        let lot = fx
            .db
            .ledger()
            .receive_lot(
                &fx.pharmacy.id,
                Some("user-1"),
                &ReceiveLot {
                    product_id: fx.product.id.clone(),
                    lot_number: "  LOT-A1 ".to_string(),
                    expiry_date: Fixture::today() + Duration::days(120),
                    quantity: 10,
                    source: LotSource::delivery_note(order.id.clone(), None),
                    reason: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(lot.lot_number, "LOT-A1");
        assert_eq!(lot.quantity, 10);
        assert_eq!(lot.source_order_id.as_deref(), Some(order.id.as_str()));

        let movements = fx.db.movements().list_for_product(&fx.product.id).await.unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].movement_type, MovementType::DeliverySync);
        assert_eq!(movements[0].delta, 10);
        assert_eq!(movements[0].lot_number.as_deref(), Some("LOT-A1"));
        assert_eq!(movements[0].created_by_user_id.as_deref(), Some("user-1"));

        let receipts = fx.db.lot_links().receipts_for_lot(&lot.id).await.unwrap();
        assert_eq!(receipts.len(), 1);
        assert_eq!(receipts[0].quantity, 10);

        assert_conserved(&fx, &fx.product).await;
    }

    #[tokio::test]
    async fn test_receive_tops_up_existing_lot_keeping_casing_and_expiry() {
        let fx = fixture().await;
        let first = fx.receive(&fx.product, "AbC-42", 90, 4).await;

        let topped = fx
            .db
            .ledger()
            .receive_lot(
                &fx.pharmacy.id,
                None,
                &ReceiveLot {
                    product_id: fx.product.id.clone(),
                    lot_number: "abc-42".to_string(),
                    expiry_date: Fixture::today() + Duration::days(200),
                    quantity: 6,
                    source: LotSource::initial_stock(),
                    reason: None,
                },
            )
            .await
            .unwrap();

        assert_eq!(topped.id, first.id);
        assert_eq!(topped.lot_number, "AbC-42");
        assert_eq!(topped.expiry_date, first.expiry_date);
        assert_eq!(topped.quantity, 10);
        assert_eq!(fx.db.lots().list_for_product(&fx.product.id).await.unwrap().len(), 1);
        assert_conserved(&fx, &fx.product).await;
    }

    #[tokio::test]
    async fn test_receive_rejects_foreign_product_and_bad_input() {
        let fx = fixture().await;
        let other = fx.db.pharmacies().create("org_other", "Other").await.unwrap();

        let request = ReceiveLot {
            product_id: fx.product.id.clone(),
            lot_number: "L1".to_string(),
            expiry_date: Fixture::today(),
            quantity: 1,
            source: LotSource::initial_stock(),
            reason: None,
        };
        let err = fx.db.ledger().receive_lot(&other.id, None, &request).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ProductNotFound(_))));

        let blank = ReceiveLot {
            lot_number: "   ".to_string(),
            ..request.clone()
        };
        let err = fx.db.ledger().receive_lot(&fx.pharmacy.id, None, &blank).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

        let zero = ReceiveLot {
            quantity: 0,
            ..request
        };
        let err = fx.db.ledger().receive_lot(&fx.pharmacy.id, None, &zero).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_consume_draws_soonest_expiry_first() {
        let fx = fixture().await;
        let late = fx.receive(&fx.product, "LATE", 200, 10).await;
        let soon = fx.receive(&fx.product, "SOON", 20, 4).await;
        let soon_too = fx.receive(&fx.product, "SOON-2", 20, 6).await;

        let draws = fx
            .db
            .ledger()
            .consume_fefo(&fx.pharmacy.id, Some("user-1"), &consume(&fx.product, 7))
            .await
            .unwrap();

        let drawn: Vec<(&str, i64)> = draws
            .iter()
            .map(|d| (d.lot_number.as_str(), d.quantity))
            .collect();
        assert_eq!(drawn, vec![("SOON", 4), ("SOON-2", 3)]);

        let lot = |id: &str| {
            let db = fx.db.clone();
            let pharmacy_id = fx.pharmacy.id.clone();
            let id = id.to_string();
            async move { db.lots().get(&pharmacy_id, &id).await.unwrap().unwrap() }
        };
        assert_eq!(lot(&soon.id).await.quantity, 0);
        assert_eq!(lot(&soon_too.id).await.quantity, 3);
        assert_eq!(lot(&late.id).await.quantity, 10);

        let sales = fx.db.lot_links().sales_for_sale("sale-1").await.unwrap();
        assert_eq!(sales.len(), 2);

        let sale_movements: Vec<StockMovement> = fx
            .db
            .movements()
            .list_for_product(&fx.product.id)
            .await
            .unwrap()
            .into_iter()
            .filter(|m| m.movement_type == MovementType::SaleSync)
            .collect();
        assert_eq!(sale_movements.len(), 2);
        assert!(sale_movements.iter().all(|m| m.source_id.as_deref() == Some("sale-1")));

        assert_conserved(&fx, &fx.product).await;
    }

    #[tokio::test]
    async fn test_insufficient_stock_writes_nothing() {
        let fx = fixture().await;
        fx.receive(&fx.product, "A", 20, 2).await;
        fx.receive(&fx.product, "B", 40, 1).await;
        let before = fx.db.movements().list_for_product(&fx.product.id).await.unwrap().len();

        let err = fx
            .db
            .ledger()
            .consume_fefo(&fx.pharmacy.id, None, &consume(&fx.product, 5))
            .await
            .unwrap_err();

        match err {
            DbError::Domain(CoreError::InsufficientStock {
                available,
                requested,
                ..
            }) => {
                assert_eq!(available, 3);
                assert_eq!(requested, 5);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert_eq!(fx.db.lots().total_quantity(&fx.product.id).await.unwrap(), 3);
        assert_eq!(
            fx.db.movements().list_for_product(&fx.product.id).await.unwrap().len(),
            before
        );
        assert!(fx.db.lot_links().sales_for_sale("sale-1").await.unwrap().is_empty());
        assert_conserved(&fx, &fx.product).await;
    }

    #[tokio::test]
    async fn test_adjust_lot_stocktake_and_negative_guard() {
        let fx = fixture().await;
        let lot = fx.receive(&fx.product, "L1", 60, 5).await;

        let adjusted = fx
            .db
            .ledger()
            .adjust_lot(
                &fx.pharmacy.id,
                Some("user-2"),
                &AdjustLot {
                    lot_id: lot.id.clone(),
                    delta: -2,
                    reason: "Broken box".to_string(),
                    kind: AdjustmentKind::default(),
                    reference: Some("stocktake-7".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(adjusted.quantity, 3);

        let err = fx
            .db
            .ledger()
            .adjust_lot(
                &fx.pharmacy.id,
                None,
                &AdjustLot {
                    lot_id: lot.id.clone(),
                    delta: -4,
                    reason: "Recount".to_string(),
                    kind: AdjustmentKind::ManualEdit,
                    reference: None,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Domain(CoreError::NegativeStock {
                current: 3,
                delta: -4,
                ..
            })
        ));

        let movements = fx.db.movements().list_for_product(&fx.product.id).await.unwrap();
        let last = movements.last().unwrap();
        assert_eq!(last.movement_type, MovementType::Stocktake);
        assert_eq!(last.delta, -2);
        assert_eq!(last.lot_number.as_deref(), Some("L1"));
        assert_eq!(last.source_id.as_deref(), Some("stocktake-7"));
        assert_conserved(&fx, &fx.product).await;
    }

    #[tokio::test]
    async fn test_adjust_lot_rejects_zero_delta_and_foreign_lot() {
        let fx = fixture().await;
        let lot = fx.receive(&fx.product, "L1", 60, 5).await;

        let zero = AdjustLot {
            lot_id: lot.id.clone(),
            delta: 0,
            reason: "noop".to_string(),
            kind: AdjustmentKind::ManualEdit,
            reference: None,
        };
        let err = fx.db.ledger().adjust_lot(&fx.pharmacy.id, None, &zero).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));

        let other = fx.db.pharmacies().create("org_other", "Other").await.unwrap();
        let foreign = AdjustLot { delta: 1, ..zero };
        let err = fx.db.ledger().adjust_lot(&other.id, None, &foreign).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::LotNotFound(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_consumption_on_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let fx = fixture_with(DbConfig::new(dir.path().join("officine.db")).max_connections(5)).await;
        fx.receive(&fx.product, "LOT-A", 200, 1000).await;

        let mut handles = Vec::new();
        for _ in 0..40 {
            let db = fx.db.clone();
            let pharmacy_id = fx.pharmacy.id.clone();
            let request = consume(&fx.product, 1);
            handles.push(tokio::spawn(async move {
                db.ledger().consume_fefo(&pharmacy_id, None, &request).await
            }));
        }

        for handle in handles {
            let draws = handle.await.unwrap().unwrap();
            assert_eq!(draws.len(), 1);
        }

        assert_eq!(fx.db.lots().total_quantity(&fx.product.id).await.unwrap(), 960);
        assert_conserved(&fx, &fx.product).await;
        fx.db.close().await;
    }

    #[tokio::test]
    async fn test_consume_gives_up_with_conflict_while_write_lock_is_held() {
        let dir = tempfile::tempdir().unwrap();
        let config = DbConfig::new(dir.path().join("officine.db"))
            .max_connections(2)
            .busy_timeout(std::time::Duration::ZERO);
        let fx = fixture_with(config).await;
        fx.receive(&fx.product, "LOT-A", 200, 10).await;

        let mut holder = fx.db.pool().acquire().await.unwrap();
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *holder).await.unwrap();

        let err = fx
            .db
            .ledger()
            .consume_fefo(&fx.pharmacy.id, None, &consume(&fx.product, 2))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)), "got {err:?}");

        sqlx::query("ROLLBACK").execute(&mut *holder).await.unwrap();
        drop(holder);

        // Once the lock is released the same consumption goes through.
        fx.db
            .ledger()
            .consume_fefo(&fx.pharmacy.id, None, &consume(&fx.product, 2))
            .await
            .unwrap();
        assert_eq!(fx.db.lots().total_quantity(&fx.product.id).await.unwrap(), 8);
        assert_conserved(&fx, &fx.product).await;
        fx.db.close().await;
    }

    #[tokio::test]
    async fn test_conservation_over_mixed_operations() {
        let fx = fixture().await;
        let a = fx.receive(&fx.product, "A", 10, 8).await;
        fx.receive(&fx.product, "B", 50, 12).await;
        fx.db
            .ledger()
            .consume_fefo(&fx.pharmacy.id, None, &consume(&fx.product, 11))
            .await
            .unwrap();
        fx.db
            .ledger()
            .adjust_lot(
                &fx.pharmacy.id,
                None,
                &AdjustLot {
                    lot_id: a.id.clone(),
                    delta: 2,
                    reason: "Found in back room".to_string(),
                    kind: AdjustmentKind::ManualEdit,
                    reference: None,
                },
            )
            .await
            .unwrap();
        fx.receive(&fx.product, "b", 50, 3).await;

        assert_conserved(&fx, &fx.product).await;
        assert_eq!(fx.reload(&fx.product).await.stock_quantity, 14);
    }

    #[test]
    fn test_adjustment_kind_defaults_to_stocktake() {
        let request: AdjustLot =
            serde_json::from_str(r#"{"lotId":"l1","delta":-1,"reason":"count"}"#).unwrap();
        assert_eq!(request.kind, AdjustmentKind::Stocktake);
        assert_eq!(request.kind.movement_type(), MovementType::Stocktake);
    }
}
