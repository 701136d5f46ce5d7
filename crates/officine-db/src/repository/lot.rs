//! # Stock Lot Repository
//!
//! Lots are created and moved only through the ledger; this repository
//! exposes the reads plus the guarded writes the ledger composes into its
//! transactions.
//!
//! ## Guarded Decrement
//! ```text
//! UPDATE stock_lots SET quantity = quantity - n
//! WHERE id = ? AND quantity >= n
//!
//! rows_affected == 1  →  applied
//! rows_affected == 0  →  someone else drew from the lot first (retry)
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use officine_core::StockLot;

const LOT_COLUMNS: &str = r#"
    id, pharmacy_id, product_id, lot_number, expiry_date, quantity,
    source_type, source_order_id, source_item_id, created_at, updated_at
"#;

/// Repository for stock lot reads.
#[derive(Debug, Clone)]
pub struct LotRepository {
    pool: SqlitePool,
}

impl LotRepository {
    /// Creates a new LotRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LotRepository { pool }
    }

    pub async fn get(&self, pharmacy_id: &str, id: &str) -> DbResult<Option<StockLot>> {
        let mut conn = self.pool.acquire().await?;
        find_in_pharmacy(&mut conn, pharmacy_id, id).await
    }

    /// Every lot of a product, including exhausted ones, soonest expiry first.
    pub async fn list_for_product(&self, product_id: &str) -> DbResult<Vec<StockLot>> {
        let lots = sqlx::query_as::<_, StockLot>(&format!(
            "SELECT {} FROM stock_lots WHERE product_id = ?1 ORDER BY expiry_date, created_at, id",
            LOT_COLUMNS
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lots)
    }

    /// Lots of a pharmacy whose number matches `lot_number`, ignoring case.
    /// One per product at most.
    pub async fn find_by_number(&self, pharmacy_id: &str, lot_number: &str) -> DbResult<Vec<StockLot>> {
        debug!(pharmacy_id = %pharmacy_id, lot_number = %lot_number, "Looking up lot number");

        let lots = sqlx::query_as::<_, StockLot>(&format!(
            r#"
            SELECT {} FROM stock_lots
            WHERE pharmacy_id = ?1 AND lot_number = ?2 COLLATE NOCASE
            ORDER BY created_at, id
            "#,
            LOT_COLUMNS
        ))
        .bind(pharmacy_id)
        .bind(lot_number)
        .fetch_all(&self.pool)
        .await?;

        Ok(lots)
    }

    /// Sum of lot quantities of a product.
    pub async fn total_quantity(&self, product_id: &str) -> DbResult<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(quantity), 0) FROM stock_lots WHERE product_id = ?1",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }
}

// =============================================================================
// Connection-level queries (usable inside a transaction)
// =============================================================================

pub(crate) async fn find_in_pharmacy(
    conn: &mut SqliteConnection,
    pharmacy_id: &str,
    id: &str,
) -> DbResult<Option<StockLot>> {
    let lot = sqlx::query_as::<_, StockLot>(&format!(
        "SELECT {} FROM stock_lots WHERE id = ?1 AND pharmacy_id = ?2",
        LOT_COLUMNS
    ))
    .bind(id)
    .bind(pharmacy_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(lot)
}

/// The lot `(product_id, lot_number)`, lot number compared ignoring case.
pub(crate) async fn find_by_product_and_number(
    conn: &mut SqliteConnection,
    product_id: &str,
    lot_number: &str,
) -> DbResult<Option<StockLot>> {
    let lot = sqlx::query_as::<_, StockLot>(&format!(
        "SELECT {} FROM stock_lots WHERE product_id = ?1 AND lot_number = ?2 COLLATE NOCASE",
        LOT_COLUMNS
    ))
    .bind(product_id)
    .bind(lot_number)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(lot)
}

/// Lots of a product that still hold stock.
pub(crate) async fn list_available(
    conn: &mut SqliteConnection,
    product_id: &str,
) -> DbResult<Vec<StockLot>> {
    let lots = sqlx::query_as::<_, StockLot>(&format!(
        "SELECT {} FROM stock_lots WHERE product_id = ?1 AND quantity > 0",
        LOT_COLUMNS
    ))
    .bind(product_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(lots)
}

pub(crate) async fn insert(conn: &mut SqliteConnection, lot: &StockLot) -> DbResult<()> {
    debug!(product_id = %lot.product_id, lot_number = %lot.lot_number, "Inserting lot");

    sqlx::query(
        r#"
        INSERT INTO stock_lots (
            id, pharmacy_id, product_id, lot_number, expiry_date, quantity,
            source_type, source_order_id, source_item_id, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&lot.id)
    .bind(&lot.pharmacy_id)
    .bind(&lot.product_id)
    .bind(&lot.lot_number)
    .bind(lot.expiry_date)
    .bind(lot.quantity)
    .bind(lot.source_type)
    .bind(&lot.source_order_id)
    .bind(&lot.source_item_id)
    .bind(lot.created_at)
    .bind(lot.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Applies `delta` unless the lot would drop below zero.
///
/// ## Returns
/// * `Ok(true)` - applied
/// * `Ok(false)` - the guard rejected it (quantity changed underneath us)
pub(crate) async fn apply_delta_guarded(
    conn: &mut SqliteConnection,
    id: &str,
    delta: i64,
) -> DbResult<bool> {
    debug!(id = %id, delta = %delta, "Moving lot quantity");

    let result = sqlx::query(
        r#"
        UPDATE stock_lots
        SET quantity = quantity + ?2,
            updated_at = ?3
        WHERE id = ?1 AND quantity + ?2 >= 0
        "#,
    )
    .bind(id)
    .bind(delta)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Re-reads a lot inside a transaction after a write.
pub(crate) async fn reload(conn: &mut SqliteConnection, id: &str) -> DbResult<StockLot> {
    sqlx::query_as::<_, StockLot>(&format!(
        "SELECT {} FROM stock_lots WHERE id = ?1",
        LOT_COLUMNS
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| DbError::not_found("StockLot", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixture;

    #[tokio::test]
    async fn test_lot_number_lookup_ignores_case() {
        let fx = fixture().await;
        fx.receive(&fx.product, "AbC-42", 90, 4).await;

        let lots = fx.db.lots().find_by_number(&fx.pharmacy.id, "abc-42").await.unwrap();
        assert_eq!(lots.len(), 1);
        assert_eq!(lots[0].lot_number, "AbC-42");
    }

    #[tokio::test]
    async fn test_guarded_delta_refuses_to_go_negative() {
        let fx = fixture().await;
        let lot = fx.receive(&fx.product, "L1", 90, 2).await;

        let mut conn = fx.db.pool().acquire().await.unwrap();
        assert!(!apply_delta_guarded(&mut conn, &lot.id, -3).await.unwrap());
        assert!(apply_delta_guarded(&mut conn, &lot.id, -2).await.unwrap());
        drop(conn);

        let lot = fx.db.lots().get(&fx.pharmacy.id, &lot.id).await.unwrap().unwrap();
        assert_eq!(lot.quantity, 0);
    }

    #[tokio::test]
    async fn test_lot_is_invisible_to_other_pharmacies() {
        let fx = fixture().await;
        let lot = fx.receive(&fx.product, "L1", 90, 2).await;
        let other = fx.db.pharmacies().create("org_other", "Other").await.unwrap();

        assert!(fx.db.lots().get(&other.id, &lot.id).await.unwrap().is_none());
        assert!(fx
            .db
            .lots()
            .find_by_number(&other.id, "L1")
            .await
            .unwrap()
            .is_empty());
    }
}
