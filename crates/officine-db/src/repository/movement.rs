//! # Stock Movement Repository
//!
//! Append-only movement log. No update or delete is exposed and the schema
//! rejects both with triggers.

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use officine_core::StockMovement;

const MOVEMENT_COLUMNS: &str = r#"
    id, pharmacy_id, product_id, product_name_snapshot, delta, movement_type,
    lot_number, lot_expiry_date, reason, source_id, created_by_user_id, created_at
"#;

/// Repository for movement log reads.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    /// Creates a new MovementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Movements of a product, oldest first.
    pub async fn list_for_product(&self, product_id: &str) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(&format!(
            "SELECT {} FROM stock_movements WHERE product_id = ?1 ORDER BY created_at, id",
            MOVEMENT_COLUMNS
        ))
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Movements tagged with one lot of one product (lot number compared
    /// ignoring case), oldest first.
    pub async fn list_for_lot(
        &self,
        pharmacy_id: &str,
        product_id: &str,
        lot_number: &str,
    ) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(&format!(
            r#"
            SELECT {} FROM stock_movements
            WHERE pharmacy_id = ?1
              AND product_id = ?2
              AND lot_number = ?3 COLLATE NOCASE
            ORDER BY created_at, id
            "#,
            MOVEMENT_COLUMNS
        ))
        .bind(pharmacy_id)
        .bind(product_id)
        .bind(lot_number)
        .fetch_all(&self.pool)
        .await?;

        Ok(movements)
    }

    /// Net of all deltas recorded for a product.
    pub async fn net_delta(&self, product_id: &str) -> DbResult<i64> {
        let net: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(delta), 0) FROM stock_movements WHERE product_id = ?1",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(net)
    }
}

pub(crate) async fn insert(conn: &mut SqliteConnection, movement: &StockMovement) -> DbResult<()> {
    debug!(
        product_id = %movement.product_id,
        delta = movement.delta,
        movement_type = ?movement.movement_type,
        "Appending stock movement"
    );

    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            id, pharmacy_id, product_id, product_name_snapshot, delta, movement_type,
            lot_number, lot_expiry_date, reason, source_id, created_by_user_id, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.pharmacy_id)
    .bind(&movement.product_id)
    .bind(&movement.product_name_snapshot)
    .bind(movement.delta)
    .bind(movement.movement_type)
    .bind(&movement.lot_number)
    .bind(movement.lot_expiry_date)
    .bind(&movement.reason)
    .bind(&movement.source_id)
    .bind(&movement.created_by_user_id)
    .bind(movement.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
