//! # Lot Link Repository
//!
//! Join rows tying lots to the documents that moved them:
//! `procurement_item_lots` (what a delivery put into a lot) and
//! `sale_item_lots` (what a sale drew from it). Traceability sums these.

use sqlx::{SqliteConnection, SqlitePool};

use crate::error::DbResult;
use officine_core::{ProcurementItemLot, SaleItemLot};

/// Repository for lot join rows.
#[derive(Debug, Clone)]
pub struct LotLinkRepository {
    pool: SqlitePool,
}

impl LotLinkRepository {
    /// Creates a new LotLinkRepository.
    pub fn new(pool: SqlitePool) -> Self {
        LotLinkRepository { pool }
    }

    pub async fn receipts_for_lot(&self, lot_id: &str) -> DbResult<Vec<ProcurementItemLot>> {
        let rows = sqlx::query_as::<_, ProcurementItemLot>(
            r#"
            SELECT id, order_id, procurement_item_id, lot_id, quantity, expiry_date, created_at
            FROM procurement_item_lots
            WHERE lot_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(lot_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    pub async fn sales_for_lot(&self, lot_id: &str) -> DbResult<Vec<SaleItemLot>> {
        let rows = sqlx::query_as::<_, SaleItemLot>(
            r#"
            SELECT id, sale_id, sale_item_id, lot_id, quantity, expiry_date, created_at
            FROM sale_item_lots
            WHERE lot_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(lot_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Sale rows written for one sale, for callers checking what a sale drew.
    pub async fn sales_for_sale(&self, sale_id: &str) -> DbResult<Vec<SaleItemLot>> {
        let rows = sqlx::query_as::<_, SaleItemLot>(
            r#"
            SELECT id, sale_id, sale_item_id, lot_id, quantity, expiry_date, created_at
            FROM sale_item_lots
            WHERE sale_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}

pub(crate) async fn insert_receipt(conn: &mut SqliteConnection, row: &ProcurementItemLot) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO procurement_item_lots (
            id, order_id, procurement_item_id, lot_id, quantity, expiry_date, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&row.id)
    .bind(&row.order_id)
    .bind(&row.procurement_item_id)
    .bind(&row.lot_id)
    .bind(row.quantity)
    .bind(row.expiry_date)
    .bind(row.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn insert_sale(conn: &mut SqliteConnection, row: &SaleItemLot) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sale_item_lots (
            id, sale_id, sale_item_id, lot_id, quantity, expiry_date, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(&row.id)
    .bind(&row.sale_id)
    .bind(&row.sale_item_id)
    .bind(&row.lot_id)
    .bind(row.quantity)
    .bind(row.expiry_date)
    .bind(row.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
