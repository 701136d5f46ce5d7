//! # Procurement Repository
//!
//! Purchase orders and delivery notes with their lines.
//!
//! ## Order Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  DRAFT ──► ORDERED ──► RECEIVED                                        │
//! │    │                                                                    │
//! │    └──► CANCELLED                                                       │
//! │                                                                         │
//! │  Only DRAFT purchase orders are rewritten by the low-stock sync.       │
//! │  Once confirmed, the order is left alone and the alert state pointing  │
//! │  at it goes stale (read as "no active draft").                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use officine_core::{new_id, OrderStatus, OrderType, ProcurementItem, ProcurementOrder};

const ORDER_COLUMNS: &str =
    "id, pharmacy_id, supplier_id, order_type, status, note, created_at, updated_at";

const ITEM_COLUMNS: &str = "id, order_id, product_id, quantity, unit_price_cents, created_at";

/// Repository for procurement orders and their lines.
#[derive(Debug, Clone)]
pub struct ProcurementRepository {
    pool: SqlitePool,
}

impl ProcurementRepository {
    /// Creates a new ProcurementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProcurementRepository { pool }
    }

    /// Creates an empty order in DRAFT status.
    pub async fn create_order(
        &self,
        pharmacy_id: &str,
        supplier_id: Option<&str>,
        order_type: OrderType,
        note: Option<&str>,
    ) -> DbResult<ProcurementOrder> {
        let order = new_order(pharmacy_id, supplier_id, order_type, note);
        let mut conn = self.pool.acquire().await?;
        insert_order(&mut conn, &order).await?;
        Ok(order)
    }

    /// Gets an order of `pharmacy_id`; orders of other pharmacies are
    /// reported as missing.
    pub async fn get_order(&self, pharmacy_id: &str, id: &str) -> DbResult<Option<ProcurementOrder>> {
        let mut conn = self.pool.acquire().await?;
        find_order(&mut conn, pharmacy_id, id).await
    }

    pub async fn list_items(&self, order_id: &str) -> DbResult<Vec<ProcurementItem>> {
        let mut conn = self.pool.acquire().await?;
        list_items(&mut conn, order_id).await
    }

    /// Adds a line to an order.
    pub async fn add_item(
        &self,
        order_id: &str,
        product_id: &str,
        quantity: i64,
        unit_price_cents: i64,
    ) -> DbResult<ProcurementItem> {
        let item = ProcurementItem {
            id: new_id(),
            order_id: order_id.to_string(),
            product_id: product_id.to_string(),
            quantity,
            unit_price_cents,
            created_at: Utc::now(),
        };
        let mut conn = self.pool.acquire().await?;
        insert_item(&mut conn, &item).await?;
        Ok(item)
    }

    /// Sets the ordered quantity of a line (the pharmacist filling in a
    /// draft).
    pub async fn set_item_quantity(&self, item_id: &str, quantity: i64) -> DbResult<()> {
        debug!(item_id = %item_id, quantity = quantity, "Updating order line quantity");

        let result = sqlx::query("UPDATE procurement_items SET quantity = ?2 WHERE id = ?1")
            .bind(item_id)
            .bind(quantity)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("ProcurementItem", item_id));
        }

        Ok(())
    }

    /// Changes an order's status (confirming or cancelling a draft).
    pub async fn set_status(&self, pharmacy_id: &str, id: &str, status: OrderStatus) -> DbResult<()> {
        debug!(id = %id, status = ?status, "Updating order status");

        let result = sqlx::query(
            "UPDATE procurement_orders SET status = ?3, updated_at = ?4 WHERE id = ?1 AND pharmacy_id = ?2",
        )
        .bind(id)
        .bind(pharmacy_id)
        .bind(status)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("ProcurementOrder", id));
        }

        Ok(())
    }

    /// Deletes an order and (by cascade) its lines.
    pub async fn delete_order(&self, pharmacy_id: &str, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting order");

        let result = sqlx::query("DELETE FROM procurement_orders WHERE id = ?1 AND pharmacy_id = ?2")
            .bind(id)
            .bind(pharmacy_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("ProcurementOrder", id));
        }

        Ok(())
    }
}

/// Builds a new DRAFT order record.
pub(crate) fn new_order(
    pharmacy_id: &str,
    supplier_id: Option<&str>,
    order_type: OrderType,
    note: Option<&str>,
) -> ProcurementOrder {
    let now = Utc::now();
    ProcurementOrder {
        id: new_id(),
        pharmacy_id: pharmacy_id.to_string(),
        supplier_id: supplier_id.map(str::to_string),
        order_type,
        status: OrderStatus::Draft,
        note: note.map(str::to_string),
        created_at: now,
        updated_at: now,
    }
}

// =============================================================================
// Connection-level queries (usable inside a transaction)
// =============================================================================

pub(crate) async fn insert_order(conn: &mut SqliteConnection, order: &ProcurementOrder) -> DbResult<()> {
    debug!(id = %order.id, order_type = ?order.order_type, "Inserting order");

    sqlx::query(
        r#"
        INSERT INTO procurement_orders (
            id, pharmacy_id, supplier_id, order_type, status, note, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(&order.id)
    .bind(&order.pharmacy_id)
    .bind(&order.supplier_id)
    .bind(order.order_type)
    .bind(order.status)
    .bind(&order.note)
    .bind(order.created_at)
    .bind(order.updated_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

pub(crate) async fn find_order(
    conn: &mut SqliteConnection,
    pharmacy_id: &str,
    id: &str,
) -> DbResult<Option<ProcurementOrder>> {
    let order = sqlx::query_as::<_, ProcurementOrder>(&format!(
        "SELECT {} FROM procurement_orders WHERE id = ?1 AND pharmacy_id = ?2",
        ORDER_COLUMNS
    ))
    .bind(id)
    .bind(pharmacy_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(order)
}

pub(crate) async fn list_items(
    conn: &mut SqliteConnection,
    order_id: &str,
) -> DbResult<Vec<ProcurementItem>> {
    let items = sqlx::query_as::<_, ProcurementItem>(&format!(
        "SELECT {} FROM procurement_items WHERE order_id = ?1 ORDER BY created_at, id",
        ITEM_COLUMNS
    ))
    .bind(order_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(items)
}

pub(crate) async fn insert_item(conn: &mut SqliteConnection, item: &ProcurementItem) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO procurement_items (id, order_id, product_id, quantity, unit_price_cents, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(&item.id)
    .bind(&item.order_id)
    .bind(&item.product_id)
    .bind(item.quantity)
    .bind(item.unit_price_cents)
    .bind(item.created_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Removes every line of an order. Returns how many were removed.
pub(crate) async fn delete_items(conn: &mut SqliteConnection, order_id: &str) -> DbResult<u64> {
    let result = sqlx::query("DELETE FROM procurement_items WHERE order_id = ?1")
        .bind(order_id)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected())
}

pub(crate) async fn touch_order(conn: &mut SqliteConnection, id: &str) -> DbResult<()> {
    sqlx::query("UPDATE procurement_orders SET updated_at = ?2 WHERE id = ?1")
        .bind(id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixture;

    #[tokio::test]
    async fn test_order_lines_round_trip() {
        let fx = fixture().await;
        let order = fx
            .db
            .procurement()
            .create_order(&fx.pharmacy.id, Some(&fx.supplier.id), OrderType::PurchaseOrder, None)
            .await
            .unwrap();
        fx.db
            .procurement()
            .add_item(&order.id, &fx.product.id, 12, 310)
            .await
            .unwrap();

        let loaded = fx
            .db
            .procurement()
            .get_order(&fx.pharmacy.id, &order.id)
            .await
            .unwrap()
            .unwrap();
        assert!(loaded.is_draft_purchase_order());

        let items = fx.db.procurement().list_items(&order.id).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 12);
    }

    #[tokio::test]
    async fn test_delete_cascades_to_lines() {
        let fx = fixture().await;
        let order = fx
            .db
            .procurement()
            .create_order(&fx.pharmacy.id, None, OrderType::PurchaseOrder, None)
            .await
            .unwrap();
        fx.db
            .procurement()
            .add_item(&order.id, &fx.product.id, 1, 1)
            .await
            .unwrap();

        fx.db
            .procurement()
            .delete_order(&fx.pharmacy.id, &order.id)
            .await
            .unwrap();

        assert!(fx.db.procurement().list_items(&order.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_status_change_is_tenant_scoped() {
        let fx = fixture().await;
        let order = fx
            .db
            .procurement()
            .create_order(&fx.pharmacy.id, None, OrderType::PurchaseOrder, None)
            .await
            .unwrap();

        let err = fx
            .db
            .procurement()
            .set_status("another-pharmacy", &order.id, OrderStatus::Ordered)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
