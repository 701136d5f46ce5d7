//! # Low-Stock Alert State Repository
//!
//! One row per pharmacy remembering which draft purchase order the
//! low-stock synchronizer owns, and the signature it was last synced at.
//!
//! The row is written only by the replenishment service, inside the same
//! transaction as the draft it describes.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use officine_core::LowStockAlertState;

/// Repository for alert state reads.
#[derive(Debug, Clone)]
pub struct AlertStateRepository {
    pool: SqlitePool,
}

impl AlertStateRepository {
    /// Creates a new AlertStateRepository.
    pub fn new(pool: SqlitePool) -> Self {
        AlertStateRepository { pool }
    }

    pub async fn get(&self, pharmacy_id: &str) -> DbResult<Option<LowStockAlertState>> {
        let mut conn = self.pool.acquire().await?;
        find(&mut conn, pharmacy_id).await
    }
}

pub(crate) async fn find(
    conn: &mut SqliteConnection,
    pharmacy_id: &str,
) -> DbResult<Option<LowStockAlertState>> {
    let state = sqlx::query_as::<_, LowStockAlertState>(
        r#"
        SELECT pharmacy_id, order_id, signature, updated_at
        FROM low_stock_alert_states
        WHERE pharmacy_id = ?1
        "#,
    )
    .bind(pharmacy_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(state)
}

/// Points the pharmacy's alert state at `order_id` / `signature`.
pub(crate) async fn upsert(
    conn: &mut SqliteConnection,
    pharmacy_id: &str,
    order_id: &str,
    signature: &str,
) -> DbResult<()> {
    debug!(pharmacy_id = %pharmacy_id, order_id = %order_id, "Saving low-stock alert state");

    sqlx::query(
        r#"
        INSERT INTO low_stock_alert_states (pharmacy_id, order_id, signature, updated_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(pharmacy_id) DO UPDATE SET
            order_id = excluded.order_id,
            signature = excluded.signature,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(pharmacy_id)
    .bind(order_id)
    .bind(signature)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}
