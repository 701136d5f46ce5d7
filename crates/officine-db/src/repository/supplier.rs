//! # Supplier Repository

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use officine_core::{new_id, Supplier};

/// Repository for supplier database operations.
#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    /// Creates a new SupplierRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    pub async fn create(&self, pharmacy_id: &str, name: &str) -> DbResult<Supplier> {
        debug!(pharmacy_id = %pharmacy_id, name = %name, "Creating supplier");

        let supplier = Supplier {
            id: new_id(),
            pharmacy_id: pharmacy_id.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO suppliers (id, pharmacy_id, name, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&supplier.id)
        .bind(&supplier.pharmacy_id)
        .bind(&supplier.name)
        .bind(supplier.created_at)
        .execute(&self.pool)
        .await?;

        Ok(supplier)
    }

    /// Gets a supplier of `pharmacy_id`; suppliers of other pharmacies are
    /// reported as missing.
    pub async fn get(&self, pharmacy_id: &str, id: &str) -> DbResult<Option<Supplier>> {
        let mut conn = self.pool.acquire().await?;
        find_in_pharmacy(&mut conn, pharmacy_id, id).await
    }

    pub async fn list(&self, pharmacy_id: &str) -> DbResult<Vec<Supplier>> {
        let suppliers = sqlx::query_as::<_, Supplier>(
            r#"
            SELECT id, pharmacy_id, name, created_at
            FROM suppliers
            WHERE pharmacy_id = ?1
            ORDER BY name, id
            "#,
        )
        .bind(pharmacy_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(suppliers)
    }
}

pub(crate) async fn find_in_pharmacy(
    conn: &mut SqliteConnection,
    pharmacy_id: &str,
    id: &str,
) -> DbResult<Option<Supplier>> {
    let supplier = sqlx::query_as::<_, Supplier>(
        r#"
        SELECT id, pharmacy_id, name, created_at
        FROM suppliers
        WHERE id = ?1 AND pharmacy_id = ?2
        "#,
    )
    .bind(id)
    .bind(pharmacy_id)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(supplier)
}

#[cfg(test)]
mod tests {
    use crate::test_support::fixture;

    #[tokio::test]
    async fn test_supplier_is_tenant_scoped() {
        let fx = fixture().await;
        let other = fx.db.pharmacies().create("org_other", "Other").await.unwrap();

        assert!(fx
            .db
            .suppliers()
            .get(&fx.pharmacy.id, &fx.supplier.id)
            .await
            .unwrap()
            .is_some());
        assert!(fx
            .db
            .suppliers()
            .get(&other.id, &fx.supplier.id)
            .await
            .unwrap()
            .is_none());
        assert_eq!(fx.db.suppliers().list(&fx.pharmacy.id).await.unwrap().len(), 1);
    }
}
