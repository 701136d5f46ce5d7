//! # Pharmacy Repository
//!
//! Tenants. Commands resolve the caller's organization id to a pharmacy
//! before touching anything else.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use officine_core::{new_id, Pharmacy};

const PHARMACY_COLUMNS: &str = "id, clerk_org_id, name, created_at, updated_at";

/// Repository for pharmacy database operations.
#[derive(Debug, Clone)]
pub struct PharmacyRepository {
    pool: SqlitePool,
}

impl PharmacyRepository {
    /// Creates a new PharmacyRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PharmacyRepository { pool }
    }

    /// Creates a pharmacy for an organization.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - the organization already has one
    pub async fn create(&self, clerk_org_id: &str, name: &str) -> DbResult<Pharmacy> {
        debug!(clerk_org_id = %clerk_org_id, "Creating pharmacy");

        let now = Utc::now();
        let pharmacy = Pharmacy {
            id: new_id(),
            clerk_org_id: clerk_org_id.to_string(),
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO pharmacies (id, clerk_org_id, name, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&pharmacy.id)
        .bind(&pharmacy.clerk_org_id)
        .bind(&pharmacy.name)
        .bind(pharmacy.created_at)
        .bind(pharmacy.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(pharmacy)
    }

    /// Resolves an organization id to its pharmacy.
    ///
    /// `Ok(None)` is the normal answer for an unknown organization.
    pub async fn get_by_clerk_org_id(&self, clerk_org_id: &str) -> DbResult<Option<Pharmacy>> {
        debug!(clerk_org_id = %clerk_org_id, "Resolving pharmacy");

        let pharmacy = sqlx::query_as::<_, Pharmacy>(&format!(
            "SELECT {} FROM pharmacies WHERE clerk_org_id = ?1",
            PHARMACY_COLUMNS
        ))
        .bind(clerk_org_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(pharmacy)
    }

    /// All pharmacies, oldest first. Used by the sweep.
    pub async fn list(&self) -> DbResult<Vec<Pharmacy>> {
        let pharmacies = sqlx::query_as::<_, Pharmacy>(&format!(
            "SELECT {} FROM pharmacies ORDER BY created_at, id",
            PHARMACY_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(pharmacies)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::DbError;
    use crate::{Database, DbConfig};

    #[tokio::test]
    async fn test_create_and_resolve_by_org() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let created = db
            .pharmacies()
            .create("org_abc", "Pharmacie du Centre")
            .await
            .unwrap();

        let found = db
            .pharmacies()
            .get_by_clerk_org_id("org_abc")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, created.id);
        assert!(db
            .pharmacies()
            .get_by_clerk_org_id("org_other")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_one_pharmacy_per_org() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        db.pharmacies().create("org_abc", "A").await.unwrap();

        let err = db.pharmacies().create("org_abc", "B").await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }
}
