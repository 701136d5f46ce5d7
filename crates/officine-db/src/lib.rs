//! # officine-db: Database Layer for Officine
//!
//! This crate provides database access for the pharmacy back-office.
//! It uses SQLite for storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Officine Data Flow                               │
//! │                                                                         │
//! │  Back-office command (expiry_risk_report, receive_lot, ...)            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   officine-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────┐  ┌──────────────┐  ┌──────────────────────┐ │   │
//! │  │   │   Database   │  │ Repositories │  │      Services        │ │   │
//! │  │   │  (pool.rs)   │  │              │  │                      │ │   │
//! │  │   │              │  │ lots         │  │ Ledger (tx)          │ │   │
//! │  │   │ SqlitePool   │◄─│ movements    │◄─│ Replenishment (tx)   │ │   │
//! │  │   │ Migrations   │  │ procurement  │  │ ExpiryReports        │ │   │
//! │  │   │              │  │ ...          │  │ LotTraceability      │ │   │
//! │  │   └──────────────┘  └──────────────┘  └──────────────────────┘ │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Table-level repositories
//! - [`ledger`] - Receive / consume (FEFO) / adjust, one transaction each
//! - [`reports`] - Expiry risk and lot traceability
//! - [`replenishment`] - Low-stock summary and draft order sync
//!
//! ## Usage
//!
//! ```rust,ignore
//! use officine_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/officine.db")).await?;
//!
//! let summary = db.replenishment().summary(&pharmacy.id).await?;
//! if summary.has_active_draft {
//!     db.replenishment().reconcile(&pharmacy.id).await?;
//! }
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod replenishment;
pub mod reports;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use ledger::{AdjustLot, AdjustmentKind, ConsumeLots, Ledger, LotSource, ReceiveLot, SaleRef};
pub use replenishment::Replenishment;
pub use reports::expiry::ExpiryReports;
pub use reports::traceability::LotTraceability;
pub use repository::product::NewProduct;

// =============================================================================
// Test Fixtures
// =============================================================================

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Duration, NaiveDate, Utc};
    use officine_core::{Pharmacy, Product, StockLot, Supplier};

    use crate::ledger::{AdjustLot, AdjustmentKind, LotSource, ReceiveLot};
    use crate::repository::product::NewProduct;
    use crate::{Database, DbConfig};

    /// A migrated in-memory database with one pharmacy, one supplier and
    /// one product (threshold 5, no stock yet).
    pub struct Fixture {
        pub db: Database,
        pub pharmacy: Pharmacy,
        pub supplier: Supplier,
        pub product: Product,
    }

    pub async fn fixture() -> Fixture {
        fixture_with(DbConfig::in_memory()).await
    }

    /// Same seed data on a database opened with `config`.
    pub async fn fixture_with(config: DbConfig) -> Fixture {
        let db = Database::new(config).await.unwrap();
        let pharmacy = db
            .pharmacies()
            .create("org_centre", "Pharmacie du Centre")
            .await
            .unwrap();
        let supplier = db.suppliers().create(&pharmacy.id, "CERP Rouen").await.unwrap();
        let product = db
            .products()
            .create(NewProduct {
                pharmacy_id: pharmacy.id.clone(),
                name: "Doliprane 1000mg".to_string(),
                category: Some("antalgique".to_string()),
                purchase_price_cents: 150,
                sale_price_cents: 290,
                low_stock_threshold: 5,
            })
            .await
            .unwrap();

        Fixture {
            db,
            pharmacy,
            supplier,
            product,
        }
    }

    impl Fixture {
        pub fn today() -> NaiveDate {
            Utc::now().date_naive()
        }

        pub async fn add_product(&self, name: &str, threshold: i64, price_cents: i64) -> Product {
            self.db
                .products()
                .create(NewProduct {
                    pharmacy_id: self.pharmacy.id.clone(),
                    name: name.to_string(),
                    category: Some("antalgique".to_string()),
                    purchase_price_cents: price_cents,
                    sale_price_cents: price_cents * 2,
                    low_stock_threshold: threshold,
                })
                .await
                .unwrap()
        }

        /// Opening stock into lot `lot_number`, expiring in `in_days` days.
        pub async fn receive(
            &self,
            product: &Product,
            lot_number: &str,
            in_days: i64,
            quantity: i64,
        ) -> StockLot {
            self.db
                .ledger()
                .receive_lot(
                    &self.pharmacy.id,
                    None,
                    &ReceiveLot {
                        product_id: product.id.clone(),
                        lot_number: lot_number.to_string(),
                        expiry_date: Self::today() + Duration::days(in_days),
                        quantity,
                        source: LotSource::initial_stock(),
                        reason: None,
                    },
                )
                .await
                .unwrap()
        }

        /// Stocktake correction of one lot.
        pub async fn adjust(&self, lot: &StockLot, delta: i64) -> StockLot {
            self.db
                .ledger()
                .adjust_lot(
                    &self.pharmacy.id,
                    None,
                    &AdjustLot {
                        lot_id: lot.id.clone(),
                        delta,
                        reason: "Stocktake".to_string(),
                        kind: AdjustmentKind::Stocktake,
                        reference: None,
                    },
                )
                .await
                .unwrap()
        }

        pub async fn reload(&self, product: &Product) -> Product {
            self.db
                .products()
                .get_by_id(&product.id)
                .await
                .unwrap()
                .unwrap()
        }
    }
}
