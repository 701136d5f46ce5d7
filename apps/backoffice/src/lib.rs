//! # Officine Back-office Library
//!
//! Command layer of the pharmacy back-office: tenant-scoped entry points
//! over the lot ledger, the expiry and traceability reports and the
//! low-stock replenishment draft.
//!
//! ## Module Organization
//! ```text
//! officine_backoffice/
//! ├── lib.rs          ◄─── You are here (logging, database bootstrap)
//! ├── config.rs       ◄─── Environment configuration
//! ├── error.rs        ◄─── API error type for commands
//! ├── sweep.rs        ◄─── Per-pharmacy maintenance pass
//! └── commands/
//!     ├── mod.rs          ◄─── Caller identity, tenant resolution
//!     ├── expiry.rs       ◄─── expiry_risk_report
//!     ├── traceability.rs ◄─── lot_traceability
//!     ├── low_stock.rs    ◄─── summary, create / sync draft
//!     └── ledger.rs       ◄─── receive, consume (FEFO), adjust
//! ```
//!
//! ## Tenant Scoping
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  request.clerkOrgId == caller.orgId ?                                  │
//! │        │ yes                               │ no                        │
//! │        ▼                                   ▼                           │
//! │  pharmacy for that org ?            reads:     empty result            │
//! │        │ yes          │ no          mutations: FORBIDDEN               │
//! │        ▼              └──────────────► (same as "no")                  │
//! │  run the command on pharmacy.id                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod config;
pub mod error;
pub mod sweep;

use directories::ProjectDirs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use config::{AppConfig, ConfigError};
use officine_db::{Database, DbConfig, DbResult};

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=officine_db=trace` - Show trace for the database crate only
/// - Default: INFO, DEBUG for officine crates
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,officine=debug,sqlx=warn"));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Determines the default database file path based on the platform.
///
/// ## Platform-Specific Paths
/// - **macOS**: `~/Library/Application Support/fr.officine.backoffice/officine.db`
/// - **Windows**: `%APPDATA%\officine\backoffice\officine.db`
/// - **Linux**: `~/.local/share/backoffice/officine.db`
///
/// `OFFICINE_DB_PATH` overrides this (see [`AppConfig::load`]).
pub fn get_database_path() -> Result<PathBuf, ConfigError> {
    let proj_dirs =
        ProjectDirs::from("fr", "officine", "backoffice").ok_or(ConfigError::NoDataDir)?;

    let data_dir = proj_dirs.data_dir();

    // Create directory if it doesn't exist
    std::fs::create_dir_all(data_dir)?;

    Ok(data_dir.join("officine.db"))
}

/// Opens the configured database and applies pending migrations.
pub async fn open_database(config: &AppConfig) -> DbResult<Database> {
    info!(db_path = ?config.db_path, "Opening database");

    let db = Database::new(
        DbConfig::new(&config.db_path).max_connections(config.db_max_connections),
    )
    .await?;

    info!("Database connected and migrations applied");
    Ok(db)
}

// =============================================================================
// Test Fixtures
// =============================================================================

#[cfg(test)]
pub(crate) mod test_support {
    use chrono::{Duration, Utc};
    use officine_core::{Pharmacy, Product, StockLot, Supplier};
    use officine_db::{Database, DbConfig, LotSource, NewProduct, ReceiveLot};

    use crate::commands::Caller;
    use crate::config::AppConfig;

    pub const ORG: &str = "org_centre";

    /// In-memory database with one pharmacy bound to [`ORG`], one supplier
    /// and one product (threshold 5).
    pub struct Fixture {
        pub db: Database,
        pub config: AppConfig,
        pub pharmacy: Pharmacy,
        pub supplier: Supplier,
        pub product: Product,
    }

    pub async fn fixture() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let pharmacy = db
            .pharmacies()
            .create(ORG, "Pharmacie du Centre")
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

        let config = AppConfig::load_from(|key| match key {
            "OFFICINE_DB_PATH" => Some(":memory:".to_string()),
            _ => None,
        })
        .unwrap();

        Fixture {
            db,
            config,
            pharmacy,
            supplier,
            product,
        }
    }

    impl Fixture {
        /// A member of the pharmacy's organization.
        pub fn member(&self) -> Caller {
            Caller::new("user_1", Some(ORG))
        }

        /// A signed-in user of another organization.
        pub fn outsider(&self) -> Caller {
            Caller::new("user_2", Some("org_other"))
        }

        pub async fn receive(&self, lot_number: &str, in_days: i64, quantity: i64) -> StockLot {
            self.db
                .ledger()
                .receive_lot(
                    &self.pharmacy.id,
                    None,
                    &ReceiveLot {
                        product_id: self.product.id.clone(),
                        lot_number: lot_number.to_string(),
                        expiry_date: Utc::now().date_naive() + Duration::days(in_days),
                        quantity,
                        source: LotSource::initial_stock(),
                        reason: None,
                    },
                )
                .await
                .unwrap()
        }
    }
}
