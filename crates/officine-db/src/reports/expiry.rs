//! # Expiry Risk Report (query side)
//!
//! Loads in-window lots joined with their product and originating order,
//! then hands them to [`officine_core::expiry::build_report`].
//!
//! ## Joins
//! ```text
//! stock_lots l
//!   LEFT JOIN products p            ON p.id = l.product_id      AND same pharmacy
//!   LEFT JOIN procurement_orders o  ON o.id = l.source_order_id AND same pharmacy
//!   LEFT JOIN suppliers s           ON s.id = o.supplier_id     AND same pharmacy
//! ```
//! LEFT joins keep lots whose product or order cannot be resolved; the core
//! decides whether to drop them. Reads run outside any transaction and may
//! be slightly stale.

use chrono::{Duration, NaiveDate};
use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use officine_core::expiry::{build_report, ExpiryCandidate, ExpiryFilters, ExpiryRiskReport, ExpiryWindow};

#[derive(Debug, sqlx::FromRow)]
struct CandidateRow {
    lot_id: String,
    lot_number: String,
    product_id: String,
    product_name: Option<String>,
    category: Option<String>,
    expiry_date: NaiveDate,
    quantity: i64,
    source_order_id: Option<String>,
    resolved_order_id: Option<String>,
    supplier_id: Option<String>,
    supplier_name: Option<String>,
}

impl From<CandidateRow> for ExpiryCandidate {
    fn from(row: CandidateRow) -> Self {
        ExpiryCandidate {
            lot_id: row.lot_id,
            lot_number: row.lot_number,
            product_id: row.product_id,
            product_name: row.product_name,
            category: row.category,
            expiry_date: row.expiry_date,
            quantity: row.quantity,
            source_order_id: row.source_order_id,
            order_resolved: row.resolved_order_id.is_some(),
            supplier_id: row.supplier_id,
            supplier_name: row.supplier_name,
        }
    }
}

/// Expiry report service.
#[derive(Debug, Clone)]
pub struct ExpiryReports {
    pool: SqlitePool,
}

impl ExpiryReports {
    /// Creates a new ExpiryReports.
    pub fn new(pool: SqlitePool) -> Self {
        ExpiryReports { pool }
    }

    /// Builds the expiry risk report of a pharmacy as of `today`.
    pub async fn risk_report(
        &self,
        pharmacy_id: &str,
        today: NaiveDate,
        window: ExpiryWindow,
        filters: &ExpiryFilters,
    ) -> DbResult<ExpiryRiskReport> {
        let candidates = self.candidates(pharmacy_id, today, window).await?;
        let report = build_report(&candidates, today, window, filters);

        debug!(
            pharmacy_id = %pharmacy_id,
            window_days = window.days(),
            candidates = candidates.len(),
            items = report.items.len(),
            "Expiry report built"
        );

        Ok(report)
    }

    /// Lots with stock expiring on or before `today + window`.
    async fn candidates(
        &self,
        pharmacy_id: &str,
        today: NaiveDate,
        window: ExpiryWindow,
    ) -> DbResult<Vec<ExpiryCandidate>> {
        let horizon = today + Duration::days(window.days());

        let rows = sqlx::query_as::<_, CandidateRow>(
            r#"
            SELECT
                l.id              AS lot_id,
                l.lot_number      AS lot_number,
                l.product_id      AS product_id,
                p.name            AS product_name,
                p.category        AS category,
                l.expiry_date     AS expiry_date,
                l.quantity        AS quantity,
                l.source_order_id AS source_order_id,
                o.id              AS resolved_order_id,
                s.id              AS supplier_id,
                s.name            AS supplier_name
            FROM stock_lots l
            LEFT JOIN products p
                ON p.id = l.product_id AND p.pharmacy_id = l.pharmacy_id
            LEFT JOIN procurement_orders o
                ON o.id = l.source_order_id AND o.pharmacy_id = l.pharmacy_id
            LEFT JOIN suppliers s
                ON s.id = o.supplier_id AND s.pharmacy_id = l.pharmacy_id
            WHERE l.pharmacy_id = ?1
              AND l.quantity > 0
              AND l.expiry_date <= ?2
            "#,
        )
        .bind(pharmacy_id)
        .bind(horizon)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ExpiryCandidate::from).collect())
    }
}
