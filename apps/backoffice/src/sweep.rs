//! # Maintenance Sweep
//!
//! Periodic pass over every pharmacy: brings the open low-stock draft back
//! in line when the low-stock set changed, and logs the expiry headline
//! numbers.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  for pharmacy in pharmacies                                             │
//! │       │                                                                 │
//! │       ├──► low_stock_summary ── draft open? ──► reconcile (signature)  │
//! │       │                                                                 │
//! │       └──► expiry_risk_report (default window) ──► info!(counts)       │
//! │                                                                         │
//! │  A failing pharmacy is logged and skipped; the others still run.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::{info, warn};

use crate::commands::expiry::{expiry_risk_report, ExpiryRiskRequest};
use crate::commands::low_stock::{low_stock_summary, LowStockSummaryRequest};
use crate::commands::Caller;
use crate::config::AppConfig;
use crate::error::ApiError;
use officine_core::expiry::ExpiryCounts;
use officine_core::Pharmacy;
use officine_db::Database;

/// Outcome of the sweep for one pharmacy.
#[derive(Debug, Clone)]
pub struct PharmacySweep {
    pub pharmacy_id: String,
    pub low_stock_count: i64,
    /// Draft rewritten by this sweep, if any.
    pub synced_draft: Option<String>,
    pub expiry: ExpiryCounts,
}

/// Runs the sweep over all pharmacies.
pub async fn run(db: &Database, config: &AppConfig) -> Result<Vec<PharmacySweep>, ApiError> {
    let pharmacies = db.pharmacies().list().await?;
    info!(pharmacies = pharmacies.len(), "Sweep started");

    let mut results = Vec::with_capacity(pharmacies.len());
    for pharmacy in &pharmacies {
        match sweep_pharmacy(db, config, pharmacy).await {
            Ok(result) => results.push(result),
            Err(e) => warn!(pharmacy_id = %pharmacy.id, error = %e, "Sweep failed for pharmacy"),
        }
    }

    info!(swept = results.len(), "Sweep finished");
    Ok(results)
}

async fn sweep_pharmacy(
    db: &Database,
    config: &AppConfig,
    pharmacy: &Pharmacy,
) -> Result<PharmacySweep, ApiError> {
    let caller = Caller::new(config.sweep_user_id.as_str(), Some(pharmacy.clerk_org_id.as_str()));

    let summary = low_stock_summary(
        db,
        &caller,
        LowStockSummaryRequest {
            clerk_org_id: pharmacy.clerk_org_id.clone(),
        },
    )
    .await?;

    let synced_draft = if summary.has_active_draft {
        db.replenishment().reconcile(&pharmacy.id).await?
    } else {
        None
    };

    let report = expiry_risk_report(
        db,
        config,
        &caller,
        ExpiryRiskRequest {
            clerk_org_id: pharmacy.clerk_org_id.clone(),
            window_days: None,
            filters: None,
        },
    )
    .await?;

    info!(
        pharmacy_id = %pharmacy.id,
        user_id = %caller.user_id,
        low_stock = summary.count,
        draft_synced = synced_draft.is_some(),
        expired = report.counts.expired,
        due_in_30_days = report.counts.due_in_30_days,
        due_in_60_days = report.counts.due_in_60_days,
        due_in_90_days = report.counts.due_in_90_days,
        "Pharmacy swept"
    );

    Ok(PharmacySweep {
        pharmacy_id: pharmacy.id.clone(),
        low_stock_count: summary.count,
        synced_draft,
        expiry: report.counts,
    })
}
