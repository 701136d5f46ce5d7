//! # Expiry Commands
//!
//! Expiry risk report for the expiry dashboard.
//!
//! ## User Workflow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  Expiry risk                          [30d] [60d] [90d]         │
//! │  ┌───────────────────────────────────────────────────────────┐ │
//! │  │ Expired 0 │ ≤30d 1 │ 31-60d 1 │ 61-90d 0                  │ │
//! │  └───────────────────────────────────────────────────────────┘ │
//! │  LOT-001  Doliprane   D-9   CRITICAL  → Sell first (FEFO)      │
//! │  LOT-002  Doliprane   D-40  WATCH     → Keep an eye on it      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{authorized_pharmacy, Caller};
use crate::config::AppConfig;
use crate::error::ApiError;
use officine_core::expiry::{ExpiryFilters, ExpiryRiskReport, ExpiryWindow};
use officine_db::Database;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpiryRiskRequest {
    pub clerk_org_id: String,
    /// 30, 60 or 90; the configured default when absent.
    #[serde(default)]
    pub window_days: Option<i64>,
    #[serde(default)]
    pub filters: Option<ExpiryFilters>,
}

/// Builds the expiry risk report of the caller's pharmacy.
///
/// An invalid `windowDays` is a validation error. A caller outside the
/// organization gets an empty report, not an error.
pub async fn expiry_risk_report(
    db: &Database,
    config: &AppConfig,
    caller: &Caller,
    request: ExpiryRiskRequest,
) -> Result<ExpiryRiskReport, ApiError> {
    let window = match request.window_days {
        Some(days) => ExpiryWindow::try_from(days)?,
        None => config.default_window,
    };

    let Some(pharmacy) = authorized_pharmacy(db, caller, &request.clerk_org_id).await? else {
        return Ok(ExpiryRiskReport::empty(window));
    };

    let filters = request.filters.unwrap_or_default();
    debug!(pharmacy_id = %pharmacy.id, window_days = window.days(), ?filters, "expiry_risk_report");

    let report = db
        .expiry_reports()
        .risk_report(&pharmacy.id, Utc::now().date_naive(), window, &filters)
        .await?;

    Ok(report)
}
