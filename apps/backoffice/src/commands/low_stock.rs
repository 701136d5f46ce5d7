//! # Low-Stock Commands
//!
//! The low-stock banner and its single replenishment draft.
//!
//! ## Banner Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  low_stock_summary ──► { count: 3, signature, hasActiveDraft: false }  │
//! │       │                                                                 │
//! │       ├── no draft ──► [Create order] ──► create_low_stock_draft       │
//! │       │                                    (refused if a draft exists) │
//! │       │                                                                 │
//! │       └── draft    ──► [Update order] ──► sync_low_stock_draft         │
//! │                                            (quantities kept)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{authorized_pharmacy, require_pharmacy, Caller};
use crate::error::ApiError;
use officine_core::low_stock::LowStockSummary;
use officine_db::Database;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LowStockSummaryRequest {
    pub clerk_org_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLowStockDraftRequest {
    pub clerk_org_id: String,
    pub supplier_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncLowStockDraftRequest {
    pub clerk_org_id: String,
    pub order_id: String,
}

/// Count and signature of the low-stock set, plus whether a draft is open.
pub async fn low_stock_summary(
    db: &Database,
    caller: &Caller,
    request: LowStockSummaryRequest,
) -> Result<LowStockSummary, ApiError> {
    let Some(pharmacy) = authorized_pharmacy(db, caller, &request.clerk_org_id).await? else {
        return Ok(LowStockSummary::empty());
    };

    let summary = db.replenishment().summary(&pharmacy.id).await?;
    debug!(pharmacy_id = %pharmacy.id, count = summary.count, "low_stock_summary");

    Ok(summary)
}

/// Opens the replenishment draft for `supplierId`.
///
/// ## Returns
/// The new order id, or a business error when a draft is already open.
pub async fn create_low_stock_draft(
    db: &Database,
    caller: &Caller,
    request: CreateLowStockDraftRequest,
) -> Result<String, ApiError> {
    let pharmacy = require_pharmacy(db, caller, &request.clerk_org_id).await?;

    if let Some(existing) = db.replenishment().active_draft(&pharmacy.id).await? {
        return Err(ApiError::business(format!(
            "A low-stock draft is already open: {}",
            existing.id
        )));
    }

    let order_id = db
        .replenishment()
        .create_draft(&pharmacy.id, &request.supplier_id)
        .await?;

    info!(
        pharmacy_id = %pharmacy.id,
        user_id = %caller.user_id,
        order_id = %order_id,
        "create_low_stock_draft"
    );

    Ok(order_id)
}

/// Brings draft `orderId` in line with the current low-stock set.
///
/// ## Returns
/// The order id, or `None` when the order is not an open draft purchase
/// order of this pharmacy.
pub async fn sync_low_stock_draft(
    db: &Database,
    caller: &Caller,
    request: SyncLowStockDraftRequest,
) -> Result<Option<String>, ApiError> {
    let pharmacy = require_pharmacy(db, caller, &request.clerk_org_id).await?;

    let synced = db
        .replenishment()
        .sync_draft(&pharmacy.id, &request.order_id)
        .await?;

    debug!(
        pharmacy_id = %pharmacy.id,
        user_id = %caller.user_id,
        order_id = %request.order_id,
        synced = synced.is_some(),
        "sync_low_stock_draft"
    );

    Ok(synced)
}
