//! # Ledger Commands
//!
//! Stock mutations at lot level: reception, counter consumption (FEFO) and
//! manual corrections. Each one is a single database transaction.
//!
//! ## Consumption Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  consume_lots { productId, quantity: 5, sale }                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Lots by expiry:  LOT-A (exp. March, 3)   LOT-B (exp. June, 10)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Draws:           LOT-A -3                LOT-B -2                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  One SALE_SYNC movement + one sale_item_lots row per draw              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{require_pharmacy, Caller};
use crate::error::ApiError;
use officine_core::fefo::LotDraw;
use officine_core::StockLot;
use officine_db::{AdjustLot, ConsumeLots, Database, ReceiveLot};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveLotRequest {
    pub clerk_org_id: String,
    #[serde(flatten)]
    pub lot: ReceiveLot,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsumeLotsRequest {
    pub clerk_org_id: String,
    #[serde(flatten)]
    pub consumption: ConsumeLots,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustLotRequest {
    pub clerk_org_id: String,
    #[serde(flatten)]
    pub adjustment: AdjustLot,
}

/// Receives goods into a lot (creating it or topping it up).
pub async fn receive_lot(
    db: &Database,
    caller: &Caller,
    request: ReceiveLotRequest,
) -> Result<StockLot, ApiError> {
    let pharmacy = require_pharmacy(db, caller, &request.clerk_org_id).await?;

    let lot = db
        .ledger()
        .receive_lot(&pharmacy.id, Some(caller.user_id.as_str()), &request.lot)
        .await?;

    info!(
        pharmacy_id = %pharmacy.id,
        lot_id = %lot.id,
        quantity = request.lot.quantity,
        "receive_lot"
    );

    Ok(lot)
}

/// Consumes stock of a product, earliest expiry first.
///
/// ## Returns
/// The lots drawn from, in consumption order.
pub async fn consume_lots(
    db: &Database,
    caller: &Caller,
    request: ConsumeLotsRequest,
) -> Result<Vec<LotDraw>, ApiError> {
    let pharmacy = require_pharmacy(db, caller, &request.clerk_org_id).await?;

    let draws = db
        .ledger()
        .consume_fefo(&pharmacy.id, Some(caller.user_id.as_str()), &request.consumption)
        .await?;

    info!(
        pharmacy_id = %pharmacy.id,
        product_id = %request.consumption.product_id,
        quantity = request.consumption.quantity,
        lots = draws.len(),
        "consume_lots"
    );

    Ok(draws)
}

/// Applies a signed correction to one lot.
pub async fn adjust_lot(
    db: &Database,
    caller: &Caller,
    request: AdjustLotRequest,
) -> Result<StockLot, ApiError> {
    let pharmacy = require_pharmacy(db, caller, &request.clerk_org_id).await?;

    let lot = db
        .ledger()
        .adjust_lot(&pharmacy.id, Some(caller.user_id.as_str()), &request.adjustment)
        .await?;

    info!(
        pharmacy_id = %pharmacy.id,
        lot_id = %lot.id,
        delta = request.adjustment.delta,
        "adjust_lot"
    );

    Ok(lot)
}
