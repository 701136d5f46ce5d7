//! # Traceability Commands
//!
//! Lot recall lookup: every product carrying a lot number, its receptions,
//! sales and adjustments.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{authorized_pharmacy, Caller};
use crate::error::ApiError;
use officine_core::traceability::{normalize_lot_query, TraceabilityReport};
use officine_db::Database;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotTraceabilityRequest {
    pub clerk_org_id: String,
    pub lot_number: String,
}

/// Traces a lot number across the caller's pharmacy.
///
/// A blank lot number returns an empty report without touching the
/// database, as does a caller outside the organization.
pub async fn lot_traceability(
    db: &Database,
    caller: &Caller,
    request: LotTraceabilityRequest,
) -> Result<TraceabilityReport, ApiError> {
    let Some(query) = normalize_lot_query(&request.lot_number) else {
        return Ok(TraceabilityReport::empty(""));
    };

    let Some(pharmacy) = authorized_pharmacy(db, caller, &request.clerk_org_id).await? else {
        return Ok(TraceabilityReport::empty(query));
    };

    debug!(pharmacy_id = %pharmacy.id, lot_number = %query, "lot_traceability");

    Ok(db.traceability().trace(&pharmacy.id, &query).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{fixture, ORG};

    fn request(lot_number: &str) -> LotTraceabilityRequest {
        LotTraceabilityRequest {
            clerk_org_id: ORG.to_string(),
            lot_number: lot_number.to_string(),
        }
    }

    #[tokio::test]
    async fn test_member_traces_lot() {
        let fx = fixture().await;
        fx.receive("AbC-42", 120, 10).await;

        let report = lot_traceability(&fx.db, &fx.member(), request(" abc-42 ")).await.unwrap();

        assert_eq!(report.lot_number, "AbC-42");
        assert_eq!(report.items.len(), 1);
        assert_eq!(report.items[0].current_balance, 10);
        assert_eq!(report.items[0].timeline.len(), 1);
    }

    #[tokio::test]
    async fn test_unauthorized_caller_gets_no_items() {
        let fx = fixture().await;
        fx.receive("AbC-42", 120, 10).await;

        let report = lot_traceability(&fx.db, &fx.outsider(), request("AbC-42")).await.unwrap();
        assert!(report.items.is_empty());
    }

    #[tokio::test]
    async fn test_blank_lot_number_is_empty() {
        let fx = fixture().await;
        let report = lot_traceability(&fx.db, &fx.member(), request("   ")).await.unwrap();
        assert_eq!(report.lot_number, "");
        assert!(report.items.is_empty());
    }
}
