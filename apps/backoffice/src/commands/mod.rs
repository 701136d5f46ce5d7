//! # Back-office Commands Module
//!
//! All commands exposed to the back-office frontend.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs          ◄─── You are here (caller identity, tenant resolution)
//! ├── expiry.rs       ◄─── Expiry risk report
//! ├── traceability.rs ◄─── Lot traceability
//! ├── low_stock.rs    ◄─── Low-stock summary and replenishment draft
//! └── ledger.rs       ◄─── Lot reception, FEFO consumption, adjustments
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Command Flow                                         │
//! │                                                                         │
//! │  Frontend                                                               │
//! │  ────────                                                               │
//! │  const report = await call('expiry_risk_report', {                      │
//! │    clerkOrgId: 'org_2abc',                                              │
//! │    windowDays: 30                                                       │
//! │  });                                                                    │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  Rust Backend                                                           │
//! │  ────────────                                                           │
//! │  async fn expiry_risk_report(                                           │
//! │      db: &Database,            ◄── Shared pool                         │
//! │      config: &AppConfig,       ◄── Defaults (window)                   │
//! │      caller: &Caller,          ◄── Resolved identity                   │
//! │      request: ExpiryRiskRequest,                                        │
//! │  ) -> Result<ExpiryRiskReport, ApiError>                                │
//! │         │                                                               │
//! │         │ (JSON serialization, camelCase)                               │
//! │         ▼                                                               │
//! │  Frontend receives: { windowDays, items, counts, filterOptions }        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod expiry;
pub mod ledger;
pub mod low_stock;
pub mod traceability;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use officine_core::Pharmacy;
use officine_db::Database;

/// Identity of the signed-in user, as resolved by the authentication layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Caller {
    pub user_id: String,
    /// Active organization; `None` when the user has not picked one.
    pub org_id: Option<String>,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, org_id: Option<&str>) -> Self {
        Caller {
            user_id: user_id.into(),
            org_id: org_id.map(str::to_string),
        }
    }
}

/// Pharmacy of `clerk_org_id` when the caller belongs to that organization.
///
/// Returns `None` both when the caller is in another organization and when
/// no pharmacy is bound to the organization; callers must not be able to
/// tell the two apart.
pub(crate) async fn authorized_pharmacy(
    db: &Database,
    caller: &Caller,
    clerk_org_id: &str,
) -> Result<Option<Pharmacy>, ApiError> {
    if caller.org_id.as_deref() != Some(clerk_org_id) {
        debug!(user_id = %caller.user_id, clerk_org_id = %clerk_org_id, "Caller outside organization");
        return Ok(None);
    }

    Ok(db.pharmacies().get_by_clerk_org_id(clerk_org_id).await?)
}

/// Same as [`authorized_pharmacy`] for mutations: refusal is an error.
pub(crate) async fn require_pharmacy(
    db: &Database,
    caller: &Caller,
    clerk_org_id: &str,
) -> Result<Pharmacy, ApiError> {
    authorized_pharmacy(db, caller, clerk_org_id)
        .await?
        .ok_or_else(ApiError::forbidden)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::test_support::{fixture, ORG};

    #[tokio::test]
    async fn test_member_resolves_pharmacy() {
        let fx = fixture().await;
        let pharmacy = authorized_pharmacy(&fx.db, &fx.member(), ORG).await.unwrap();
        assert_eq!(pharmacy.unwrap().id, fx.pharmacy.id);
    }

    #[tokio::test]
    async fn test_outsiders_and_unbound_orgs_are_refused() {
        let fx = fixture().await;

        assert!(authorized_pharmacy(&fx.db, &fx.outsider(), ORG).await.unwrap().is_none());

        let no_org = Caller::new("user_3", None);
        assert!(authorized_pharmacy(&fx.db, &no_org, ORG).await.unwrap().is_none());

        let unbound = Caller::new("user_4", Some("org_unbound"));
        let err = require_pharmacy(&fx.db, &unbound, "org_unbound").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
    }
}
