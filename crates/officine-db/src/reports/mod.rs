//! # Reports
//!
//! Read-only views over lots. They never open a transaction and tolerate
//! slightly stale data.
//!
//! - [`expiry`] - Expiry risk report (severity tiers, counts, filter options)
//! - [`traceability`] - Per-lot-number audit trail

pub mod expiry;
pub mod traceability;
