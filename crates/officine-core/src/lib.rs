//! # officine-core: Pure Inventory Logic for Officine
//!
//! This crate is the **heart** of the pharmacy back-office inventory. It
//! contains the lot, expiry and replenishment rules as pure functions with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Officine Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  Back-office UI (external)                      │   │
//! │  │    Expiry page ──► Lot trace page ──► Procurement page          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ commands                               │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 apps/backoffice (tenant scoping)                │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ officine-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌─────────┐  ┌─────────┐  ┌──────────────┐  ┌───────────┐    │   │
//! │  │   │  fefo   │  │ expiry  │  │ traceability │  │ low_stock │    │   │
//! │  │   │  plan   │  │ tiers   │  │  timeline    │  │ signature │    │   │
//! │  │   └─────────┘  └─────────┘  └──────────────┘  └───────────┘    │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 officine-db (Database Layer)                    │   │
//! │  │          SQLite queries, migrations, transactions               │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain records (Product, StockLot, StockMovement, orders)
//! - [`fefo`] - First-Expired-First-Out consumption planning
//! - [`expiry`] - Expiry risk tiers and report assembly
//! - [`traceability`] - Per-lot audit timelines
//! - [`low_stock`] - Low-stock signatures and draft line reconciliation
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use officine_core::low_stock::signature;
//!
//! // Order and duplicates do not matter
//! assert_eq!(signature(["p2", "p1", "p2"]), "p1|p2");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod expiry;
pub mod fefo;
pub mod low_stock;
pub mod traceability;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum length of a lot number as printed on packaging.
pub const MAX_LOT_NUMBER_LEN: usize = 64;

/// Maximum quantity accepted by a single ledger operation.
///
/// ## Business Reason
/// Catches typos like 10000 instead of 100 on a delivery note.
pub const MAX_LEDGER_QUANTITY: i64 = 100_000;

/// Generates a new entity ID (UUID v4).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
