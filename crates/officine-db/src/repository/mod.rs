//! # Repository Module
//!
//! Database repository implementations for Officine.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Two Ways Into Each Table                             │
//! │                                                                         │
//! │  db.lots().find_by_number(..)          Repository method               │
//! │       │                                  - borrows a pool connection   │
//! │       ▼                                  - reads, simple writes        │
//! │  ┌──────────────────────┐                                              │
//! │  │   SQL (one place)    │                                              │
//! │  └──────────────────────┘                                              │
//! │       ▲                                                                 │
//! │       │                                                                 │
//! │  lot::apply_delta_guarded(&mut tx, ..)  Connection-level function      │
//! │                                          - runs inside the caller's    │
//! │                                            transaction (ledger, sync)  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`PharmacyRepository`](pharmacy::PharmacyRepository) - Tenants
//! - [`SupplierRepository`](supplier::SupplierRepository) - Suppliers
//! - [`ProductRepository`](product::ProductRepository) - Catalog and aggregate stock
//! - [`LotRepository`](lot::LotRepository) - Stock lots
//! - [`MovementRepository`](movement::MovementRepository) - Append-only movement log
//! - [`ProcurementRepository`](procurement::ProcurementRepository) - Orders and lines
//! - [`LotLinkRepository`](lot_link::LotLinkRepository) - Receipt / sale join rows
//! - [`AlertStateRepository`](alert_state::AlertStateRepository) - Draft tracking row

pub mod alert_state;
pub mod lot;
pub mod lot_link;
pub mod movement;
pub mod pharmacy;
pub mod procurement;
pub mod product;
pub mod supplier;
