//! # Domain Types
//!
//! Records shared by the ledger, the reports and the synchronizer.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    StockLot     │   │  StockMovement  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  stock_quantity │◄──│  product_id     │   │  delta (signed) │       │
//! │  │  threshold      │   │  lot_number     │   │  movement_type  │       │
//! │  │  purchase_price │   │  expiry_date    │   │  lot_number?    │       │
//! │  └─────────────────┘   │  quantity >= 0  │   │  name snapshot  │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ProcurementOrder │   │ProcurementItem- │   │  SaleItemLot    │       │
//! │  │  type, status   │   │      Lot        │   │  (sold qty)     │       │
//! │  │ ProcurementItem │   │ (received qty)  │   │                 │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  Pharmacy (tenant) ── LowStockAlertState (draft tracking row)          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Snapshot Pattern
//! `StockMovement::product_name_snapshot` is a frozen copy taken when the
//! movement is written. Renaming a product never rewrites history.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// =============================================================================
// Tenant
// =============================================================================

/// A pharmacy (tenant). Every other record is scoped by `pharmacy_id`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Pharmacy {
    pub id: String,
    /// External organization identifier the caller's identity resolves to.
    pub clerk_org_id: String,
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A supplier of a pharmacy.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Supplier {
    pub id: String,
    pub pharmacy_id: String,
    pub name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Product
// =============================================================================

/// A product carried by a pharmacy.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub pharmacy_id: String,
    pub name: String,
    /// Therapeutic / shelf category, used by report filters.
    pub category: Option<String>,
    /// Default unit price on purchase orders, in cents.
    pub purchase_price_cents: i64,
    pub sale_price_cents: i64,
    /// Aggregate stock. Always equals the sum of the product's lot quantities.
    pub stock_quantity: i64,
    /// At or below this level the product is low stock.
    pub low_stock_threshold: i64,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether this product belongs in the low-stock set.
    pub fn is_low_stock(&self) -> bool {
        self.is_active && self.stock_quantity <= self.low_stock_threshold
    }
}

// =============================================================================
// Stock Lots
// =============================================================================

/// How a lot entered the pharmacy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum LotSourceType {
    /// Goods received against a delivery note.
    DeliveryNote,
    /// Goods received directly against a purchase order.
    PurchaseOrder,
    /// Opening balance when the pharmacy started tracking lots.
    InitialStock,
}

impl LotSourceType {
    /// Movement type recorded when a lot is received from this source.
    pub fn receipt_movement(self) -> MovementType {
        match self {
            LotSourceType::DeliveryNote | LotSourceType::PurchaseOrder => {
                MovementType::DeliverySync
            }
            LotSourceType::InitialStock => MovementType::InitialStock,
        }
    }
}

/// One physical batch of a product.
///
/// A lot reaching zero is kept for traceability; lots are never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockLot {
    pub id: String,
    pub pharmacy_id: String,
    pub product_id: String,
    /// Unique within `product_id` only, compared case-insensitively.
    pub lot_number: String,
    #[ts(as = "String")]
    pub expiry_date: NaiveDate,
    /// Remaining units, never negative.
    pub quantity: i64,
    pub source_type: LotSourceType,
    pub source_order_id: Option<String>,
    pub source_item_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Movement Log
// =============================================================================

/// Why a quantity changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum MovementType {
    InitialStock,
    ManualEdit,
    SaleSync,
    DeliverySync,
    Stocktake,
}

/// Append-only ledger entry. Never updated, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub pharmacy_id: String,
    pub product_id: String,
    /// Product name at write time (frozen).
    pub product_name_snapshot: String,
    pub delta: i64,
    pub movement_type: MovementType,
    pub lot_number: Option<String>,
    #[ts(as = "Option<String>")]
    pub lot_expiry_date: Option<NaiveDate>,
    pub reason: String,
    /// The sale / order / stocktake that caused the movement.
    pub source_id: Option<String>,
    pub created_by_user_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Procurement
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum OrderType {
    PurchaseOrder,
    DeliveryNote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[ts(export)]
pub enum OrderStatus {
    /// Editable, eligible for automatic synchronization.
    Draft,
    Ordered,
    Received,
    Cancelled,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Draft
    }
}

/// A purchase order or delivery note.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProcurementOrder {
    pub id: String,
    pub pharmacy_id: String,
    pub supplier_id: Option<String>,
    pub order_type: OrderType,
    pub status: OrderStatus,
    pub note: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl ProcurementOrder {
    /// Only draft purchase orders can be synchronized with the low-stock set.
    pub fn is_draft_purchase_order(&self) -> bool {
        self.order_type == OrderType::PurchaseOrder && self.status == OrderStatus::Draft
    }
}

/// A line of a procurement order.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProcurementItem {
    pub id: String,
    pub order_id: String,
    pub product_id: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Lot Join Records
// =============================================================================

/// Links a procurement line to the lot it filled.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProcurementItemLot {
    pub id: String,
    pub order_id: String,
    pub procurement_item_id: Option<String>,
    pub lot_id: String,
    pub quantity: i64,
    #[ts(as = "String")]
    pub expiry_date: NaiveDate,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Links a sale line to a lot it drew from.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleItemLot {
    pub id: String,
    pub sale_id: String,
    pub sale_item_id: Option<String>,
    pub lot_id: String,
    pub quantity: i64,
    #[ts(as = "String")]
    pub expiry_date: NaiveDate,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Low-Stock Alert State
// =============================================================================

/// Tenant-scoped row tracking the draft replenishment order.
///
/// May be stale: the referenced order can be deleted or confirmed behind our
/// back. Readers re-validate it before trusting `order_id`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LowStockAlertState {
    pub pharmacy_id: String,
    pub order_id: Option<String>,
    pub signature: Option<String>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}
