//! # Error Types
//!
//! Domain-specific error types for officine-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  officine-core errors (this file)                                      │
//! │  ├── CoreError        - Ledger rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  officine-db errors (separate crate)                                   │
//! │  └── DbError          - Database failures, wraps CoreError             │
//! │                                                                         │
//! │  backoffice errors (app)                                               │
//! │  └── ApiError         - What the UI sees (serialized)                  │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → UI           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Ledger rule violations.
///
/// Both stock errors are all-or-nothing: when one is returned, no lot,
/// movement or join row has been written.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found (or belongs to another pharmacy).
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Lot cannot be found (or belongs to another pharmacy).
    #[error("Lot not found: {0}")]
    LotNotFound(String),

    /// Total lot quantity is lower than the requested consumption.
    ///
    /// ## User Workflow
    /// ```text
    /// Sale line (qty: 5)
    ///      │
    ///      ▼
    /// consume_fefo: lots hold 3 units in total
    ///      │
    ///      ▼
    /// InsufficientStock { product_id, available: 3, requested: 5 }
    ///      │
    ///      ▼
    /// Sale is stopped, nothing was decremented
    /// ```
    #[error("Insufficient stock for {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// A manual adjustment would push a lot below zero.
    #[error("Adjustment of {delta} on lot {lot_id} would leave {current} + {delta} < 0")]
    NegativeStock {
        lot_id: String,
        current: i64,
        delta: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be zero.
    #[error("{field} must not be zero")]
    MustBeNonZero { field: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product_id: "doliprane-1000".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for doliprane-1000: available 3, requested 5"
        );

        let err = CoreError::NegativeStock {
            lot_id: "lot-1".to_string(),
            current: 2,
            delta: -4,
        };
        assert_eq!(
            err.to_string(),
            "Adjustment of -4 on lot lot-1 would leave 2 + -4 < 0"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "lot_number".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
