//! # Validation Module
//!
//! Input validation for ledger operations and report queries.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Back-office UI (external)                                    │
//! │  └── Basic format checks, immediate feedback                           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Lot numbers, quantities, deltas                                   │
//! │  └── Report windows                                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── CHECK (quantity >= 0) on stock_lots                               │
//! │  └── UNIQUE (product_id, lot_number COLLATE NOCASE)                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::{MAX_LEDGER_QUANTITY, MAX_LOT_NUMBER_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates a lot number and returns it trimmed.
///
/// ## Rules
/// - Must not be blank
/// - At most 64 characters
///
/// ## Example
/// ```rust
/// use officine_core::validation::validate_lot_number;
///
/// assert_eq!(validate_lot_number("  LOT-001 ").unwrap(), "LOT-001");
/// assert!(validate_lot_number("   ").is_err());
/// ```
pub fn validate_lot_number(lot_number: &str) -> ValidationResult<String> {
    let lot_number = lot_number.trim();

    if lot_number.is_empty() {
        return Err(ValidationError::Required {
            field: "lot_number".to_string(),
        });
    }

    if lot_number.chars().count() > MAX_LOT_NUMBER_LEN {
        return Err(ValidationError::TooLong {
            field: "lot_number".to_string(),
            max: MAX_LOT_NUMBER_LEN,
        });
    }

    Ok(lot_number.to_string())
}

/// Validates a received or consumed quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LEDGER_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_LEDGER_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LEDGER_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a signed stocktake delta.
///
/// ## Rules
/// - Must not be zero (a no-op correction would still log a movement)
/// - |delta| must not exceed MAX_LEDGER_QUANTITY
pub fn validate_delta(delta: i64) -> ValidationResult<()> {
    if delta == 0 {
        return Err(ValidationError::MustBeNonZero {
            field: "delta".to_string(),
        });
    }

    if delta.unsigned_abs() > MAX_LEDGER_QUANTITY as u64 {
        return Err(ValidationError::OutOfRange {
            field: "delta".to_string(),
            min: -MAX_LEDGER_QUANTITY,
            max: MAX_LEDGER_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a free-text reason attached to a movement.
pub fn validate_reason(reason: &str) -> ValidationResult<String> {
    let reason = reason.trim();

    if reason.is_empty() {
        return Err(ValidationError::Required {
            field: "reason".to_string(),
        });
    }

    if reason.len() > 500 {
        return Err(ValidationError::TooLong {
            field: "reason".to_string(),
            max: 500,
        });
    }

    Ok(reason.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_lot_number() {
        assert_eq!(validate_lot_number("LOT-001").unwrap(), "LOT-001");
        assert_eq!(validate_lot_number(" ab12 ").unwrap(), "ab12");
        assert!(validate_lot_number("").is_err());
        assert!(validate_lot_number(&"X".repeat(65)).is_err());
        assert!(validate_lot_number(&"X".repeat(64)).is_ok());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_LEDGER_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-3).is_err());
        assert!(validate_quantity(MAX_LEDGER_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_delta() {
        assert!(validate_delta(-4).is_ok());
        assert!(validate_delta(7).is_ok());
        assert!(matches!(
            validate_delta(0),
            Err(ValidationError::MustBeNonZero { .. })
        ));
        assert!(validate_delta(-MAX_LEDGER_QUANTITY - 1).is_err());
    }

    #[test]
    fn test_validate_reason() {
        assert_eq!(validate_reason(" Casse ").unwrap(), "Casse");
        assert!(validate_reason("  ").is_err());
    }
}
