//! # API Error Type
//!
//! Unified error type for back-office commands.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Officine                               │
//! │                                                                         │
//! │  Frontend                    Rust Backend                               │
//! │  ────────                    ────────────                               │
//! │                                                                         │
//! │  call('consume_lots')                                                   │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function                                                │  │
//! │  │  Result<T, ApiError>                                             │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Tenant check? ─── caller org != clerkOrgId ────── FORBIDDEN ───►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Ledger rule? ─── DbError::Domain(InsufficientStock) ── ApiError►│  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Success ──────────────────────────────────────────────────────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  catch (e) {                                                            │
//! │    // e.code = "INSUFFICIENT_STOCK"                                     │
//! │    // e.message = "Insufficient stock for ...: 3 available, 5 requested"│
//! │  }                                                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use officine_core::{CoreError, ValidationError};
use officine_db::DbError;

/// API error returned from commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "NEGATIVE_STOCK",
///   "message": "Lot LOT-001 holds 2, cannot apply -5"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Resource not found (404)
    NotFound,

    /// Input validation failed (400)
    ValidationError,

    /// Caller may not act on this pharmacy (403)
    Forbidden,

    /// Database operation failed (500)
    DatabaseError,

    /// Business rule refused the request (422)
    BusinessLogic,

    /// Consumption exceeds the stock held across lots
    InsufficientStock,

    /// Adjustment would take a lot below zero
    NegativeStock,

    /// Concurrent writers kept changing the same lots
    Conflict,

    /// Internal server error (500)
    Internal,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates the error returned to callers outside the pharmacy.
    pub fn forbidden() -> Self {
        ApiError::new(ErrorCode::Forbidden, "Not allowed for this pharmacy")
    }

    /// Creates a business rule error.
    pub fn business(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::BusinessLogic, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::Domain(e) => ApiError::from(e),
            DbError::Conflict(message) => {
                tracing::warn!("Ledger conflict: {}", message);
                ApiError::new(ErrorCode::Conflict, "Stock changed concurrently, please retry")
            }
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts ledger rule violations to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => ApiError::not_found("Product", &id),
            CoreError::LotNotFound(id) => ApiError::not_found("Lot", &id),
            CoreError::InsufficientStock {
                product_id,
                available,
                requested,
            } => ApiError::new(
                ErrorCode::InsufficientStock,
                format!(
                    "Insufficient stock for {}: {} available, {} requested",
                    product_id, available, requested
                ),
            ),
            CoreError::NegativeStock {
                lot_id,
                current,
                delta,
            } => ApiError::new(
                ErrorCode::NegativeStock,
                format!("Lot {} holds {}, cannot apply {}", lot_id, current, delta),
            ),
            CoreError::Validation(e) => ApiError::from(e),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_keep_their_code() {
        let err: ApiError = DbError::Domain(CoreError::InsufficientStock {
            product_id: "p1".to_string(),
            available: 3,
            requested: 5,
        })
        .into();
        assert_eq!(err.code, ErrorCode::InsufficientStock);
        assert!(err.message.contains("3 available"));

        let err: ApiError = DbError::Domain(CoreError::NegativeStock {
            lot_id: "LOT-001".to_string(),
            current: 2,
            delta: -5,
        })
        .into();
        assert_eq!(err.code, ErrorCode::NegativeStock);
    }

    #[test]
    fn test_serializes_screaming_snake_code() {
        let json = serde_json::to_value(ApiError::forbidden()).unwrap();
        assert_eq!(json["code"], "FORBIDDEN");

        let json = serde_json::to_value(ApiError::from(DbError::Conflict("lot".into()))).unwrap();
        assert_eq!(json["code"], "CONFLICT");
    }
}
