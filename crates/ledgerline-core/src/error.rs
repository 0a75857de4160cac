//! # Error Types
//!
//! Domain-specific error types for ledgerline-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  ledgerline-core errors (this file)                                    │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  ledgerline-db errors (separate crate)                                 │
//! │  ├── DbError          - Database operation failures                    │
//! │  └── FlowError        - CoreError | DbError, returned by services      │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → FlowError → route layer           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (ids, amounts, states)
//! 3. Errors are enum variants, never String
//! 4. Every variant maps to a business failure the route layer can name;
//!    anything unclassified stays a `DbError` and means "internal fault"
//!
//! A failed multi-step operation (ship, return, record) aborts its whole
//! transaction: the caller may assume no partial state was persisted.

use thiserror::Error;

use crate::types::OrderStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations.
///
/// Every multi-step mutation recovers these at the boundary of its atomic
/// unit: the transaction is rolled back and the order/account keep their
/// pre-call state.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The order's current status does not permit the requested transition.
    ///
    /// ## When This Occurs
    /// - Shipping an order that was never approved
    /// - Editing an order after approval
    /// - Approving or rejecting a shipped/cancelled order
    #[error("Order {order_id} is {status:?}, cannot {action}")]
    InvalidState {
        order_id: String,
        status: OrderStatus,
        action: String,
    },

    /// A referenced entity does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// The entity exists but belongs to a different tenant than the caller.
    ///
    /// Deliberately distinct from [`CoreError::NotFound`]: a tenant mismatch
    /// on a cash account is a caller bug, not a missing row.
    #[error("{entity} {id} belongs to a different tenant")]
    TenantMismatch { entity: &'static str, id: String },

    /// Ledger amounts must be strictly positive.
    #[error("Ledger amount must be positive, got {amount_cents}")]
    InvalidAmount { amount_cents: i64 },

    /// A ledger direction string from foreign input was neither `in` nor `out`.
    #[error("Invalid ledger direction: '{value}'")]
    InvalidDirection { value: String },

    /// A cash sale was shipped without a target cash account.
    #[error("Cash payment requires a target cash account")]
    MissingCashAccount,

    /// An order line references a product that no longer exists at ship time.
    #[error("Product not found at ship time: {product_id}")]
    ProductNotFound { product_id: String },

    /// The adjustment would drive stock below zero and neither the product
    /// flag nor the caller policy allows overselling.
    #[error("Insufficient stock for {sku}: available {available}, requested {requested}")]
    InsufficientStock {
        sku: String,
        available: i64,
        requested: i64,
    },

    /// A payment or return exceeds the remaining balance it amortizes.
    #[error("Amount {amount_cents} exceeds remaining balance {remaining_cents}")]
    OverPayment {
        amount_cents: i64,
        remaining_cents: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Creates an InvalidState error for a given order and attempted action.
    pub fn invalid_state(
        order_id: impl Into<String>,
        status: OrderStatus,
        action: impl Into<String>,
    ) -> Self {
        CoreError::InvalidState {
            order_id: order_id.into(),
            status,
            action: action.into(),
        }
    }

    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur before business logic runs; the route layer can surface
/// them field-by-field.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// An order mutation was given no lines.
    #[error("an order must carry at least one line")]
    EmptyLines,

    /// Too many lines on a single order.
    #[error("an order cannot carry more than {max} lines")]
    TooManyLines { max: usize },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            sku: "COKE-330".to_string(),
            available: 3,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock for COKE-330: available 3, requested 5"
        );

        let err = CoreError::invalid_state("o-1", OrderStatus::Shipped, "approve");
        assert_eq!(err.to_string(), "Order o-1 is Shipped, cannot approve");
    }

    #[test]
    fn test_overpayment_message() {
        let err = CoreError::OverPayment {
            amount_cents: 500,
            remaining_cents: 300,
        };
        assert_eq!(err.to_string(), "Amount 500 exceeds remaining balance 300");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "memo".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
