//! # Validation Module
//!
//! Input validation for the order-to-cash core.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Route layer (out of scope here)                              │
//! │  ├── Deserialization / claims extraction                               │
//! │  └── Immediate caller feedback                                         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE - business input validation                      │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (amount_cents > 0), CHECK (quantity > 0)                    │
//! │  ├── UNIQUE (tenant_id, sku)                                           │
//! │  └── Foreign key constraints                                           │
//! │                                                                         │
//! │  Defense in depth: multiple layers catch different errors              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;
use crate::types::OrderLineDraft;
use crate::{MAX_LINE_QUANTITY, MAX_ORDER_LINES};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Ledger Validators
// =============================================================================

/// Validates a ledger memo.
///
/// ## Rules
/// - Must not be empty (every entry must say what moved the money)
/// - Maximum 500 characters
pub fn validate_memo(memo: &str) -> ValidationResult<()> {
    let memo = memo.trim();

    if memo.is_empty() {
        return Err(ValidationError::Required {
            field: "memo".to_string(),
        });
    }

    if memo.len() > 500 {
        return Err(ValidationError::TooLong {
            field: "memo".to_string(),
            max: 500,
        });
    }

    Ok(())
}

// =============================================================================
// Order Validators
// =============================================================================

/// Validates a line quantity.
pub fn validate_quantity(quantity: i64) -> ValidationResult<()> {
    if quantity <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if quantity > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a unit price. Zero is allowed (giveaways); negatives are not.
pub fn validate_unit_price(unit_price_cents: i64) -> ValidationResult<()> {
    if unit_price_cents < 0 {
        return Err(ValidationError::MustBePositive {
            field: "unit_price_cents".to_string(),
        });
    }
    Ok(())
}

/// Validates a full line set for create/edit/approve.
///
/// ## Rules
/// - At least one line, at most [`MAX_ORDER_LINES`]
/// - Every line: non-empty name, valid quantity, valid unit price
pub fn validate_lines(lines: &[OrderLineDraft]) -> ValidationResult<()> {
    if lines.is_empty() {
        return Err(ValidationError::EmptyLines);
    }

    if lines.len() > MAX_ORDER_LINES {
        return Err(ValidationError::TooManyLines {
            max: MAX_ORDER_LINES,
        });
    }

    for line in lines {
        if line.name.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "line.name".to_string(),
            });
        }
        validate_quantity(line.quantity)?;
        validate_unit_price(line.unit_price_cents)?;
    }

    Ok(())
}

/// Validates a credit term. `None` means due immediately.
pub fn validate_credit_term_days(days: Option<i64>) -> ValidationResult<()> {
    if let Some(days) = days {
        if !(0..=3650).contains(&days) {
            return Err(ValidationError::OutOfRange {
                field: "credit_term_days".to_string(),
                min: 0,
                max: 3650,
            });
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
