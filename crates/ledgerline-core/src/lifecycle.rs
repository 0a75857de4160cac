//! # Order Lifecycle
//!
//! The pure transition table for the order state machine.
//!
//! ## State Diagram
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Order State Machine                                │
//! │                                                                         │
//! │                    ┌─────────────┐                                     │
//! │                    │   Pending   │  (salesperson drafts & edits)       │
//! │                    └──────┬──────┘                                     │
//! │                           │                                             │
//! │              ┌────────────┴────────────┐                               │
//! │              ▼                         ▼                               │
//! │        ┌───────────┐            ┌────────────┐                         │
//! │        │  Approved │            │  Cancelled │  (terminal)             │
//! │        └─────┬─────┘            └────────────┘                         │
//! │              │  (re-approval allowed, idempotent)                      │
//! │     ┌────────┴────────┐                                                │
//! │     ▼                 ▼                                                │
//! │ ┌─────────┐     ┌────────────┐                                         │
//! │ │ Shipped │     │  Cancelled │                                         │
//! │ └─────────┘     └────────────┘                                         │
//! │ (terminal)       (terminal)                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The workflow service consults this table before performing any side
//! effect; re-running Ship against a shipped order is refused here, by
//! policy, not by best-effort deduplication.

use crate::error::{CoreError, CoreResult};
use crate::types::OrderStatus;

/// Whether `from → to` is a legal transition.
///
/// Approve → Approve is deliberately legal: re-approval reconciles lines
/// idempotently with no further side effects.
pub const fn can_transition(from: OrderStatus, to: OrderStatus) -> bool {
    use OrderStatus::*;
    matches!(
        (from, to),
        (Pending, Approved)
            | (Pending, Cancelled)
            | (Approved, Approved)
            | (Approved, Shipped)
            | (Approved, Cancelled)
    )
}

/// Whether a status admits no further transitions.
pub const fn is_terminal(status: OrderStatus) -> bool {
    matches!(status, OrderStatus::Shipped | OrderStatus::Cancelled)
}

/// Whether the salesperson may still mutate the order's lines.
pub const fn is_editable(status: OrderStatus) -> bool {
    matches!(status, OrderStatus::Pending)
}

/// Guards a transition, naming the attempted action in the error.
///
/// ## Example
/// ```rust
/// use ledgerline_core::lifecycle::ensure_transition;
/// use ledgerline_core::types::OrderStatus;
///
/// assert!(ensure_transition("o-1", OrderStatus::Approved, OrderStatus::Shipped, "ship").is_ok());
/// assert!(ensure_transition("o-1", OrderStatus::Pending, OrderStatus::Shipped, "ship").is_err());
/// ```
pub fn ensure_transition(
    order_id: &str,
    from: OrderStatus,
    to: OrderStatus,
    action: &str,
) -> CoreResult<()> {
    if can_transition(from, to) {
        Ok(())
    } else {
        Err(CoreError::invalid_state(order_id, from, action))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
