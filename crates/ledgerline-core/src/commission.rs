//! # Commission Calculator
//!
//! Pure margin-based commission math. No side effects: the workflow
//! decides whether a [`crate::types::Commission`] record gets created
//! from the numbers produced here.
//!
//! ## How Commissions Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Per sale line:   margin = (sell_price − cost_at_sale) × quantity      │
//! │                                                                         │
//! │  Per sale:        commission = Σ margins × rate_bps / 10000            │
//! │                                                                         │
//! │  Policy:          commission ≤ 0  →  no record is ever created         │
//! │                   (loss-making sales never produce negative payouts)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The rate is the salesperson's cash or credit rate, selected by the
//! sale's payment method via [`crate::types::CommissionRates::rate_for`].

use crate::money::Money;
use crate::types::{CommissionRate, SaleLine};

/// Sums the per-line margins of a sale.
///
/// Negative line margins (sold below cost) are summed as-is; a sale can
/// have a negative total margin and the caller suppresses the record.
pub fn margin_total(lines: &[SaleLine]) -> Money {
    lines.iter().map(SaleLine::margin).sum()
}

/// Computes the commission a rate earns over a set of sale lines.
pub fn compute(lines: &[SaleLine], rate: CommissionRate) -> Money {
    margin_total(lines).apply_rate(rate)
}

/// The commission portion a partial return claws back:
/// `returned_amount × rate`.
///
/// Used by the reversal path to scale an existing commission down in
/// proportion to the returned value.
pub fn return_clawback(returned: Money, rate: CommissionRate) -> Money {
    returned.apply_rate(rate)
}

// =============================================================================
// Unit Tests
// =============================================================================
