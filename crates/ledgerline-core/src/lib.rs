//! # ledgerline-core: Pure Business Logic for Ledgerline
//!
//! This crate is the **heart** of the Ledgerline retail backend. It
//! contains the order-to-cash business rules as pure functions with zero
//! I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Ledgerline Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Route layer (HTTP, auth, DTOs)                     │   │
//! │  │        — separate deployment concern, not in this repo —        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │ in-process call contract               │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 ledgerline-db (Persistence)                     │   │
//! │  │   OrderWorkflow ── LedgerService ── repositories ── SQLite      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ ledgerline-core (THIS CRATE) ★                  │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌────────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │ lifecycle  │  │commission │  │   │
//! │  │   │  Order    │  │   Money   │  │ transition │  │  margin   │  │   │
//! │  │   │  Sale ... │  │  (cents)  │  │   table    │  │   math    │  │   │
//! │  │   └───────────┘  └───────────┘  └────────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Order, Sale, LedgerEntry, Commission, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`lifecycle`] - The order state-machine transition table
//! - [`commission`] - Margin-based commission math
//! - [`error`] - Domain error types
//! - [`validation`] - Business input validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: Every function is deterministic - same input = same output
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in cents (i64) to avoid float errors
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//! 5. **Explicit Tenancy**: tenant and actor ids are parameters, never
//!    ambient context

// =============================================================================
// Module Declarations
// =============================================================================

pub mod commission;
pub mod error;
pub mod lifecycle;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use ledgerline_core::Money` instead of
// `use ledgerline_core::money::Money`

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum lines allowed on a single order
///
/// ## Business Reason
/// Prevents runaway drafts and keeps approval reconciliation bounded.
/// Can be made configurable per-tenant in future versions.
pub const MAX_ORDER_LINES: usize = 200;

/// Maximum quantity of a single order line
///
/// ## Business Reason
/// Prevents accidental over-ordering (e.g., typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 100_000;
