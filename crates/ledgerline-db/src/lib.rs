//! # ledgerline-db: Database Layer for Ledgerline
//!
//! This crate provides persistence and the transactional services for
//! the Ledgerline order-to-cash core. It uses SQLite with sqlx for
//! async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Ledgerline Data Flow                             │
//! │                                                                         │
//! │  Route layer (ship order, record cash movement, ...)                   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   ledgerline-db (THIS CRATE)                    │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────┐   ┌───────────────┐   ┌──────────────┐      │   │
//! │  │   │ OrderWorkflow│──►│ LedgerService │   │  Migrations  │      │   │
//! │  │   │ (workflow.rs)│   │  (ledger.rs)  │   │  (embedded)  │      │   │
//! │  │   └──────┬───────┘   └───────┬───────┘   └──────────────┘      │   │
//! │  │          │                   │                                  │   │
//! │  │          ▼                   ▼                                  │   │
//! │  │   ┌─────────────────────────────────────────────┐              │   │
//! │  │   │  Repositories: tenant, cash_account,        │              │   │
//! │  │   │  product, order, sale, settlement,          │              │   │
//! │  │   │  commission                                 │              │   │
//! │  │   └─────────────────────────────────────────────┘              │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL, foreign keys on)                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database and service error types
//! - [`repository`] - Repository implementations per aggregate
//! - [`ledger`] - The cash ledger service
//! - [`workflow`] - The order state machine and its transactions
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ledgerline_db::{Database, DbConfig};
//! use ledgerline_core::PaymentMethod;
//!
//! let db = Database::new(DbConfig::new("path/to/ledgerline.db")).await?;
//!
//! let workflow = db.order_workflow();
//! let order_id = workflow
//!     .create_order(&tenant_id, &salesperson_id, None, PaymentMethod::Cash, None, &lines)
//!     .await?;
//! workflow.approve_order(&tenant_id, &order_id, &lines).await?;
//! let sale_id = workflow.ship_order(&tenant_id, &order_id, Some(&till_id)).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod workflow;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult, FlowError, FlowResult};
pub use ledger::LedgerService;
pub use pool::{Database, DbConfig};
pub use workflow::OrderWorkflow;

// Repository re-exports for convenience
pub use repository::cash_account::CashAccountRepository;
pub use repository::commission::CommissionRepository;
pub use repository::order::OrderRepository;
pub use repository::product::{NewProduct, ProductRepository};
pub use repository::sale::SaleRepository;
pub use repository::settlement::SettlementRepository;
pub use repository::tenant::TenantRepository;
