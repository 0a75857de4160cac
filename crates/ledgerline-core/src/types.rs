//! # Domain Types
//!
//! Core domain types for the Ledgerline order-to-cash workflow.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   CashAccount   │   │   LedgerEntry   │   │     Product     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  amount_cents>0 │   │  cost_cents     │       │
//! │  │  balance_cents  │◄──│  direction      │   │  stock_quantity │       │
//! │  └─────────────────┘   │  (append-only)  │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Order      │──►│      Sale       │──►│ Receivable /    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │ Commission      │       │
//! │  │  status (FSM)   │   │  cost snapshot  │   │  (per sale)     │       │
//! │  │  OrderLine[]    │   │  SaleLine[]     │   └─────────────────┘       │
//! │  └─────────────────┘   └─────────────────┘                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Multi-Tenancy
//! Every entity carries `tenant_id` and every query in ledgerline-db
//! predicates on it. There is no ambient tenant context anywhere: the
//! tenant and the acting user are always explicit parameters.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::money::Money;

// =============================================================================
// Tenant
// =============================================================================

/// An isolated business entity owning its own accounts, orders, products.
///
/// Created at onboarding; immutable from this core's perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Tenant {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Cash Account & Ledger
// =============================================================================

/// A named pool of funds with a running balance.
///
/// ## Balance Invariant
/// `balance_cents` always equals the signed sum of all ledger entries
/// recorded against the account. This holds by construction: the ledger
/// service updates the balance in the same transaction that inserts the
/// entry. The balance is never recomputed from the entries at runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CashAccount {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub balance_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CashAccount {
    /// Returns the balance as a Money type.
    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }
}

/// Direction of a ledger entry relative to the cash account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Money flowing into the account (sale proceeds, capital, collections).
    In,
    /// Money flowing out of the account (purchases, expenses, refunds).
    Out,
}

impl Direction {
    /// Parses a direction from foreign input (route layer, imports).
    ///
    /// The enum makes invalid directions unrepresentable internally; this
    /// is the single place where a bad string becomes a typed error.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "in" => Ok(Direction::In),
            "out" => Ok(Direction::Out),
            other => Err(CoreError::InvalidDirection {
                value: other.to_string(),
            }),
        }
    }

    /// Returns the signed delta this direction applies to a balance.
    #[inline]
    pub const fn signed_cents(&self, amount_cents: i64) -> i64 {
        match self {
            Direction::In => amount_cents,
            Direction::Out => -amount_cents,
        }
    }

    /// The opposite direction, used by the reversal path.
    #[inline]
    pub const fn reversed(&self) -> Self {
        match self {
            Direction::In => Direction::Out,
            Direction::Out => Direction::In,
        }
    }
}

/// One append-only row in the cash ledger.
///
/// Entries are created once and never mutated or deleted. A reversal is a
/// new entry in the opposite direction whose memo references the original
/// event.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct LedgerEntry {
    pub id: String,
    pub tenant_id: String,
    pub cash_account_id: String,
    pub entry_at: DateTime<Utc>,
    /// Strictly positive; the sign lives in `direction`.
    pub amount_cents: i64,
    pub direction: Direction,
    pub memo: String,
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// Returns the amount as a Money type.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    /// The signed contribution of this entry to its account balance.
    #[inline]
    pub fn signed_cents(&self) -> i64 {
        self.direction.signed_cents(self.amount_cents)
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: String,
    pub tenant_id: String,
    /// Stock Keeping Unit - business identifier, unique per tenant.
    pub sku: String,
    pub name: String,
    /// Current purchase cost in cents; snapshotted onto sale lines at ship.
    pub cost_cents: i64,
    /// Default sell price in cents.
    pub price_cents: i64,
    /// Current stock level. Mutated only through the inventory adjuster.
    pub stock_quantity: i64,
    /// Explicit oversell opt-in: allow the stock to go negative.
    pub allow_negative_stock: bool,
    /// Whether product is active (soft delete).
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the cost as a Money type.
    #[inline]
    pub fn cost(&self) -> Money {
        Money::from_cents(self.cost_cents)
    }

    /// Returns the sell price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

/// Caller-side stock policy for inventory adjustments.
///
/// `Enforce` is the contract going forward: decrements that would drive
/// stock negative fail unless the product itself opts in via
/// `allow_negative_stock`. `AllowNegative` is the explicit caller
/// override for flows that knowingly oversell (e.g. backorders).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockPolicy {
    Enforce,
    AllowNegative,
}

// =============================================================================
// Salesperson & Commission Rates
// =============================================================================

/// A salesperson drafting orders and earning margin-based commissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Salesperson {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    /// Commission rate for cash sales, in basis points.
    pub cash_rate_bps: i64,
    /// Commission rate for credit sales, in basis points.
    pub credit_rate_bps: i64,
    pub created_at: DateTime<Utc>,
}

impl Salesperson {
    /// The salesperson's rate table, looked up once per shipment.
    #[inline]
    pub fn commission_rates(&self) -> CommissionRates {
        CommissionRates {
            cash: CommissionRate::from_bps(self.cash_rate_bps),
            credit: CommissionRate::from_bps(self.credit_rate_bps),
        }
    }
}

/// Commission rate represented in basis points (bps).
///
/// ## Why Basis Points?
/// 1 basis point = 0.01% = 1/10000
/// 250 bps = 2.5%. Integer bps keep commission math in integer cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionRate(i64);

impl CommissionRate {
    /// Creates a rate from basis points.
    #[inline]
    pub const fn from_bps(bps: i64) -> Self {
        CommissionRate(bps)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> i64 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero rate.
    #[inline]
    pub const fn zero() -> Self {
        CommissionRate(0)
    }

    /// Checks if the rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for CommissionRate {
    fn default() -> Self {
        CommissionRate::zero()
    }
}

/// Per-payment-method commission rate strategy.
///
/// Replaces ad hoc per-field selection with a single table keyed by
/// payment method, looked up once at ship time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissionRates {
    pub cash: CommissionRate,
    pub credit: CommissionRate,
}

impl CommissionRates {
    /// Selects the rate for the given payment method.
    #[inline]
    pub const fn rate_for(&self, method: PaymentMethod) -> CommissionRate {
        match method {
            PaymentMethod::Cash => self.cash,
            PaymentMethod::Credit => self.credit,
        }
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How an order settles at shipment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Settles immediately into a cash account at ship time.
    Cash,
    /// Settles later: a receivable is opened for the sale total.
    Credit,
}

// =============================================================================
// Order
// =============================================================================

/// Order lifecycle states. The transition table lives in [`crate::lifecycle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Drafted by a salesperson; the salesperson may still edit it.
    Pending,
    /// Accepted by an admin; lines are frozen for the salesperson.
    Approved,
    /// Fulfilled; the sale and all downstream bookkeeping exist. Terminal.
    Shipped,
    /// Rejected or withdrawn before fulfillment. Terminal.
    Cancelled,
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::Pending
    }
}

/// A sales order drafted by a salesperson.
///
/// Invariant: `total_cents == Σ line.subtotal_cents` after every mutation
/// (create, edit, approve). Orders are never hard-deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Order {
    pub id: String,
    pub tenant_id: String,
    pub salesperson_id: String,
    pub customer_id: Option<String>,
    pub payment_method: PaymentMethod,
    /// Days until a credit sale falls due; `None` means due immediately.
    pub credit_term_days: Option<i64>,
    pub status: OrderStatus,
    pub total_cents: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Order {
    /// Returns the total as a Money type.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// Where an order line's goods come from.
///
/// A tagged variant instead of a nullable product reference: the
/// no-product case is explicit at the type level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LineSource {
    /// A catalog product; shipping decrements its stock and snapshots
    /// its cost.
    Catalog { product_id: String },
    /// A free-text line (service, one-off item). No stock movement, no
    /// cost snapshot.
    FreeText,
}

impl LineSource {
    /// The referenced product id, if this is a catalog line.
    #[inline]
    pub fn product_id(&self) -> Option<&str> {
        match self {
            LineSource::Catalog { product_id } => Some(product_id),
            LineSource::FreeText => None,
        }
    }
}

/// A line on an order. Owned exclusively by its order header.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: String,
    pub order_id: String,
    pub source: LineSource,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    /// `unit_price_cents × quantity`, recomputed on every line mutation.
    pub subtotal_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl OrderLine {
    /// Returns the subtotal as a Money type.
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

/// Caller-supplied line content for create, edit, and approve.
///
/// `id` is `None` for new lines; approve's reconciliation updates lines
/// whose id matches a pre-existing line and inserts the rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLineDraft {
    pub id: Option<String>,
    pub source: LineSource,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
}

impl OrderLineDraft {
    /// The subtotal this draft contributes to the order total.
    #[inline]
    pub fn subtotal_cents(&self) -> i64 {
        self.unit_price_cents * self.quantity
    }
}

/// Filter for order listings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub salesperson_id: Option<String>,
}

// =============================================================================
// Sale
// =============================================================================

/// Settlement status of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum SaleStatus {
    /// Cash sale: settled at ship time.
    Paid,
    /// Credit sale: a receivable tracks the outstanding amount.
    Unpaid,
    /// Fully returned; the void marker of the reversal path.
    Voided,
}

/// A realized sale, created exactly once when an order ships.
///
/// The header is immutable except for the return path, which scales
/// `total_cents` down and may set the `Voided` marker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    pub id: String,
    pub tenant_id: String,
    pub order_id: String,
    pub customer_id: Option<String>,
    pub salesperson_id: String,
    pub payment_method: PaymentMethod,
    pub status: SaleStatus,
    pub total_cents: i64,
    /// Due date for credit sales: ship date + credit term days.
    pub due_date: Option<NaiveDate>,
    pub shipped_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Sale {
    /// Returns the total as a Money type.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

/// A line on a sale.
///
/// ## Snapshot Pattern
/// `cost_cents_at_sale` freezes the product cost at the moment of
/// shipment. Later cost changes never rewrite history: margins and
/// commissions stay exactly as they were realized.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleLine {
    pub id: String,
    pub sale_id: String,
    /// `None` for free-text lines.
    pub product_id: Option<String>,
    pub name: String,
    pub cost_cents_at_sale: i64,
    pub sell_price_cents: i64,
    pub quantity: i64,
    pub subtotal_cents: i64,
    pub created_at: DateTime<Utc>,
}

impl SaleLine {
    /// The margin this line contributes: `(sell − cost) × quantity`.
    #[inline]
    pub fn margin(&self) -> Money {
        Money::from_cents((self.sell_price_cents - self.cost_cents_at_sale) * self.quantity)
    }
}

/// One returned line in a reversal: how many units of which sale line
/// come back to stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnLine {
    pub sale_line_id: String,
    pub quantity: i64,
}

// =============================================================================
// Receivable / Payable
// =============================================================================

/// Settlement status shared by receivables and payables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum SettlementStatus {
    /// Balance outstanding.
    Open,
    /// Amortized to exactly zero.
    Paid,
}

/// Amount owed to the business by a customer, amortized over time.
///
/// Created only for credit sales. `remaining_cents` decreases
/// monotonically and never goes negative; `status` flips to `Paid`
/// exactly when it reaches zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Receivable {
    pub id: String,
    pub tenant_id: String,
    pub sale_id: String,
    pub customer_id: Option<String>,
    pub total_cents: i64,
    pub remaining_cents: i64,
    pub due_date: NaiveDate,
    pub status: SettlementStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Amount owed by the business to a supplier. Mirror of [`Receivable`],
/// opened by the purchase-commit flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Payable {
    pub id: String,
    pub tenant_id: String,
    pub purchase_id: String,
    pub supplier_id: Option<String>,
    pub total_cents: i64,
    pub remaining_cents: i64,
    pub due_date: NaiveDate,
    pub status: SettlementStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Commission
// =============================================================================

/// Payout status of a commission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
pub enum CommissionStatus {
    /// Credit sale: realized only once the receivable might be collected.
    Pending,
    /// Cash sale: realized immediately.
    Paid,
    /// Scaled to zero (or below) by returns.
    Voided,
}

/// A salesperson's margin-based commission on one sale.
///
/// Created at most once per sale, and only when the computed amount is
/// positive: no negative commission is ever recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Commission {
    pub id: String,
    pub tenant_id: String,
    pub sale_id: String,
    pub salesperson_id: String,
    pub rate_bps: i64,
    pub amount_cents: i64,
    pub status: CommissionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Commission {
    /// Returns the amount as a Money type.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }

    /// Returns the rate.
    #[inline]
    pub fn rate(&self) -> CommissionRate {
        CommissionRate::from_bps(self.rate_bps)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
