//! # Order Workflow
//!
//! The order state machine: the only entry point the route layer calls
//! for order lifecycle events. It owns the transition policy and the
//! transactions that compose every downstream side effect.
//!
//! ## The Ship Transition
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     ship_order(tenant, order, account?)                 │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │                                                                 │   │
//! │  │  1. order must be APPROVED            (InvalidState)            │   │
//! │  │  2. cash ⇒ account id supplied        (MissingCashAccount)      │   │
//! │  │  3. due date = today + credit term                              │   │
//! │  │  4. INSERT sale + lines, cost snapshot (ProductNotFound)        │   │
//! │  │  5. stock -= line quantities           (InsufficientStock)      │   │
//! │  │  6. cash   ⇒ ledger IN entry + balance                          │   │
//! │  │     credit ⇒ open receivable                                    │   │
//! │  │  7. commission = Σ margins × rate      (suppressed unless > 0)  │   │
//! │  │  8. order → SHIPPED                                             │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← All eight steps or none: a failure at any step leaves the   │
//! │           order APPROVED with zero new rows anywhere.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The return path composes the same primitives in reverse (sale total,
//! receivable, ledger, commission, stock) inside one transaction of its
//! own.

use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::FlowResult;
use crate::ledger::LedgerService;
use crate::repository::commission::CommissionRepository;
use crate::repository::order::OrderRepository;
use crate::repository::product::ProductRepository;
use crate::repository::sale::SaleRepository;
use crate::repository::settlement::SettlementRepository;
use ledgerline_core::validation::{validate_credit_term_days, validate_lines};
use ledgerline_core::{
    commission, lifecycle, Commission, CommissionStatus, CoreError, Direction, LineSource,
    Money, Order, OrderLineDraft, OrderStatus, PaymentMethod, Product, ReturnLine, Sale,
    SaleLine, SaleStatus, Salesperson, StockPolicy, ValidationError,
};

/// The order state machine over a connection pool.
///
/// Stateless apart from configuration: each method begins and commits
/// its own transaction, so concurrent requests are isolated by the
/// store, not by this struct.
#[derive(Debug, Clone)]
pub struct OrderWorkflow {
    pool: SqlitePool,
    /// Stock policy applied to shipment decrements. `Enforce` unless the
    /// deployment explicitly opts into overselling.
    stock_policy: StockPolicy,
}

impl OrderWorkflow {
    /// Creates a workflow with the default (enforcing) stock policy.
    pub fn new(pool: SqlitePool) -> Self {
        OrderWorkflow {
            pool,
            stock_policy: StockPolicy::Enforce,
        }
    }

    /// Overrides the stock policy for every shipment this workflow runs.
    ///
    /// The legacy system silently allowed negative stock; here it is a
    /// deployment-level decision, never a default.
    pub fn with_stock_policy(mut self, policy: StockPolicy) -> Self {
        self.stock_policy = policy;
        self
    }

    // =========================================================================
    // Create / Edit / Read
    // =========================================================================

    /// Creates an order in `Pending` with the supplied lines.
    ///
    /// No side effects beyond the order and line writes.
    ///
    /// ## Returns
    /// The new order's id.
    pub async fn create_order(
        &self,
        tenant_id: &str,
        salesperson_id: &str,
        customer_id: Option<&str>,
        payment_method: PaymentMethod,
        credit_term_days: Option<i64>,
        lines: &[OrderLineDraft],
    ) -> FlowResult<String> {
        validate_lines(lines)?;
        validate_credit_term_days(credit_term_days)?;

        let mut tx = self.pool.begin().await?;

        // The drafting salesperson must exist under this tenant.
        Self::fetch_salesperson(&mut tx, tenant_id, salesperson_id).await?;

        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            salesperson_id: salesperson_id.to_string(),
            customer_id: customer_id.map(str::to_string),
            payment_method,
            credit_term_days,
            status: OrderStatus::Pending,
            total_cents: lines.iter().map(OrderLineDraft::subtotal_cents).sum(),
            created_at: now,
            updated_at: now,
        };

        OrderRepository::insert_order_with(&mut tx, &order).await?;
        OrderRepository::replace_lines_with(&mut tx, &order.id, lines).await?;

        tx.commit().await?;

        info!(
            order_id = %order.id,
            total = %order.total_cents,
            lines = lines.len(),
            "Order created"
        );

        Ok(order.id)
    }

    /// Replaces a pending order's lines wholesale and recomputes the
    /// total. Salesperson-only: the order is invisible to anyone else.
    pub async fn edit_order(
        &self,
        tenant_id: &str,
        order_id: &str,
        salesperson_id: &str,
        lines: &[OrderLineDraft],
    ) -> FlowResult<Order> {
        validate_lines(lines)?;

        let mut tx = self.pool.begin().await?;

        let order = OrderRepository::get_with(&mut tx, tenant_id, order_id)
            .await?
            // A foreign salesperson's order reads as absent, same as a
            // foreign tenant's.
            .filter(|o| o.salesperson_id == salesperson_id)
            .ok_or_else(|| CoreError::not_found("Order", order_id))?;

        if !lifecycle::is_editable(order.status) {
            return Err(CoreError::invalid_state(order_id, order.status, "edit").into());
        }

        let total = OrderRepository::replace_lines_with(&mut tx, order_id, lines).await?;
        OrderRepository::set_status_and_total_with(&mut tx, order_id, order.status, total)
            .await?;

        let updated = OrderRepository::get_with(&mut tx, tenant_id, order_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Order", order_id))?;

        tx.commit().await?;

        info!(order_id = %order_id, total = %updated.total_cents, "Order edited");

        Ok(updated)
    }

    // =========================================================================
    // Approve / Reject
    // =========================================================================

    /// Reconciles the order's lines against an admin-supplied target set
    /// and moves the order to `Approved`.
    ///
    /// Re-approving an already approved order is idempotent: it runs the
    /// same reconciliation with no further side effects.
    pub async fn approve_order(
        &self,
        tenant_id: &str,
        order_id: &str,
        targets: &[OrderLineDraft],
    ) -> FlowResult<Order> {
        validate_lines(targets)?;

        let mut tx = self.pool.begin().await?;

        let order = OrderRepository::get_with(&mut tx, tenant_id, order_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Order", order_id))?;

        lifecycle::ensure_transition(order_id, order.status, OrderStatus::Approved, "approve")?;

        let total = OrderRepository::reconcile_lines_with(&mut tx, order_id, targets).await?;
        OrderRepository::set_status_and_total_with(
            &mut tx,
            order_id,
            OrderStatus::Approved,
            total,
        )
        .await?;

        let updated = OrderRepository::get_with(&mut tx, tenant_id, order_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Order", order_id))?;

        tx.commit().await?;

        info!(order_id = %order_id, total = %updated.total_cents, "Order approved");

        Ok(updated)
    }

    /// Cancels an order that has not shipped.
    ///
    /// Nothing was committed yet, so there are no inventory or ledger
    /// side effects to undo.
    pub async fn reject_order(&self, tenant_id: &str, order_id: &str) -> FlowResult<()> {
        let mut tx = self.pool.begin().await?;

        let order = OrderRepository::get_with(&mut tx, tenant_id, order_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Order", order_id))?;

        lifecycle::ensure_transition(order_id, order.status, OrderStatus::Cancelled, "reject")?;

        OrderRepository::set_status_with(&mut tx, order_id, OrderStatus::Cancelled).await?;

        tx.commit().await?;

        info!(order_id = %order_id, "Order rejected");

        Ok(())
    }

    // =========================================================================
    // Ship
    // =========================================================================

    /// Ships an approved order: creates the sale, decrements stock,
    /// settles cash or opens a receivable, computes the commission, and
    /// marks the order shipped — all as one atomic unit.
    ///
    /// ## Returns
    /// The new sale's id.
    pub async fn ship_order(
        &self,
        tenant_id: &str,
        order_id: &str,
        cash_account_id: Option<&str>,
    ) -> FlowResult<String> {
        let mut tx = self.pool.begin().await?;

        // 1. Precondition: approved, and nothing else. Re-running ship on
        //    a shipped order fails here, inside the transaction.
        let order = OrderRepository::get_with(&mut tx, tenant_id, order_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Order", order_id))?;

        lifecycle::ensure_transition(order_id, order.status, OrderStatus::Shipped, "ship")?;

        // 2. Cash needs somewhere for the money to land.
        if order.payment_method == PaymentMethod::Cash && cash_account_id.is_none() {
            return Err(CoreError::MissingCashAccount.into());
        }

        // 3. Due date: today + credit term (0 if absent).
        let today = Utc::now().date_naive();
        let due_date = today + Duration::days(order.credit_term_days.unwrap_or(0));

        // 4. Sale header and snapshot lines.
        let now = Utc::now();
        let sale = Sale {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            order_id: order_id.to_string(),
            customer_id: order.customer_id.clone(),
            salesperson_id: order.salesperson_id.clone(),
            payment_method: order.payment_method,
            status: match order.payment_method {
                PaymentMethod::Cash => SaleStatus::Paid,
                PaymentMethod::Credit => SaleStatus::Unpaid,
            },
            total_cents: order.total_cents,
            due_date: match order.payment_method {
                PaymentMethod::Cash => None,
                PaymentMethod::Credit => Some(due_date),
            },
            shipped_at: now,
            created_at: now,
        };

        SaleRepository::insert_sale_with(&mut tx, &sale).await?;

        let order_lines = OrderRepository::get_lines_with(&mut tx, order_id).await?;
        let mut sale_lines = Vec::with_capacity(order_lines.len());

        for line in &order_lines {
            let (product_id, cost_cents_at_sale) = match &line.source {
                LineSource::Catalog { product_id } => {
                    let product =
                        Self::fetch_live_product(&mut tx, tenant_id, product_id).await?;
                    (Some(product.id), product.cost_cents)
                }
                LineSource::FreeText => (None, 0),
            };

            let sale_line = SaleLine {
                id: Uuid::new_v4().to_string(),
                sale_id: sale.id.clone(),
                product_id,
                name: line.name.clone(),
                cost_cents_at_sale,
                sell_price_cents: line.unit_price_cents,
                quantity: line.quantity,
                subtotal_cents: line.subtotal_cents,
                created_at: now,
            };

            SaleRepository::insert_line_with(&mut tx, &sale_line).await?;
            sale_lines.push(sale_line);
        }

        // 5. Inventory: one decrement per catalog line.
        for sale_line in &sale_lines {
            if let Some(product_id) = sale_line.product_id.as_deref() {
                ProductRepository::adjust_stock_with(
                    &mut tx,
                    tenant_id,
                    product_id,
                    -sale_line.quantity,
                    self.stock_policy,
                )
                .await?;
            }
        }

        // 6. Settlement: cash lands in the account, credit opens a
        //    receivable. Zero-total sales move no money and owe none.
        if sale.total_cents > 0 {
            match order.payment_method {
                PaymentMethod::Cash => {
                    // Present by the step-2 precondition
                    let account_id = cash_account_id.ok_or(CoreError::MissingCashAccount)?;
                    LedgerService::record_with(
                        &mut tx,
                        tenant_id,
                        account_id,
                        now,
                        sale.total_cents,
                        Direction::In,
                        &format!("Sale {} shipped (order {})", sale.id, order_id),
                    )
                    .await?;
                }
                PaymentMethod::Credit => {
                    SettlementRepository::open_receivable_with(
                        &mut tx,
                        tenant_id,
                        &sale.id,
                        sale.customer_id.as_deref(),
                        sale.total_cents,
                        due_date,
                    )
                    .await?;
                }
            }
        }

        // 7. Commission: the salesperson's per-method rate over the sum
        //    of line margins. Non-positive amounts create nothing.
        let salesperson =
            Self::fetch_salesperson(&mut tx, tenant_id, &order.salesperson_id).await?;
        let rate = salesperson.commission_rates().rate_for(order.payment_method);
        let amount = commission::compute(&sale_lines, rate);

        if amount.is_positive() {
            let commission = Commission {
                id: Uuid::new_v4().to_string(),
                tenant_id: tenant_id.to_string(),
                sale_id: sale.id.clone(),
                salesperson_id: order.salesperson_id.clone(),
                rate_bps: rate.bps(),
                amount_cents: amount.cents(),
                status: match order.payment_method {
                    PaymentMethod::Cash => CommissionStatus::Paid,
                    PaymentMethod::Credit => CommissionStatus::Pending,
                },
                created_at: now,
                updated_at: now,
            };
            CommissionRepository::insert_with(&mut tx, &commission).await?;
        } else {
            debug!(sale_id = %sale.id, margin = %amount, "Commission suppressed");
        }

        // 8. The order leaves the state machine.
        OrderRepository::set_status_with(&mut tx, order_id, OrderStatus::Shipped).await?;

        tx.commit().await?;

        info!(
            order_id = %order_id,
            sale_id = %sale.id,
            total = %sale.total_cents,
            method = ?order.payment_method,
            "Order shipped"
        );

        Ok(sale.id)
    }

    // =========================================================================
    // Return / Void
    // =========================================================================

    /// Reverses part (or all) of a shipped sale.
    ///
    /// Atomically: scales the sale total down (void marker at zero),
    /// reduces the linked receivable (paid marker at zero), records the
    /// opposite-direction ledger entry, claws back the rate-scaled
    /// commission portion (void marker at or below zero), and restores
    /// stock for the returned lines. A partial return leaves all five
    /// consistently scaled, never independently adjusted.
    pub async fn reverse_for_return(
        &self,
        tenant_id: &str,
        sale_id: &str,
        returned_cents: i64,
        line_adjustments: &[ReturnLine],
        cash_account_id: &str,
    ) -> FlowResult<()> {
        if returned_cents <= 0 {
            return Err(CoreError::InvalidAmount {
                amount_cents: returned_cents,
            }
            .into());
        }

        let mut tx = self.pool.begin().await?;

        let sale = SaleRepository::get_with(&mut tx, tenant_id, sale_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Sale", sale_id))?;

        if returned_cents > sale.total_cents {
            return Err(CoreError::OverPayment {
                amount_cents: returned_cents,
                remaining_cents: sale.total_cents,
            }
            .into());
        }

        // (a) Sale total down, void marker at zero.
        SaleRepository::reduce_total_with(&mut tx, sale_id, returned_cents, sale.total_cents)
            .await?;

        // (b) Linked receivable down by the same amount (credit sales).
        if let Some(receivable) =
            SettlementRepository::get_receivable_by_sale_with(&mut tx, tenant_id, sale_id)
                .await?
        {
            SettlementRepository::reduce_receivable_with(&mut tx, &receivable, returned_cents)
                .await?;
        }

        // (c) Opposite-direction ledger entry referencing the sale.
        LedgerService::record_with(
            &mut tx,
            tenant_id,
            cash_account_id,
            Utc::now(),
            returned_cents,
            Direction::In.reversed(),
            &format!("Return against sale {}", sale_id),
        )
        .await?;

        // (d) Commission clawback, proportional to the returned value.
        if let Some(commission) =
            CommissionRepository::get_by_sale_with(&mut tx, tenant_id, sale_id).await?
        {
            let clawback =
                commission::return_clawback(Money::from_cents(returned_cents), commission.rate());
            CommissionRepository::reduce_with(&mut tx, &commission, clawback.cents()).await?;
        }

        // (e) Returned units go back on the shelf.
        for adjustment in line_adjustments {
            let line =
                SaleRepository::get_line_with(&mut tx, sale_id, &adjustment.sale_line_id)
                    .await?
                    .ok_or_else(|| {
                        CoreError::not_found("Sale line", adjustment.sale_line_id.as_str())
                    })?;

            if adjustment.quantity <= 0 || adjustment.quantity > line.quantity {
                return Err(CoreError::Validation(ValidationError::OutOfRange {
                    field: "return quantity".to_string(),
                    min: 1,
                    max: line.quantity,
                })
                .into());
            }

            if let Some(product_id) = line.product_id.as_deref() {
                ProductRepository::adjust_stock_with(
                    &mut tx,
                    tenant_id,
                    product_id,
                    adjustment.quantity,
                    StockPolicy::Enforce,
                )
                .await?;
            }
        }

        tx.commit().await?;

        info!(
            sale_id = %sale_id,
            returned = %returned_cents,
            lines = line_adjustments.len(),
            "Sale reversed for return"
        );

        Ok(())
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    /// Fetches a salesperson inside a workflow transaction.
    async fn fetch_salesperson(
        conn: &mut sqlx::SqliteConnection,
        tenant_id: &str,
        salesperson_id: &str,
    ) -> FlowResult<Salesperson> {
        let salesperson = sqlx::query_as::<_, Salesperson>(
            r#"
            SELECT id, tenant_id, name, cash_rate_bps, credit_rate_bps, created_at
            FROM salespeople
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(salesperson_id)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?;

        salesperson
            .ok_or_else(|| CoreError::not_found("Salesperson", salesperson_id).into())
    }

    /// Fetches a product for the cost snapshot. A missing or deactivated
    /// product fails the whole shipment.
    async fn fetch_live_product(
        conn: &mut sqlx::SqliteConnection,
        tenant_id: &str,
        product_id: &str,
    ) -> FlowResult<Product> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, tenant_id, sku, name,
                   cost_cents, price_cents, stock_quantity,
                   allow_negative_stock, is_active, created_at, updated_at
            FROM products
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(product_id)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?;

        match product {
            Some(p) if p.is_active => Ok(p),
            _ => Err(CoreError::ProductNotFound {
                product_id: product_id.to_string(),
            }
            .into()),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FlowError;
    use crate::pool::{Database, DbConfig};
    use crate::repository::product::NewProduct;
    use ledgerline_core::OrderFilter;

    /// Everything a workflow test needs: one tenant, one salesperson
    /// (3% cash / 10% credit), one cash account, one stocked product.
    struct Ctx {
        db: Database,
        tenant_id: String,
        salesperson_id: String,
        account_id: String,
        product_id: String,
    }

    async fn setup() -> Ctx {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tenant = db.tenants().create_tenant("Toko Sinar").await.unwrap();
        let salesperson = db
            .tenants()
            .create_salesperson(&tenant.id, "Ari", 300, 1000)
            .await
            .unwrap();
        let account = db.cash_accounts().create(&tenant.id, "Till").await.unwrap();
        let product = db
            .products()
            .create(
                &tenant.id,
                NewProduct {
                    sku: "WID-1".to_string(),
                    name: "Widget".to_string(),
                    cost_cents: 50,
                    price_cents: 100,
                    stock_quantity: 100,
                    allow_negative_stock: false,
                },
            )
            .await
            .unwrap();

        Ctx {
            db,
            tenant_id: tenant.id,
            salesperson_id: salesperson.id,
            account_id: account.id,
            product_id: product.id,
        }
    }

    fn catalog_line(product_id: &str, price: i64, qty: i64) -> OrderLineDraft {
        OrderLineDraft {
            id: None,
            source: LineSource::Catalog {
                product_id: product_id.to_string(),
            },
            name: "Widget".to_string(),
            unit_price_cents: price,
            quantity: qty,
        }
    }

    fn free_line(name: &str, price: i64, qty: i64) -> OrderLineDraft {
        OrderLineDraft {
            id: None,
            source: LineSource::FreeText,
            name: name.to_string(),
            unit_price_cents: price,
            quantity: qty,
        }
    }

    /// Shorthand: create → approve (same lines) → return order id.
    async fn approved_order(
        ctx: &Ctx,
        method: PaymentMethod,
        term: Option<i64>,
        lines: Vec<OrderLineDraft>,
    ) -> String {
        let wf = ctx.db.order_workflow();
        let order_id = wf
            .create_order(
                &ctx.tenant_id,
                &ctx.salesperson_id,
                Some("cust-1"),
                method,
                term,
                &lines,
            )
            .await
            .unwrap();
        wf.approve_order(&ctx.tenant_id, &order_id, &lines).await.unwrap();
        order_id
    }

    async fn order_total_matches_lines(ctx: &Ctx, order_id: &str) {
        let order = ctx.db.orders().get(&ctx.tenant_id, order_id).await.unwrap().unwrap();
        let lines = ctx.db.orders().get_lines(order_id).await.unwrap();
        let sum: i64 = lines.iter().map(|l| l.subtotal_cents).sum();
        assert_eq!(order.total_cents, sum, "order total invariant violated");
    }

    async fn balance_invariant(ctx: &Ctx) {
        let account = ctx
            .db
            .cash_accounts()
            .get(&ctx.tenant_id, &ctx.account_id)
            .await
            .unwrap()
            .unwrap();
        let sum = ctx
            .db
            .ledger()
            .entry_sum_cents(&ctx.tenant_id, &ctx.account_id)
            .await
            .unwrap();
        assert_eq!(account.balance_cents, sum, "balance invariant violated");
    }

    // -------------------------------------------------------------------------
    // Create / Edit
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_create_then_edit_replaces_lines_wholesale() {
        let ctx = setup().await;
        let wf = ctx.db.order_workflow();

        // qty 3 @ 100 + qty 2 @ 50 = 400
        let order_id = wf
            .create_order(
                &ctx.tenant_id,
                &ctx.salesperson_id,
                None,
                PaymentMethod::Cash,
                None,
                &[
                    catalog_line(&ctx.product_id, 100, 3),
                    free_line("Delivery", 50, 2),
                ],
            )
            .await
            .unwrap();

        let order = ctx.db.orders().get(&ctx.tenant_id, &order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_cents, 400);
        order_total_matches_lines(&ctx, &order_id).await;

        // Edit while pending: 1 line qty 1 @ 400, old lines gone
        let order = wf
            .edit_order(
                &ctx.tenant_id,
                &order_id,
                &ctx.salesperson_id,
                &[free_line("Bundle", 400, 1)],
            )
            .await
            .unwrap();
        assert_eq!(order.total_cents, 400);

        let lines = ctx.db.orders().get_lines(&order_id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].name, "Bundle");
        order_total_matches_lines(&ctx, &order_id).await;
    }

    #[tokio::test]
    async fn test_edit_is_scoped_to_the_drafting_salesperson() {
        let ctx = setup().await;
        let wf = ctx.db.order_workflow();

        let order_id = wf
            .create_order(
                &ctx.tenant_id,
                &ctx.salesperson_id,
                None,
                PaymentMethod::Cash,
                None,
                &[free_line("Thing", 100, 1)],
            )
            .await
            .unwrap();

        let other = ctx
            .db
            .tenants()
            .create_salesperson(&ctx.tenant_id, "Budi", 0, 0)
            .await
            .unwrap();

        let err = wf
            .edit_order(&ctx.tenant_id, &order_id, &other.id, &[free_line("X", 1, 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Core(CoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_edit_after_approval_is_invalid_state() {
        let ctx = setup().await;
        let wf = ctx.db.order_workflow();
        let order_id =
            approved_order(&ctx, PaymentMethod::Cash, None, vec![free_line("T", 100, 1)]).await;

        let err = wf
            .edit_order(
                &ctx.tenant_id,
                &order_id,
                &ctx.salesperson_id,
                &[free_line("X", 1, 1)],
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FlowError::Core(CoreError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn test_create_rejects_empty_lines_and_unknown_salesperson() {
        let ctx = setup().await;
        let wf = ctx.db.order_workflow();

        let err = wf
            .create_order(
                &ctx.tenant_id,
                &ctx.salesperson_id,
                None,
                PaymentMethod::Cash,
                None,
                &[],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Core(CoreError::Validation(_))));

        let err = wf
            .create_order(
                &ctx.tenant_id,
                "ghost",
                None,
                PaymentMethod::Cash,
                None,
                &[free_line("T", 100, 1)],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Core(CoreError::NotFound { .. })));
    }

    // -------------------------------------------------------------------------
    // Approve / Reject
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_approve_inserts_new_target_lines() {
        let ctx = setup().await;
        let wf = ctx.db.order_workflow();

        let order_id = wf
            .create_order(
                &ctx.tenant_id,
                &ctx.salesperson_id,
                None,
                PaymentMethod::Cash,
                None,
                &[free_line("Draft line", 10, 1)],
            )
            .await
            .unwrap();

        // Target set: one fresh line qty 5 @ 20 → total 100
        let order = wf
            .approve_order(&ctx.tenant_id, &order_id, &[free_line("Approved line", 20, 5)])
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Approved);
        assert_eq!(order.total_cents, 100);

        let lines = ctx.db.orders().get_lines(&order_id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].name, "Approved line");
        order_total_matches_lines(&ctx, &order_id).await;
    }

    #[tokio::test]
    async fn test_approve_reconciles_update_delete_insert() {
        let ctx = setup().await;
        let wf = ctx.db.order_workflow();

        let order_id = wf
            .create_order(
                &ctx.tenant_id,
                &ctx.salesperson_id,
                None,
                PaymentMethod::Cash,
                None,
                &[free_line("Keep me", 100, 1), free_line("Drop me", 50, 2)],
            )
            .await
            .unwrap();

        let stored = ctx.db.orders().get_lines(&order_id).await.unwrap();
        let keep = stored.iter().find(|l| l.name == "Keep me").unwrap();

        // Update the kept line (qty 1 → 3), drop the other, insert a new one
        let targets = vec![
            OrderLineDraft {
                id: Some(keep.id.clone()),
                source: LineSource::FreeText,
                name: "Keep me".to_string(),
                unit_price_cents: 100,
                quantity: 3,
            },
            free_line("Brand new", 25, 2),
        ];

        let order = wf.approve_order(&ctx.tenant_id, &order_id, &targets).await.unwrap();
        assert_eq!(order.total_cents, 350);

        let lines = ctx.db.orders().get_lines(&order_id).await.unwrap();
        assert_eq!(lines.len(), 2);
        let kept = lines.iter().find(|l| l.id == keep.id).unwrap();
        assert_eq!(kept.quantity, 3);
        assert!(lines.iter().any(|l| l.name == "Brand new"));
        assert!(!lines.iter().any(|l| l.name == "Drop me"));
        order_total_matches_lines(&ctx, &order_id).await;
    }

    #[tokio::test]
    async fn test_reapproval_is_idempotent() {
        let ctx = setup().await;
        let wf = ctx.db.order_workflow();
        let lines = vec![free_line("T", 100, 2)];
        let order_id = approved_order(&ctx, PaymentMethod::Cash, None, lines.clone()).await;

        let again = wf.approve_order(&ctx.tenant_id, &order_id, &lines).await.unwrap();
        assert_eq!(again.status, OrderStatus::Approved);
        assert_eq!(again.total_cents, 200);
        assert_eq!(ctx.db.orders().get_lines(&order_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reject_cancels_and_is_terminal() {
        let ctx = setup().await;
        let wf = ctx.db.order_workflow();

        let order_id = wf
            .create_order(
                &ctx.tenant_id,
                &ctx.salesperson_id,
                None,
                PaymentMethod::Cash,
                None,
                &[free_line("T", 100, 1)],
            )
            .await
            .unwrap();

        wf.reject_order(&ctx.tenant_id, &order_id).await.unwrap();
        let order = ctx.db.orders().get(&ctx.tenant_id, &order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Cancelled);

        // No transition leaves Cancelled
        let err = wf
            .approve_order(&ctx.tenant_id, &order_id, &[free_line("T", 100, 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Core(CoreError::InvalidState { .. })));

        let err = wf.reject_order(&ctx.tenant_id, &order_id).await.unwrap_err();
        assert!(matches!(err, FlowError::Core(CoreError::InvalidState { .. })));
    }

    // -------------------------------------------------------------------------
    // Ship — cash
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_ship_cash_order_settles_into_the_account() {
        let ctx = setup().await;
        let wf = ctx.db.order_workflow();

        // Opening balance 500
        ctx.db
            .ledger()
            .record(&ctx.tenant_id, &ctx.account_id, Utc::now(), 500, Direction::In, "Opening")
            .await
            .unwrap();

        let order_id = approved_order(
            &ctx,
            PaymentMethod::Cash,
            None,
            vec![catalog_line(&ctx.product_id, 100, 1)],
        )
        .await;

        let sale_id = wf
            .ship_order(&ctx.tenant_id, &order_id, Some(&ctx.account_id))
            .await
            .unwrap();

        // Balance 500 → 600, one IN entry of 100
        let account = ctx
            .db
            .cash_accounts()
            .get(&ctx.tenant_id, &ctx.account_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(account.balance_cents, 600);

        let entries = ctx.db.ledger().entries(&ctx.tenant_id, &ctx.account_id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].amount_cents, 100);
        assert_eq!(entries[1].direction, Direction::In);

        // Sale is paid immediately, no receivable, no due date
        let sale = ctx.db.sales().get(&ctx.tenant_id, &sale_id).await.unwrap().unwrap();
        assert_eq!(sale.status, SaleStatus::Paid);
        assert_eq!(sale.total_cents, 100);
        assert!(sale.due_date.is_none());
        assert!(ctx
            .db
            .settlements()
            .get_receivable_by_sale(&ctx.tenant_id, &sale_id)
            .await
            .unwrap()
            .is_none());

        // Cash commission is paid immediately: margin 50 × 3% = 2
        let commission = ctx
            .db
            .commissions()
            .get_by_sale(&ctx.tenant_id, &sale_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(commission.status, CommissionStatus::Paid);
        assert_eq!(commission.amount_cents, 2);

        // Stock decremented, order terminal
        let product = ctx.db.products().get(&ctx.tenant_id, &ctx.product_id).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, 99);
        let order = ctx.db.orders().get(&ctx.tenant_id, &order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Shipped);

        balance_invariant(&ctx).await;
    }

    #[tokio::test]
    async fn test_ship_cash_without_account_fails_clean() {
        let ctx = setup().await;
        let wf = ctx.db.order_workflow();
        let order_id = approved_order(
            &ctx,
            PaymentMethod::Cash,
            None,
            vec![catalog_line(&ctx.product_id, 100, 1)],
        )
        .await;

        let err = wf.ship_order(&ctx.tenant_id, &order_id, None).await.unwrap_err();
        assert!(matches!(
            err,
            FlowError::Core(CoreError::MissingCashAccount)
        ));

        // Order stays approved; nothing shipped
        let order = ctx.db.orders().get(&ctx.tenant_id, &order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Approved);
        assert_eq!(ctx.db.sales().count_for_order(&order_id).await.unwrap(), 0);
    }

    // -------------------------------------------------------------------------
    // Ship — credit
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_ship_credit_order_opens_receivable() {
        let ctx = setup().await;
        let wf = ctx.db.order_workflow();

        // qty 2 @ 100 = 200, 30-day term
        let order_id = approved_order(
            &ctx,
            PaymentMethod::Credit,
            Some(30),
            vec![catalog_line(&ctx.product_id, 100, 2)],
        )
        .await;

        let sale_id = wf.ship_order(&ctx.tenant_id, &order_id, None).await.unwrap();

        let sale = ctx.db.sales().get(&ctx.tenant_id, &sale_id).await.unwrap().unwrap();
        assert_eq!(sale.status, SaleStatus::Unpaid);
        assert_eq!(sale.total_cents, 200);

        let expected_due = Utc::now().date_naive() + Duration::days(30);
        assert_eq!(sale.due_date, Some(expected_due));

        let receivable = ctx
            .db
            .settlements()
            .get_receivable_by_sale(&ctx.tenant_id, &sale_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(receivable.total_cents, 200);
        assert_eq!(receivable.remaining_cents, 200);
        assert_eq!(receivable.status, ledgerline_core::SettlementStatus::Open);
        assert_eq!(receivable.due_date, expected_due);

        // Credit commission waits for collection: margin 100 × 10% = 10
        let commission = ctx
            .db
            .commissions()
            .get_by_sale(&ctx.tenant_id, &sale_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(commission.status, CommissionStatus::Pending);
        assert_eq!(commission.amount_cents, 10);

        // No cash moved
        assert_eq!(
            ctx.db.ledger().entries(&ctx.tenant_id, &ctx.account_id).await.unwrap().len(),
            0
        );
    }

    #[tokio::test]
    async fn test_receivable_payment_amortizes_and_lands_in_cash() {
        let ctx = setup().await;
        let wf = ctx.db.order_workflow();
        let order_id = approved_order(
            &ctx,
            PaymentMethod::Credit,
            Some(14),
            vec![catalog_line(&ctx.product_id, 100, 2)],
        )
        .await;
        let sale_id = wf.ship_order(&ctx.tenant_id, &order_id, None).await.unwrap();

        let receivable = ctx
            .db
            .settlements()
            .get_receivable_by_sale(&ctx.tenant_id, &sale_id)
            .await
            .unwrap()
            .unwrap();

        let receivable = ctx
            .db
            .settlements()
            .apply_receivable_payment(&ctx.tenant_id, &receivable.id, 200, &ctx.account_id)
            .await
            .unwrap();
        assert_eq!(receivable.remaining_cents, 0);
        assert_eq!(receivable.status, ledgerline_core::SettlementStatus::Paid);

        let account = ctx
            .db
            .cash_accounts()
            .get(&ctx.tenant_id, &ctx.account_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(account.balance_cents, 200);
        balance_invariant(&ctx).await;
    }

    // -------------------------------------------------------------------------
    // Ship — state legality & atomicity
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_ship_refused_unless_approved_with_zero_side_effects() {
        let ctx = setup().await;
        let wf = ctx.db.order_workflow();

        let order_id = wf
            .create_order(
                &ctx.tenant_id,
                &ctx.salesperson_id,
                None,
                PaymentMethod::Cash,
                None,
                &[catalog_line(&ctx.product_id, 100, 1)],
            )
            .await
            .unwrap();

        // Pending → ship: refused
        let err = wf
            .ship_order(&ctx.tenant_id, &order_id, Some(&ctx.account_id))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Core(CoreError::InvalidState { .. })));

        // Cancelled → ship: refused
        wf.reject_order(&ctx.tenant_id, &order_id).await.unwrap();
        let err = wf
            .ship_order(&ctx.tenant_id, &order_id, Some(&ctx.account_id))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Core(CoreError::InvalidState { .. })));

        // Zero rows anywhere
        assert_eq!(ctx.db.sales().count_for_order(&order_id).await.unwrap(), 0);
        assert_eq!(
            ctx.db.ledger().entries(&ctx.tenant_id, &ctx.account_id).await.unwrap().len(),
            0
        );
        let product = ctx.db.products().get(&ctx.tenant_id, &ctx.product_id).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, 100);
    }

    #[tokio::test]
    async fn test_reshipping_a_shipped_order_is_refused() {
        let ctx = setup().await;
        let wf = ctx.db.order_workflow();
        let order_id = approved_order(
            &ctx,
            PaymentMethod::Cash,
            None,
            vec![catalog_line(&ctx.product_id, 100, 1)],
        )
        .await;

        wf.ship_order(&ctx.tenant_id, &order_id, Some(&ctx.account_id)).await.unwrap();

        let err = wf
            .ship_order(&ctx.tenant_id, &order_id, Some(&ctx.account_id))
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Core(CoreError::InvalidState { .. })));

        // Exactly one sale, exactly one ledger entry: no double-booking
        assert_eq!(ctx.db.sales().count_for_order(&order_id).await.unwrap(), 1);
        assert_eq!(
            ctx.db.ledger().entries(&ctx.tenant_id, &ctx.account_id).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn test_ship_rolls_back_wholesale_on_dead_product() {
        let ctx = setup().await;
        let wf = ctx.db.order_workflow();

        let doomed = ctx
            .db
            .products()
            .create(
                &ctx.tenant_id,
                NewProduct {
                    sku: "DOOM-1".to_string(),
                    name: "Doomed".to_string(),
                    cost_cents: 10,
                    price_cents: 20,
                    stock_quantity: 10,
                    allow_negative_stock: false,
                },
            )
            .await
            .unwrap();

        let order_id = approved_order(
            &ctx,
            PaymentMethod::Cash,
            None,
            vec![
                catalog_line(&ctx.product_id, 100, 2),
                catalog_line(&doomed.id, 20, 1),
            ],
        )
        .await;

        // The second line's product dies before shipment
        ctx.db.products().deactivate(&ctx.tenant_id, &doomed.id).await.unwrap();

        let err = wf
            .ship_order(&ctx.tenant_id, &order_id, Some(&ctx.account_id))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FlowError::Core(CoreError::ProductNotFound { .. })
        ));

        // The whole transition rolled back: order approved, no sale, no
        // ledger entry, first product's stock untouched
        let order = ctx.db.orders().get(&ctx.tenant_id, &order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Approved);
        assert_eq!(ctx.db.sales().count_for_order(&order_id).await.unwrap(), 0);
        assert_eq!(
            ctx.db.ledger().entries(&ctx.tenant_id, &ctx.account_id).await.unwrap().len(),
            0
        );
        let product = ctx.db.products().get(&ctx.tenant_id, &ctx.product_id).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, 100);
        balance_invariant(&ctx).await;
    }

    #[tokio::test]
    async fn test_ship_rolls_back_on_insufficient_stock() {
        let ctx = setup().await;
        let wf = ctx.db.order_workflow();

        let scarce = ctx
            .db
            .products()
            .create(
                &ctx.tenant_id,
                NewProduct {
                    sku: "SCARCE-1".to_string(),
                    name: "Scarce".to_string(),
                    cost_cents: 10,
                    price_cents: 20,
                    stock_quantity: 2,
                    allow_negative_stock: false,
                },
            )
            .await
            .unwrap();

        let order_id = approved_order(
            &ctx,
            PaymentMethod::Cash,
            None,
            vec![catalog_line(&scarce.id, 20, 5)],
        )
        .await;

        let err = wf
            .ship_order(&ctx.tenant_id, &order_id, Some(&ctx.account_id))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FlowError::Core(CoreError::InsufficientStock { available: 2, requested: 5, .. })
        ));

        let order = ctx.db.orders().get(&ctx.tenant_id, &order_id).await.unwrap().unwrap();
        assert_eq!(order.status, OrderStatus::Approved);
        assert_eq!(ctx.db.sales().count_for_order(&order_id).await.unwrap(), 0);
        let product = ctx.db.products().get(&ctx.tenant_id, &scarce.id).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, 2);
    }

    #[tokio::test]
    async fn test_oversell_workflow_opt_in_ships_past_zero() {
        let ctx = setup().await;
        let wf = ctx
            .db
            .order_workflow()
            .with_stock_policy(StockPolicy::AllowNegative);

        let scarce = ctx
            .db
            .products()
            .create(
                &ctx.tenant_id,
                NewProduct {
                    sku: "SCARCE-2".to_string(),
                    name: "Scarce".to_string(),
                    cost_cents: 10,
                    price_cents: 20,
                    stock_quantity: 2,
                    allow_negative_stock: false,
                },
            )
            .await
            .unwrap();

        let order_id = approved_order(
            &ctx,
            PaymentMethod::Cash,
            None,
            vec![catalog_line(&scarce.id, 20, 5)],
        )
        .await;

        wf.ship_order(&ctx.tenant_id, &order_id, Some(&ctx.account_id)).await.unwrap();

        let product = ctx.db.products().get(&ctx.tenant_id, &scarce.id).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, -3);
    }

    #[tokio::test]
    async fn test_free_text_lines_ship_without_stock_or_snapshot() {
        let ctx = setup().await;
        let wf = ctx.db.order_workflow();
        let order_id = approved_order(
            &ctx,
            PaymentMethod::Cash,
            None,
            vec![
                catalog_line(&ctx.product_id, 100, 1),
                free_line("Assembly service", 500, 1),
            ],
        )
        .await;

        let sale_id = wf
            .ship_order(&ctx.tenant_id, &order_id, Some(&ctx.account_id))
            .await
            .unwrap();

        let lines = ctx.db.sales().get_lines(&sale_id).await.unwrap();
        assert_eq!(lines.len(), 2);
        let service = lines.iter().find(|l| l.name == "Assembly service").unwrap();
        assert!(service.product_id.is_none());
        assert_eq!(service.cost_cents_at_sale, 0);

        // Only the catalog line moved stock
        let product = ctx.db.products().get(&ctx.tenant_id, &ctx.product_id).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, 99);
    }

    #[tokio::test]
    async fn test_cost_snapshot_survives_later_cost_changes() {
        let ctx = setup().await;
        let wf = ctx.db.order_workflow();
        let order_id = approved_order(
            &ctx,
            PaymentMethod::Cash,
            None,
            vec![catalog_line(&ctx.product_id, 100, 1)],
        )
        .await;
        let sale_id = wf
            .ship_order(&ctx.tenant_id, &order_id, Some(&ctx.account_id))
            .await
            .unwrap();

        // The product's cost changes after the sale
        sqlx::query("UPDATE products SET cost_cents = 90 WHERE id = ?1")
            .bind(&ctx.product_id)
            .execute(ctx.db.pool())
            .await
            .unwrap();

        let lines = ctx.db.sales().get_lines(&sale_id).await.unwrap();
        assert_eq!(lines[0].cost_cents_at_sale, 50);
    }

    #[tokio::test]
    async fn test_no_commission_without_margin() {
        let ctx = setup().await;
        let wf = ctx.db.order_workflow();

        // Sell at cost: margin 0
        let order_id = approved_order(
            &ctx,
            PaymentMethod::Cash,
            None,
            vec![catalog_line(&ctx.product_id, 50, 2)],
        )
        .await;
        let sale_id = wf
            .ship_order(&ctx.tenant_id, &order_id, Some(&ctx.account_id))
            .await
            .unwrap();

        assert!(ctx
            .db
            .commissions()
            .get_by_sale(&ctx.tenant_id, &sale_id)
            .await
            .unwrap()
            .is_none());

        // Sell below cost: negative margin, still no record
        let order_id = approved_order(
            &ctx,
            PaymentMethod::Cash,
            None,
            vec![catalog_line(&ctx.product_id, 30, 2)],
        )
        .await;
        let sale_id = wf
            .ship_order(&ctx.tenant_id, &order_id, Some(&ctx.account_id))
            .await
            .unwrap();

        assert!(ctx
            .db
            .commissions()
            .get_by_sale(&ctx.tenant_id, &sale_id)
            .await
            .unwrap()
            .is_none());
    }

    // -------------------------------------------------------------------------
    // Return / Void
    // -------------------------------------------------------------------------

    /// Ships a credit sale of qty 2 @ 100 (cost 50, 10% credit rate):
    /// total 200, receivable 200, commission 10.
    async fn shipped_credit_sale(ctx: &Ctx) -> String {
        let order_id = approved_order(
            ctx,
            PaymentMethod::Credit,
            Some(30),
            vec![catalog_line(&ctx.product_id, 100, 2)],
        )
        .await;
        ctx.db
            .order_workflow()
            .ship_order(&ctx.tenant_id, &order_id, None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_partial_return_scales_all_five_ledgers() {
        let ctx = setup().await;
        let wf = ctx.db.order_workflow();
        let sale_id = shipped_credit_sale(&ctx).await;

        let lines = ctx.db.sales().get_lines(&sale_id).await.unwrap();
        let line = &lines[0];

        // Return 50 (one unit comes back to the shelf)
        wf.reverse_for_return(
            &ctx.tenant_id,
            &sale_id,
            50,
            &[ReturnLine {
                sale_line_id: line.id.clone(),
                quantity: 1,
            }],
            &ctx.account_id,
        )
        .await
        .unwrap();

        let sale = ctx.db.sales().get(&ctx.tenant_id, &sale_id).await.unwrap().unwrap();
        assert_eq!(sale.total_cents, 150);
        assert_eq!(sale.status, SaleStatus::Unpaid);

        let receivable = ctx
            .db
            .settlements()
            .get_receivable_by_sale(&ctx.tenant_id, &sale_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(receivable.remaining_cents, 150);
        assert_eq!(receivable.status, ledgerline_core::SettlementStatus::Open);

        // One OUT reversal entry
        let entries = ctx.db.ledger().entries(&ctx.tenant_id, &ctx.account_id).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].direction, Direction::Out);
        assert_eq!(entries[0].amount_cents, 50);
        assert!(entries[0].memo.contains(&sale_id));

        // Commission 10 − (50 × 10%) = 5, still pending
        let commission = ctx
            .db
            .commissions()
            .get_by_sale(&ctx.tenant_id, &sale_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(commission.amount_cents, 5);
        assert_eq!(commission.status, CommissionStatus::Pending);

        // 100 − 2 shipped + 1 returned = 99
        let product = ctx.db.products().get(&ctx.tenant_id, &ctx.product_id).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, 99);

        balance_invariant(&ctx).await;
    }

    #[tokio::test]
    async fn test_full_return_voids_sale_and_commission() {
        let ctx = setup().await;
        let wf = ctx.db.order_workflow();
        let sale_id = shipped_credit_sale(&ctx).await;
        let lines = ctx.db.sales().get_lines(&sale_id).await.unwrap();
        let line = &lines[0];

        wf.reverse_for_return(
            &ctx.tenant_id,
            &sale_id,
            200,
            &[ReturnLine {
                sale_line_id: line.id.clone(),
                quantity: 2,
            }],
            &ctx.account_id,
        )
        .await
        .unwrap();

        let sale = ctx.db.sales().get(&ctx.tenant_id, &sale_id).await.unwrap().unwrap();
        assert_eq!(sale.total_cents, 0);
        assert_eq!(sale.status, SaleStatus::Voided);

        let receivable = ctx
            .db
            .settlements()
            .get_receivable_by_sale(&ctx.tenant_id, &sale_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(receivable.remaining_cents, 0);
        assert_eq!(receivable.status, ledgerline_core::SettlementStatus::Paid);

        let commission = ctx
            .db
            .commissions()
            .get_by_sale(&ctx.tenant_id, &sale_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(commission.amount_cents, 0);
        assert_eq!(commission.status, CommissionStatus::Voided);

        // Stock fully restored
        let product = ctx.db.products().get(&ctx.tenant_id, &ctx.product_id).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, 100);
    }

    #[tokio::test]
    async fn test_return_exceeding_sale_total_is_refused_clean() {
        let ctx = setup().await;
        let wf = ctx.db.order_workflow();
        let sale_id = shipped_credit_sale(&ctx).await;

        let err = wf
            .reverse_for_return(&ctx.tenant_id, &sale_id, 250, &[], &ctx.account_id)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FlowError::Core(CoreError::OverPayment {
                amount_cents: 250,
                remaining_cents: 200,
            })
        ));

        // Untouched
        let sale = ctx.db.sales().get(&ctx.tenant_id, &sale_id).await.unwrap().unwrap();
        assert_eq!(sale.total_cents, 200);
        assert_eq!(
            ctx.db.ledger().entries(&ctx.tenant_id, &ctx.account_id).await.unwrap().len(),
            0
        );
    }

    #[tokio::test]
    async fn test_return_with_bad_line_quantity_rolls_back() {
        let ctx = setup().await;
        let wf = ctx.db.order_workflow();
        let sale_id = shipped_credit_sale(&ctx).await;
        let lines = ctx.db.sales().get_lines(&sale_id).await.unwrap();
        let line = &lines[0];

        // Returning 3 of a 2-unit line fails after the sale/receivable/
        // ledger steps already ran inside the transaction
        let err = wf
            .reverse_for_return(
                &ctx.tenant_id,
                &sale_id,
                50,
                &[ReturnLine {
                    sale_line_id: line.id.clone(),
                    quantity: 3,
                }],
                &ctx.account_id,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Core(CoreError::Validation(_))));

        // Everything rolled back together
        let sale = ctx.db.sales().get(&ctx.tenant_id, &sale_id).await.unwrap().unwrap();
        assert_eq!(sale.total_cents, 200);
        let receivable = ctx
            .db
            .settlements()
            .get_receivable_by_sale(&ctx.tenant_id, &sale_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(receivable.remaining_cents, 200);
        assert_eq!(
            ctx.db.ledger().entries(&ctx.tenant_id, &ctx.account_id).await.unwrap().len(),
            0
        );
        balance_invariant(&ctx).await;
    }

    // -------------------------------------------------------------------------
    // Listing & tenancy
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_list_orders_filters_by_status() {
        let ctx = setup().await;
        let wf = ctx.db.order_workflow();

        let pending = wf
            .create_order(
                &ctx.tenant_id,
                &ctx.salesperson_id,
                None,
                PaymentMethod::Cash,
                None,
                &[free_line("A", 100, 1)],
            )
            .await
            .unwrap();
        let _approved =
            approved_order(&ctx, PaymentMethod::Cash, None, vec![free_line("B", 100, 1)]).await;

        let all = ctx
            .db
            .orders()
            .list(&ctx.tenant_id, &OrderFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let only_pending = ctx
            .db
            .orders()
            .list(
                &ctx.tenant_id,
                &OrderFilter {
                    status: Some(OrderStatus::Pending),
                    salesperson_id: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(only_pending.len(), 1);
        assert_eq!(only_pending[0].id, pending);
    }

    #[tokio::test]
    async fn test_orders_are_invisible_across_tenants() {
        let ctx = setup().await;
        let wf = ctx.db.order_workflow();
        let order_id = wf
            .create_order(
                &ctx.tenant_id,
                &ctx.salesperson_id,
                None,
                PaymentMethod::Cash,
                None,
                &[free_line("A", 100, 1)],
            )
            .await
            .unwrap();

        let other = ctx.db.tenants().create_tenant("Other").await.unwrap();
        assert!(ctx.db.orders().get(&other.id, &order_id).await.unwrap().is_none());

        let err = wf
            .approve_order(&other.id, &order_id, &[free_line("A", 100, 1)])
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Core(CoreError::NotFound { .. })));
    }
}
