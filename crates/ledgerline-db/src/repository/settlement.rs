//! # Settlement Repository — Receivables & Payables
//!
//! Partial-payment balances tied to a source sale (receivable) or
//! purchase (payable). The two sides are symmetric.
//!
//! ## Amortization Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  open(total, due_date)      →  remaining = total, status = open        │
//! │                                                                         │
//! │  apply_payment(amount)      →  remaining -= amount                     │
//! │      amount > remaining     →  OverPayment, nothing persisted          │
//! │      remaining reaches 0    →  status = paid (exactly at zero)         │
//! │                                                                         │
//! │  remaining is monotonically decreasing and never negative.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Payments against a cash account record the matching ledger entry in
//! the same transaction as the amortization.

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbResult, FlowResult};
use crate::ledger::LedgerService;
use ledgerline_core::{CoreError, Direction, Payable, Receivable, SettlementStatus};

/// Repository for receivables and payables.
#[derive(Debug, Clone)]
pub struct SettlementRepository {
    pool: SqlitePool,
}

impl SettlementRepository {
    /// Creates a new SettlementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SettlementRepository { pool }
    }

    // =========================================================================
    // Receivables
    // =========================================================================

    /// Gets a receivable by ID, scoped to the tenant.
    pub async fn get_receivable(
        &self,
        tenant_id: &str,
        id: &str,
    ) -> DbResult<Option<Receivable>> {
        let receivable = sqlx::query_as::<_, Receivable>(
            r#"
            SELECT id, tenant_id, sale_id, customer_id, total_cents,
                   remaining_cents, due_date, status, created_at, updated_at
            FROM receivables
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(receivable)
    }

    /// Gets the receivable spawned by a sale, if any.
    pub async fn get_receivable_by_sale(
        &self,
        tenant_id: &str,
        sale_id: &str,
    ) -> DbResult<Option<Receivable>> {
        let receivable = sqlx::query_as::<_, Receivable>(
            r#"
            SELECT id, tenant_id, sale_id, customer_id, total_cents,
                   remaining_cents, due_date, status, created_at, updated_at
            FROM receivables
            WHERE sale_id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(sale_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(receivable)
    }

    /// Fetches a sale's receivable inside a workflow transaction.
    pub(crate) async fn get_receivable_by_sale_with(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        sale_id: &str,
    ) -> DbResult<Option<Receivable>> {
        let receivable = sqlx::query_as::<_, Receivable>(
            r#"
            SELECT id, tenant_id, sale_id, customer_id, total_cents,
                   remaining_cents, due_date, status, created_at, updated_at
            FROM receivables
            WHERE sale_id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(sale_id)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(receivable)
    }

    /// Opens a receivable for a credit sale. Called from the ship
    /// transaction.
    pub(crate) async fn open_receivable_with(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        sale_id: &str,
        customer_id: Option<&str>,
        total_cents: i64,
        due_date: NaiveDate,
    ) -> DbResult<Receivable> {
        let now = Utc::now();
        let receivable = Receivable {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            sale_id: sale_id.to_string(),
            customer_id: customer_id.map(str::to_string),
            total_cents,
            remaining_cents: total_cents,
            due_date,
            status: SettlementStatus::Open,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %receivable.id, sale_id = %sale_id, total = %total_cents, "Opening receivable");

        sqlx::query(
            r#"
            INSERT INTO receivables (
                id, tenant_id, sale_id, customer_id, total_cents,
                remaining_cents, due_date, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&receivable.id)
        .bind(&receivable.tenant_id)
        .bind(&receivable.sale_id)
        .bind(receivable.customer_id.as_deref())
        .bind(receivable.total_cents)
        .bind(receivable.remaining_cents)
        .bind(receivable.due_date)
        .bind(receivable.status)
        .bind(receivable.created_at)
        .bind(receivable.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(receivable)
    }

    /// Applies a customer payment against a receivable.
    ///
    /// The amortization and the cash-account effect are one atomic unit.
    pub async fn apply_receivable_payment(
        &self,
        tenant_id: &str,
        receivable_id: &str,
        amount_cents: i64,
        cash_account_id: &str,
    ) -> FlowResult<Receivable> {
        if amount_cents <= 0 {
            return Err(CoreError::InvalidAmount { amount_cents }.into());
        }

        let mut tx = self.pool.begin().await?;

        let receivable: Option<Receivable> = sqlx::query_as(
            r#"
            SELECT id, tenant_id, sale_id, customer_id, total_cents,
                   remaining_cents, due_date, status, created_at, updated_at
            FROM receivables
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(receivable_id)
        .bind(tenant_id)
        .fetch_optional(&mut *tx)
        .await?;

        let mut receivable = receivable
            .ok_or_else(|| CoreError::not_found("Receivable", receivable_id))?;

        if amount_cents > receivable.remaining_cents {
            return Err(CoreError::OverPayment {
                amount_cents,
                remaining_cents: receivable.remaining_cents,
            }
            .into());
        }

        receivable.remaining_cents -= amount_cents;
        if receivable.remaining_cents == 0 {
            receivable.status = SettlementStatus::Paid;
        }
        receivable.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE receivables
            SET remaining_cents = ?2, status = ?3, updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(&receivable.id)
        .bind(receivable.remaining_cents)
        .bind(receivable.status)
        .bind(receivable.updated_at)
        .execute(&mut *tx)
        .await?;

        LedgerService::record_with(
            &mut tx,
            tenant_id,
            cash_account_id,
            Utc::now(),
            amount_cents,
            Direction::In,
            &format!("Receivable payment for sale {}", receivable.sale_id),
        )
        .await?;

        tx.commit().await?;

        info!(
            receivable_id = %receivable.id,
            amount = %amount_cents,
            remaining = %receivable.remaining_cents,
            "Receivable payment applied"
        );

        Ok(receivable)
    }

    /// Reduces a receivable's remaining balance inside the return
    /// transaction, clamping at zero and flipping the status there.
    pub(crate) async fn reduce_receivable_with(
        conn: &mut SqliteConnection,
        receivable: &Receivable,
        returned_cents: i64,
    ) -> DbResult<i64> {
        let after = (receivable.remaining_cents - returned_cents).max(0);
        let status = if after == 0 {
            SettlementStatus::Paid
        } else {
            SettlementStatus::Open
        };

        sqlx::query(
            r#"
            UPDATE receivables
            SET remaining_cents = ?2, status = ?3, updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(&receivable.id)
        .bind(after)
        .bind(status)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(after)
    }

    // =========================================================================
    // Payables (supplier mirror)
    // =========================================================================

    /// Gets a payable by ID, scoped to the tenant.
    pub async fn get_payable(&self, tenant_id: &str, id: &str) -> DbResult<Option<Payable>> {
        let payable = sqlx::query_as::<_, Payable>(
            r#"
            SELECT id, tenant_id, purchase_id, supplier_id, total_cents,
                   remaining_cents, due_date, status, created_at, updated_at
            FROM payables
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payable)
    }

    /// Opens a payable for a committed purchase.
    pub async fn open_payable(
        &self,
        tenant_id: &str,
        purchase_id: &str,
        supplier_id: Option<&str>,
        total_cents: i64,
        due_date: NaiveDate,
    ) -> FlowResult<Payable> {
        if total_cents <= 0 {
            return Err(CoreError::InvalidAmount {
                amount_cents: total_cents,
            }
            .into());
        }

        let now = Utc::now();
        let payable = Payable {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            purchase_id: purchase_id.to_string(),
            supplier_id: supplier_id.map(str::to_string),
            total_cents,
            remaining_cents: total_cents,
            due_date,
            status: SettlementStatus::Open,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %payable.id, purchase_id = %purchase_id, total = %total_cents, "Opening payable");

        sqlx::query(
            r#"
            INSERT INTO payables (
                id, tenant_id, purchase_id, supplier_id, total_cents,
                remaining_cents, due_date, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&payable.id)
        .bind(&payable.tenant_id)
        .bind(&payable.purchase_id)
        .bind(payable.supplier_id.as_deref())
        .bind(payable.total_cents)
        .bind(payable.remaining_cents)
        .bind(payable.due_date)
        .bind(payable.status)
        .bind(payable.created_at)
        .bind(payable.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(payable)
    }

    /// Applies a supplier payment against a payable.
    ///
    /// Mirror of [`Self::apply_receivable_payment`]: money leaves the
    /// cash account in the same atomic unit.
    pub async fn apply_payable_payment(
        &self,
        tenant_id: &str,
        payable_id: &str,
        amount_cents: i64,
        cash_account_id: &str,
    ) -> FlowResult<Payable> {
        if amount_cents <= 0 {
            return Err(CoreError::InvalidAmount { amount_cents }.into());
        }

        let mut tx = self.pool.begin().await?;

        let payable: Option<Payable> = sqlx::query_as(
            r#"
            SELECT id, tenant_id, purchase_id, supplier_id, total_cents,
                   remaining_cents, due_date, status, created_at, updated_at
            FROM payables
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(payable_id)
        .bind(tenant_id)
        .fetch_optional(&mut *tx)
        .await?;

        let mut payable = payable.ok_or_else(|| CoreError::not_found("Payable", payable_id))?;

        if amount_cents > payable.remaining_cents {
            return Err(CoreError::OverPayment {
                amount_cents,
                remaining_cents: payable.remaining_cents,
            }
            .into());
        }

        payable.remaining_cents -= amount_cents;
        if payable.remaining_cents == 0 {
            payable.status = SettlementStatus::Paid;
        }
        payable.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE payables
            SET remaining_cents = ?2, status = ?3, updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(&payable.id)
        .bind(payable.remaining_cents)
        .bind(payable.status)
        .bind(payable.updated_at)
        .execute(&mut *tx)
        .await?;

        LedgerService::record_with(
            &mut tx,
            tenant_id,
            cash_account_id,
            Utc::now(),
            amount_cents,
            Direction::Out,
            &format!("Payable payment for purchase {}", payable.purchase_id),
        )
        .await?;

        tx.commit().await?;

        info!(
            payable_id = %payable.id,
            amount = %amount_cents,
            remaining = %payable.remaining_cents,
            "Payable payment applied"
        );

        Ok(payable)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
