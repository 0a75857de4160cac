//! # Ledger Service
//!
//! The append-only cash transaction log plus the running balance per
//! cash account. Every other component that moves money calls this.
//!
//! ## The Balance Invariant
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │              balance == Σ signed(entry.amount)                          │
//! │                                                                         │
//! │  record(amount, direction)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   SINGLE TRANSACTION                            │   │
//! │  │                                                                 │   │
//! │  │  1. INSERT INTO ledger_entries (id, amount, direction, ...)     │   │
//! │  │                                                                 │   │
//! │  │  2. UPDATE cash_accounts                                        │   │
//! │  │     SET balance_cents = balance_cents ± amount                  │   │
//! │  │     WHERE id = ?                                                │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  COMMIT ← Both succeed or both fail (invariant holds by construction) │
//! │                                                                         │
//! │  Concurrent writers against the same account serialize on the row     │
//! │  update inside the transaction; no reader ever observes an entry       │
//! │  without its balance effect, or vice versa.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Entries are never modified after creation. A reversal (used by the
//! return path) is a NEW entry in the opposite direction whose memo
//! references the original event.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{FlowResult, DbResult};
use ledgerline_core::validation::validate_memo;
use ledgerline_core::{CoreError, Direction, LedgerEntry};

/// Service recording cash movements and maintaining account balances.
///
/// Also consumed directly by the purchase/expense/capital flows outside
/// the order workflow.
#[derive(Debug, Clone)]
pub struct LedgerService {
    pool: SqlitePool,
}

impl LedgerService {
    /// Creates a new LedgerService.
    pub fn new(pool: SqlitePool) -> Self {
        LedgerService { pool }
    }

    /// Records a cash movement as its own atomic unit.
    ///
    /// ## Contract
    /// - `amount_cents` must be strictly positive (`InvalidAmount`)
    /// - the account must exist (`NotFound`) and belong to `tenant_id`
    ///   (`TenantMismatch`)
    /// - on success exactly one entry exists and the balance moved by
    ///   the signed amount
    ///
    /// ## Returns
    /// The new entry's id.
    pub async fn record(
        &self,
        tenant_id: &str,
        cash_account_id: &str,
        entry_at: DateTime<Utc>,
        amount_cents: i64,
        direction: Direction,
        memo: &str,
    ) -> FlowResult<String> {
        let mut tx = self.pool.begin().await?;

        let entry_id = Self::record_with(
            &mut tx,
            tenant_id,
            cash_account_id,
            entry_at,
            amount_cents,
            direction,
            memo,
        )
        .await?;

        tx.commit().await?;

        info!(
            entry_id = %entry_id,
            cash_account_id = %cash_account_id,
            amount = %amount_cents,
            direction = ?direction,
            "Cash movement recorded"
        );

        Ok(entry_id)
    }

    /// Records a cash movement inside a caller-owned transaction.
    ///
    /// Used by Ship and Return to fold the ledger effect into their own
    /// atomic unit. The caller commits; any error here aborts the whole
    /// unit.
    pub(crate) async fn record_with(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        cash_account_id: &str,
        entry_at: DateTime<Utc>,
        amount_cents: i64,
        direction: Direction,
        memo: &str,
    ) -> FlowResult<String> {
        if amount_cents <= 0 {
            return Err(CoreError::InvalidAmount { amount_cents }.into());
        }
        validate_memo(memo)?;

        // Ownership check before any write: missing account and foreign
        // account are distinct failures.
        let owner: Option<(String,)> =
            sqlx::query_as("SELECT tenant_id FROM cash_accounts WHERE id = ?1")
                .bind(cash_account_id)
                .fetch_optional(&mut *conn)
                .await?;

        match owner {
            None => {
                return Err(CoreError::not_found("Cash account", cash_account_id).into());
            }
            Some((owner_id,)) if owner_id != tenant_id => {
                return Err(CoreError::TenantMismatch {
                    entity: "Cash account",
                    id: cash_account_id.to_string(),
                }
                .into());
            }
            Some(_) => {}
        }

        let entry_id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(entry_id = %entry_id, cash_account_id = %cash_account_id, "Appending ledger entry");

        sqlx::query(
            r#"
            INSERT INTO ledger_entries (
                id, tenant_id, cash_account_id, entry_at,
                amount_cents, direction, memo, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&entry_id)
        .bind(tenant_id)
        .bind(cash_account_id)
        .bind(entry_at)
        .bind(amount_cents)
        .bind(direction)
        .bind(memo)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        sqlx::query(
            r#"
            UPDATE cash_accounts
            SET balance_cents = balance_cents + ?2, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(cash_account_id)
        .bind(direction.signed_cents(amount_cents))
        .bind(now)
        .execute(&mut *conn)
        .await?;

        Ok(entry_id)
    }

    /// Lists an account's entries, oldest first.
    pub async fn entries(
        &self,
        tenant_id: &str,
        cash_account_id: &str,
    ) -> DbResult<Vec<LedgerEntry>> {
        let entries = sqlx::query_as::<_, LedgerEntry>(
            r#"
            SELECT id, tenant_id, cash_account_id, entry_at,
                   amount_cents, direction, memo, created_at
            FROM ledger_entries
            WHERE tenant_id = ?1 AND cash_account_id = ?2
            ORDER BY entry_at, created_at
            "#,
        )
        .bind(tenant_id)
        .bind(cash_account_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    /// The signed sum of an account's entries.
    ///
    /// Audit helper: must always equal the stored balance. The balance is
    /// never derived from this at runtime.
    pub async fn entry_sum_cents(
        &self,
        tenant_id: &str,
        cash_account_id: &str,
    ) -> DbResult<i64> {
        let sum: Option<i64> = sqlx::query_scalar(
            r#"
            SELECT SUM(CASE direction WHEN 'in' THEN amount_cents ELSE -amount_cents END)
            FROM ledger_entries
            WHERE tenant_id = ?1 AND cash_account_id = ?2
            "#,
        )
        .bind(tenant_id)
        .bind(cash_account_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(sum.unwrap_or(0))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
