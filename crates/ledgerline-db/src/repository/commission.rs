//! # Commission Repository
//!
//! Persistence for salesperson commissions. Records are created only by
//! the ship transaction (and only when the computed amount is positive);
//! the return path scales them down, never below zero.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use ledgerline_core::{Commission, CommissionStatus};

/// Repository for commission database operations.
#[derive(Debug, Clone)]
pub struct CommissionRepository {
    pool: SqlitePool,
}

impl CommissionRepository {
    /// Creates a new CommissionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CommissionRepository { pool }
    }

    /// Gets the commission spawned by a sale, if any.
    pub async fn get_by_sale(
        &self,
        tenant_id: &str,
        sale_id: &str,
    ) -> DbResult<Option<Commission>> {
        let commission = sqlx::query_as::<_, Commission>(
            r#"
            SELECT id, tenant_id, sale_id, salesperson_id,
                   rate_bps, amount_cents, status, created_at, updated_at
            FROM commissions
            WHERE sale_id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(sale_id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(commission)
    }

    /// Lists a salesperson's commissions, newest first.
    pub async fn list_for_salesperson(
        &self,
        tenant_id: &str,
        salesperson_id: &str,
    ) -> DbResult<Vec<Commission>> {
        let commissions = sqlx::query_as::<_, Commission>(
            r#"
            SELECT id, tenant_id, sale_id, salesperson_id,
                   rate_bps, amount_cents, status, created_at, updated_at
            FROM commissions
            WHERE tenant_id = ?1 AND salesperson_id = ?2
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .bind(salesperson_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(commissions)
    }

    // =========================================================================
    // Transaction-scoped helpers (called by the workflow)
    // =========================================================================

    /// Fetches a sale's commission inside a workflow transaction.
    pub(crate) async fn get_by_sale_with(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        sale_id: &str,
    ) -> DbResult<Option<Commission>> {
        let commission = sqlx::query_as::<_, Commission>(
            r#"
            SELECT id, tenant_id, sale_id, salesperson_id,
                   rate_bps, amount_cents, status, created_at, updated_at
            FROM commissions
            WHERE sale_id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(sale_id)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(commission)
    }

    /// Inserts the commission created by the ship transition.
    pub(crate) async fn insert_with(
        conn: &mut SqliteConnection,
        commission: &Commission,
    ) -> DbResult<()> {
        debug!(
            id = %commission.id,
            sale_id = %commission.sale_id,
            amount = %commission.amount_cents,
            "Inserting commission"
        );

        sqlx::query(
            r#"
            INSERT INTO commissions (
                id, tenant_id, sale_id, salesperson_id,
                rate_bps, amount_cents, status, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&commission.id)
        .bind(&commission.tenant_id)
        .bind(&commission.sale_id)
        .bind(&commission.salesperson_id)
        .bind(commission.rate_bps)
        .bind(commission.amount_cents)
        .bind(commission.status)
        .bind(commission.created_at)
        .bind(commission.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Claws back part of a commission inside the return transaction.
    ///
    /// The amount is clamped at zero; reaching (or crossing) zero flips
    /// the void marker. No commission row ever goes negative.
    pub(crate) async fn reduce_with(
        conn: &mut SqliteConnection,
        commission: &Commission,
        clawback_cents: i64,
    ) -> DbResult<i64> {
        let after = (commission.amount_cents - clawback_cents).max(0);
        let status = if after == 0 {
            CommissionStatus::Voided
        } else {
            commission.status
        };

        sqlx::query(
            r#"
            UPDATE commissions
            SET amount_cents = ?2, status = ?3, updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(&commission.id)
        .bind(after)
        .bind(status)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(after)
    }
}
