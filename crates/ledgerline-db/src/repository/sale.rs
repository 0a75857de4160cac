//! # Sale Repository
//!
//! Persistence for realized sales and their snapshot lines.
//!
//! A sale is born complete inside the ship transaction and its lines are
//! immutable from then on. The only legal mutation afterwards is the
//! return path scaling `total_cents` down, flipping the `Voided` marker
//! when it reaches zero.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use ledgerline_core::{Sale, SaleLine, SaleStatus};

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID, scoped to the tenant.
    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, tenant_id, order_id, customer_id, salesperson_id,
                   payment_method, status, total_cents, due_date, shipped_at, created_at
            FROM sales
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Gets all lines for a sale.
    pub async fn get_lines(&self, sale_id: &str) -> DbResult<Vec<SaleLine>> {
        let lines = sqlx::query_as::<_, SaleLine>(
            r#"
            SELECT id, sale_id, product_id, name,
                   cost_cents_at_sale, sell_price_cents, quantity, subtotal_cents, created_at
            FROM sale_lines
            WHERE sale_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    // =========================================================================
    // Transaction-scoped helpers (called by the workflow)
    // =========================================================================

    /// Fetches a sale inside a workflow transaction.
    pub(crate) async fn get_with(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        id: &str,
    ) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(
            r#"
            SELECT id, tenant_id, order_id, customer_id, salesperson_id,
                   payment_method, status, total_cents, due_date, shipped_at, created_at
            FROM sales
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(sale)
    }

    /// Fetches one sale line inside a workflow transaction.
    pub(crate) async fn get_line_with(
        conn: &mut SqliteConnection,
        sale_id: &str,
        line_id: &str,
    ) -> DbResult<Option<SaleLine>> {
        let line = sqlx::query_as::<_, SaleLine>(
            r#"
            SELECT id, sale_id, product_id, name,
                   cost_cents_at_sale, sell_price_cents, quantity, subtotal_cents, created_at
            FROM sale_lines
            WHERE id = ?1 AND sale_id = ?2
            "#,
        )
        .bind(line_id)
        .bind(sale_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(line)
    }

    /// Inserts the sale header created by the ship transition.
    pub(crate) async fn insert_sale_with(
        conn: &mut SqliteConnection,
        sale: &Sale,
    ) -> DbResult<()> {
        debug!(id = %sale.id, order_id = %sale.order_id, "Inserting sale");

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, tenant_id, order_id, customer_id, salesperson_id,
                payment_method, status, total_cents, due_date, shipped_at, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&sale.id)
        .bind(&sale.tenant_id)
        .bind(&sale.order_id)
        .bind(sale.customer_id.as_deref())
        .bind(&sale.salesperson_id)
        .bind(sale.payment_method)
        .bind(sale.status)
        .bind(sale.total_cents)
        .bind(sale.due_date)
        .bind(sale.shipped_at)
        .bind(sale.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Inserts one snapshot line.
    pub(crate) async fn insert_line_with(
        conn: &mut SqliteConnection,
        line: &SaleLine,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sale_lines (
                id, sale_id, product_id, name,
                cost_cents_at_sale, sell_price_cents, quantity, subtotal_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&line.id)
        .bind(&line.sale_id)
        .bind(line.product_id.as_deref())
        .bind(&line.name)
        .bind(line.cost_cents_at_sale)
        .bind(line.sell_price_cents)
        .bind(line.quantity)
        .bind(line.subtotal_cents)
        .bind(line.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Scales the sale total down by a returned amount, flipping the
    /// void marker when nothing remains.
    ///
    /// ## Returns
    /// The total after the reduction.
    pub(crate) async fn reduce_total_with(
        conn: &mut SqliteConnection,
        sale_id: &str,
        returned_cents: i64,
        current_total: i64,
    ) -> DbResult<i64> {
        let after = current_total - returned_cents;

        if after == 0 {
            sqlx::query("UPDATE sales SET total_cents = ?2, status = ?3 WHERE id = ?1")
                .bind(sale_id)
                .bind(after)
                .bind(SaleStatus::Voided)
                .execute(&mut *conn)
                .await?;
        } else {
            // Settlement status is untouched by a partial return
            sqlx::query("UPDATE sales SET total_cents = ?2 WHERE id = ?1")
                .bind(sale_id)
                .bind(after)
                .execute(&mut *conn)
                .await?;
        }

        Ok(after)
    }

    /// Counts sales created for an order (0 or 1 by construction).
    pub async fn count_for_order(&self, order_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales WHERE order_id = ?1")
            .bind(order_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
