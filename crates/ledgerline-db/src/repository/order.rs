//! # Order Repository
//!
//! Persistence for order headers and lines.
//!
//! Reads run against the pool; every mutation helper takes a
//! `&mut SqliteConnection` because order mutations only ever happen
//! inside a workflow transaction (create, edit, approve, reject, ship).
//!
//! ## Line Storage
//! `order_lines.product_id` is NULL for free-text lines. The domain
//! model keeps the distinction as a tagged [`LineSource`] variant; the
//! mapping between the two lives here and nowhere else.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use ledgerline_core::{
    LineSource, Order, OrderFilter, OrderLine, OrderLineDraft, OrderStatus,
};

/// Row shape of `order_lines`; converted to/from the tagged domain type.
#[derive(Debug, sqlx::FromRow)]
struct OrderLineRow {
    id: String,
    order_id: String,
    product_id: Option<String>,
    name: String,
    unit_price_cents: i64,
    quantity: i64,
    subtotal_cents: i64,
    created_at: chrono::DateTime<Utc>,
}

impl From<OrderLineRow> for OrderLine {
    fn from(row: OrderLineRow) -> Self {
        OrderLine {
            id: row.id,
            order_id: row.order_id,
            source: match row.product_id {
                Some(product_id) => LineSource::Catalog { product_id },
                None => LineSource::FreeText,
            },
            name: row.name,
            unit_price_cents: row.unit_price_cents,
            quantity: row.quantity,
            subtotal_cents: row.subtotal_cents,
            created_at: row.created_at,
        }
    }
}

/// Repository for order database operations.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    /// Creates a new OrderRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Gets an order by ID, scoped to the tenant.
    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, tenant_id, salesperson_id, customer_id,
                   payment_method, credit_term_days, status, total_cents,
                   created_at, updated_at
            FROM orders
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(order)
    }

    /// Gets all lines of an order, oldest first.
    pub async fn get_lines(&self, order_id: &str) -> DbResult<Vec<OrderLine>> {
        let rows = sqlx::query_as::<_, OrderLineRow>(
            r#"
            SELECT id, order_id, product_id, name,
                   unit_price_cents, quantity, subtotal_cents, created_at
            FROM order_lines
            WHERE order_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(OrderLine::from).collect())
    }

    /// Gets an order together with its lines.
    pub async fn get_with_lines(
        &self,
        tenant_id: &str,
        id: &str,
    ) -> DbResult<Option<(Order, Vec<OrderLine>)>> {
        let order = match self.get(tenant_id, id).await? {
            Some(order) => order,
            None => return Ok(None),
        };
        let lines = self.get_lines(id).await?;

        Ok(Some((order, lines)))
    }

    /// Lists a tenant's orders, newest first, optionally filtered.
    pub async fn list(&self, tenant_id: &str, filter: &OrderFilter) -> DbResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, tenant_id, salesperson_id, customer_id,
                   payment_method, credit_term_days, status, total_cents,
                   created_at, updated_at
            FROM orders
            WHERE tenant_id = ?1
              AND (?2 IS NULL OR status = ?2)
              AND (?3 IS NULL OR salesperson_id = ?3)
            ORDER BY created_at DESC
            "#,
        )
        .bind(tenant_id)
        .bind(filter.status)
        .bind(filter.salesperson_id.as_deref())
        .fetch_all(&self.pool)
        .await?;

        Ok(orders)
    }

    // =========================================================================
    // Transaction-scoped helpers (called by the workflow)
    // =========================================================================

    /// Fetches an order inside a workflow transaction.
    pub(crate) async fn get_with(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        id: &str,
    ) -> DbResult<Option<Order>> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, tenant_id, salesperson_id, customer_id,
                   payment_method, credit_term_days, status, total_cents,
                   created_at, updated_at
            FROM orders
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(order)
    }

    /// Fetches an order's lines inside a workflow transaction.
    pub(crate) async fn get_lines_with(
        conn: &mut SqliteConnection,
        order_id: &str,
    ) -> DbResult<Vec<OrderLine>> {
        let rows = sqlx::query_as::<_, OrderLineRow>(
            r#"
            SELECT id, order_id, product_id, name,
                   unit_price_cents, quantity, subtotal_cents, created_at
            FROM order_lines
            WHERE order_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows.into_iter().map(OrderLine::from).collect())
    }

    /// Inserts a new order header.
    pub(crate) async fn insert_order_with(
        conn: &mut SqliteConnection,
        order: &Order,
    ) -> DbResult<()> {
        debug!(id = %order.id, "Inserting order");

        sqlx::query(
            r#"
            INSERT INTO orders (
                id, tenant_id, salesperson_id, customer_id,
                payment_method, credit_term_days, status, total_cents,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&order.id)
        .bind(&order.tenant_id)
        .bind(&order.salesperson_id)
        .bind(order.customer_id.as_deref())
        .bind(order.payment_method)
        .bind(order.credit_term_days)
        .bind(order.status)
        .bind(order.total_cents)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Inserts one line from a draft and returns its subtotal.
    async fn insert_line_with(
        conn: &mut SqliteConnection,
        order_id: &str,
        draft: &OrderLineDraft,
    ) -> DbResult<i64> {
        let subtotal = draft.subtotal_cents();

        sqlx::query(
            r#"
            INSERT INTO order_lines (
                id, order_id, product_id, name,
                unit_price_cents, quantity, subtotal_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(order_id)
        .bind(draft.source.product_id())
        .bind(&draft.name)
        .bind(draft.unit_price_cents)
        .bind(draft.quantity)
        .bind(subtotal)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(subtotal)
    }

    /// Replaces ALL lines wholesale (delete-then-insert) and returns the
    /// new total. Used by create (empty start) and the salesperson edit.
    pub(crate) async fn replace_lines_with(
        conn: &mut SqliteConnection,
        order_id: &str,
        drafts: &[OrderLineDraft],
    ) -> DbResult<i64> {
        sqlx::query("DELETE FROM order_lines WHERE order_id = ?1")
            .bind(order_id)
            .execute(&mut *conn)
            .await?;

        let mut total = 0;
        for draft in drafts {
            total += Self::insert_line_with(&mut *conn, order_id, draft).await?;
        }

        Ok(total)
    }

    /// Reconciles the stored line set against an admin-supplied target
    /// and returns the new total.
    ///
    /// ## Reconciliation Rules
    /// - Stored lines absent from the target are deleted
    /// - Target lines whose id matches a stored line are updated in place
    /// - Target lines with no id (or an unknown id) are inserted fresh
    pub(crate) async fn reconcile_lines_with(
        conn: &mut SqliteConnection,
        order_id: &str,
        targets: &[OrderLineDraft],
    ) -> DbResult<i64> {
        let existing = Self::get_lines_with(&mut *conn, order_id).await?;

        let kept_ids: Vec<&str> = targets
            .iter()
            .filter_map(|t| t.id.as_deref())
            .collect();

        for line in &existing {
            if !kept_ids.contains(&line.id.as_str()) {
                sqlx::query("DELETE FROM order_lines WHERE id = ?1")
                    .bind(&line.id)
                    .execute(&mut *conn)
                    .await?;
            }
        }

        let mut total = 0;
        for target in targets {
            let known_id = target
                .id
                .as_deref()
                .filter(|id| existing.iter().any(|l| l.id == *id));

            match known_id {
                Some(id) => {
                    let subtotal = target.subtotal_cents();

                    sqlx::query(
                        r#"
                        UPDATE order_lines
                        SET product_id = ?2, name = ?3,
                            unit_price_cents = ?4, quantity = ?5, subtotal_cents = ?6
                        WHERE id = ?1
                        "#,
                    )
                    .bind(id)
                    .bind(target.source.product_id())
                    .bind(&target.name)
                    .bind(target.unit_price_cents)
                    .bind(target.quantity)
                    .bind(subtotal)
                    .execute(&mut *conn)
                    .await?;

                    total += subtotal;
                }
                None => {
                    total += Self::insert_line_with(&mut *conn, order_id, target).await?;
                }
            }
        }

        Ok(total)
    }

    /// Updates the order's status and total in one statement.
    pub(crate) async fn set_status_and_total_with(
        conn: &mut SqliteConnection,
        order_id: &str,
        status: OrderStatus,
        total_cents: i64,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            UPDATE orders
            SET status = ?2, total_cents = ?3, updated_at = ?4
            WHERE id = ?1
            "#,
        )
        .bind(order_id)
        .bind(status)
        .bind(total_cents)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Updates only the order's status.
    pub(crate) async fn set_status_with(
        conn: &mut SqliteConnection,
        order_id: &str,
        status: OrderStatus,
    ) -> DbResult<()> {
        sqlx::query("UPDATE orders SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(order_id)
            .bind(status)
            .bind(Utc::now())
            .execute(&mut *conn)
            .await?;

        Ok(())
    }
}
