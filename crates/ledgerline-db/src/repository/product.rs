//! # Product Repository
//!
//! Product CRUD plus the inventory adjuster.
//!
//! ## Inventory Adjuster
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    How Stock Adjustment Works                           │
//! │                                                                         │
//! │  adjust_stock(product, delta, policy)                                  │
//! │       │   delta < 0: sale/shipment     delta > 0: receipt/return       │
//! │       ▼                                                                 │
//! │  read current stock (inside the caller's transaction)                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  would the result go below zero?                                       │
//! │       │                                                                 │
//! │       ├── no  ──────────────────────────► apply delta                  │
//! │       │                                                                 │
//! │       └── yes ── product.allow_negative_stock                          │
//! │                  or StockPolicy::AllowNegative? ──► apply delta        │
//! │                  otherwise ──► InsufficientStock                       │
//! │                                                                         │
//! │  Negative stock is an explicit opt-in at either level, never a        │
//! │  silent outcome.                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbResult, FlowResult};
use ledgerline_core::{CoreError, Product, StockPolicy};

/// Caller-supplied fields for a new product.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub sku: String,
    pub name: String,
    pub cost_cents: i64,
    pub price_cents: i64,
    pub stock_quantity: i64,
    pub allow_negative_stock: bool,
}

/// Repository for product records and stock adjustments.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Creates a product.
    pub async fn create(&self, tenant_id: &str, new: NewProduct) -> DbResult<Product> {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            sku: new.sku,
            name: new.name,
            cost_cents: new.cost_cents,
            price_cents: new.price_cents,
            stock_quantity: new.stock_quantity,
            allow_negative_stock: new.allow_negative_stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, sku = %product.sku, "Creating product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, tenant_id, sku, name,
                cost_cents, price_cents, stock_quantity,
                allow_negative_stock, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.tenant_id)
        .bind(&product.sku)
        .bind(&product.name)
        .bind(product.cost_cents)
        .bind(product.price_cents)
        .bind(product.stock_quantity)
        .bind(product.allow_negative_stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets a product by ID, scoped to the tenant.
    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, tenant_id, sku, name,
                   cost_cents, price_cents, stock_quantity,
                   allow_negative_stock, is_active, created_at, updated_at
            FROM products
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists active products of a tenant.
    pub async fn list_active(&self, tenant_id: &str) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, tenant_id, sku, name,
                   cost_cents, price_cents, stock_quantity,
                   allow_negative_stock, is_active, created_at, updated_at
            FROM products
            WHERE tenant_id = ?1 AND is_active = 1
            ORDER BY sku
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Soft-deletes a product.
    pub async fn deactivate(&self, tenant_id: &str, id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE products SET is_active = 0, updated_at = ?3 WHERE id = ?1 AND tenant_id = ?2",
        )
        .bind(id)
        .bind(tenant_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(crate::error::DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Applies a signed stock delta as its own atomic unit.
    ///
    /// Negative delta for a sale/shipment, positive for a purchase
    /// receipt or a return.
    ///
    /// ## Returns
    /// The stock quantity after the adjustment.
    pub async fn adjust_stock(
        &self,
        tenant_id: &str,
        product_id: &str,
        delta: i64,
        policy: StockPolicy,
    ) -> FlowResult<i64> {
        let mut tx = self.pool.begin().await?;
        let after = Self::adjust_stock_with(&mut tx, tenant_id, product_id, delta, policy).await?;
        tx.commit().await?;
        Ok(after)
    }

    /// Applies a signed stock delta inside a caller-owned transaction.
    ///
    /// The read and the update share the caller's transaction, so the
    /// floor check cannot race a concurrent writer.
    pub(crate) async fn adjust_stock_with(
        conn: &mut SqliteConnection,
        tenant_id: &str,
        product_id: &str,
        delta: i64,
        policy: StockPolicy,
    ) -> FlowResult<i64> {
        let row: Option<(String, i64, bool)> = sqlx::query_as(
            r#"
            SELECT sku, stock_quantity, allow_negative_stock
            FROM products
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(product_id)
        .bind(tenant_id)
        .fetch_optional(&mut *conn)
        .await?;

        let (sku, stock, allow_negative) = match row {
            Some(row) => row,
            None => return Err(CoreError::not_found("Product", product_id).into()),
        };

        let after = stock + delta;
        let oversell_allowed = allow_negative || policy == StockPolicy::AllowNegative;
        if after < 0 && !oversell_allowed {
            return Err(CoreError::InsufficientStock {
                sku,
                available: stock,
                requested: -delta,
            }
            .into());
        }

        debug!(product_id = %product_id, delta = %delta, after = %after, "Adjusting stock");

        sqlx::query(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity + ?3, updated_at = ?4
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(product_id)
        .bind(tenant_id)
        .bind(delta)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(after)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
