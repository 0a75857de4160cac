//! # Tenant Repository
//!
//! Onboarding-time records: tenants and their salespeople.
//!
//! Tenants are the isolation boundary of the whole system. They are
//! created once at business onboarding and are immutable from this
//! core's perspective; everything else in the schema hangs off
//! `tenant_id` and every query in this crate predicates on it.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use ledgerline_core::{Salesperson, Tenant};

/// Repository for tenant and salesperson records.
#[derive(Debug, Clone)]
pub struct TenantRepository {
    pool: SqlitePool,
}

impl TenantRepository {
    /// Creates a new TenantRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TenantRepository { pool }
    }

    /// Creates a tenant.
    pub async fn create_tenant(&self, name: &str) -> DbResult<Tenant> {
        let tenant = Tenant {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };

        debug!(id = %tenant.id, name = %tenant.name, "Creating tenant");

        sqlx::query("INSERT INTO tenants (id, name, created_at) VALUES (?1, ?2, ?3)")
            .bind(&tenant.id)
            .bind(&tenant.name)
            .bind(tenant.created_at)
            .execute(&self.pool)
            .await?;

        Ok(tenant)
    }

    /// Gets a tenant by ID.
    pub async fn get_tenant(&self, id: &str) -> DbResult<Option<Tenant>> {
        let tenant = sqlx::query_as::<_, Tenant>(
            "SELECT id, name, created_at FROM tenants WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(tenant)
    }

    /// Creates a salesperson with their commission rate table.
    pub async fn create_salesperson(
        &self,
        tenant_id: &str,
        name: &str,
        cash_rate_bps: i64,
        credit_rate_bps: i64,
    ) -> DbResult<Salesperson> {
        let salesperson = Salesperson {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            name: name.to_string(),
            cash_rate_bps,
            credit_rate_bps,
            created_at: Utc::now(),
        };

        debug!(id = %salesperson.id, name = %salesperson.name, "Creating salesperson");

        sqlx::query(
            r#"
            INSERT INTO salespeople (id, tenant_id, name, cash_rate_bps, credit_rate_bps, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&salesperson.id)
        .bind(&salesperson.tenant_id)
        .bind(&salesperson.name)
        .bind(salesperson.cash_rate_bps)
        .bind(salesperson.credit_rate_bps)
        .bind(salesperson.created_at)
        .execute(&self.pool)
        .await?;

        Ok(salesperson)
    }

    /// Gets a salesperson by ID, scoped to the tenant.
    pub async fn get_salesperson(
        &self,
        tenant_id: &str,
        id: &str,
    ) -> DbResult<Option<Salesperson>> {
        let salesperson = sqlx::query_as::<_, Salesperson>(
            r#"
            SELECT id, tenant_id, name, cash_rate_bps, credit_rate_bps, created_at
            FROM salespeople
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(salesperson)
    }

    /// Lists all salespeople of a tenant.
    pub async fn list_salespeople(&self, tenant_id: &str) -> DbResult<Vec<Salesperson>> {
        let salespeople = sqlx::query_as::<_, Salesperson>(
            r#"
            SELECT id, tenant_id, name, cash_rate_bps, credit_rate_bps, created_at
            FROM salespeople
            WHERE tenant_id = ?1
            ORDER BY name
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(salespeople)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_tenant_roundtrip() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.tenants();

        let tenant = repo.create_tenant("Toko Sinar").await.unwrap();
        let fetched = repo.get_tenant(&tenant.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Toko Sinar");

        assert!(repo.get_tenant("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_salesperson_is_tenant_scoped() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.tenants();

        let a = repo.create_tenant("A").await.unwrap();
        let b = repo.create_tenant("B").await.unwrap();
        let sp = repo.create_salesperson(&a.id, "Ari", 300, 150).await.unwrap();

        assert!(repo.get_salesperson(&a.id, &sp.id).await.unwrap().is_some());
        // Same id queried under the other tenant is invisible
        assert!(repo.get_salesperson(&b.id, &sp.id).await.unwrap().is_none());

        let rates = sp.commission_rates();
        assert_eq!(rates.cash.bps(), 300);
        assert_eq!(rates.credit.bps(), 150);
    }
}
