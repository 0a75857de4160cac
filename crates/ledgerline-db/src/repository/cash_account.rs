//! # Cash Account Repository
//!
//! CRUD for cash accounts. Balances are NOT mutated here: the only code
//! path that touches `balance_cents` is the ledger service, which updates
//! it in the same transaction as the entry insert. Accounts are never
//! deleted by this core.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use ledgerline_core::CashAccount;

/// Repository for cash account records.
#[derive(Debug, Clone)]
pub struct CashAccountRepository {
    pool: SqlitePool,
}

impl CashAccountRepository {
    /// Creates a new CashAccountRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CashAccountRepository { pool }
    }

    /// Creates a cash account with an opening balance of zero.
    ///
    /// Opening capital is recorded through the ledger service afterwards,
    /// so that the balance invariant holds from the first cent.
    pub async fn create(&self, tenant_id: &str, name: &str) -> DbResult<CashAccount> {
        let now = Utc::now();
        let account = CashAccount {
            id: Uuid::new_v4().to_string(),
            tenant_id: tenant_id.to_string(),
            name: name.to_string(),
            balance_cents: 0,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %account.id, name = %account.name, "Creating cash account");

        sqlx::query(
            r#"
            INSERT INTO cash_accounts (id, tenant_id, name, balance_cents, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&account.id)
        .bind(&account.tenant_id)
        .bind(&account.name)
        .bind(account.balance_cents)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(account)
    }

    /// Gets a cash account by ID, scoped to the tenant.
    pub async fn get(&self, tenant_id: &str, id: &str) -> DbResult<Option<CashAccount>> {
        let account = sqlx::query_as::<_, CashAccount>(
            r#"
            SELECT id, tenant_id, name, balance_cents, created_at, updated_at
            FROM cash_accounts
            WHERE id = ?1 AND tenant_id = ?2
            "#,
        )
        .bind(id)
        .bind(tenant_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(account)
    }

    /// Lists all cash accounts of a tenant.
    pub async fn list(&self, tenant_id: &str) -> DbResult<Vec<CashAccount>> {
        let accounts = sqlx::query_as::<_, CashAccount>(
            r#"
            SELECT id, tenant_id, name, balance_cents, created_at, updated_at
            FROM cash_accounts
            WHERE tenant_id = ?1
            ORDER BY name
            "#,
        )
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(accounts)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use crate::pool::{Database, DbConfig};

    #[tokio::test]
    async fn test_account_starts_at_zero_and_is_tenant_scoped() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tenants = db.tenants();
        let accounts = db.cash_accounts();

        let a = tenants.create_tenant("A").await.unwrap();
        let b = tenants.create_tenant("B").await.unwrap();

        let account = accounts.create(&a.id, "Till").await.unwrap();
        assert_eq!(account.balance_cents, 0);

        let fetched = accounts.get(&a.id, &account.id).await.unwrap().unwrap();
        assert_eq!(fetched.name, "Till");

        // Invisible from the other tenant
        assert!(accounts.get(&b.id, &account.id).await.unwrap().is_none());
    }
}
