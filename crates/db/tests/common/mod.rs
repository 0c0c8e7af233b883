//! Shared setup for database integration tests.
//!
//! Tests run only when `DATABASE_URL` (or `TALLY__DATABASE__URL`) points at a
//! `PostgreSQL` instance; otherwise each test returns early.

#![allow(dead_code)]

use std::env;
use std::time::Duration;

use rust_decimal::Decimal;
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use serde_json::{Value, json};
use tally_db::entities::sea_orm_active_enums::AccountType;
use tally_db::migration::Migrator;
use tally_db::repositories::{CreateAccountInput, LedgerSync};
use tally_db::{AccountRepository, PgLedgerStore, TenantRepository};
use tally_shared::types::{AccountId, TenantId, TransactionId, UserId};
use tokio::sync::Mutex;

static MIGRATED: Mutex<bool> = Mutex::const_new(false);

fn database_url() -> Option<String> {
    env::var("DATABASE_URL")
        .or_else(|_| env::var("TALLY__DATABASE__URL"))
        .ok()
}

/// Connects and brings the schema up to date, or returns `None` when no
/// database is configured.
pub async fn connect() -> Option<DatabaseConnection> {
    let Some(url) = database_url() else {
        eprintln!("DATABASE_URL not set, skipping database test");
        return None;
    };
    let db = Database::connect(&url).await.expect("connect to test database");

    let mut migrated = MIGRATED.lock().await;
    if !*migrated {
        Migrator::up(&db, None).await.expect("run migrations");
        *migrated = true;
    }
    Some(db)
}

/// A tenant with one member and a ledger dispatcher.
pub struct Harness {
    pub db: DatabaseConnection,
    pub sync: LedgerSync,
    pub tenant: TenantId,
    pub user: UserId,
}

impl Harness {
    pub async fn new(db: DatabaseConnection) -> Self {
        Self::with_lock_timeout(db, Duration::from_secs(5)).await
    }

    pub async fn with_lock_timeout(db: DatabaseConnection, lock_timeout: Duration) -> Self {
        let tenants = TenantRepository::new(db.clone());
        let tenant = tenants
            .create_tenant("Integration Test Tenant")
            .await
            .expect("create tenant");
        let tenant = TenantId::from_uuid(tenant.id);
        let user = UserId::new();
        tenants.add_member(tenant, user).await.expect("add member");

        let sync = LedgerSync::new(PgLedgerStore::new(db.clone(), lock_timeout), tenants);
        Self {
            db,
            sync,
            tenant,
            user,
        }
    }

    pub async fn account(&self, opening_balance: Decimal) -> AccountId {
        let model = AccountRepository::new(self.db.clone())
            .create_account(CreateAccountInput {
                tenant_id: self.tenant,
                name: "Wallet".to_string(),
                account_type: AccountType::Checking,
                opening_balance,
                credit_limit: None,
            })
            .await
            .expect("create account");
        AccountId::from_uuid(model.id)
    }

    pub async fn balance(&self, account: AccountId) -> Decimal {
        AccountRepository::new(self.db.clone())
            .find(self.tenant, account)
            .await
            .expect("find account")
            .expect("account exists")
            .balance
    }
}

pub fn expense(id: TransactionId, account: AccountId, amount: &str, status: &str) -> Value {
    json!({
        "id": id.to_string(),
        "description": "Groceries",
        "amount": amount,
        "type": "EXPENSE",
        "status": status,
        "date": "2026-05-10",
        "accountId": account.to_string(),
    })
}

pub fn transfer(id: TransactionId, from: AccountId, to: AccountId, amount: &str) -> Value {
    json!({
        "id": id.to_string(),
        "description": "Move to savings",
        "amount": amount,
        "type": "TRANSFER",
        "status": "PAID",
        "date": "2026-05-10",
        "accountId": from.to_string(),
        "destinationAccountId": to.to_string(),
    })
}
