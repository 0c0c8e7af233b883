//! `PostgreSQL` ledger store.
//!
//! A unit is one database transaction with `lock_timeout` and the tenant
//! context applied. Dropping a [`PgLedgerUnit`] without committing rolls the
//! transaction back.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, RuntimeErr, TransactionTrait};
use tally_core::audit::AuditEntry;
use tally_core::ledger::{LedgerError, StoredTransaction, TransactionRecord};
use tally_core::sync::{LedgerStore, LedgerUnit, SyncService};
use tally_shared::types::{AccountId, TenantId, TransactionId, UserId};
use tracing::warn;

use super::tenant::TenantRepository;
use super::{account, audit, transaction};
use crate::rls::{set_lock_timeout, set_tenant_context};

/// The sync dispatcher wired to `PostgreSQL`.
pub type LedgerSync = SyncService<PgLedgerStore, TenantRepository>;

const LOCK_NOT_AVAILABLE: &str = "55P03";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

fn sqlstate(err: &DbErr) -> Option<String> {
    match err {
        DbErr::Exec(RuntimeErr::SqlxError(e)) | DbErr::Query(RuntimeErr::SqlxError(e)) => e
            .as_database_error()
            .and_then(|d| d.code())
            .map(std::borrow::Cow::into_owned),
        _ => None,
    }
}

fn is_contention(err: &DbErr) -> bool {
    matches!(
        sqlstate(err).as_deref(),
        Some(LOCK_NOT_AVAILABLE | SERIALIZATION_FAILURE | DEADLOCK_DETECTED)
    )
}

/// Maps a database error to the ledger taxonomy.
#[must_use]
pub fn map_db_err(err: DbErr) -> LedgerError {
    if is_contention(&err) {
        warn!(error = %err, "Lock contention in ledger unit");
        LedgerError::ConcurrentModification
    } else {
        LedgerError::Database(err.to_string())
    }
}

fn map_lock_err(err: DbErr, id: TransactionId) -> LedgerError {
    if sqlstate(&err).as_deref() == Some(LOCK_NOT_AVAILABLE) {
        warn!(transaction_id = %id, "Timed out waiting for transaction lock");
        LedgerError::LockTimeout(id.into_inner())
    } else {
        map_db_err(err)
    }
}

/// Opens ledger units on a `PostgreSQL` pool.
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    db: DatabaseConnection,
    lock_timeout: Duration,
}

impl PgLedgerStore {
    /// Creates a store whose units wait at most `lock_timeout` for any lock.
    #[must_use]
    pub const fn new(db: DatabaseConnection, lock_timeout: Duration) -> Self {
        Self { db, lock_timeout }
    }

    /// Returns the underlying pool.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    type Unit = PgLedgerUnit;

    async fn begin(&self, tenant_id: TenantId) -> Result<PgLedgerUnit, LedgerError> {
        let txn = self.db.begin().await.map_err(map_db_err)?;
        set_lock_timeout(&txn, self.lock_timeout)
            .await
            .map_err(map_db_err)?;
        set_tenant_context(&txn, tenant_id)
            .await
            .map_err(map_db_err)?;
        Ok(PgLedgerUnit { txn, tenant_id })
    }
}

/// One database transaction scoped to a tenant.
pub struct PgLedgerUnit {
    txn: DatabaseTransaction,
    tenant_id: TenantId,
}

#[async_trait]
impl LedgerUnit for PgLedgerUnit {
    async fn lock_transaction(
        &mut self,
        id: TransactionId,
    ) -> Result<Option<StoredTransaction>, LedgerError> {
        let row = transaction::lock_for_update(&self.txn, id)
            .await
            .map_err(|e| map_lock_err(e, id))?;
        Ok(row.map(transaction::to_stored))
    }

    async fn account_exists(&mut self, account_id: AccountId) -> Result<bool, LedgerError> {
        account::exists(&self.txn, self.tenant_id, account_id)
            .await
            .map_err(map_db_err)
    }

    async fn adjust_balance(
        &mut self,
        account_id: AccountId,
        delta: Decimal,
    ) -> Result<(), LedgerError> {
        let updated = account::increment_balance(&self.txn, self.tenant_id, account_id, delta)
            .await
            .map_err(map_db_err)?;
        if updated {
            Ok(())
        } else {
            Err(LedgerError::AccountNotFound(account_id.into_inner()))
        }
    }

    async fn upsert_transaction(
        &mut self,
        record: &TransactionRecord,
        actor: UserId,
    ) -> Result<(), LedgerError> {
        transaction::upsert(&self.txn, self.tenant_id, record, actor)
            .await
            .map_err(map_db_err)
    }

    async fn soft_delete_transaction(
        &mut self,
        id: TransactionId,
        actor: UserId,
    ) -> Result<bool, LedgerError> {
        transaction::soft_delete(&self.txn, self.tenant_id, id, actor)
            .await
            .map_err(map_db_err)
    }

    async fn append_audit(&mut self, entry: &AuditEntry) -> Result<(), LedgerError> {
        audit::append(&self.txn, entry).await.map_err(map_db_err)
    }

    async fn commit(self) -> Result<(), LedgerError> {
        self.txn.commit().await.map_err(map_db_err)
    }
}
