//! Storage seam for the sync dispatcher.
//!
//! The dispatcher never talks to a database directly. It opens a
//! [`LedgerUnit`] through a [`LedgerStore`], performs every read and write of
//! one command through it, and commits. A unit dropped without `commit`
//! discards everything done through it.

use async_trait::async_trait;
use rust_decimal::Decimal;
use tally_shared::types::{AccountId, TenantId, TransactionId, UserId};

use crate::audit::AuditEntry;
use crate::ledger::error::LedgerError;
use crate::ledger::types::{StoredTransaction, TransactionRecord};

/// One atomic unit of work scoped to a tenant.
#[async_trait]
pub trait LedgerUnit: Send {
    /// Locks the transaction id for the rest of the unit and returns the
    /// stored row, tombstoned or not, if any.
    ///
    /// The lock must cover ids that do not exist yet so that two first saves
    /// of the same id are serialized.
    async fn lock_transaction(
        &mut self,
        id: TransactionId,
    ) -> Result<Option<StoredTransaction>, LedgerError>;

    /// Returns true if the account exists under the unit's tenant.
    async fn account_exists(&mut self, account_id: AccountId) -> Result<bool, LedgerError>;

    /// Atomically adds `delta` to the account balance.
    ///
    /// Fails with `AccountNotFound` if no row under the tenant was updated.
    async fn adjust_balance(
        &mut self,
        account_id: AccountId,
        delta: Decimal,
    ) -> Result<(), LedgerError>;

    /// Inserts the record, or replaces every client-owned field of the
    /// existing row with the same id.
    async fn upsert_transaction(
        &mut self,
        record: &TransactionRecord,
        actor: UserId,
    ) -> Result<(), LedgerError>;

    /// Sets the tombstone; returns false if the row was absent or already
    /// tombstoned.
    async fn soft_delete_transaction(
        &mut self,
        id: TransactionId,
        actor: UserId,
    ) -> Result<bool, LedgerError>;

    /// Appends an audit entry inside the unit.
    async fn append_audit(&mut self, entry: &AuditEntry) -> Result<(), LedgerError>;

    /// Makes every change durable.
    async fn commit(self) -> Result<(), LedgerError>;
}

/// Opens atomic units.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Unit type produced by this store.
    type Unit: LedgerUnit;

    /// Begins a unit scoped to `tenant_id`.
    async fn begin(&self, tenant_id: TenantId) -> Result<Self::Unit, LedgerError>;
}

/// Maps an authenticated user to their tenant.
#[async_trait]
pub trait TenantResolver: Send + Sync {
    /// Returns the user's tenant, or `TenantNotResolved`.
    async fn resolve(&self, user_id: UserId) -> Result<TenantId, LedgerError>;
}
