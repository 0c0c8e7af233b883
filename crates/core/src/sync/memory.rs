//! In-memory ledger store for dispatcher tests.
//!
//! A single async mutex stands in for the database's id lock. A unit works on
//! a private copy of the state and publishes it on commit, so dropping a unit
//! discards its changes just as a rolled back transaction would.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use tally_shared::types::{AccountId, TenantId, TransactionId, UserId};
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::store::{LedgerStore, LedgerUnit, TenantResolver};
use crate::audit::AuditEntry;
use crate::ledger::error::LedgerError;
use crate::ledger::types::{StoredTransaction, TransactionRecord};

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub accounts: HashMap<AccountId, (TenantId, Decimal)>,
    pub transactions: HashMap<TransactionId, StoredTransaction>,
    pub audit: Vec<AuditEntry>,
}

#[derive(Clone)]
pub struct MemoryLedger {
    state: Arc<Mutex<MemoryState>>,
    members: Arc<Mutex<HashMap<UserId, TenantId>>>,
    lock_timeout: Duration,
    fail_audit: Arc<AtomicBool>,
}

impl Default for MemoryLedger {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

impl MemoryLedger {
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            state: Arc::new(Mutex::new(MemoryState::default())),
            members: Arc::new(Mutex::new(HashMap::new())),
            lock_timeout,
            fail_audit: Arc::new(AtomicBool::new(false)),
        }
    }

    pub async fn add_member(&self, user_id: UserId, tenant_id: TenantId) {
        self.members.lock().await.insert(user_id, tenant_id);
    }

    pub async fn open_account(&self, tenant_id: TenantId, balance: Decimal) -> AccountId {
        let id = AccountId::new();
        self.state
            .lock()
            .await
            .accounts
            .insert(id, (tenant_id, balance));
        id
    }

    pub async fn balance(&self, account_id: AccountId) -> Decimal {
        self.state.lock().await.accounts[&account_id].1
    }

    pub async fn transaction(&self, id: TransactionId) -> Option<StoredTransaction> {
        self.state.lock().await.transactions.get(&id).cloned()
    }

    pub async fn audit(&self) -> Vec<AuditEntry> {
        self.state.lock().await.audit.clone()
    }

    pub fn fail_audit(&self, fail: bool) {
        self.fail_audit.store(fail, Ordering::SeqCst);
    }

    /// Takes the id lock directly, as a concurrent unit would.
    pub async fn hold_lock(&self) -> OwnedMutexGuard<MemoryState> {
        self.state.clone().lock_owned().await
    }
}

pub struct MemoryUnit {
    shared: Arc<Mutex<MemoryState>>,
    guard: Option<OwnedMutexGuard<MemoryState>>,
    working: MemoryState,
    tenant_id: TenantId,
    lock_timeout: Duration,
    fail_audit: bool,
}

impl MemoryUnit {
    fn locked(&self) -> Result<(), LedgerError> {
        if self.guard.is_some() {
            Ok(())
        } else {
            Err(LedgerError::Internal("unit used before locking".into()))
        }
    }
}

#[async_trait]
impl LedgerUnit for MemoryUnit {
    async fn lock_transaction(
        &mut self,
        id: TransactionId,
    ) -> Result<Option<StoredTransaction>, LedgerError> {
        if self.guard.is_none() {
            let guard = tokio::time::timeout(self.lock_timeout, self.shared.clone().lock_owned())
                .await
                .map_err(|_| LedgerError::LockTimeout(id.into_inner()))?;
            self.working = (*guard).clone();
            self.guard = Some(guard);
        }
        Ok(self.working.transactions.get(&id).cloned())
    }

    async fn account_exists(&mut self, account_id: AccountId) -> Result<bool, LedgerError> {
        self.locked()?;
        Ok(self
            .working
            .accounts
            .get(&account_id)
            .is_some_and(|(tenant, _)| *tenant == self.tenant_id))
    }

    async fn adjust_balance(
        &mut self,
        account_id: AccountId,
        delta: Decimal,
    ) -> Result<(), LedgerError> {
        self.locked()?;
        match self.working.accounts.get_mut(&account_id) {
            Some((tenant, balance)) if *tenant == self.tenant_id => {
                *balance += delta;
                Ok(())
            }
            _ => Err(LedgerError::AccountNotFound(account_id.into_inner())),
        }
    }

    async fn upsert_transaction(
        &mut self,
        record: &TransactionRecord,
        actor: UserId,
    ) -> Result<(), LedgerError> {
        self.locked()?;
        let now = Utc::now();
        let tenant_id = self.tenant_id;
        self.working
            .transactions
            .entry(record.id)
            .and_modify(|stored| {
                stored.record = record.clone();
                stored.updated_by = actor;
                stored.updated_at = now;
                stored.deleted_at = None;
            })
            .or_insert_with(|| StoredTransaction {
                record: record.clone(),
                tenant_id,
                created_by: actor,
                updated_by: actor,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            });
        Ok(())
    }

    async fn soft_delete_transaction(
        &mut self,
        id: TransactionId,
        actor: UserId,
    ) -> Result<bool, LedgerError> {
        self.locked()?;
        match self.working.transactions.get_mut(&id) {
            Some(stored) if stored.tenant_id == self.tenant_id && !stored.is_deleted() => {
                let now = Utc::now();
                stored.deleted_at = Some(now);
                stored.updated_at = now;
                stored.updated_by = actor;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn append_audit(&mut self, entry: &AuditEntry) -> Result<(), LedgerError> {
        self.locked()?;
        if self.fail_audit {
            return Err(LedgerError::AuditFailure("audit sink unavailable".into()));
        }
        self.working.audit.push(entry.clone());
        Ok(())
    }

    async fn commit(self) -> Result<(), LedgerError> {
        let Some(mut guard) = self.guard else {
            return Err(LedgerError::Internal("commit without lock".into()));
        };
        *guard = self.working;
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryLedger {
    type Unit = MemoryUnit;

    async fn begin(&self, tenant_id: TenantId) -> Result<MemoryUnit, LedgerError> {
        Ok(MemoryUnit {
            shared: self.state.clone(),
            guard: None,
            working: MemoryState::default(),
            tenant_id,
            lock_timeout: self.lock_timeout,
            fail_audit: self.fail_audit.load(Ordering::SeqCst),
        })
    }
}

#[async_trait]
impl TenantResolver for MemoryLedger {
    async fn resolve(&self, user_id: UserId) -> Result<TenantId, LedgerError> {
        self.members
            .lock()
            .await
            .get(&user_id)
            .copied()
            .ok_or(LedgerError::TenantNotResolved(user_id.into_inner()))
    }
}
