//! Sync command dispatcher.
//!
//! Sequences one command end to end: validate, resolve the tenant, open a
//! unit, lock the id, reconcile balances, persist, diff, audit, commit.
//! Any error drops the unit and with it every change the command made.

use async_trait::async_trait;
use serde::Serialize;
use tally_shared::types::{TenantId, TransactionId, UserId};
use tracing::{debug, info, warn};

use super::store::{LedgerStore, LedgerUnit, TenantResolver};
use crate::audit::{AuditEntry, diff_records};
use crate::ledger::error::LedgerError;
use crate::ledger::reconcile::{BalanceAdjustment, BalancePlan, plan_delete, plan_save};
use crate::ledger::types::{StoredTransaction, TransactionRecord};
use crate::ledger::validation::{SyncAction, SyncCommand, parse_delete, parse_save};

/// What a command did to its transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncEffect {
    /// First save of the id.
    Created,
    /// Save over an active record with at least one changed field.
    Updated,
    /// Save identical to the active record; nothing written.
    Unchanged,
    /// Active record tombstoned.
    Deleted,
    /// Delete of a tombstoned record; nothing written.
    AlreadyDeleted,
    /// Delete of an id the server has never seen; nothing written.
    Absent,
}

/// Result of a successfully applied command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    /// Target transaction.
    pub transaction_id: TransactionId,
    /// What happened.
    pub effect: SyncEffect,
    /// Balance changes that were applied, in application order.
    pub adjustments: Vec<BalanceAdjustment>,
}

impl SyncOutcome {
    fn new(transaction_id: TransactionId, effect: SyncEffect) -> Self {
        Self {
            transaction_id,
            effect,
            adjustments: Vec::new(),
        }
    }

    /// Returns true if the command wrote anything.
    #[must_use]
    pub const fn is_mutation(&self) -> bool {
        matches!(
            self.effect,
            SyncEffect::Created | SyncEffect::Updated | SyncEffect::Deleted
        )
    }
}

/// Applies sync commands on behalf of an authenticated user.
///
/// Object-safe so the HTTP layer can hold it behind `Arc<dyn _>`.
#[async_trait]
pub trait CommandDispatcher: Send + Sync {
    /// Applies one command as `actor`.
    async fn dispatch(
        &self,
        actor: UserId,
        command: SyncCommand,
    ) -> Result<SyncOutcome, LedgerError>;
}

/// Dispatcher over a ledger store and a tenant resolver.
pub struct SyncService<S, R> {
    store: S,
    resolver: R,
}

impl<S, R> SyncService<S, R>
where
    S: LedgerStore,
    R: TenantResolver,
{
    /// Creates a new dispatcher.
    pub const fn new(store: S, resolver: R) -> Self {
        Self { store, resolver }
    }

    /// Returns the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Validates and applies one command.
    ///
    /// Validation happens before any I/O, so a malformed command never
    /// touches storage.
    pub async fn execute(
        &self,
        actor: UserId,
        command: SyncCommand,
    ) -> Result<SyncOutcome, LedgerError> {
        match command.action {
            SyncAction::Save => {
                let record = parse_save(&command.payload)?;
                let tenant_id = self.resolver.resolve(actor).await?;
                self.save(tenant_id, actor, record).await
            }
            SyncAction::Delete => {
                let id = parse_delete(&command.payload)?;
                let tenant_id = self.resolver.resolve(actor).await?;
                self.delete(tenant_id, actor, id).await
            }
        }
    }

    async fn save(
        &self,
        tenant_id: TenantId,
        actor: UserId,
        record: TransactionRecord,
    ) -> Result<SyncOutcome, LedgerError> {
        let mut unit = self.store.begin(tenant_id).await?;
        let existing = unit.lock_transaction(record.id).await?;

        if let Some(stored) = &existing {
            check_tenant(stored, tenant_id)?;
            if stored.is_deleted() {
                warn!(transaction_id = %record.id, "Save rejected for deleted transaction");
                return Err(LedgerError::TransactionDeleted(record.id.into_inner()));
            }
        }

        if existing.as_ref().is_some_and(|stored| stored.record == record) {
            debug!(transaction_id = %record.id, "Save matches stored state");
            return Ok(SyncOutcome::new(record.id, SyncEffect::Unchanged));
        }

        let plan = plan_save(existing.as_ref().map(|s| &s.record), &record);
        let adjustments = apply_plan(&mut unit, &plan).await?;
        unit.upsert_transaction(&record, actor).await?;

        let (entry, effect) = match existing {
            Some(previous) => (
                diff_records(&previous.record, &record)
                    .map(|changes| AuditEntry::updated(tenant_id, actor, &previous, changes)),
                SyncEffect::Updated,
            ),
            None => (
                Some(AuditEntry::created(tenant_id, actor, &record)),
                SyncEffect::Created,
            ),
        };
        // A representation-only rewrite has no field changes to record.
        if let Some(entry) = entry {
            append_audit(&mut unit, &entry).await?;
        }
        unit.commit().await?;

        info!(
            tenant_id = %tenant_id,
            transaction_id = %record.id,
            effect = ?effect,
            adjustments = adjustments.len(),
            "Transaction saved"
        );

        Ok(SyncOutcome {
            transaction_id: record.id,
            effect,
            adjustments,
        })
    }

    async fn delete(
        &self,
        tenant_id: TenantId,
        actor: UserId,
        id: TransactionId,
    ) -> Result<SyncOutcome, LedgerError> {
        let mut unit = self.store.begin(tenant_id).await?;

        let Some(previous) = unit.lock_transaction(id).await? else {
            debug!(transaction_id = %id, "Delete of unknown transaction ignored");
            return Ok(SyncOutcome::new(id, SyncEffect::Absent));
        };
        check_tenant(&previous, tenant_id)?;
        if previous.is_deleted() {
            debug!(transaction_id = %id, "Transaction already deleted");
            return Ok(SyncOutcome::new(id, SyncEffect::AlreadyDeleted));
        }

        let plan = plan_delete(&previous.record);
        let adjustments = apply_plan(&mut unit, &plan).await?;

        if !unit.soft_delete_transaction(id, actor).await? {
            // The id lock is held, so only a store bug gets here.
            return Err(LedgerError::ConcurrentModification);
        }

        append_audit(&mut unit, &AuditEntry::deleted(tenant_id, actor, &previous)).await?;
        unit.commit().await?;

        info!(
            tenant_id = %tenant_id,
            transaction_id = %id,
            adjustments = adjustments.len(),
            "Transaction deleted"
        );

        Ok(SyncOutcome {
            transaction_id: id,
            effect: SyncEffect::Deleted,
            adjustments,
        })
    }
}

#[async_trait]
impl<S, R> CommandDispatcher for SyncService<S, R>
where
    S: LedgerStore,
    R: TenantResolver,
{
    async fn dispatch(
        &self,
        actor: UserId,
        command: SyncCommand,
    ) -> Result<SyncOutcome, LedgerError> {
        self.execute(actor, command).await
    }
}

fn check_tenant(stored: &StoredTransaction, tenant_id: TenantId) -> Result<(), LedgerError> {
    if stored.tenant_id == tenant_id {
        Ok(())
    } else {
        warn!(
            transaction_id = %stored.record.id,
            tenant_id = %tenant_id,
            "Cross-tenant mutation rejected"
        );
        Err(LedgerError::TenantMismatch(stored.record.id.into_inner()))
    }
}

/// Verifies every referenced account, then applies the non-zero deltas.
///
/// Verification comes first so a missing account fails the command before
/// any balance moves.
async fn apply_plan<U: LedgerUnit>(
    unit: &mut U,
    plan: &BalancePlan,
) -> Result<Vec<BalanceAdjustment>, LedgerError> {
    for account_id in plan.accounts() {
        if !unit.account_exists(account_id).await? {
            return Err(LedgerError::AccountNotFound(account_id.into_inner()));
        }
    }
    let effective = plan.effective();
    for adjustment in &effective {
        unit.adjust_balance(adjustment.account_id, adjustment.delta)
            .await?;
    }
    Ok(effective)
}

async fn append_audit<U: LedgerUnit>(unit: &mut U, entry: &AuditEntry) -> Result<(), LedgerError> {
    unit.append_audit(entry).await.map_err(|e| match e {
        LedgerError::AuditFailure(_) => e,
        e if e.is_retryable() => e,
        other => LedgerError::AuditFailure(other.to_string()),
    })
}
