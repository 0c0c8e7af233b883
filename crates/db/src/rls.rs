//! Row-Level Security (RLS) context management.
//!
//! Every tenant-scoped table carries a policy keyed on the
//! `app.current_tenant_id` setting. The setting is applied with `SET LOCAL`,
//! so it lives exactly as long as the surrounding database transaction.
//!
//! # Usage
//!
//! ```ignore
//! use tally_db::rls::RlsConnection;
//!
//! let rls = RlsConnection::new(&db, tenant_id).await?;
//! let accounts = Accounts::find().all(rls.transaction()).await?;
//! rls.commit().await?;
//! ```

use std::time::Duration;

use sea_orm::{ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};
use tally_shared::types::TenantId;

/// A database transaction with the tenant context applied.
pub struct RlsConnection {
    txn: DatabaseTransaction,
}

impl RlsConnection {
    /// Begins a transaction and scopes it to `tenant_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction cannot be started or the RLS
    /// context cannot be set.
    pub async fn new(db: &DatabaseConnection, tenant_id: TenantId) -> Result<Self, DbErr> {
        let txn = db.begin().await?;
        set_tenant_context(&txn, tenant_id).await?;
        Ok(Self { txn })
    }

    /// Returns the underlying transaction for executing queries.
    #[must_use]
    pub fn transaction(&self) -> &DatabaseTransaction {
        &self.txn
    }

    /// Releases the underlying transaction.
    #[must_use]
    pub fn into_inner(self) -> DatabaseTransaction {
        self.txn
    }

    /// Commits the transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the commit fails.
    pub async fn commit(self) -> Result<(), DbErr> {
        self.txn.commit().await
    }
}

/// Sets the RLS context on an existing transaction.
///
/// # Errors
///
/// Returns an error if the RLS context cannot be set.
pub async fn set_tenant_context(
    txn: &DatabaseTransaction,
    tenant_id: TenantId,
) -> Result<(), DbErr> {
    txn.execute_unprepared(&tenant_setting_sql(tenant_id)).await?;
    Ok(())
}

/// Bounds every lock wait in the transaction.
///
/// # Errors
///
/// Returns an error if the setting cannot be applied.
pub async fn set_lock_timeout(txn: &DatabaseTransaction, timeout: Duration) -> Result<(), DbErr> {
    txn.execute_unprepared(&lock_timeout_sql(timeout)).await?;
    Ok(())
}

// A formatted UUID cannot carry quotes, so interpolation is safe here.
fn tenant_setting_sql(tenant_id: TenantId) -> String {
    format!("SET LOCAL app.current_tenant_id = '{tenant_id}'")
}

fn lock_timeout_sql(timeout: Duration) -> String {
    format!("SET LOCAL lock_timeout = '{}ms'", timeout.as_millis())
}
