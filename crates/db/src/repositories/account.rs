//! Account repository.
//!
//! Balances only ever change through [`increment_balance`], a single
//! `UPDATE accounts SET balance = balance + $delta` that Postgres applies
//! atomically under a row lock. There is no read-modify-write anywhere.

use std::collections::HashMap;

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use tally_core::ledger::{record_dest_impact, record_impact};
use tally_shared::types::{AccountId, TenantId};
use uuid::Uuid;

use crate::entities::{accounts, sea_orm_active_enums::AccountType, transactions};
use crate::rls::RlsConnection;

use super::transaction::to_stored;

/// Returns true if the account exists under the tenant.
///
/// # Errors
///
/// Returns an error if the query fails.
pub async fn exists<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
    account_id: AccountId,
) -> Result<bool, DbErr> {
    let count = accounts::Entity::find_by_id(account_id.into_inner())
        .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
        .count(conn)
        .await?;
    Ok(count > 0)
}

/// Atomically adds `delta` to the account balance.
///
/// Returns false if no account with this id exists under the tenant.
///
/// # Errors
///
/// Returns an error if the update fails.
pub async fn increment_balance<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
    account_id: AccountId,
    delta: Decimal,
) -> Result<bool, DbErr> {
    let result = accounts::Entity::update_many()
        .col_expr(
            accounts::Column::Balance,
            Expr::col(accounts::Column::Balance).add(delta),
        )
        .col_expr(accounts::Column::UpdatedAt, Expr::value(Utc::now()))
        .filter(accounts::Column::Id.eq(account_id.into_inner()))
        .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
        .exec(conn)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Input for opening an account.
#[derive(Debug, Clone)]
pub struct CreateAccountInput {
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// Display name.
    pub name: String,
    /// Account type.
    pub account_type: AccountType,
    /// Starting balance; also the current balance on creation.
    pub opening_balance: Decimal,
    /// Optional credit limit.
    pub credit_limit: Option<Decimal>,
}

/// An account whose stored balance disagrees with its transactions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceDrift {
    /// The account.
    pub account_id: AccountId,
    /// Stored balance.
    pub stored: Decimal,
    /// Opening balance plus the impact of every active transaction.
    pub expected: Decimal,
}

/// Account repository for account lifecycle and consistency checks.
#[derive(Debug, Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
}

impl AccountRepository {
    /// Creates a new account repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Opens an account with its balance set to the opening balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn create_account(&self, input: CreateAccountInput) -> Result<accounts::Model, DbErr> {
        let now = Utc::now().fixed_offset();
        accounts::ActiveModel {
            id: Set(Uuid::now_v7()),
            tenant_id: Set(input.tenant_id.into_inner()),
            name: Set(input.name),
            account_type: Set(input.account_type),
            balance: Set(input.opening_balance),
            opening_balance: Set(input.opening_balance),
            credit_limit: Set(input.credit_limit),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await
    }

    /// Finds an account under the tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find(
        &self,
        tenant_id: TenantId,
        account_id: AccountId,
    ) -> Result<Option<accounts::Model>, DbErr> {
        accounts::Entity::find_by_id(account_id.into_inner())
            .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .one(&self.db)
            .await
    }

    /// Recomputes every balance of the tenant from its active transactions
    /// and returns the accounts that disagree.
    ///
    /// An empty result means the ledger invariant holds.
    ///
    /// # Errors
    ///
    /// Returns an error if a query fails.
    pub async fn verify_balances(&self, tenant_id: TenantId) -> Result<Vec<BalanceDrift>, DbErr> {
        let rls = RlsConnection::new(&self.db, tenant_id).await?;
        let txn = rls.transaction();

        let accounts = accounts::Entity::find()
            .filter(accounts::Column::TenantId.eq(tenant_id.into_inner()))
            .order_by_asc(accounts::Column::Id)
            .all(txn)
            .await?;
        let active = transactions::Entity::find()
            .filter(transactions::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(transactions::Column::DeletedAt.is_null())
            .all(txn)
            .await?;
        rls.commit().await?;

        let mut expected: HashMap<AccountId, Decimal> = accounts
            .iter()
            .map(|a| (AccountId::from_uuid(a.id), a.opening_balance))
            .collect();
        for stored in active.into_iter().map(to_stored) {
            let record = &stored.record;
            *expected.entry(record.account_id).or_default() += record_impact(record);
            if let Some(destination) = record.destination_account_id {
                *expected.entry(destination).or_default() += record_dest_impact(record);
            }
        }

        Ok(accounts
            .into_iter()
            .filter_map(|account| {
                let account_id = AccountId::from_uuid(account.id);
                let expected = expected.get(&account_id).copied().unwrap_or_default();
                (account.balance != expected).then_some(BalanceDrift {
                    account_id,
                    stored: account.balance,
                    expected,
                })
            })
            .collect())
    }
}
