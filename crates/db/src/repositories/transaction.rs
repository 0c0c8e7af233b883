//! Transaction repository.
//!
//! Transactions are keyed by their client-assigned id. Writes go through
//! free functions that run on the caller's database transaction, so the
//! ledger store can combine them with balance and audit writes in one unit.
//! Reads used for pull-sync live on [`TransactionRepository`].

use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, Statement,
};
use tally_core::ledger::{StoredTransaction, TransactionRecord};
use tally_shared::types::{AccountId, TenantId, TransactionId, UserId};

use crate::entities::transactions;
use crate::rls::RlsConnection;

/// Converts a row into the core representation.
#[must_use]
pub fn to_stored(model: transactions::Model) -> StoredTransaction {
    StoredTransaction {
        record: TransactionRecord {
            id: TransactionId::from_uuid(model.id),
            description: model.description,
            amount: model.amount,
            transaction_type: model.transaction_type.into(),
            status: model.status.into(),
            date: model.transaction_date,
            account_id: AccountId::from_uuid(model.account_id),
            destination_account_id: model.destination_account_id.map(AccountId::from_uuid),
            contact_id: model.contact_id,
            branch_id: model.branch_id,
            category: model.category,
            recurrence_id: model.recurrence_id,
            installment_number: model.installment_number,
            installment_total: model.installment_total,
        },
        tenant_id: TenantId::from_uuid(model.tenant_id),
        created_by: UserId::from_uuid(model.created_by),
        updated_by: UserId::from_uuid(model.updated_by),
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
        deleted_at: model.deleted_at.map(|d| d.with_timezone(&Utc)),
    }
}

/// Locks `id` for the rest of the database transaction and returns its row.
///
/// The advisory lock is taken first because a row lock cannot cover an id
/// that has no row yet; two first saves of the same id would otherwise both
/// see it as absent.
///
/// # Errors
///
/// Returns an error if either lock cannot be acquired.
pub async fn lock_for_update<C: ConnectionTrait>(
    conn: &C,
    id: TransactionId,
) -> Result<Option<transactions::Model>, DbErr> {
    conn.execute(Statement::from_sql_and_values(
        DbBackend::Postgres,
        "SELECT pg_advisory_xact_lock(hashtextextended($1, 0))",
        [id.to_string().into()],
    ))
    .await?;

    transactions::Entity::find_by_id(id.into_inner())
        .lock_exclusive()
        .one(conn)
        .await
}

/// Inserts the record or replaces every client-owned field of the row with
/// the same id, in a single statement.
///
/// Tenant and creation metadata are written on insert only.
///
/// # Errors
///
/// Returns an error if the statement fails.
pub async fn upsert<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
    record: &TransactionRecord,
    actor: UserId,
) -> Result<(), DbErr> {
    let now = Utc::now().fixed_offset();
    let model = transactions::ActiveModel {
        id: Set(record.id.into_inner()),
        tenant_id: Set(tenant_id.into_inner()),
        description: Set(record.description.clone()),
        amount: Set(record.amount),
        transaction_type: Set(record.transaction_type.into()),
        status: Set(record.status.into()),
        transaction_date: Set(record.date),
        account_id: Set(record.account_id.into_inner()),
        destination_account_id: Set(record.destination_account_id.map(AccountId::into_inner)),
        contact_id: Set(record.contact_id),
        branch_id: Set(record.branch_id),
        category: Set(record.category.clone()),
        recurrence_id: Set(record.recurrence_id),
        installment_number: Set(record.installment_number),
        installment_total: Set(record.installment_total),
        created_by: Set(actor.into_inner()),
        updated_by: Set(actor.into_inner()),
        created_at: Set(now),
        updated_at: Set(now),
        deleted_at: Set(None),
    };

    transactions::Entity::insert(model)
        .on_conflict(
            OnConflict::column(transactions::Column::Id)
                .update_columns([
                    transactions::Column::Description,
                    transactions::Column::Amount,
                    transactions::Column::TransactionType,
                    transactions::Column::Status,
                    transactions::Column::TransactionDate,
                    transactions::Column::AccountId,
                    transactions::Column::DestinationAccountId,
                    transactions::Column::ContactId,
                    transactions::Column::BranchId,
                    transactions::Column::Category,
                    transactions::Column::RecurrenceId,
                    transactions::Column::InstallmentNumber,
                    transactions::Column::InstallmentTotal,
                    transactions::Column::UpdatedBy,
                    transactions::Column::UpdatedAt,
                    transactions::Column::DeletedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}

/// Sets the tombstone on an active row.
///
/// Returns false if no active row with this id exists under the tenant.
///
/// # Errors
///
/// Returns an error if the update fails.
pub async fn soft_delete<C: ConnectionTrait>(
    conn: &C,
    tenant_id: TenantId,
    id: TransactionId,
    actor: UserId,
) -> Result<bool, DbErr> {
    let now = Utc::now();
    let result = transactions::Entity::update_many()
        .col_expr(transactions::Column::DeletedAt, Expr::value(now))
        .col_expr(transactions::Column::UpdatedAt, Expr::value(now))
        .col_expr(transactions::Column::UpdatedBy, Expr::value(actor.into_inner()))
        .filter(transactions::Column::Id.eq(id.into_inner()))
        .filter(transactions::Column::TenantId.eq(tenant_id.into_inner()))
        .filter(transactions::Column::DeletedAt.is_null())
        .exec(conn)
        .await?;
    Ok(result.rows_affected > 0)
}

/// Read access to transactions for pull-sync.
#[derive(Debug, Clone)]
pub struct TransactionRepository {
    db: DatabaseConnection,
}

impl TransactionRepository {
    /// Creates a new transaction repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a transaction by id under the tenant, tombstoned or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn find(
        &self,
        tenant_id: TenantId,
        id: TransactionId,
    ) -> Result<Option<StoredTransaction>, DbErr> {
        let rls = RlsConnection::new(&self.db, tenant_id).await?;
        let model = transactions::Entity::find_by_id(id.into_inner())
            .filter(transactions::Column::TenantId.eq(tenant_id.into_inner()))
            .one(rls.transaction())
            .await?;
        rls.commit().await?;
        Ok(model.map(to_stored))
    }

    /// Lists non-deleted transactions, optionally only those changed after
    /// `updated_since`, oldest change first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_active(
        &self,
        tenant_id: TenantId,
        updated_since: Option<DateTime<Utc>>,
    ) -> Result<Vec<StoredTransaction>, DbErr> {
        let rls = RlsConnection::new(&self.db, tenant_id).await?;
        let mut query = transactions::Entity::find()
            .filter(transactions::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(transactions::Column::DeletedAt.is_null());
        if let Some(since) = updated_since {
            query = query.filter(transactions::Column::UpdatedAt.gt(since));
        }
        let models = query
            .order_by_asc(transactions::Column::UpdatedAt)
            .order_by_asc(transactions::Column::Id)
            .all(rls.transaction())
            .await?;
        rls.commit().await?;
        Ok(models.into_iter().map(to_stored).collect())
    }
}
