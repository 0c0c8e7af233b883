//! Audit log repository.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use tally_core::audit::AuditEntry;
use tally_shared::types::{AuditLogId, TenantId, UserId};

use crate::entities::audit_logs;
use crate::rls::RlsConnection;

/// Appends an entry on the caller's transaction.
///
/// # Errors
///
/// Returns an error if the insert fails.
pub async fn append<C: ConnectionTrait>(conn: &C, entry: &AuditEntry) -> Result<(), DbErr> {
    audit_logs::ActiveModel {
        id: Set(entry.id.into_inner()),
        tenant_id: Set(entry.tenant_id.into_inner()),
        actor_id: Set(entry.actor_id.into_inner()),
        action: Set(entry.action.into()),
        entity_type: Set(entry.entity_type.clone()),
        entity_id: Set(entry.entity_id.clone()),
        summary: Set(entry.summary.clone()),
        previous_state: Set(entry.previous_state.clone()),
        changes: Set(entry.changes.clone()),
        created_at: Set(entry.created_at.fixed_offset()),
    }
    .insert(conn)
    .await?;
    Ok(())
}

fn to_entry(model: audit_logs::Model) -> AuditEntry {
    AuditEntry {
        id: AuditLogId::from_uuid(model.id),
        tenant_id: TenantId::from_uuid(model.tenant_id),
        actor_id: UserId::from_uuid(model.actor_id),
        action: model.action.into(),
        entity_type: model.entity_type,
        entity_id: model.entity_id,
        summary: model.summary,
        previous_state: model.previous_state,
        changes: model.changes,
        created_at: model.created_at.to_utc(),
    }
}

/// Read access to the audit trail.
#[derive(Debug, Clone)]
pub struct AuditRepository {
    db: DatabaseConnection,
}

impl AuditRepository {
    /// Creates a new audit repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Lists the entries for one entity, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn list_for_entity(
        &self,
        tenant_id: TenantId,
        entity_type: &str,
        entity_id: &str,
    ) -> Result<Vec<AuditEntry>, DbErr> {
        let rls = RlsConnection::new(&self.db, tenant_id).await?;
        let models = audit_logs::Entity::find()
            .filter(audit_logs::Column::TenantId.eq(tenant_id.into_inner()))
            .filter(audit_logs::Column::EntityType.eq(entity_type))
            .filter(audit_logs::Column::EntityId.eq(entity_id))
            .order_by_asc(audit_logs::Column::CreatedAt)
            .order_by_asc(audit_logs::Column::Id)
            .all(rls.transaction())
            .await?;
        rls.commit().await?;
        Ok(models.into_iter().map(to_entry).collect())
    }
}
