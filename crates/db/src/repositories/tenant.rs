//! Tenant repository.

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, DbErr, EntityTrait, Set};
use tally_core::ledger::LedgerError;
use tally_core::sync::TenantResolver;
use tally_shared::types::{TenantId, UserId};
use tracing::warn;
use uuid::Uuid;

use crate::entities::{tenant_members, tenants};

/// Tenant repository for tenants and their members.
#[derive(Debug, Clone)]
pub struct TenantRepository {
    db: DatabaseConnection,
}

impl TenantRepository {
    /// Creates a new tenant repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create_tenant(&self, name: &str) -> Result<tenants::Model, DbErr> {
        tenants::ActiveModel {
            id: Set(Uuid::now_v7()),
            name: Set(name.to_string()),
            created_at: Set(chrono::Utc::now().fixed_offset()),
        }
        .insert(&self.db)
        .await
    }

    /// Attaches a user to a tenant. A user belongs to exactly one tenant.
    ///
    /// # Errors
    ///
    /// Returns an error if the user is already a member or the insert fails.
    pub async fn add_member(&self, tenant_id: TenantId, user_id: UserId) -> Result<(), DbErr> {
        tenant_members::ActiveModel {
            user_id: Set(user_id.into_inner()),
            tenant_id: Set(tenant_id.into_inner()),
            created_at: Set(chrono::Utc::now().fixed_offset()),
        }
        .insert(&self.db)
        .await?;
        Ok(())
    }

    /// Returns the tenant of a user, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn tenant_of(&self, user_id: UserId) -> Result<Option<TenantId>, DbErr> {
        let member = tenant_members::Entity::find_by_id(user_id.into_inner())
            .one(&self.db)
            .await?;
        Ok(member.map(|m| TenantId::from_uuid(m.tenant_id)))
    }
}

#[async_trait]
impl TenantResolver for TenantRepository {
    async fn resolve(&self, user_id: UserId) -> Result<TenantId, LedgerError> {
        match self.tenant_of(user_id).await {
            Ok(Some(tenant_id)) => Ok(tenant_id),
            Ok(None) => {
                warn!(user_id = %user_id, "User has no tenant");
                Err(LedgerError::TenantNotResolved(user_id.into_inner()))
            }
            Err(e) => Err(LedgerError::Database(e.to_string())),
        }
    }
}
