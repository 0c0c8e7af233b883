//! Audit log entry types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tally_shared::types::{AuditLogId, TenantId, UserId};

use crate::ledger::types::{StoredTransaction, TransactionRecord};

/// Entity type recorded for transaction mutations.
pub const TRANSACTION_ENTITY: &str = "transaction";

/// Mutation recorded by an audit entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    /// First save of an id.
    Create,
    /// Save over an active record.
    Update,
    /// Tombstone.
    Delete,
}

impl AuditAction {
    /// Returns the stored name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CREATE" => Ok(Self::Create),
            "UPDATE" => Ok(Self::Update),
            "DELETE" => Ok(Self::Delete),
            _ => Err(s.to_string()),
        }
    }
}

/// One append-only audit record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Entry id.
    pub id: AuditLogId,
    /// Tenant the mutation happened in.
    pub tenant_id: TenantId,
    /// User who issued the command.
    pub actor_id: UserId,
    /// What happened.
    pub action: AuditAction,
    /// Kind of entity mutated.
    pub entity_type: String,
    /// Id of the entity mutated.
    pub entity_id: String,
    /// Human-readable one-liner.
    pub summary: String,
    /// Full stored state before the mutation; absent on create.
    pub previous_state: Option<Value>,
    /// Field diff, or the full payload on create.
    pub changes: Option<Value>,
    /// When the entry was written.
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    fn new(
        tenant_id: TenantId,
        actor_id: UserId,
        action: AuditAction,
        record: &TransactionRecord,
        summary: String,
    ) -> Self {
        Self {
            id: AuditLogId::new(),
            tenant_id,
            actor_id,
            action,
            entity_type: TRANSACTION_ENTITY.to_string(),
            entity_id: record.id.to_string(),
            summary,
            previous_state: None,
            changes: None,
            created_at: Utc::now(),
        }
    }

    /// Entry for the first save of a transaction; records the full payload.
    #[must_use]
    pub fn created(tenant_id: TenantId, actor_id: UserId, record: &TransactionRecord) -> Self {
        let summary = format!(
            "Created {} transaction \"{}\" of {}",
            record.transaction_type, record.description, record.amount
        );
        let mut entry = Self::new(tenant_id, actor_id, AuditAction::Create, record, summary);
        entry.changes = Some(Value::Object(record.to_audit_map()));
        entry
    }

    /// Entry for a save over an active record with a non-empty diff.
    #[must_use]
    pub fn updated(
        tenant_id: TenantId,
        actor_id: UserId,
        previous: &StoredTransaction,
        changes: Map<String, Value>,
    ) -> Self {
        let fields: Vec<&str> = changes.keys().map(String::as_str).collect();
        let summary = format!(
            "Updated transaction \"{}\": {}",
            previous.record.description,
            fields.join(", ")
        );
        let mut entry = Self::new(tenant_id, actor_id, AuditAction::Update, &previous.record, summary);
        entry.previous_state = Some(previous.snapshot());
        entry.changes = Some(Value::Object(changes));
        entry
    }

    /// Entry for a tombstone.
    #[must_use]
    pub fn deleted(tenant_id: TenantId, actor_id: UserId, previous: &StoredTransaction) -> Self {
        let summary = format!("Deleted transaction \"{}\"", previous.record.description);
        let mut entry = Self::new(tenant_id, actor_id, AuditAction::Delete, &previous.record, summary);
        entry.previous_state = Some(previous.snapshot());
        entry
    }
}
