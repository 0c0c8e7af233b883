//! Ledger domain types for transaction synchronization.
//!
//! This module defines the core types used by the reconciliation engine:
//! transaction classification, business status, and the validated
//! transaction record that flows through reconciliation, storage and audit.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, TenantId, TransactionId, UserId};
use uuid::Uuid;

/// Transaction type classification.
///
/// Determines the sign of a transaction's effect on its source account and
/// whether it carries a destination leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Money coming into the account.
    Income,
    /// Money leaving the account.
    Expense,
    /// Money moving from the account to a destination account.
    Transfer,
}

impl TransactionType {
    /// Returns the canonical wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Income => "INCOME",
            Self::Expense => "EXPENSE",
            Self::Transfer => "TRANSFER",
        }
    }

    /// Returns true if the transaction has a destination leg.
    #[must_use]
    pub const fn is_transfer(&self) -> bool {
        matches!(self, Self::Transfer)
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "INCOME" => Ok(Self::Income),
            "EXPENSE" => Ok(Self::Expense),
            "TRANSFER" => Ok(Self::Transfer),
            _ => Err(s.to_string()),
        }
    }
}

/// Business status of a transaction.
///
/// Only `Paid` transactions affect balances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionStatus {
    /// Scheduled or awaiting settlement.
    Pending,
    /// Settled; the amount has moved.
    Paid,
    /// Past its date without settlement.
    Overdue,
    /// Abandoned without settlement.
    Cancelled,
}

impl TransactionStatus {
    /// Returns the canonical wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Paid => "PAID",
            Self::Overdue => "OVERDUE",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Returns true if a transaction in this status counts toward balances.
    #[must_use]
    pub const fn affects_balance(&self) -> bool {
        matches!(self, Self::Paid)
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Ok(Self::Pending),
            "PAID" => Ok(Self::Paid),
            "OVERDUE" => Ok(Self::Overdue),
            "CANCELLED" | "CANCELED" => Ok(Self::Cancelled),
            _ => Err(s.to_string()),
        }
    }
}

/// A validated transaction as submitted by a client.
///
/// This is the full set of client-owned fields; every SAVE replaces all of
/// them. Serialized with camelCase keys, which is also the shape recorded in
/// the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Client-assigned identifier.
    pub id: TransactionId,
    /// Free-form description.
    pub description: String,
    /// Non-negative magnitude.
    pub amount: Decimal,
    /// Transaction type.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// Business status.
    pub status: TransactionStatus,
    /// Calendar day of the transaction.
    pub date: NaiveDate,
    /// Source account.
    pub account_id: AccountId,
    /// Destination account, present only for transfers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination_account_id: Option<AccountId>,
    /// Counterparty contact.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<Uuid>,
    /// Branch the transaction is booked under.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_id: Option<Uuid>,
    /// Category label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Series this transaction belongs to, for recurring or installment plans.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_id: Option<Uuid>,
    /// Position within the installment series (1-based).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installment_number: Option<i32>,
    /// Total installments in the series.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installment_total: Option<i32>,
}

impl TransactionRecord {
    /// Returns the record as a JSON object for auditing.
    #[must_use]
    pub fn to_audit_map(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }
}

/// A transaction as persisted, with ownership and lifecycle metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTransaction {
    /// Client-owned fields.
    pub record: TransactionRecord,
    /// Owning tenant.
    pub tenant_id: TenantId,
    /// User who first saved the transaction.
    pub created_by: UserId,
    /// User who last saved or deleted the transaction.
    pub updated_by: UserId,
    /// First save.
    pub created_at: DateTime<Utc>,
    /// Last mutation.
    pub updated_at: DateTime<Utc>,
    /// Tombstone; set once and never cleared by the sync path.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl StoredTransaction {
    /// Returns true if the transaction has been tombstoned.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Returns the full stored state as a JSON snapshot for `previous_state`.
    #[must_use]
    pub fn snapshot(&self) -> serde_json::Value {
        let mut map = self.record.to_audit_map();
        map.insert("tenantId".into(), serde_json::json!(self.tenant_id));
        map.insert("createdBy".into(), serde_json::json!(self.created_by));
        map.insert("updatedBy".into(), serde_json::json!(self.updated_by));
        map.insert("createdAt".into(), serde_json::json!(self.created_at));
        map.insert("updatedAt".into(), serde_json::json!(self.updated_at));
        map.insert("deletedAt".into(), serde_json::json!(self.deleted_at));
        serde_json::Value::Object(map)
    }
}
