//! `SeaORM` active enums mapped to `PostgreSQL` enum types.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use tally_core::audit::AuditAction as CoreAuditAction;
use tally_core::ledger::{TransactionStatus as CoreStatus, TransactionType as CoreType};

/// `account_type` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "account_type")]
pub enum AccountType {
    /// Checking account.
    #[sea_orm(string_value = "CHECKING")]
    Checking,
    /// Savings account.
    #[sea_orm(string_value = "SAVINGS")]
    Savings,
    /// Cash on hand.
    #[sea_orm(string_value = "CASH")]
    Cash,
    /// Credit card.
    #[sea_orm(string_value = "CREDIT_CARD")]
    CreditCard,
    /// Investment account.
    #[sea_orm(string_value = "INVESTMENT")]
    Investment,
}

/// `transaction_type` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_type")]
pub enum TransactionType {
    /// Income.
    #[sea_orm(string_value = "INCOME")]
    Income,
    /// Expense.
    #[sea_orm(string_value = "EXPENSE")]
    Expense,
    /// Transfer.
    #[sea_orm(string_value = "TRANSFER")]
    Transfer,
}

/// `transaction_status` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "transaction_status")]
pub enum TransactionStatus {
    /// Pending.
    #[sea_orm(string_value = "PENDING")]
    Pending,
    /// Paid.
    #[sea_orm(string_value = "PAID")]
    Paid,
    /// Overdue.
    #[sea_orm(string_value = "OVERDUE")]
    Overdue,
    /// Cancelled.
    #[sea_orm(string_value = "CANCELLED")]
    Cancelled,
}

/// `audit_action` enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "audit_action")]
pub enum AuditAction {
    /// Create.
    #[sea_orm(string_value = "CREATE")]
    Create,
    /// Update.
    #[sea_orm(string_value = "UPDATE")]
    Update,
    /// Delete.
    #[sea_orm(string_value = "DELETE")]
    Delete,
}

impl From<CoreType> for TransactionType {
    fn from(value: CoreType) -> Self {
        match value {
            CoreType::Income => Self::Income,
            CoreType::Expense => Self::Expense,
            CoreType::Transfer => Self::Transfer,
        }
    }
}

impl From<TransactionType> for CoreType {
    fn from(value: TransactionType) -> Self {
        match value {
            TransactionType::Income => Self::Income,
            TransactionType::Expense => Self::Expense,
            TransactionType::Transfer => Self::Transfer,
        }
    }
}

impl From<CoreStatus> for TransactionStatus {
    fn from(value: CoreStatus) -> Self {
        match value {
            CoreStatus::Pending => Self::Pending,
            CoreStatus::Paid => Self::Paid,
            CoreStatus::Overdue => Self::Overdue,
            CoreStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<TransactionStatus> for CoreStatus {
    fn from(value: TransactionStatus) -> Self {
        match value {
            TransactionStatus::Pending => Self::Pending,
            TransactionStatus::Paid => Self::Paid,
            TransactionStatus::Overdue => Self::Overdue,
            TransactionStatus::Cancelled => Self::Cancelled,
        }
    }
}

impl From<CoreAuditAction> for AuditAction {
    fn from(value: CoreAuditAction) -> Self {
        match value {
            CoreAuditAction::Create => Self::Create,
            CoreAuditAction::Update => Self::Update,
            CoreAuditAction::Delete => Self::Delete,
        }
    }
}

impl From<AuditAction> for CoreAuditAction {
    fn from(value: AuditAction) -> Self {
        match value {
            AuditAction::Create => Self::Create,
            AuditAction::Update => Self::Update,
            AuditAction::Delete => Self::Delete,
        }
    }
}
