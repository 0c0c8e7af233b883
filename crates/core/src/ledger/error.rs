//! Ledger error types for sync commands.
//!
//! Every failure the dispatcher can report is a `LedgerError`. Errors are
//! grouped into kinds that tell a client what to do next: fix the payload,
//! fix the references, retry verbatim, or give up.

use tally_shared::AppError;
use thiserror::Error;
use uuid::Uuid;

/// Broad classification of a ledger error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The command itself is malformed or not allowed in the current state.
    Validation,
    /// The command names an account or tenant the actor cannot use.
    Referential,
    /// A lock could not be taken in time; retry the same command.
    Contention,
    /// The mutation could not be audited and was rolled back.
    AuditFailure,
    /// Storage or invariant failure.
    Internal,
}

impl ErrorKind {
    /// Returns the wire name used in error responses.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Referential => "referential",
            Self::Contention => "contention",
            Self::AuditFailure => "audit_failure",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while applying a sync command.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Payload carries no transaction id.
    #[error("Transaction id is required")]
    MissingId,

    /// Transaction id is not a UUID.
    #[error("Transaction id is not a valid UUID: {0}")]
    InvalidId(String),

    /// A required payload field is absent or empty.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// An enum field holds an unknown value.
    #[error("Invalid value for {field}: {value}")]
    InvalidEnumValue {
        /// Payload key.
        field: &'static str,
        /// Rejected value.
        value: String,
    },

    /// Amount is neither a number nor a numeric string.
    #[error("Amount is not a valid decimal: {0}")]
    MalformedAmount(String),

    /// Amount is below zero; direction comes from the type.
    #[error("Amount cannot be negative")]
    NegativeAmount,

    /// Date is neither `YYYY-MM-DD` nor RFC 3339.
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// An optional reference is not a UUID.
    #[error("Invalid reference for {field}: {value}")]
    InvalidReference {
        /// Payload key.
        field: &'static str,
        /// Rejected value.
        value: String,
    },

    /// A transfer without a destination account.
    #[error("Transfer requires a destination account")]
    MissingDestination,

    /// A destination account on something other than a transfer.
    #[error("Only transfers may have a destination account")]
    UnexpectedDestination,

    /// A transfer whose source and destination are the same account.
    #[error("Transfer source and destination must differ")]
    SameAccountTransfer,

    /// Installment metadata out of range.
    #[error("Invalid installment: {0}")]
    InvalidInstallment(String),

    /// The transaction was deleted and cannot be saved again.
    #[error("Transaction {0} has been deleted")]
    TransactionDeleted(Uuid),

    // ========== Referential Errors ==========
    /// Account does not exist under the actor's tenant.
    #[error("Account not found: {0}")]
    AccountNotFound(Uuid),

    /// Transaction belongs to another tenant.
    #[error("Transaction {0} belongs to another tenant")]
    TenantMismatch(Uuid),

    /// Actor has no tenant membership.
    #[error("No tenant found for user {0}")]
    TenantNotResolved(Uuid),

    // ========== Contention Errors ==========
    /// The transaction id lock was not acquired in time.
    #[error("Timed out waiting for lock on transaction {0}, please retry")]
    LockTimeout(Uuid),

    /// Serialization failure, deadlock, or a lock timeout on another row.
    #[error("Concurrent modification detected, please retry")]
    ConcurrentModification,

    // ========== Audit Errors ==========
    /// Audit entry could not be appended.
    #[error("Audit log append failed: {0}")]
    AuditFailure(String),

    // ========== Internal Errors ==========
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LedgerError {
    /// Returns the kind of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingId
            | Self::InvalidId(_)
            | Self::MissingField(_)
            | Self::InvalidEnumValue { .. }
            | Self::MalformedAmount(_)
            | Self::NegativeAmount
            | Self::InvalidDate(_)
            | Self::InvalidReference { .. }
            | Self::MissingDestination
            | Self::UnexpectedDestination
            | Self::SameAccountTransfer
            | Self::InvalidInstallment(_)
            | Self::TransactionDeleted(_) => ErrorKind::Validation,
            Self::AccountNotFound(_) | Self::TenantMismatch(_) | Self::TenantNotResolved(_) => {
                ErrorKind::Referential
            }
            Self::LockTimeout(_) | Self::ConcurrentModification => ErrorKind::Contention,
            Self::AuditFailure(_) => ErrorKind::AuditFailure,
            Self::Database(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::MissingId => "MISSING_ID",
            Self::InvalidId(_) => "INVALID_ID",
            Self::MissingField(_) => "MISSING_FIELD",
            Self::InvalidEnumValue { .. } => "INVALID_ENUM_VALUE",
            Self::MalformedAmount(_) => "MALFORMED_AMOUNT",
            Self::NegativeAmount => "NEGATIVE_AMOUNT",
            Self::InvalidDate(_) => "INVALID_DATE",
            Self::InvalidReference { .. } => "INVALID_REFERENCE",
            Self::MissingDestination => "MISSING_DESTINATION",
            Self::UnexpectedDestination => "UNEXPECTED_DESTINATION",
            Self::SameAccountTransfer => "SAME_ACCOUNT_TRANSFER",
            Self::InvalidInstallment(_) => "INVALID_INSTALLMENT",
            Self::TransactionDeleted(_) => "TRANSACTION_DELETED",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::TenantMismatch(_) => "TENANT_MISMATCH",
            Self::TenantNotResolved(_) => "TENANT_NOT_RESOLVED",
            Self::LockTimeout(_) => "LOCK_TIMEOUT",
            Self::ConcurrentModification => "CONCURRENT_MODIFICATION",
            Self::AuditFailure(_) => "AUDIT_FAILURE",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 409 Conflict - terminal state and lock contention
            Self::TransactionDeleted(_) | Self::LockTimeout(_) | Self::ConcurrentModification => {
                409
            }

            // 404 Not Found
            Self::AccountNotFound(_) => 404,

            // 403 Forbidden - tenant boundary
            Self::TenantMismatch(_) | Self::TenantNotResolved(_) => 403,

            // 500 Internal Server Error
            Self::AuditFailure(_) | Self::Database(_) | Self::Internal(_) => 500,

            // 400 Bad Request - remaining validation errors
            _ => 400,
        }
    }

    /// Returns true if the same command may be retried verbatim.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind(), ErrorKind::Contention)
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::TransactionDeleted(_) => Self::Conflict(message),
            LedgerError::AccountNotFound(_) => Self::NotFound(message),
            LedgerError::TenantMismatch(_) | LedgerError::TenantNotResolved(_) => {
                Self::Forbidden(message)
            }
            LedgerError::LockTimeout(_) | LedgerError::ConcurrentModification => {
                Self::Contention(message)
            }
            LedgerError::Database(_) => Self::Database(message),
            LedgerError::AuditFailure(_) | LedgerError::Internal(_) => Self::Internal(message),
            _ => Self::Validation(message),
        }
    }
}
