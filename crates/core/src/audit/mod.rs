//! Audit trail for transaction mutations.
//!
//! - Audit entry types and constructors
//! - The field map describing which transaction fields are audited
//! - Field-level diff between two transaction states

pub mod diff;
pub mod fields;
pub mod types;

pub use diff::{diff, diff_records};
pub use fields::{AuditField, FieldKind, TRANSACTION_AUDIT_FIELDS};
pub use types::{AuditAction, AuditEntry, TRANSACTION_ENTITY};
