//! Audited transaction fields.

/// How a field is normalized before comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Compared verbatim after trimming.
    Plain,
    /// Numbers and numeric strings compare as decimals.
    Numeric,
    /// Compared as a calendar day, ignoring any time component.
    Date,
}

/// A field tracked by the diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuditField {
    /// camelCase payload key.
    pub key: &'static str,
    /// Normalization rule.
    pub kind: FieldKind,
}

const fn plain(key: &'static str) -> AuditField {
    AuditField {
        key,
        kind: FieldKind::Plain,
    }
}

const fn numeric(key: &'static str) -> AuditField {
    AuditField {
        key,
        kind: FieldKind::Numeric,
    }
}

/// Every persisted, client-owned transaction field.
pub static TRANSACTION_AUDIT_FIELDS: &[AuditField] = &[
    plain("description"),
    numeric("amount"),
    plain("type"),
    plain("status"),
    AuditField {
        key: "date",
        kind: FieldKind::Date,
    },
    plain("accountId"),
    plain("destinationAccountId"),
    plain("contactId"),
    plain("branchId"),
    plain("category"),
    plain("recurrenceId"),
    numeric("installmentNumber"),
    numeric("installmentTotal"),
];
