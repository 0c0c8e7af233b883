//! Field-level diff between two transaction states.
//!
//! Clients round-trip values through different representations: a date may
//! come back as a timestamp, an amount as `"20.00"` instead of `20`, an unset
//! category as `""` instead of `null`. Values are normalized before
//! comparison so that none of these show up as changes.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use serde_json::{Map, Value, json};

use super::fields::{AuditField, FieldKind, TRANSACTION_AUDIT_FIELDS};
use crate::ledger::types::TransactionRecord;

/// Canonical form of a value for comparison; `None` means "unset".
fn normalize(value: Option<&Value>, kind: FieldKind) -> Option<String> {
    let value = match value {
        None | Some(Value::Null) => return None,
        Some(value) => value,
    };
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        other => return Some(other.to_string()),
    };
    if text.is_empty() {
        return None;
    }
    match kind {
        FieldKind::Date => Some(normalize_date(&text)),
        FieldKind::Numeric => Some(normalize_decimal(&text).unwrap_or(text)),
        FieldKind::Plain => Some(text),
    }
}

fn normalize_date(text: &str) -> String {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(text).map(|dt| dt.date_naive()))
        .map_or_else(|_| text.to_string(), |d| d.format("%Y-%m-%d").to_string())
}

fn normalize_decimal(text: &str) -> Option<String> {
    // Plain numerals only.
    if !text.bytes().all(|b| b.is_ascii_digit() || b == b'.' || b == b'-') {
        return None;
    }
    Decimal::from_str(text).ok().map(|d| d.normalize().to_string())
}

/// Compares `old` and `new` over the listed fields.
///
/// Only keys present in `new` are compared, so a partial payload never
/// reports the fields it omits. Returns `None` when nothing differs,
/// otherwise a map of `{ field: { "from": old, "to": new } }`.
#[must_use]
pub fn diff(
    old: &Map<String, Value>,
    new: &Map<String, Value>,
    fields: &[AuditField],
) -> Option<Map<String, Value>> {
    let mut changes = Map::new();
    for field in fields {
        let Some(new_value) = new.get(field.key) else {
            continue;
        };
        let old_value = old.get(field.key);
        if normalize(old_value, field.kind) != normalize(Some(new_value), field.kind) {
            changes.insert(
                field.key.to_string(),
                json!({
                    "from": old_value.cloned().unwrap_or(Value::Null),
                    "to": new_value,
                }),
            );
        }
    }
    (!changes.is_empty()).then_some(changes)
}

/// Diffs two saves of the same transaction.
///
/// A SAVE replaces every field, so fields the new record leaves unset are
/// compared as explicit nulls and clearing a value is reported.
#[must_use]
pub fn diff_records(old: &TransactionRecord, new: &TransactionRecord) -> Option<Map<String, Value>> {
    let mut new_map = new.to_audit_map();
    for field in TRANSACTION_AUDIT_FIELDS {
        new_map.entry(field.key).or_insert(Value::Null);
    }
    diff(&old.to_audit_map(), &new_map, TRANSACTION_AUDIT_FIELDS)
}
