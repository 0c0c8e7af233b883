//! Validation of inbound sync commands.
//!
//! Clients send loosely typed JSON: amounts as numbers or strings, dates as
//! plain days or full timestamps, enums in any case, and empty strings for
//! unset references. Parsing normalizes all of that into a
//! `TransactionRecord` before any I/O happens.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tally_shared::types::{AccountId, TransactionId};
use uuid::Uuid;

use super::error::LedgerError;
use super::types::{TransactionRecord, TransactionStatus, TransactionType};

/// Command verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SyncAction {
    /// Create or fully replace a transaction.
    Save,
    /// Tombstone a transaction.
    Delete,
}

impl SyncAction {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Save => "SAVE",
            Self::Delete => "DELETE",
        }
    }
}

/// Raw transaction payload as received from a client.
///
/// Unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPayload {
    /// Client-assigned UUID.
    pub id: Option<String>,
    /// Free-form description.
    pub description: Option<String>,
    /// JSON number or numeric string.
    pub amount: Option<Value>,
    /// `INCOME`, `EXPENSE` or `TRANSFER`.
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    /// `PENDING`, `PAID`, `OVERDUE` or `CANCELLED`.
    pub status: Option<String>,
    /// `YYYY-MM-DD` or RFC 3339.
    pub date: Option<String>,
    /// Source account UUID.
    pub account_id: Option<String>,
    /// Destination account UUID.
    pub destination_account_id: Option<String>,
    /// Contact UUID.
    pub contact_id: Option<String>,
    /// Branch UUID.
    pub branch_id: Option<String>,
    /// Category label.
    pub category: Option<String>,
    /// Recurrence series UUID.
    pub recurrence_id: Option<String>,
    /// 1-based installment position.
    pub installment_number: Option<i32>,
    /// Installment count.
    pub installment_total: Option<i32>,
}

/// A sync command: an action and its payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncCommand {
    /// What to do.
    pub action: SyncAction,
    /// What to do it to.
    pub payload: TransactionPayload,
}

impl SyncCommand {
    /// Builds a SAVE command.
    #[must_use]
    pub fn save(payload: TransactionPayload) -> Self {
        Self {
            action: SyncAction::Save,
            payload,
        }
    }

    /// Builds a DELETE command for the given id.
    #[must_use]
    pub fn delete(id: TransactionId) -> Self {
        Self {
            action: SyncAction::Delete,
            payload: TransactionPayload {
                id: Some(id.to_string()),
                ..TransactionPayload::default()
            },
        }
    }
}

impl From<&TransactionRecord> for TransactionPayload {
    fn from(record: &TransactionRecord) -> Self {
        let uuid = |u: Option<Uuid>| u.map(|u| u.to_string());
        Self {
            id: Some(record.id.to_string()),
            description: Some(record.description.clone()),
            amount: Some(Value::String(record.amount.to_string())),
            transaction_type: Some(record.transaction_type.as_str().to_string()),
            status: Some(record.status.as_str().to_string()),
            date: Some(record.date.format("%Y-%m-%d").to_string()),
            account_id: Some(record.account_id.to_string()),
            destination_account_id: record.destination_account_id.map(|a| a.to_string()),
            contact_id: uuid(record.contact_id),
            branch_id: uuid(record.branch_id),
            category: record.category.clone(),
            recurrence_id: uuid(record.recurrence_id),
            installment_number: record.installment_number,
            installment_total: record.installment_total,
        }
    }
}

/// Treats absent, blank and whitespace-only strings alike.
fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn required<'a>(value: Option<&'a str>, field: &'static str) -> Result<&'a str, LedgerError> {
    present(value).ok_or(LedgerError::MissingField(field))
}

/// Parses the transaction id.
pub fn parse_id(payload: &TransactionPayload) -> Result<TransactionId, LedgerError> {
    let raw = present(payload.id.as_deref()).ok_or(LedgerError::MissingId)?;
    TransactionId::from_str(raw).map_err(|_| LedgerError::InvalidId(raw.to_string()))
}

fn parse_reference(value: Option<&str>, field: &'static str) -> Result<Option<Uuid>, LedgerError> {
    present(value)
        .map(|raw| {
            Uuid::parse_str(raw).map_err(|_| LedgerError::InvalidReference {
                field,
                value: raw.to_string(),
            })
        })
        .transpose()
}

/// Most fractional digits a stored amount keeps.
pub const AMOUNT_SCALE: u32 = 4;

/// Most integer digits a stored amount keeps.
pub const AMOUNT_INTEGER_DIGITS: u32 = 15;

/// Parses an amount from a JSON number or numeric string.
///
/// The value must fit the stored precision exactly: at most
/// [`AMOUNT_SCALE`] significant fractional digits and
/// [`AMOUNT_INTEGER_DIGITS`] integer digits. Anything finer would be rounded
/// by the database independently of the balance it moves.
pub fn parse_amount(value: Option<&Value>) -> Result<Decimal, LedgerError> {
    let raw = match value {
        None | Some(Value::Null) => return Err(LedgerError::MissingField("amount")),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) if s.trim().is_empty() => {
            return Err(LedgerError::MissingField("amount"));
        }
        Some(Value::String(s)) => s.trim().to_string(),
        Some(other) => return Err(LedgerError::MalformedAmount(other.to_string())),
    };
    let amount = Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .map_err(|_| LedgerError::MalformedAmount(raw.clone()))?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(LedgerError::NegativeAmount);
    }
    let amount = amount.normalize();
    let limit = Decimal::from(10_i64.pow(AMOUNT_INTEGER_DIGITS));
    if amount.scale() > AMOUNT_SCALE || amount.abs() >= limit {
        return Err(LedgerError::MalformedAmount(raw));
    }
    Ok(amount)
}

/// Parses a calendar day from `YYYY-MM-DD` or an RFC 3339 timestamp.
///
/// Timestamps keep the day as written in their own offset.
pub fn parse_date(raw: &str) -> Result<NaiveDate, LedgerError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .map_err(|_| LedgerError::InvalidDate(raw.to_string()))
}

fn parse_enum<T: FromStr>(value: Option<&str>, field: &'static str) -> Result<T, LedgerError> {
    let raw = required(value, field)?;
    T::from_str(raw).map_err(|_| LedgerError::InvalidEnumValue {
        field,
        value: raw.to_string(),
    })
}

fn validate_installment(number: Option<i32>, total: Option<i32>) -> Result<(), LedgerError> {
    match (number, total) {
        (None, None) => Ok(()),
        (Some(_), None) => Err(LedgerError::InvalidInstallment(
            "installment number given without a total".into(),
        )),
        (_, Some(total)) if total < 1 => Err(LedgerError::InvalidInstallment(format!(
            "total must be at least 1, got {total}"
        ))),
        (Some(number), Some(total)) if number < 1 || number > total => {
            Err(LedgerError::InvalidInstallment(format!(
                "number {number} is outside 1..={total}"
            )))
        }
        _ => Ok(()),
    }
}

/// Validates a SAVE payload into a record.
///
/// # Errors
///
/// Returns the first validation error found; nothing is persisted.
pub fn parse_save(payload: &TransactionPayload) -> Result<TransactionRecord, LedgerError> {
    let id = parse_id(payload)?;
    let transaction_type: TransactionType = parse_enum(payload.transaction_type.as_deref(), "type")?;
    let status: TransactionStatus = parse_enum(payload.status.as_deref(), "status")?;
    let amount = parse_amount(payload.amount.as_ref())?;
    let date = parse_date(required(payload.date.as_deref(), "date")?)?;

    let account_id = parse_reference(payload.account_id.as_deref(), "accountId")?
        .map(AccountId::from_uuid)
        .ok_or(LedgerError::MissingField("accountId"))?;
    let destination_account_id =
        parse_reference(payload.destination_account_id.as_deref(), "destinationAccountId")?
            .map(AccountId::from_uuid);

    match (transaction_type, destination_account_id) {
        (TransactionType::Transfer, None) => return Err(LedgerError::MissingDestination),
        (TransactionType::Transfer, Some(dest)) if dest == account_id => {
            return Err(LedgerError::SameAccountTransfer);
        }
        (TransactionType::Income | TransactionType::Expense, Some(_)) => {
            return Err(LedgerError::UnexpectedDestination);
        }
        _ => {}
    }

    validate_installment(payload.installment_number, payload.installment_total)?;

    Ok(TransactionRecord {
        id,
        description: payload
            .description
            .as_deref()
            .map(str::trim)
            .unwrap_or_default()
            .to_string(),
        amount,
        transaction_type,
        status,
        date,
        account_id,
        destination_account_id,
        contact_id: parse_reference(payload.contact_id.as_deref(), "contactId")?,
        branch_id: parse_reference(payload.branch_id.as_deref(), "branchId")?,
        category: present(payload.category.as_deref()).map(str::to_string),
        recurrence_id: parse_reference(payload.recurrence_id.as_deref(), "recurrenceId")?,
        installment_number: payload.installment_number,
        installment_total: payload.installment_total,
    })
}

/// Validates a DELETE payload; only the id is read.
pub fn parse_delete(payload: &TransactionPayload) -> Result<TransactionId, LedgerError> {
    parse_id(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn payload(value: Value) -> TransactionPayload {
        serde_json::from_value(value).unwrap()
    }

    fn base() -> Value {
        json!({
            "id": "0192f0a4-7b1e-7c3a-9d2e-5f6a7b8c9d0e",
            "description": "Rent",
            "amount": 1200.5,
            "type": "expense",
            "status": "Paid",
            "date": "2026-02-01",
            "accountId": "0192f0a4-7b1e-7c3a-9d2e-000000000001",
            "ignoredKey": "whatever"
        })
    }

    fn with(field: &str, value: Value) -> TransactionPayload {
        let mut v = base();
        v[field] = value;
        payload(v)
    }

    #[test]
    fn test_parse_save_normalizes_loose_input() {
        let record = parse_save(&payload(base())).unwrap();

        assert_eq!(record.amount, dec!(1200.5));
        assert_eq!(record.transaction_type, TransactionType::Expense);
        assert_eq!(record.status, TransactionStatus::Paid);
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2026, 2, 1).unwrap());
        assert_eq!(record.destination_account_id, None);
    }

    #[test]
    fn test_command_deserializes_with_unknown_keys() {
        let cmd: SyncCommand = serde_json::from_value(json!({
            "action": "SAVE",
            "payload": base(),
        }))
        .unwrap();
        assert_eq!(cmd.action, SyncAction::Save);
        assert!(parse_save(&cmd.payload).is_ok());
    }

    #[rstest]
    #[case(json!("15.25"), dec!(15.25))]
    #[case(json!(" 7 "), dec!(7))]
    #[case(json!(0), dec!(0))]
    #[case(json!("1e2"), dec!(100))]
    fn test_amount_forms(#[case] amount: Value, #[case] expected: Decimal) {
        assert_eq!(parse_save(&with("amount", amount)).unwrap().amount, expected);
    }

    #[rstest]
    #[case(json!("12.3400"), dec!(12.34))]
    #[case(json!("0.0001"), dec!(0.0001))]
    #[case(json!("999999999999999.9999"), dec!(999999999999999.9999))]
    fn test_amount_within_stored_precision(#[case] amount: Value, #[case] expected: Decimal) {
        assert_eq!(parse_save(&with("amount", amount)).unwrap().amount, expected);
    }

    #[rstest]
    #[case(json!("0.00005"))]
    #[case(json!(0.12345))]
    #[case(json!("1000000000000000"))]
    #[case(json!("1e20"))]
    #[case(json!(1e20))]
    fn test_amount_beyond_stored_precision(#[case] amount: Value) {
        let err = parse_save(&with("amount", amount)).unwrap_err();
        assert!(matches!(err, LedgerError::MalformedAmount(_)), "{err:?}");
    }

    #[test]
    fn test_rfc3339_date_keeps_its_own_day() {
        let record = parse_save(&with("date", json!("2026-03-31T23:30:00-03:00"))).unwrap();
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2026, 3, 31).unwrap());
    }

    #[rstest]
    #[case("id", Value::Null, "MISSING_ID")]
    #[case("id", json!("not-a-uuid"), "INVALID_ID")]
    #[case("amount", json!("abc"), "MALFORMED_AMOUNT")]
    #[case("amount", json!(true), "MALFORMED_AMOUNT")]
    #[case("amount", json!(-5), "NEGATIVE_AMOUNT")]
    #[case("amount", Value::Null, "MISSING_FIELD")]
    #[case("type", json!("REFUND"), "INVALID_ENUM_VALUE")]
    #[case("status", json!(""), "MISSING_FIELD")]
    #[case("date", json!("01/02/2026"), "INVALID_DATE")]
    #[case("accountId", json!(""), "MISSING_FIELD")]
    #[case("contactId", json!("nope"), "INVALID_REFERENCE")]
    #[case("destinationAccountId", json!("0192f0a4-7b1e-7c3a-9d2e-000000000002"), "UNEXPECTED_DESTINATION")]
    fn test_rejections(#[case] field: &str, #[case] value: Value, #[case] code: &str) {
        let err = parse_save(&with(field, value)).unwrap_err();
        assert_eq!(err.error_code(), code);
    }

    #[test]
    fn test_transfer_rules() {
        let mut v = base();
        v["type"] = json!("TRANSFER");
        assert!(matches!(
            parse_save(&payload(v.clone())),
            Err(LedgerError::MissingDestination)
        ));

        v["destinationAccountId"] = v["accountId"].clone();
        assert!(matches!(
            parse_save(&payload(v.clone())),
            Err(LedgerError::SameAccountTransfer)
        ));

        v["destinationAccountId"] = json!("0192f0a4-7b1e-7c3a-9d2e-000000000002");
        let record = parse_save(&payload(v)).unwrap();
        assert!(record.destination_account_id.is_some());
    }

    #[test]
    fn test_empty_optional_references_are_absent() {
        let mut v = base();
        v["contactId"] = json!("");
        v["branchId"] = json!("  ");
        v["category"] = json!("");
        v["destinationAccountId"] = json!("");
        let record = parse_save(&payload(v)).unwrap();

        assert_eq!(record.contact_id, None);
        assert_eq!(record.branch_id, None);
        assert_eq!(record.category, None);
        assert_eq!(record.destination_account_id, None);
    }

    #[rstest]
    #[case(Some(1), Some(3), true)]
    #[case(Some(3), Some(3), true)]
    #[case(None, Some(12), true)]
    #[case(Some(4), Some(3), false)]
    #[case(Some(0), Some(3), false)]
    #[case(Some(1), None, false)]
    #[case(None, Some(0), false)]
    fn test_installments(#[case] number: Option<i32>, #[case] total: Option<i32>, #[case] ok: bool) {
        let mut v = base();
        v["installmentNumber"] = json!(number);
        v["installmentTotal"] = json!(total);
        assert_eq!(parse_save(&payload(v)).is_ok(), ok);
    }

    #[test]
    fn test_delete_reads_only_the_id() {
        let id = TransactionId::new();
        let cmd = SyncCommand::delete(id);
        assert_eq!(parse_delete(&cmd.payload).unwrap(), id);
        assert!(matches!(
            parse_delete(&TransactionPayload::default()),
            Err(LedgerError::MissingId)
        ));
    }

    #[test]
    fn test_record_round_trips_through_payload() {
        let record = parse_save(&payload(base())).unwrap();
        let again = parse_save(&TransactionPayload::from(&record)).unwrap();
        assert_eq!(record, again);
    }
}
