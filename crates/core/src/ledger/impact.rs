//! Balance impact of a single transaction.
//!
//! Reversing a transaction is the negation of its impact; there is no
//! separate inverse rule.

use rust_decimal::Decimal;

use super::types::{TransactionRecord, TransactionStatus, TransactionType};

/// Signed effect of a transaction on its source account.
///
/// Zero unless the status is `Paid`. Income adds, expense and the source
/// leg of a transfer subtract.
#[must_use]
pub fn impact(status: TransactionStatus, amount: Decimal, transaction_type: TransactionType) -> Decimal {
    if !status.affects_balance() {
        return Decimal::ZERO;
    }
    match transaction_type {
        TransactionType::Income => amount,
        TransactionType::Expense | TransactionType::Transfer => -amount,
    }
}

/// Signed effect of a transfer on its destination account.
#[must_use]
pub fn dest_impact(status: TransactionStatus, amount: Decimal) -> Decimal {
    if status.affects_balance() {
        amount
    } else {
        Decimal::ZERO
    }
}

/// Source-leg impact of a record.
#[must_use]
pub fn record_impact(record: &TransactionRecord) -> Decimal {
    impact(record.status, record.amount, record.transaction_type)
}

/// Destination-leg impact of a record; zero for anything but a transfer.
#[must_use]
pub fn record_dest_impact(record: &TransactionRecord) -> Decimal {
    if record.transaction_type.is_transfer() {
        dest_impact(record.status, record.amount)
    } else {
        Decimal::ZERO
    }
}
