//! Transaction ledger logic.
//!
//! This module implements the balance side of transaction sync:
//! - Domain types for transactions
//! - Impact of a single transaction on its accounts
//! - Reconciliation of SAVE and DELETE into balance adjustments
//! - Validation of inbound commands
//! - Error types for ledger operations

pub mod error;
pub mod impact;
pub mod reconcile;
pub mod types;
pub mod validation;

#[cfg(test)]
mod reconcile_props;

pub use error::{ErrorKind, LedgerError};
pub use impact::{dest_impact, impact, record_dest_impact, record_impact};
pub use reconcile::{BalanceAdjustment, BalancePlan, Leg, plan_delete, plan_save};
pub use types::{StoredTransaction, TransactionRecord, TransactionStatus, TransactionType};
pub use validation::{SyncAction, SyncCommand, TransactionPayload, parse_delete, parse_save};
