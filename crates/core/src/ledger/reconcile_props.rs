//! Property-based tests for balance reconciliation.
//!
//! Feature: ledger-sync
//! - Property 1: Balance Invariant
//! - Property 2: Save Idempotence
//! - Property 3: Delete Reversal

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::{AccountId, TransactionId};
use uuid::Uuid;

use super::impact::{record_dest_impact, record_impact};
use super::reconcile::{BalancePlan, plan_delete, plan_save};
use super::types::{TransactionRecord, TransactionStatus, TransactionType};

const ACCOUNTS: usize = 4;
const IDS: usize = 5;

fn account(index: usize) -> AccountId {
    AccountId::from_uuid(Uuid::from_u128(index as u128 + 1))
}

fn transaction_id(index: usize) -> TransactionId {
    TransactionId::from_uuid(Uuid::from_u128(1_000 + index as u128))
}

#[derive(Debug, Clone)]
enum Command {
    Save(TransactionRecord),
    Delete(TransactionId),
}

fn status_strategy() -> impl Strategy<Value = TransactionStatus> {
    prop_oneof![
        Just(TransactionStatus::Pending),
        Just(TransactionStatus::Paid),
        Just(TransactionStatus::Paid),
        Just(TransactionStatus::Cancelled),
    ]
}

fn type_strategy() -> impl Strategy<Value = TransactionType> {
    prop_oneof![
        Just(TransactionType::Income),
        Just(TransactionType::Expense),
        Just(TransactionType::Transfer),
    ]
}

fn record_strategy() -> impl Strategy<Value = TransactionRecord> {
    (
        0..IDS,
        type_strategy(),
        status_strategy(),
        0i64..100_000i64,
        0..ACCOUNTS,
        1..ACCOUNTS,
    )
        .prop_map(|(id, transaction_type, status, cents, source, offset)| {
            let destination = transaction_type
                .is_transfer()
                .then(|| account((source + offset) % ACCOUNTS));
            TransactionRecord {
                id: transaction_id(id),
                description: format!("txn {id}"),
                amount: Decimal::new(cents, 2),
                transaction_type,
                status,
                date: NaiveDate::from_ymd_opt(2026, 1, 15).unwrap(),
                account_id: account(source),
                destination_account_id: destination,
                contact_id: None,
                branch_id: None,
                category: None,
                recurrence_id: None,
                installment_number: None,
                installment_total: None,
            }
        })
}

fn command_strategy() -> impl Strategy<Value = Command> {
    prop_oneof![
        3 => record_strategy().prop_map(Command::Save),
        1 => (0..IDS).prop_map(|i| Command::Delete(transaction_id(i))),
    ]
}

/// In-memory model of the ledger mirroring the dispatcher's state machine.
#[derive(Default)]
struct Model {
    active: HashMap<TransactionId, TransactionRecord>,
    tombstoned: HashSet<TransactionId>,
    balances: HashMap<AccountId, Decimal>,
}

impl Model {
    fn apply_plan(&mut self, plan: &BalancePlan) {
        for adjustment in plan.effective() {
            *self
                .balances
                .entry(adjustment.account_id)
                .or_insert(Decimal::ZERO) += adjustment.delta;
        }
    }

    fn run(&mut self, command: &Command) {
        match command {
            Command::Save(record) => {
                if self.tombstoned.contains(&record.id) {
                    return;
                }
                let plan = plan_save(self.active.get(&record.id), record);
                self.apply_plan(&plan);
                self.active.insert(record.id, record.clone());
            }
            Command::Delete(id) => {
                if let Some(old) = self.active.remove(id) {
                    self.apply_plan(&plan_delete(&old));
                    self.tombstoned.insert(*id);
                }
            }
        }
    }

    fn balance(&self, account_id: AccountId) -> Decimal {
        self.balances.get(&account_id).copied().unwrap_or_default()
    }

    fn expected_balance(&self, account_id: AccountId) -> Decimal {
        let mut expected = Decimal::ZERO;
        for record in self.active.values() {
            if record.account_id == account_id {
                expected += record_impact(record);
            }
            if record.destination_account_id == Some(account_id) {
                expected += record_dest_impact(record);
            }
        }
        expected
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    // =========================================================================
    // Property 1: Balance Invariant
    // =========================================================================

    /// *For any* sequence of SAVE and DELETE commands, every account balance
    /// SHALL equal the sum of impacts of the active transactions touching it.
    #[test]
    fn prop_balance_invariant_holds_after_every_command(
        commands in prop::collection::vec(command_strategy(), 1..40),
    ) {
        let mut model = Model::default();
        for command in &commands {
            model.run(command);
            for index in 0..ACCOUNTS {
                let id = account(index);
                prop_assert_eq!(model.balance(id), model.expected_balance(id));
            }
        }
    }

    /// *For any* command sequence, the total of all balances SHALL equal
    /// income minus expenses; transfers never create or destroy money.
    #[test]
    fn prop_transfers_conserve_money(
        commands in prop::collection::vec(command_strategy(), 1..40),
    ) {
        let mut model = Model::default();
        for command in &commands {
            model.run(command);
        }
        let total: Decimal = model.balances.values().copied().sum();
        let external: Decimal = model
            .active
            .values()
            .filter(|r| !r.transaction_type.is_transfer())
            .map(record_impact)
            .sum();
        prop_assert_eq!(total, external);
    }

    // =========================================================================
    // Property 2: Save Idempotence
    // =========================================================================

    /// *For any* record, re-saving the identical payload SHALL plan no change.
    #[test]
    fn prop_resave_is_noop(old in record_strategy()) {
        let first = plan_save(None, &old);
        let second = plan_save(Some(&old), &old);
        prop_assert!(second.is_noop());
        prop_assert_eq!(first.accounts(), second.accounts());
    }

    // =========================================================================
    // Property 3: Delete Reversal
    // =========================================================================

    /// *For any* save over any prior state, deleting afterwards SHALL restore
    /// every balance to its value before the save.
    #[test]
    fn prop_save_then_delete_restores_balances(
        prior in prop::collection::vec(record_strategy(), 0..10),
        record in record_strategy(),
    ) {
        let mut model = Model::default();
        for r in prior.into_iter().filter(|r| r.id != record.id) {
            model.run(&Command::Save(r));
        }
        let before: Vec<Decimal> = (0..ACCOUNTS).map(|i| model.balance(account(i))).collect();

        model.run(&Command::Save(record.clone()));
        model.run(&Command::Delete(record.id));

        let after: Vec<Decimal> = (0..ACCOUNTS).map(|i| model.balance(account(i))).collect();
        prop_assert_eq!(before, after);
    }

    /// *For any* pair of records with the same id, the save plan SHALL equal
    /// deleting the old record then creating the new one, account by account.
    #[test]
    fn prop_save_equals_delete_then_create(
        old in record_strategy(),
        new in record_strategy(),
    ) {
        let combined = plan_save(Some(&old), &new).net_by_account();

        let mut split = plan_delete(&old).net_by_account();
        for (account_id, delta) in plan_save(None, &new).net_by_account() {
            *split.entry(account_id).or_insert(Decimal::ZERO) += delta;
        }

        for index in 0..ACCOUNTS {
            let id = account(index);
            prop_assert_eq!(
                combined.get(&id).copied().unwrap_or_default(),
                split.get(&id).copied().unwrap_or_default()
            );
        }
    }
}
