//! Balance reconciliation for SAVE and DELETE commands.
//!
//! Each transaction contributes to at most two accounts: its source account
//! through `impact` and, for transfers, its destination account through
//! `dest_impact`. Reconciling a command means retracting the prior record's
//! contribution and adding the new one, leg by leg. When a leg stays on the
//! same account the two collapse into a single delta.

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use serde::Serialize;
use tally_shared::types::AccountId;

use super::impact::{record_dest_impact, record_impact};
use super::types::TransactionRecord;

/// Which side of a transaction an adjustment belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Leg {
    /// The `account_id` side.
    Source,
    /// The `destination_account_id` side of a transfer.
    Destination,
}

/// A signed increment to apply to one account balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BalanceAdjustment {
    /// Account to adjust.
    pub account_id: AccountId,
    /// Leg that produced this adjustment.
    pub leg: Leg,
    /// Signed amount to add to the balance.
    pub delta: Decimal,
}

/// The full set of balance adjustments implied by one command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BalancePlan {
    adjustments: Vec<BalanceAdjustment>,
}

impl BalancePlan {
    /// All adjustments, including zero deltas.
    #[must_use]
    pub fn adjustments(&self) -> &[BalanceAdjustment] {
        &self.adjustments
    }

    /// Every account the command references, in ascending order.
    ///
    /// Zero-delta legs are included: a command that names an account must
    /// name one that exists.
    #[must_use]
    pub fn accounts(&self) -> BTreeSet<AccountId> {
        self.adjustments.iter().map(|a| a.account_id).collect()
    }

    /// Non-zero adjustments ordered by account ID.
    ///
    /// Applying in a stable order means two units that touch the same pair of
    /// accounts acquire row locks in the same sequence.
    #[must_use]
    pub fn effective(&self) -> Vec<BalanceAdjustment> {
        let mut effective: Vec<_> = self
            .adjustments
            .iter()
            .copied()
            .filter(|a| !a.delta.is_zero())
            .collect();
        effective.sort_by_key(|a| a.account_id);
        effective
    }

    /// Net change per account.
    #[must_use]
    pub fn net_by_account(&self) -> BTreeMap<AccountId, Decimal> {
        let mut net = BTreeMap::new();
        for adjustment in &self.adjustments {
            *net.entry(adjustment.account_id).or_insert(Decimal::ZERO) += adjustment.delta;
        }
        net
    }

    /// Returns true if applying the plan changes no balance.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.adjustments.iter().all(|a| a.delta.is_zero())
    }

    fn push(&mut self, account_id: AccountId, leg: Leg, delta: Decimal) {
        self.adjustments.push(BalanceAdjustment {
            account_id,
            leg,
            delta,
        });
    }

    /// Moves one leg from its old (account, impact) to its new one.
    fn reconcile_leg(
        &mut self,
        leg: Leg,
        old: Option<(AccountId, Decimal)>,
        new: Option<(AccountId, Decimal)>,
    ) {
        match (old, new) {
            (Some((old_account, old_impact)), Some((new_account, new_impact)))
                if old_account == new_account =>
            {
                self.push(new_account, leg, new_impact - old_impact);
            }
            (old, new) => {
                if let Some((account, old_impact)) = old {
                    self.push(account, leg, -old_impact);
                }
                if let Some((account, new_impact)) = new {
                    self.push(account, leg, new_impact);
                }
            }
        }
    }
}

/// Source leg of a record: always present.
fn source_leg(record: &TransactionRecord) -> (AccountId, Decimal) {
    (record.account_id, record_impact(record))
}

/// Destination leg of a record: present only for transfers with a destination.
fn destination_leg(record: &TransactionRecord) -> Option<(AccountId, Decimal)> {
    if !record.transaction_type.is_transfer() {
        return None;
    }
    record
        .destination_account_id
        .map(|account| (account, record_dest_impact(record)))
}

/// Computes the adjustments for saving `new` over an optional active `old`.
#[must_use]
pub fn plan_save(old: Option<&TransactionRecord>, new: &TransactionRecord) -> BalancePlan {
    let mut plan = BalancePlan::default();
    plan.reconcile_leg(Leg::Source, old.map(source_leg), Some(source_leg(new)));
    plan.reconcile_leg(
        Leg::Destination,
        old.and_then(destination_leg),
        destination_leg(new),
    );
    plan
}

/// Computes the adjustments that retract an active record entirely.
#[must_use]
pub fn plan_delete(old: &TransactionRecord) -> BalancePlan {
    let mut plan = BalancePlan::default();
    plan.reconcile_leg(Leg::Source, Some(source_leg(old)), None);
    plan.reconcile_leg(Leg::Destination, destination_leg(old), None);
    plan
}
