//! Group balance projection
//!
//! Running per-member totals for each group, updated incrementally as
//! expenses and settlements land. The projection is derived state: it
//! can always be rebuilt from the expense and transaction records, and
//! `reconcile` checks the live projection against a rebuild. Drift is
//! reported as a consistency violation, never silently corrected.
//!
//! Invariant: within a group the member net balances sum to zero. An
//! expense credits the payer with the full total and debits every
//! participant their share, and shares sum to the total exactly; a
//! settlement moves equal amounts onto the debtor's paid side and the
//! creditor's owed side.

use crate::money::{Currency, Money};
use crate::types::{Expense, GroupId, MemberBalance, Transaction, TransactionKind, TransactionStatus, UserId};
use crate::{Error, Result};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

type MemberMap = BTreeMap<UserId, MemberBalance>;

/// Per-group running member balances
pub struct GroupBalances {
    groups: DashMap<GroupId, Arc<Mutex<MemberMap>>>,
    currency: Currency,
}

impl GroupBalances {
    /// Create an empty projection for one currency
    pub fn new(currency: Currency) -> Self {
        Self {
            groups: DashMap::new(),
            currency,
        }
    }

    /// Fold a recorded expense into the projection.
    ///
    /// The payer is credited with the full total; every participant
    /// (the payer included, for their own share) is debited their
    /// computed amount.
    pub fn apply_expense(&self, expense: &Expense) -> Result<()> {
        let group = expense.group.as_ref().ok_or_else(|| {
            Error::InvalidState(format!(
                "expense {} has no group; nothing to project",
                expense.expense_id
            ))
        })?;

        self.with_group(group, |members| {
            apply_expense_to(members, group, expense, self.currency, false)
        })
    }

    /// Undo a previously applied expense (amount update, reversal)
    pub fn reverse_expense(&self, expense: &Expense) -> Result<()> {
        let group = expense.group.as_ref().ok_or_else(|| {
            Error::InvalidState(format!(
                "expense {} has no group; nothing to reverse",
                expense.expense_id
            ))
        })?;

        self.with_group(group, |members| {
            apply_expense_to(members, group, expense, self.currency, true)
        })
    }

    /// Fold a completed settlement into the projection: the debtor's
    /// paid total and the creditor's owed total both grow by the
    /// settled amount, moving both nets toward zero.
    pub fn apply_settlement(
        &self,
        group: &GroupId,
        debtor: &UserId,
        creditor: &UserId,
        amount: Money,
    ) -> Result<()> {
        self.with_group(group, |members| {
            apply_settlement_to(members, group, debtor, creditor, amount, self.currency, false)
        })
    }

    /// Undo a settlement (refund of a settlement transaction)
    pub fn reverse_settlement(
        &self,
        group: &GroupId,
        debtor: &UserId,
        creditor: &UserId,
        amount: Money,
    ) -> Result<()> {
        self.with_group(group, |members| {
            apply_settlement_to(members, group, debtor, creditor, amount, self.currency, true)
        })
    }

    /// Member balances for a group, ordered by user id
    pub fn balances_for(&self, group: &GroupId) -> Vec<MemberBalance> {
        match self.groups.get(group) {
            Some(entry) => entry.value().lock().values().cloned().collect(),
            None => Vec::new(),
        }
    }

    /// One member's net position in a group (zero if never seen)
    pub fn net_of(&self, group: &GroupId, user: &UserId) -> Money {
        match self.groups.get(group) {
            Some(entry) => entry
                .value()
                .lock()
                .get(user)
                .map(|b| b.net_balance)
                .unwrap_or_else(|| Money::zero(self.currency)),
            None => Money::zero(self.currency),
        }
    }

    /// Rebuild a group's balances from its records and compare against
    /// the live projection.
    ///
    /// Returns the rebuilt balances when they match. Any drift between
    /// the projection and the records, or a group whose nets do not sum
    /// to zero, is a `LedgerConsistency` error.
    pub fn reconcile(
        &self,
        group: &GroupId,
        expenses: &[Expense],
        transactions: &[Transaction],
    ) -> Result<Vec<MemberBalance>> {
        let rebuilt = self.rebuild(group, expenses, transactions)?;

        let mut net_sum = Money::zero(self.currency);
        for balance in rebuilt.values() {
            net_sum = net_sum.checked_add(balance.net_balance)?;
        }
        if !net_sum.is_zero() {
            return Err(Error::LedgerConsistency(format!(
                "group {}: member nets sum to {} instead of zero",
                group, net_sum
            )));
        }

        let live = self.balances_for(group);
        let rebuilt_list: Vec<MemberBalance> = rebuilt.into_values().collect();
        if live != rebuilt_list {
            return Err(Error::LedgerConsistency(format!(
                "group {}: projection drifted from the expense and settlement records",
                group
            )));
        }

        tracing::debug!(group = %group, members = rebuilt_list.len(), "Reconciliation clean");
        Ok(rebuilt_list)
    }

    /// Fold a group's full record set into a fresh balance map.
    ///
    /// Only completed transactions count. Settlements and expense
    /// charges pay group debt down; refunds put it back; plain
    /// transfers move wallet money without touching group debt.
    pub fn rebuild(
        &self,
        group: &GroupId,
        expenses: &[Expense],
        transactions: &[Transaction],
    ) -> Result<MemberMap> {
        let mut members = MemberMap::new();

        for expense in expenses {
            expense.verify()?;
            apply_expense_to(&mut members, group, expense, self.currency, false)?;
        }

        for tx in transactions {
            if tx.status != TransactionStatus::Completed {
                continue;
            }
            match tx.kind {
                TransactionKind::Settlement | TransactionKind::ExpenseCharge => {
                    let (debtor, creditor) = settlement_parties(tx)?;
                    apply_settlement_to(
                        &mut members,
                        group,
                        &debtor,
                        &creditor,
                        tx.amount,
                        self.currency,
                        false,
                    )?;
                }
                // A refund of a settlement runs creditor -> debtor, so
                // the original parties are swapped relative to the tx
                TransactionKind::Refund => {
                    let (creditor, debtor) = settlement_parties(tx)?;
                    apply_settlement_to(
                        &mut members,
                        group,
                        &debtor,
                        &creditor,
                        tx.amount,
                        self.currency,
                        true,
                    )?;
                }
                TransactionKind::Transfer => {}
            }
        }

        Ok(members)
    }

    fn with_group<R>(
        &self,
        group: &GroupId,
        f: impl FnOnce(&mut MemberMap) -> Result<R>,
    ) -> Result<R> {
        let handle = self
            .groups
            .entry(group.clone())
            .or_insert_with(|| Arc::new(Mutex::new(MemberMap::new())))
            .value()
            .clone();
        let mut guard = handle.lock();
        f(&mut guard)
    }
}

fn entry<'a>(
    members: &'a mut MemberMap,
    group: &GroupId,
    user: &UserId,
    currency: Currency,
) -> &'a mut MemberBalance {
    members
        .entry(user.clone())
        .or_insert_with(|| MemberBalance::zero(group.clone(), user.clone(), currency))
}

fn apply_expense_to(
    members: &mut MemberMap,
    group: &GroupId,
    expense: &Expense,
    currency: Currency,
    reverse: bool,
) -> Result<()> {
    let sign = if reverse { -1 } else { 1 };
    let total = Money::new(expense.total.minor_units() * sign, currency);
    entry(members, group, &expense.payer, currency).add_paid(total)?;

    for share in &expense.participants {
        let owed = Money::new(share.amount.minor_units() * sign, currency);
        entry(members, group, &share.participant, currency).add_owed(owed)?;
    }
    Ok(())
}

fn apply_settlement_to(
    members: &mut MemberMap,
    group: &GroupId,
    debtor: &UserId,
    creditor: &UserId,
    amount: Money,
    currency: Currency,
    reverse: bool,
) -> Result<()> {
    let sign = if reverse { -1 } else { 1 };
    let amount = Money::new(amount.minor_units() * sign, currency);
    entry(members, group, debtor, currency).add_paid(amount)?;
    entry(members, group, creditor, currency).add_owed(amount)?;
    Ok(())
}

fn settlement_parties(tx: &Transaction) -> Result<(UserId, UserId)> {
    let from = tx.from_account.wallet_user().ok_or_else(|| {
        Error::LedgerConsistency(format!(
            "transaction {}: {} is not a wallet account",
            tx.transaction_id, tx.from_account
        ))
    })?;
    let to = tx.to_account.wallet_user().ok_or_else(|| {
        Error::LedgerConsistency(format!(
            "transaction {}: {} is not a wallet account",
            tx.transaction_id, tx.to_account
        ))
    })?;
    Ok((from, to))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::compute_split;
    use crate::types::{ShareSpec, SplitPolicy};
    use chrono::Utc;
    use uuid::Uuid;

    fn usd(minor_units: i64) -> Money {
        Money::new(minor_units, Currency::USD)
    }

    fn dinner_expense(group: &GroupId, payer: &str, total: i64, participants: &[&str]) -> Expense {
        let specs: Vec<ShareSpec> = participants.iter().map(|p| ShareSpec::equal(*p)).collect();
        let shares = compute_split(usd(total), SplitPolicy::Equal, &specs).unwrap();
        Expense {
            expense_id: Uuid::new_v4(),
            payer: UserId::new(payer),
            total: usd(total),
            policy: SplitPolicy::Equal,
            participants: shares,
            group: Some(group.clone()),
            description: "dinner".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_expense_projection_nets_sum_to_zero() {
        let group = GroupId::new("trip");
        let balances = GroupBalances::new(Currency::USD);

        let expense = dinner_expense(&group, "alice", 3000, &["alice", "bob", "carol"]);
        balances.apply_expense(&expense).unwrap();

        let members = balances.balances_for(&group);
        assert_eq!(members.len(), 3);

        let alice = &members[0];
        assert_eq!(alice.user, UserId::new("alice"));
        assert_eq!(alice.total_paid, usd(3000));
        assert_eq!(alice.total_owed, usd(1000));
        assert_eq!(alice.net_balance, usd(2000));

        let net_sum: i64 = members.iter().map(|m| m.net_balance.minor_units()).sum();
        assert_eq!(net_sum, 0);
    }

    #[test]
    fn test_settlement_moves_nets_toward_zero() {
        let group = GroupId::new("trip");
        let balances = GroupBalances::new(Currency::USD);

        let expense = dinner_expense(&group, "alice", 3000, &["alice", "bob", "carol"]);
        balances.apply_expense(&expense).unwrap();

        balances
            .apply_settlement(&group, &UserId::new("bob"), &UserId::new("alice"), usd(1000))
            .unwrap();

        assert_eq!(balances.net_of(&group, &UserId::new("bob")), usd(0));
        assert_eq!(balances.net_of(&group, &UserId::new("alice")), usd(1000));
        assert_eq!(balances.net_of(&group, &UserId::new("carol")), usd(-1000));
    }

    #[test]
    fn test_reverse_expense_restores_zero() {
        let group = GroupId::new("trip");
        let balances = GroupBalances::new(Currency::USD);

        let expense = dinner_expense(&group, "alice", 3000, &["alice", "bob"]);
        balances.apply_expense(&expense).unwrap();
        balances.reverse_expense(&expense).unwrap();

        for member in balances.balances_for(&group) {
            assert!(member.net_balance.is_zero());
            assert!(member.total_paid.is_zero());
            assert!(member.total_owed.is_zero());
        }
    }

    #[test]
    fn test_reconcile_detects_drift() {
        let group = GroupId::new("trip");
        let balances = GroupBalances::new(Currency::USD);

        let expense = dinner_expense(&group, "alice", 3000, &["alice", "bob", "carol"]);
        balances.apply_expense(&expense).unwrap();

        // Clean projection reconciles
        let reconciled = balances.reconcile(&group, &[expense.clone()], &[]).unwrap();
        assert_eq!(reconciled.len(), 3);

        // An expense the projection never saw shows up as drift
        let missed = dinner_expense(&group, "bob", 900, &["alice", "bob", "carol"]);
        let err = balances
            .reconcile(&group, &[expense, missed], &[])
            .unwrap_err();
        assert_eq!(err.kind(), "ledger_consistency");
    }

    #[test]
    fn test_rebuild_counts_only_completed_settlements() {
        let group = GroupId::new("trip");
        let balances = GroupBalances::new(Currency::USD);
        let expense = dinner_expense(&group, "alice", 2000, &["alice", "bob"]);

        let mut settled = Transaction::new(
            TransactionKind::Settlement,
            usd(1000),
            crate::types::AccountId::wallet(&UserId::new("bob")),
            crate::types::AccountId::wallet(&UserId::new("alice")),
            3,
            "settle up",
            Utc::now(),
        );
        settled.related_group = Some(group.clone());

        // Still pending: must not count
        let rebuilt = balances
            .rebuild(&group, std::slice::from_ref(&expense), std::slice::from_ref(&settled))
            .unwrap();
        assert_eq!(rebuilt[&UserId::new("bob")].net_balance, usd(-1000));

        settled.transition(TransactionStatus::Processing).unwrap();
        settled.transition(TransactionStatus::Completed).unwrap();
        let rebuilt = balances
            .rebuild(&group, &[expense], &[settled])
            .unwrap();
        assert_eq!(rebuilt[&UserId::new("bob")].net_balance, usd(0));
        assert_eq!(rebuilt[&UserId::new("alice")].net_balance, usd(0));
    }
}
