//! Main ledger orchestration layer
//!
//! This module ties together the split calculator, balance ledger,
//! transaction executor, group projection, and storage into a
//! high-level API for shared-expense bookkeeping.
//!
//! # Example
//!
//! ```
//! use divvy_ledger::{Config, Ledger, Money, ShareSpec, SplitPolicy, UserId};
//!
//! fn main() -> divvy_ledger::Result<()> {
//!     let ledger = Ledger::open(Config::default())?;
//!     let currency = ledger.currency();
//!
//!     let expense = ledger.create_expense(
//!         UserId::new("alice"),
//!         Money::new(3000, currency),
//!         SplitPolicy::Equal,
//!         &[
//!             ShareSpec::equal("alice"),
//!             ShareSpec::equal("bob"),
//!             ShareSpec::equal("carol"),
//!         ],
//!         None,
//!         "dinner",
//!     )?;
//!     assert_eq!(expense.participants.len(), 3);
//!     Ok(())
//! }
//! ```
//!
//! Every multi-step operation persists each step's effect before
//! moving on, so an interruption leaves records that reconciliation
//! can verify. Balances are only ever touched through the balance
//! ledger's prepare/commit API.

use crate::balance::BalanceLedger;
use crate::config::Config;
use crate::directory::{Clock, Directory, OpenDirectory, SystemClock};
use crate::group::GroupBalances;
use crate::metrics::Metrics;
use crate::money::{Currency, Money};
use crate::split::compute_split;
use crate::store::{MemoryStore, Store};
use crate::transaction::TransactionExecutor;
use crate::types::{
    AccountId, Expense, GroupId, MemberBalance, ShareSpec, SplitPolicy, Transaction,
    TransactionKind, TransactionStatus, UserId,
};
use crate::{Error, Result};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;
use uuid::Uuid;

/// Outcome of charging an expense's outstanding shares
#[derive(Debug)]
pub struct ChargeReport {
    /// Expense that was charged
    pub expense_id: Uuid,

    /// Completed charge transactions
    pub completed: Vec<Transaction>,

    /// Charges that failed, with the reason for each
    pub failed: Vec<FailedCharge>,
}

impl ChargeReport {
    /// True when every outstanding share was charged
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// One participant whose charge failed
#[derive(Debug)]
pub struct FailedCharge {
    /// Participant whose wallet could not cover the share
    pub participant: UserId,

    /// Stable error kind
    pub error_kind: &'static str,

    /// Human-readable reason
    pub message: String,
}

/// Main ledger interface
pub struct Ledger {
    /// Configuration
    config: Config,

    /// Ledger currency
    currency: Currency,

    /// Authoritative balances
    balances: BalanceLedger,

    /// Group debt projection
    groups: GroupBalances,

    /// Durable records
    store: Arc<dyn Store>,

    /// Identity and membership resolution
    directory: Arc<dyn Directory>,

    /// Timestamp source
    clock: Arc<dyn Clock>,

    /// Prometheus metrics
    metrics: Metrics,

    /// Per-expense mutation locks (read-modify-write serialization)
    expense_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl Ledger {
    /// Open a ledger with configuration.
    ///
    /// Uses the in-memory store, an allow-all directory, and the
    /// system clock; swap collaborators with the `with_*` builders.
    pub fn open(config: Config) -> Result<Self> {
        let currency = config.resolved_currency()?;
        let metrics = Metrics::new()
            .map_err(|e| Error::Config(format!("Failed to create metrics: {}", e)))?;

        Ok(Self {
            currency,
            balances: BalanceLedger::new(currency),
            groups: GroupBalances::new(currency),
            store: Arc::new(MemoryStore::new()),
            directory: Arc::new(OpenDirectory),
            clock: Arc::new(SystemClock),
            metrics,
            config,
            expense_locks: DashMap::new(),
        })
    }

    /// Set the storage backend
    pub fn with_store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = store;
        self
    }

    /// Set the identity directory
    pub fn with_directory(mut self, directory: Arc<dyn Directory>) -> Self {
        self.directory = directory;
        self
    }

    /// Set the clock
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Ledger currency
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    // ------------------------------------------------------------------
    // Expenses

    /// Record a shared expense.
    ///
    /// Splits the total across the participants, verifies the exact-sum
    /// invariant, persists the expense, and updates the group debt
    /// projection. No wallet balance moves until the expense is settled
    /// or explicitly charged. The payer's own share is marked settled
    /// at creation.
    pub fn create_expense(
        &self,
        payer: UserId,
        total: Money,
        policy: SplitPolicy,
        specs: &[ShareSpec],
        group: Option<GroupId>,
        description: impl Into<String>,
    ) -> Result<Expense> {
        self.require_currency(total)?;
        self.require_user(&payer)?;
        for spec in specs {
            self.require_user(&spec.participant)?;
        }
        if let Some(group) = &group {
            self.require_member(group, &payer)?;
            for spec in specs {
                self.require_member(group, &spec.participant)?;
            }
        }

        let now = self.clock.now();
        let mut participants = compute_split(total, policy, specs)?;
        for share in &mut participants {
            if share.participant == payer {
                share.settled_amount = share.amount;
                share.settled = true;
                share.settled_at = Some(now);
            }
        }

        let expense = Expense {
            expense_id: Uuid::new_v4(),
            payer,
            total,
            policy,
            participants,
            group,
            description: description.into(),
            created_at: now,
            updated_at: now,
        };
        if self.config.reconciliation.verify_on_write {
            expense.verify()?;
        }

        self.store.put_expense(&expense)?;
        if expense.group.is_some() {
            self.groups.apply_expense(&expense)?;
        }

        self.metrics.record_expense();
        tracing::info!(
            expense = %expense.expense_id,
            payer = %expense.payer,
            total = %expense.total,
            participants = expense.participants.len(),
            "Expense recorded"
        );
        Ok(expense)
    }

    /// Change an expense's total, recomputing every share from its
    /// stored basis.
    ///
    /// Rejected with `AlreadySettled` once any non-payer share has
    /// settled anything, and with `InvalidSplit` for custom-policy
    /// expenses, whose fixed amounts cannot be rescaled.
    pub fn update_expense_amount(&self, expense_id: Uuid, new_total: Money) -> Result<Expense> {
        self.require_currency(new_total)?;
        let lock = self.expense_lock(expense_id);
        let _guard = lock.lock();

        let old = self.store.get_expense(expense_id)?;
        if old.has_any_settlement() {
            return Err(Error::AlreadySettled(format!(
                "expense {} has settled shares; its total is frozen",
                expense_id
            )));
        }
        if old.policy == SplitPolicy::Custom {
            return Err(Error::InvalidSplit(
                "custom-policy expenses carry fixed amounts and cannot be rescaled".to_string(),
            ));
        }

        let specs: Vec<ShareSpec> = old
            .participants
            .iter()
            .map(|p| ShareSpec {
                participant: p.participant.clone(),
                basis: p.basis.clone(),
            })
            .collect();

        let now = self.clock.now();
        let mut participants = compute_split(new_total, old.policy, &specs)?;
        for share in &mut participants {
            if share.participant == old.payer {
                share.settled_amount = share.amount;
                share.settled = true;
                share.settled_at = Some(now);
            }
        }

        let updated = Expense {
            total: new_total,
            participants,
            updated_at: now,
            ..old.clone()
        };
        if self.config.reconciliation.verify_on_write {
            updated.verify()?;
        }

        self.store.put_expense(&updated)?;
        if updated.group.is_some() {
            self.groups.reverse_expense(&old)?;
            self.groups.apply_expense(&updated)?;
        }

        tracing::info!(
            expense = %expense_id,
            old_total = %old.total,
            new_total = %new_total,
            "Expense total updated"
        );
        Ok(updated)
    }

    /// Settle a participant's share of an expense, moving wallet money
    /// from the participant to the payer.
    ///
    /// With no amount, settles the full outstanding balance; a partial
    /// amount accumulates and the share flips to settled only once the
    /// full computed amount is covered.
    pub fn settle_expense_share(
        &self,
        expense_id: Uuid,
        participant: &UserId,
        amount: Option<Money>,
    ) -> Result<Transaction> {
        let lock = self.expense_lock(expense_id);
        let _guard = lock.lock();

        let mut expense = self.store.get_expense(expense_id)?;
        let share = expense
            .share_of(participant)
            .ok_or_else(|| {
                Error::UnknownUser(format!(
                    "{} is not a participant of expense {}",
                    participant, expense_id
                ))
            })?
            .clone();
        if share.settled {
            return Err(Error::AlreadySettled(format!(
                "share of {} on expense {} is already settled",
                participant, expense_id
            )));
        }

        let outstanding = share.outstanding()?;
        let amount = amount.unwrap_or(outstanding);
        self.require_currency(amount)?;
        if !amount.is_positive() || matches!(amount.partial_cmp(&outstanding), Some(std::cmp::Ordering::Greater)) {
            return Err(Error::InvalidState(format!(
                "settlement of {} must be positive and at most the outstanding {}",
                amount, outstanding
            )));
        }

        let mut tx = self.new_transaction(
            TransactionKind::Settlement,
            amount,
            AccountId::wallet(participant),
            AccountId::wallet(&expense.payer),
            format!("settle share of {}", expense.description),
        );
        tx.related_expense = Some(expense_id);
        tx.related_group = expense.group.clone();

        self.execute_and_persist(&mut tx)?;
        self.apply_share_settlement(&mut expense, participant, amount)?;
        Ok(tx)
    }

    /// Charge every outstanding share of an expense, debiting each
    /// participant's wallet in favor of the payer.
    ///
    /// Continues past individual failures and reports exactly which
    /// charges failed and why; completed charges stay applied.
    pub fn charge_expense(&self, expense_id: Uuid) -> Result<ChargeReport> {
        let lock = self.expense_lock(expense_id);
        let _guard = lock.lock();

        let mut expense = self.store.get_expense(expense_id)?;
        let outstanding: Vec<(UserId, Money)> = expense
            .participants
            .iter()
            .filter(|p| !p.settled)
            .map(|p| Ok((p.participant.clone(), p.outstanding()?)))
            .collect::<Result<_>>()?;

        let mut report = ChargeReport {
            expense_id,
            completed: Vec::new(),
            failed: Vec::new(),
        };

        for (participant, amount) in outstanding {
            if !amount.is_positive() {
                continue;
            }
            let mut tx = self.new_transaction(
                TransactionKind::ExpenseCharge,
                amount,
                AccountId::wallet(&participant),
                AccountId::wallet(&expense.payer),
                format!("charge share of {}", expense.description),
            );
            tx.related_expense = Some(expense_id);
            tx.related_group = expense.group.clone();

            match self.execute_and_persist(&mut tx) {
                Ok(()) => {
                    self.apply_share_settlement(&mut expense, &participant, amount)?;
                    report.completed.push(tx);
                }
                Err(e) => {
                    tracing::warn!(
                        expense = %expense_id,
                        participant = %participant,
                        error = %e,
                        "Charge failed, continuing"
                    );
                    report.failed.push(FailedCharge {
                        participant,
                        error_kind: e.kind(),
                        message: e.to_string(),
                    });
                }
            }
        }

        Ok(report)
    }

    // ------------------------------------------------------------------
    // Transactions

    /// Move wallet money directly between two users
    pub fn transfer(
        &self,
        from: &UserId,
        to: &UserId,
        amount: Money,
        description: impl Into<String>,
    ) -> Result<Transaction> {
        self.require_user(from)?;
        self.require_user(to)?;

        let mut tx = self.new_transaction(
            TransactionKind::Transfer,
            amount,
            AccountId::wallet(from),
            AccountId::wallet(to),
            description,
        );
        self.execute_and_persist(&mut tx)?;
        Ok(tx)
    }

    /// Reverse a completed transaction with an opposite-direction
    /// refund, rolling back any share settlement it carried.
    pub fn refund_transaction(&self, transaction_id: Uuid) -> Result<Transaction> {
        let original = self.store.get_transaction(transaction_id)?;
        if original.status != TransactionStatus::Completed {
            return Err(Error::InvalidState(format!(
                "transaction {} is {}; only completed transactions can be refunded",
                transaction_id,
                original.status.as_str()
            )));
        }
        if original.kind == TransactionKind::Refund {
            return Err(Error::InvalidState(format!(
                "transaction {} is itself a refund",
                transaction_id
            )));
        }

        let mut refund = self.new_transaction(
            TransactionKind::Refund,
            original.amount,
            original.to_account.clone(),
            original.from_account.clone(),
            format!("refund of {}", transaction_id),
        );
        refund.related_expense = original.related_expense;
        refund.related_group = original.related_group.clone();

        self.execute_and_persist(&mut refund)?;

        if matches!(
            original.kind,
            TransactionKind::Settlement | TransactionKind::ExpenseCharge
        ) {
            self.reverse_share_settlement(&original)?;
        }

        tracing::info!(
            original = %transaction_id,
            refund = %refund.transaction_id,
            amount = %refund.amount,
            "Transaction refunded"
        );
        Ok(refund)
    }

    /// Retry a failed transaction.
    ///
    /// A no-op on a transaction that already completed; exhausting the
    /// retry budget is `RetryLimitExceeded` with the transaction left
    /// failed. A settlement whose share was meanwhile covered through
    /// a fresh settlement is stale: the retry is rejected with
    /// `AlreadySettled` before any money moves.
    pub fn retry_transaction(&self, transaction_id: Uuid) -> Result<Transaction> {
        let mut tx = self.store.get_transaction(transaction_id)?;
        if tx.status == TransactionStatus::Completed {
            return Ok(tx);
        }

        let settlement_kind = matches!(
            tx.kind,
            TransactionKind::Settlement | TransactionKind::ExpenseCharge
        );

        // Settlement retries hold the expense lock for the whole
        // attempt so the share cannot settle through another path
        // between the staleness check and the bookkeeping.
        let expense_lock = match tx.related_expense {
            Some(expense_id) if settlement_kind => Some(self.expense_lock(expense_id)),
            _ => None,
        };
        let _guard = expense_lock.as_ref().map(|lock| lock.lock());
        if settlement_kind {
            self.check_settlement_still_owed(&tx)?;
        }

        self.metrics.record_retry();
        let executor = TransactionExecutor::new(&self.balances, &*self.clock);
        let outcome = executor.retry(&mut tx);
        self.store.put_transaction(&tx)?;

        match outcome {
            Ok(()) => {
                self.metrics
                    .record_transaction_completed(tx.amount.minor_units());
                if settlement_kind {
                    self.record_retried_settlement(&tx)?;
                }
                Ok(tx)
            }
            Err(e) => {
                self.metrics.record_transaction_failed();
                Err(e)
            }
        }
    }

    /// Cancel a pending or in-flight transaction.
    ///
    /// Completion wins a race: once the transaction is observed
    /// completed, the cancel is rejected with `InvalidState`. In-process
    /// calls drive every transaction to a terminal or failed state
    /// before returning, so the usual target here is a pending record
    /// left on file by an interrupted run.
    pub fn cancel_transaction(&self, transaction_id: Uuid) -> Result<Transaction> {
        let mut tx = self.store.get_transaction(transaction_id)?;
        let executor = TransactionExecutor::new(&self.balances, &*self.clock);
        executor.cancel(&mut tx)?;
        self.store.put_transaction(&tx)?;
        Ok(tx)
    }

    // ------------------------------------------------------------------
    // Balances and groups

    /// Fund a user's wallet
    pub fn deposit(&self, user: &UserId, amount: Money) -> Result<Money> {
        self.require_user(user)?;
        let account = AccountId::wallet(user);
        self.balances
            .open_account(account.clone(), self.config.transactions.allow_overdraft);
        self.balances.deposit(&account, amount)
    }

    /// A user's wallet balance (zero for a wallet never funded)
    pub fn balance_of(&self, user: &UserId) -> Result<Money> {
        match self.balances.balance_of(&AccountId::wallet(user)) {
            Ok(balance) => Ok(balance),
            Err(Error::AccountNotFound(_)) => Ok(Money::zero(self.currency)),
            Err(e) => Err(e),
        }
    }

    /// Settle part of a group debt directly between two members,
    /// outside any single expense (used when clearing netted debts).
    pub fn settle_debt(
        &self,
        group: &GroupId,
        debtor: &UserId,
        creditor: &UserId,
        amount: Money,
    ) -> Result<Transaction> {
        self.require_member(group, debtor)?;
        self.require_member(group, creditor)?;

        let mut tx = self.new_transaction(
            TransactionKind::Settlement,
            amount,
            AccountId::wallet(debtor),
            AccountId::wallet(creditor),
            format!("settle group debt in {}", group),
        );
        tx.related_group = Some(group.clone());

        self.execute_and_persist(&mut tx)?;
        self.groups.apply_settlement(group, debtor, creditor, amount)?;
        Ok(tx)
    }

    /// Live member balances for a group, ordered by user id
    pub fn group_balances(&self, group: &GroupId) -> Vec<MemberBalance> {
        self.groups.balances_for(group)
    }

    /// Rebuild a group's balances from its stored records and verify
    /// the live projection matches; drift is a `LedgerConsistency`
    /// error, never silently corrected.
    pub fn recompute_group_balances(&self, group: &GroupId) -> Result<Vec<MemberBalance>> {
        let expenses = self.store.group_expenses(group)?;
        let transactions = self.store.group_transactions(group)?;
        self.groups.reconcile(group, &expenses, &transactions)
    }

    /// Fetch an expense
    pub fn expense(&self, expense_id: Uuid) -> Result<Expense> {
        self.store.get_expense(expense_id)
    }

    /// Fetch a transaction
    pub fn transaction(&self, transaction_id: Uuid) -> Result<Transaction> {
        self.store.get_transaction(transaction_id)
    }

    /// A user's wallet transaction history, oldest first
    pub fn transactions_of(&self, user: &UserId) -> Result<Vec<Transaction>> {
        self.store.account_transactions(&AccountId::wallet(user))
    }

    // ------------------------------------------------------------------
    // Internals

    fn new_transaction(
        &self,
        kind: TransactionKind,
        amount: Money,
        from: AccountId,
        to: AccountId,
        description: impl Into<String>,
    ) -> Transaction {
        let overdraft = self.config.transactions.allow_overdraft;
        self.balances.open_account(from.clone(), overdraft);
        self.balances.open_account(to.clone(), overdraft);
        Transaction::new(
            kind,
            amount,
            from,
            to,
            self.config.transactions.max_retries,
            description,
            self.clock.now(),
        )
    }

    /// Persist the pending record, drive the transaction to
    /// completion, and persist its final state either way; the failed
    /// record stays on file for audit, and an interruption leaves a
    /// pending record that can be cancelled.
    fn execute_and_persist(&self, tx: &mut Transaction) -> Result<()> {
        self.store.put_transaction(tx)?;
        let executor = TransactionExecutor::new(&self.balances, &*self.clock);
        let outcome = executor.execute(tx);
        self.store.put_transaction(tx)?;
        match outcome {
            Ok(()) => {
                self.metrics
                    .record_transaction_completed(tx.amount.minor_units());
                Ok(())
            }
            Err(e) => {
                self.metrics.record_transaction_failed();
                Err(e)
            }
        }
    }

    /// Fold a completed settlement into the expense's share bookkeeping
    /// and the group projection. Caller holds the expense lock.
    fn apply_share_settlement(
        &self,
        expense: &mut Expense,
        participant: &UserId,
        amount: Money,
    ) -> Result<()> {
        let now = self.clock.now();
        let payer = expense.payer.clone();
        let group = expense.group.clone();
        let share = expense
            .participants
            .iter_mut()
            .find(|p| &p.participant == participant)
            .ok_or_else(|| {
                Error::LedgerConsistency(format!(
                    "expense {} has no share for {}",
                    expense.expense_id, participant
                ))
            })?;

        share.settled_amount = share.settled_amount.checked_add(amount)?;
        share.settled = share.settled_amount == share.amount;
        if share.settled {
            share.settled_at = Some(now);
        }
        expense.updated_at = now;
        self.store.put_expense(expense)?;

        if let Some(group) = &group {
            self.groups.apply_settlement(group, participant, &payer, amount)?;
        }
        Ok(())
    }

    /// Roll a refunded settlement back out of the expense bookkeeping
    /// and the group projection.
    fn reverse_share_settlement(&self, original: &Transaction) -> Result<()> {
        let participant = original.from_account.wallet_user().ok_or_else(|| {
            Error::LedgerConsistency(format!(
                "transaction {}: {} is not a wallet account",
                original.transaction_id, original.from_account
            ))
        })?;

        if let Some(expense_id) = original.related_expense {
            let lock = self.expense_lock(expense_id);
            let _guard = lock.lock();

            let mut expense = self.store.get_expense(expense_id)?;
            let now = self.clock.now();
            if let Some(share) = expense
                .participants
                .iter_mut()
                .find(|p| p.participant == participant)
            {
                share.settled_amount = share.settled_amount.checked_sub(original.amount)?;
                share.settled = share.settled_amount == share.amount;
                if !share.settled {
                    share.settled_at = None;
                }
            }
            expense.updated_at = now;
            self.store.put_expense(&expense)?;
        }

        if let Some(group) = &original.related_group {
            let creditor = original.to_account.wallet_user().ok_or_else(|| {
                Error::LedgerConsistency(format!(
                    "transaction {}: {} is not a wallet account",
                    original.transaction_id, original.to_account
                ))
            })?;
            self.groups
                .reverse_settlement(group, &participant, &creditor, original.amount)?;
        }
        Ok(())
    }

    /// A failed settlement can be superseded by a fresh settlement of
    /// the same share; retrying the stale record would collect the
    /// share a second time. Caller holds the expense lock.
    fn check_settlement_still_owed(&self, tx: &Transaction) -> Result<()> {
        let Some(expense_id) = tx.related_expense else {
            return Ok(());
        };
        let participant = tx.from_account.wallet_user().ok_or_else(|| {
            Error::LedgerConsistency(format!(
                "transaction {}: {} is not a wallet account",
                tx.transaction_id, tx.from_account
            ))
        })?;
        let expense = self.store.get_expense(expense_id)?;
        let share = expense.share_of(&participant).ok_or_else(|| {
            Error::LedgerConsistency(format!(
                "expense {} has no share for {}",
                expense_id, participant
            ))
        })?;

        let outstanding = share.outstanding()?;
        if share.settled
            || matches!(
                tx.amount.partial_cmp(&outstanding),
                Some(std::cmp::Ordering::Greater)
            )
        {
            return Err(Error::AlreadySettled(format!(
                "transaction {} was superseded; share of {} on expense {} has {} outstanding",
                tx.transaction_id, participant, expense_id, outstanding
            )));
        }
        Ok(())
    }

    /// Share bookkeeping for a settlement that completed through a
    /// retry rather than the original settle call. Caller holds the
    /// expense lock when the transaction references an expense.
    fn record_retried_settlement(&self, tx: &Transaction) -> Result<()> {
        let Some(expense_id) = tx.related_expense else {
            if let Some(group) = &tx.related_group {
                let debtor = tx.from_account.wallet_user();
                let creditor = tx.to_account.wallet_user();
                if let (Some(debtor), Some(creditor)) = (debtor, creditor) {
                    self.groups
                        .apply_settlement(group, &debtor, &creditor, tx.amount)?;
                }
            }
            return Ok(());
        };

        let participant = tx.from_account.wallet_user().ok_or_else(|| {
            Error::LedgerConsistency(format!(
                "transaction {}: {} is not a wallet account",
                tx.transaction_id, tx.from_account
            ))
        })?;

        let mut expense = self.store.get_expense(expense_id)?;
        self.apply_share_settlement(&mut expense, &participant, tx.amount)
    }

    fn expense_lock(&self, expense_id: Uuid) -> Arc<Mutex<()>> {
        self.expense_locks
            .entry(expense_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone()
    }

    fn require_currency(&self, amount: Money) -> Result<()> {
        if amount.currency() != self.currency {
            return Err(Error::CurrencyMismatch {
                expected: self.currency.code(),
                actual: amount.currency().code(),
            });
        }
        Ok(())
    }

    fn require_user(&self, user: &UserId) -> Result<()> {
        if !self.directory.user_exists(user) {
            return Err(Error::UnknownUser(user.to_string()));
        }
        Ok(())
    }

    fn require_member(&self, group: &GroupId, user: &UserId) -> Result<()> {
        self.require_user(user)?;
        if !self.directory.is_active_member(group, user) {
            return Err(Error::NotAGroupMember(format!("{} in {}", user, group)));
        }
        Ok(())
    }
}
