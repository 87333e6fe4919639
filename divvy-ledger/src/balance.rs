//! Balance ledger
//!
//! Authoritative running balances, applied via atomic deltas. Each
//! account carries its own lock and a version counter: two concurrent
//! deltas on the same account are strictly serialized, while deltas on
//! disjoint accounts proceed in parallel. Two-account transfers take
//! both locks in canonical id order.
//!
//! A transfer runs in two phases. `prepare_transfer` reads the current
//! balances, validates funds, and records the intended before/after
//! snapshots together with the account versions. `commit_transfer`
//! re-locks both accounts and applies both deltas all-or-nothing, but
//! only if the versions are unchanged: an interleaved delta surfaces
//! as a retryable conflict instead of a silent misapply.

use crate::money::{Currency, Money};
use crate::types::AccountId;
use crate::{Error, Result};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A balance account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Account ID
    pub account_id: AccountId,

    /// Current balance
    pub balance: Money,

    /// Whether a debit may take this account negative
    pub allow_overdraft: bool,

    /// Bumped on every applied delta
    pub version: u64,
}

/// Validated transfer intent with balance snapshots
#[derive(Debug, Clone)]
pub struct TransferIntent {
    /// Debit side
    pub from: AccountId,
    /// Credit side
    pub to: AccountId,
    /// Amount to move
    pub amount: Money,
    /// Debit balance before application
    pub from_before: Money,
    /// Debit balance after application
    pub from_after: Money,
    /// Credit balance before application
    pub to_before: Money,
    /// Credit balance after application
    pub to_after: Money,
    /// Debit account version at prepare time
    pub from_version: u64,
    /// Credit account version at prepare time
    pub to_version: u64,
}

/// Per-account serialized balance store
pub struct BalanceLedger {
    accounts: DashMap<AccountId, Arc<Mutex<Account>>>,
    currency: Currency,
}

impl BalanceLedger {
    /// Create an empty ledger for one currency
    pub fn new(currency: Currency) -> Self {
        Self {
            accounts: DashMap::new(),
            currency,
        }
    }

    /// Ledger currency
    pub fn currency(&self) -> Currency {
        self.currency
    }

    /// Open an account (idempotent; an existing account is left as-is)
    pub fn open_account(&self, account_id: AccountId, allow_overdraft: bool) {
        let currency = self.currency;
        self.accounts.entry(account_id.clone()).or_insert_with(|| {
            Arc::new(Mutex::new(Account {
                account_id,
                balance: Money::zero(currency),
                allow_overdraft,
                version: 0,
            }))
        });
    }

    /// Current balance of an account
    pub fn balance_of(&self, account_id: &AccountId) -> Result<Money> {
        let account = self.handle(account_id)?;
        let guard = account.lock();
        Ok(guard.balance)
    }

    /// Credit an account directly (wallet funding); creates the account
    /// if it does not exist yet. Returns the new balance.
    pub fn deposit(&self, account_id: &AccountId, amount: Money) -> Result<Money> {
        if !amount.is_positive() {
            return Err(Error::InvalidState(format!(
                "deposit amount must be positive, got {}",
                amount
            )));
        }
        self.require_currency(amount)?;
        self.open_account(account_id.clone(), false);

        let account = self.handle(account_id)?;
        let mut guard = account.lock();
        guard.balance = guard.balance.checked_add(amount)?;
        guard.version += 1;

        tracing::debug!(account = %account_id, balance = %guard.balance, "Deposit applied");
        Ok(guard.balance)
    }

    /// Validate a transfer and capture balance snapshots.
    ///
    /// Fails with `InsufficientFunds` when the debit would take a
    /// non-overdraft account negative; no balance is touched.
    pub fn prepare_transfer(
        &self,
        from: &AccountId,
        to: &AccountId,
        amount: Money,
    ) -> Result<TransferIntent> {
        if from == to {
            return Err(Error::InvalidState(
                "transfer requires two distinct accounts".to_string(),
            ));
        }
        if !amount.is_positive() {
            return Err(Error::InvalidState(format!(
                "transfer amount must be positive, got {}",
                amount
            )));
        }
        self.require_currency(amount)?;

        self.open_account(from.clone(), false);
        self.open_account(to.clone(), false);

        self.with_pair(from, to, |from_account, to_account| {
            let from_before = from_account.balance;
            let from_after = from_before.checked_sub(amount)?;
            if from_after.is_negative() && !from_account.allow_overdraft {
                return Err(Error::InsufficientFunds {
                    account: from.to_string(),
                    requested: amount.minor_units(),
                    available: from_before.minor_units(),
                });
            }

            let to_before = to_account.balance;
            let to_after = to_before.checked_add(amount)?;

            Ok(TransferIntent {
                from: from.clone(),
                to: to.clone(),
                amount,
                from_before,
                from_after,
                to_before,
                to_after,
                from_version: from_account.version,
                to_version: to_account.version,
            })
        })
    }

    /// Apply a prepared transfer to both accounts, both-or-neither.
    ///
    /// Fails with a retryable `Conflict` if either account changed
    /// since the intent was prepared; balances are left untouched.
    pub fn commit_transfer(&self, intent: &TransferIntent) -> Result<()> {
        self.with_pair(&intent.from, &intent.to, |from_account, to_account| {
            if from_account.version != intent.from_version {
                return Err(Error::Conflict(format!(
                    "account {} changed since the transfer was prepared",
                    intent.from
                )));
            }
            if to_account.version != intent.to_version {
                return Err(Error::Conflict(format!(
                    "account {} changed since the transfer was prepared",
                    intent.to
                )));
            }

            // Both locks held: the two writes are a single atomic step
            from_account.balance = intent.from_after;
            from_account.version += 1;
            to_account.balance = intent.to_after;
            to_account.version += 1;

            Ok(())
        })?;

        tracing::debug!(
            from = %intent.from,
            to = %intent.to,
            amount = %intent.amount,
            "Transfer committed"
        );

        Ok(())
    }

    fn handle(&self, account_id: &AccountId) -> Result<Arc<Mutex<Account>>> {
        self.accounts
            .get(account_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::AccountNotFound(account_id.to_string()))
    }

    /// Run `f` with both accounts locked, taking the locks in canonical
    /// id order so concurrent transfers cannot deadlock
    fn with_pair<R>(
        &self,
        a: &AccountId,
        b: &AccountId,
        f: impl FnOnce(&mut Account, &mut Account) -> Result<R>,
    ) -> Result<R> {
        let handle_a = self.handle(a)?;
        let handle_b = self.handle(b)?;

        if a < b {
            let mut guard_a = handle_a.lock();
            let mut guard_b = handle_b.lock();
            f(&mut guard_a, &mut guard_b)
        } else {
            let mut guard_b = handle_b.lock();
            let mut guard_a = handle_a.lock();
            f(&mut guard_a, &mut guard_b)
        }
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
}
