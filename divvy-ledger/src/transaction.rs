//! Transaction state machine
//!
//! Drives a single money-movement attempt through its lifecycle:
//!
//! ```text
//! pending ──> processing ──> completed
//!    │             │ ▲
//!    │             ▼ │ (retry, bounded)
//!    │           failed
//!    └──> cancelled <── processing
//! ```
//!
//! Entering `processing` records the intended before/after balance
//! snapshots, validated against the current ledger state. Completing
//! applies both deltas atomically. Any apply error moves the
//! transaction to `failed` with its reason recorded and balances
//! untouched; transient conflicts are retried automatically up to the
//! bound, while validation failures surface to the caller immediately.
//! No transition leaves `completed` or `cancelled`.

use crate::balance::BalanceLedger;
use crate::directory::Clock;
use crate::types::{Transaction, TransactionStatus};
use crate::{Error, Result};

/// Executes transactions against the balance ledger
pub struct TransactionExecutor<'a> {
    balances: &'a BalanceLedger,
    clock: &'a dyn Clock,
}

impl<'a> TransactionExecutor<'a> {
    /// Create an executor over a balance ledger
    pub fn new(balances: &'a BalanceLedger, clock: &'a dyn Clock) -> Self {
        Self { balances, clock }
    }

    /// Drive a pending (or failed, when retrying) transaction to
    /// completion.
    ///
    /// Transient conflicts are retried in place while the retry budget
    /// lasts. On a terminal failure the transaction is left in `failed`
    /// with the reason recorded and the error is returned; balances are
    /// exactly as they were before the call.
    pub fn execute(&self, tx: &mut Transaction) -> Result<()> {
        loop {
            tx.transition(TransactionStatus::Processing)?;

            match self.attempt(tx) {
                Ok(()) => {
                    tracing::info!(
                        transaction = %tx.transaction_id,
                        amount = %tx.amount,
                        from = %tx.from_account,
                        to = %tx.to_account,
                        "Transaction completed"
                    );
                    return Ok(());
                }
                Err(e) => {
                    tx.record_failure(&e)?;

                    if e.is_retryable() && tx.can_retry() {
                        tracing::warn!(
                            transaction = %tx.transaction_id,
                            retry_count = tx.retry_count,
                            error = %e,
                            "Transient failure, retrying"
                        );
                        continue;
                    }

                    tracing::warn!(
                        transaction = %tx.transaction_id,
                        error = %e,
                        "Transaction failed"
                    );
                    return Err(e);
                }
            }
        }
    }

    /// Retry a failed transaction.
    ///
    /// A transaction that already completed (e.g. through a racing
    /// worker) is a no-op; an exhausted retry budget is
    /// `RetryLimitExceeded` and the transaction stays `failed`.
    pub fn retry(&self, tx: &mut Transaction) -> Result<()> {
        match tx.status {
            TransactionStatus::Completed => Ok(()),
            TransactionStatus::Failed if tx.retry_count >= tx.max_retries => {
                Err(Error::RetryLimitExceeded {
                    transaction: tx.transaction_id,
                    max_retries: tx.max_retries,
                })
            }
            TransactionStatus::Failed => self.execute(tx),
            status => Err(Error::InvalidState(format!(
                "transaction {}: retry is only permitted from failed, not {}",
                tx.transaction_id,
                status.as_str()
            ))),
        }
    }

    /// Cancel a pending or in-flight transaction.
    ///
    /// Guarded by the transition table's check-and-set: once
    /// `completed` is observed, completion wins and the cancel is
    /// rejected. No balance effect, since no completed delta exists.
    pub fn cancel(&self, tx: &mut Transaction) -> Result<()> {
        tx.transition(TransactionStatus::Cancelled)?;
        tracing::info!(transaction = %tx.transaction_id, "Transaction cancelled");
        Ok(())
    }

    /// One application attempt: snapshot, validate, apply atomically
    fn attempt(&self, tx: &mut Transaction) -> Result<()> {
        let intent =
            self.balances
                .prepare_transfer(&tx.from_account, &tx.to_account, tx.amount)?;

        tx.from_balance_before = Some(intent.from_before);
        tx.from_balance_after = Some(intent.from_after);
        tx.to_balance_before = Some(intent.to_before);
        tx.to_balance_after = Some(intent.to_after);

        self.balances.commit_transfer(&intent)?;

        tx.transition(TransactionStatus::Completed)?;
        tx.processed_at = Some(self.clock.now());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::SystemClock;
    use crate::money::{Currency, Money};
    use crate::types::{AccountId, TransactionKind};
    use chrono::Utc;

    fn usd(minor_units: i64) -> Money {
        Money::new(minor_units, Currency::USD)
    }

    fn transfer_tx(from: &str, to: &str, amount: i64) -> Transaction {
        Transaction::new(
            TransactionKind::Transfer,
            usd(amount),
            AccountId::new(from),
            AccountId::new(to),
            3,
            "test transfer",
            Utc::now(),
        )
    }

    #[test]
    fn test_execute_happy_path() {
        let balances = BalanceLedger::new(Currency::USD);
        let clock = SystemClock;
        let executor = TransactionExecutor::new(&balances, &clock);

        balances.deposit(&AccountId::new("a"), usd(1000)).unwrap();

        let mut tx = transfer_tx("a", "b", 300);
        executor.execute(&mut tx).unwrap();

        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(tx.from_balance_before, Some(usd(1000)));
        assert_eq!(tx.from_balance_after, Some(usd(700)));
        assert_eq!(tx.to_balance_before, Some(usd(0)));
        assert_eq!(tx.to_balance_after, Some(usd(300)));
        assert!(tx.processed_at.is_some());
        assert_eq!(balances.balance_of(&AccountId::new("b")).unwrap(), usd(300));
    }

    #[test]
    fn test_insufficient_funds_is_terminal() {
        let balances = BalanceLedger::new(Currency::USD);
        let clock = SystemClock;
        let executor = TransactionExecutor::new(&balances, &clock);

        balances.deposit(&AccountId::new("a"), usd(100)).unwrap();

        let mut tx = transfer_tx("a", "b", 500);
        let err = executor.execute(&mut tx).unwrap_err();

        assert_eq!(err.kind(), "insufficient_funds");
        assert_eq!(tx.status, TransactionStatus::Failed);
        assert_eq!(tx.retry_count, 1);
        assert!(tx.failure_reason.as_deref().unwrap().contains("insufficient_funds"));
        // No partial application
        assert_eq!(balances.balance_of(&AccountId::new("a")).unwrap(), usd(100));
        assert_eq!(balances.balance_of(&AccountId::new("b")).unwrap(), usd(0));
    }

    #[test]
    fn test_retry_after_funding_succeeds() {
        let balances = BalanceLedger::new(Currency::USD);
        let clock = SystemClock;
        let executor = TransactionExecutor::new(&balances, &clock);

        let mut tx = transfer_tx("a", "b", 500);
        balances.deposit(&AccountId::new("a"), usd(100)).unwrap();
        executor.execute(&mut tx).unwrap_err();

        // Fund the account, then retry
        balances.deposit(&AccountId::new("a"), usd(1000)).unwrap();
        executor.retry(&mut tx).unwrap();

        assert_eq!(tx.status, TransactionStatus::Completed);
        assert_eq!(balances.balance_of(&AccountId::new("b")).unwrap(), usd(500));
    }

    #[test]
    fn test_retry_budget_exhausted() {
        let balances = BalanceLedger::new(Currency::USD);
        let clock = SystemClock;
        let executor = TransactionExecutor::new(&balances, &clock);

        let mut tx = transfer_tx("a", "b", 500);
        tx.max_retries = 3;

        // Burn through the budget against an unfunded account
        for _ in 0..3 {
            let _ = match tx.status {
                TransactionStatus::Pending => executor.execute(&mut tx),
                _ => executor.retry(&mut tx),
            };
        }
        assert_eq!(tx.retry_count, 3);
        assert_eq!(tx.status, TransactionStatus::Failed);

        let err = executor.retry(&mut tx).unwrap_err();
        assert_eq!(err.kind(), "retry_limit_exceeded");
        assert_eq!(tx.status, TransactionStatus::Failed);
    }

    #[test]
    fn test_retry_of_completed_is_noop() {
        let balances = BalanceLedger::new(Currency::USD);
        let clock = SystemClock;
        let executor = TransactionExecutor::new(&balances, &clock);

        balances.deposit(&AccountId::new("a"), usd(1000)).unwrap();

        let mut tx = transfer_tx("a", "b", 300);
        executor.execute(&mut tx).unwrap();

        let before = tx.clone();
        executor.retry(&mut tx).unwrap();
        assert_eq!(tx, before);
        assert_eq!(balances.balance_of(&AccountId::new("b")).unwrap(), usd(300));
    }

    #[test]
    fn test_cancel_from_pending() {
        let balances = BalanceLedger::new(Currency::USD);
        let clock = SystemClock;
        let executor = TransactionExecutor::new(&balances, &clock);

        let mut tx = transfer_tx("a", "b", 300);
        executor.cancel(&mut tx).unwrap();
        assert_eq!(tx.status, TransactionStatus::Cancelled);
    }

    #[test]
    fn test_cancel_loses_to_completion() {
        let balances = BalanceLedger::new(Currency::USD);
        let clock = SystemClock;
        let executor = TransactionExecutor::new(&balances, &clock);

        balances.deposit(&AccountId::new("a"), usd(1000)).unwrap();

        let mut tx = transfer_tx("a", "b", 300);
        executor.execute(&mut tx).unwrap();

        let err = executor.cancel(&mut tx).unwrap_err();
        assert_eq!(err.kind(), "invalid_state");
        assert_eq!(tx.status, TransactionStatus::Completed);
    }
}
