//! Durable record storage interface
//!
//! The storage engine is an external collaborator; the ledger consumes
//! it through the `Store` trait. Records must be queryable by group
//! and by account for reconciliation, and the transaction log is an
//! append-only audit trail: amount and parties are rejected if an
//! update tries to change them in place.
//!
//! `MemoryStore` is the in-process reference implementation.

use crate::types::{AccountId, Expense, GroupId, Transaction};
use crate::{Error, Result};
use dashmap::DashMap;
use uuid::Uuid;

/// Durable storage for expenses and transactions
pub trait Store: Send + Sync {
    /// Insert or update an expense
    fn put_expense(&self, expense: &Expense) -> Result<()>;

    /// Fetch an expense by ID
    fn get_expense(&self, expense_id: Uuid) -> Result<Expense>;

    /// All expenses belonging to a group, oldest first
    fn group_expenses(&self, group: &GroupId) -> Result<Vec<Expense>>;

    /// Insert or update a transaction.
    ///
    /// Amount, parties, and kind are immutable after creation; an
    /// update changing them is rejected.
    fn put_transaction(&self, tx: &Transaction) -> Result<()>;

    /// Fetch a transaction by ID
    fn get_transaction(&self, transaction_id: Uuid) -> Result<Transaction>;

    /// All transactions belonging to a group, oldest first
    fn group_transactions(&self, group: &GroupId) -> Result<Vec<Transaction>>;

    /// All transactions touching an account, oldest first
    fn account_transactions(&self, account: &AccountId) -> Result<Vec<Transaction>>;
}

/// In-memory reference store
#[derive(Default)]
pub struct MemoryStore {
    expenses: DashMap<Uuid, Expense>,
    transactions: DashMap<Uuid, Transaction>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl Store for MemoryStore {
    fn put_expense(&self, expense: &Expense) -> Result<()> {
        self.expenses.insert(expense.expense_id, expense.clone());
        Ok(())
    }

    fn get_expense(&self, expense_id: Uuid) -> Result<Expense> {
        self.expenses
            .get(&expense_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::ExpenseNotFound(expense_id.to_string()))
    }

    fn group_expenses(&self, group: &GroupId) -> Result<Vec<Expense>> {
        let mut expenses: Vec<Expense> = self
            .expenses
            .iter()
            .filter(|entry| entry.value().group.as_ref() == Some(group))
            .map(|entry| entry.value().clone())
            .collect();
        expenses.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.expense_id.cmp(&b.expense_id))
        });
        Ok(expenses)
    }

    fn put_transaction(&self, tx: &Transaction) -> Result<()> {
        if let Some(existing) = self.transactions.get(&tx.transaction_id) {
            let existing = existing.value();
            if existing.amount != tx.amount
                || existing.from_account != tx.from_account
                || existing.to_account != tx.to_account
                || existing.kind != tx.kind
            {
                return Err(Error::LedgerConsistency(format!(
                    "transaction {} is an audit record; amount and parties are immutable",
                    tx.transaction_id
                )));
            }
        }
        self.transactions.insert(tx.transaction_id, tx.clone());
        Ok(())
    }

    fn get_transaction(&self, transaction_id: Uuid) -> Result<Transaction> {
        self.transactions
            .get(&transaction_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| Error::TransactionNotFound(transaction_id.to_string()))
    }

    fn group_transactions(&self, group: &GroupId) -> Result<Vec<Transaction>> {
        let mut txs: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|entry| entry.value().related_group.as_ref() == Some(group))
            .map(|entry| entry.value().clone())
            .collect();
        txs.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.transaction_id.cmp(&b.transaction_id))
        });
        Ok(txs)
    }

    fn account_transactions(&self, account: &AccountId) -> Result<Vec<Transaction>> {
        let mut txs: Vec<Transaction> = self
            .transactions
            .iter()
            .filter(|entry| {
                let tx = entry.value();
                &tx.from_account == account || &tx.to_account == account
            })
            .map(|entry| entry.value().clone())
            .collect();
        txs.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.transaction_id.cmp(&b.transaction_id))
        });
        Ok(txs)
    }
}
