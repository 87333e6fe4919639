//! Core types for the shared-expense ledger
//!
//! All types are designed for:
//! - Exact arithmetic (integer minor-unit money)
//! - Serde serialization (API bindings, audit export)
//! - Append-only auditing (transactions are never destroyed)

use crate::money::{Currency, Money};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// User identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create new user ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Group identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupId(String);

impl GroupId {
    /// Create new group ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Balance account identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountId(String);

impl AccountId {
    /// Create new account ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Wallet account for a user
    pub fn wallet(user: &UserId) -> Self {
        Self(format!("wallet:{}", user.as_str()))
    }

    /// The user behind a wallet account, if this is one
    pub fn wallet_user(&self) -> Option<UserId> {
        self.0.strip_prefix("wallet:").map(UserId::new)
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rule for dividing an expense among participants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SplitPolicy {
    /// Divide evenly, remainder to the first participants in input order
    Equal,
    /// Divide by percentage of the total (must sum to exactly 100)
    Percentage,
    /// Divide by relative weight
    Shares,
    /// Caller supplies the exact per-participant amounts
    Custom,
}

/// Per-participant split input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ShareBasis {
    /// No input needed (equal split)
    Equal,
    /// Percentage of the total, exact decimal
    Percentage(Decimal),
    /// Relative weight (zero is rejected; negative is unrepresentable)
    Weight(u64),
    /// Fixed amount supplied by the caller
    Fixed(Money),
}

/// A participant and their split input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShareSpec {
    /// Participant user
    pub participant: UserId,

    /// Split input for this participant
    pub basis: ShareBasis,
}

impl ShareSpec {
    /// Equal-split participant
    pub fn equal(participant: impl Into<String>) -> Self {
        Self {
            participant: UserId::new(participant),
            basis: ShareBasis::Equal,
        }
    }

    /// Percentage participant
    pub fn percentage(participant: impl Into<String>, percent: Decimal) -> Self {
        Self {
            participant: UserId::new(participant),
            basis: ShareBasis::Percentage(percent),
        }
    }

    /// Weighted participant
    pub fn weight(participant: impl Into<String>, weight: u64) -> Self {
        Self {
            participant: UserId::new(participant),
            basis: ShareBasis::Weight(weight),
        }
    }

    /// Fixed-amount participant
    pub fn fixed(participant: impl Into<String>, amount: Money) -> Self {
        Self {
            participant: UserId::new(participant),
            basis: ShareBasis::Fixed(amount),
        }
    }
}

/// One participant's computed share of an expense
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantShare {
    /// Participant user
    pub participant: UserId,

    /// Original split input, kept so the split can be recomputed when
    /// the expense total changes
    pub basis: ShareBasis,

    /// Computed owed amount, fixed at expense create/update time
    pub amount: Money,

    /// Derived display percentage of the total (2 decimal places)
    pub percent_of_total: Decimal,

    /// Amount settled so far (partial settlements accumulate)
    pub settled_amount: Money,

    /// True once the full computed amount has been settled
    pub settled: bool,

    /// When the share became fully settled
    pub settled_at: Option<DateTime<Utc>>,
}

impl ParticipantShare {
    /// Amount still outstanding on this share
    pub fn outstanding(&self) -> Result<Money> {
        self.amount.checked_sub(self.settled_amount)
    }
}

/// A recorded shared expense
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    /// Unique expense ID
    pub expense_id: Uuid,

    /// User who paid the total up front
    pub payer: UserId,

    /// Total amount paid
    pub total: Money,

    /// Split policy used to compute the shares
    pub policy: SplitPolicy,

    /// Per-participant shares; their amounts sum to `total` exactly
    pub participants: Vec<ParticipantShare>,

    /// Group this expense belongs to, if any
    pub group: Option<GroupId>,

    /// Free-form description
    pub description: String,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Expense {
    /// True once every share is fully settled
    pub fn is_settled(&self) -> bool {
        self.participants.iter().all(|p| p.settled)
    }

    /// True once any share other than the payer's has settled a
    /// non-zero amount. The payer's own share is settled at creation
    /// (they covered it by paying) and does not count as money moved.
    pub fn has_any_settlement(&self) -> bool {
        self.participants
            .iter()
            .any(|p| p.participant != self.payer && !p.settled_amount.is_zero())
    }

    /// Look up a participant's share
    pub fn share_of(&self, user: &UserId) -> Option<&ParticipantShare> {
        self.participants.iter().find(|p| &p.participant == user)
    }

    /// Verify the exact-sum invariant: Σ share amounts == total
    pub fn verify(&self) -> Result<()> {
        let mut sum = Money::zero(self.total.currency());
        for share in &self.participants {
            sum = sum.checked_add(share.amount)?;
        }
        if sum != self.total {
            return Err(Error::LedgerConsistency(format!(
                "expense {}: shares sum to {} but total is {}",
                self.expense_id, sum, self.total
            )));
        }
        Ok(())
    }
}

/// Type of money movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionKind {
    /// Direct peer-to-peer transfer
    Transfer,
    /// Immediate charge of an expense share
    ExpenseCharge,
    /// Settlement of an outstanding owed amount
    Settlement,
    /// Reversal of a completed transaction
    Refund,
}

/// Transaction lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Created, not yet picked up
    Pending,
    /// Balance application in progress
    Processing,
    /// Deltas applied to both accounts (terminal)
    Completed,
    /// Application failed; retryable while the budget lasts
    Failed,
    /// Explicitly cancelled before completion (terminal)
    Cancelled,
}

impl TransactionStatus {
    /// Whether a transition from `self` to `to` is permitted.
    ///
    /// No transition leaves Completed or Cancelled.
    pub fn can_transition(self, to: TransactionStatus) -> bool {
        use TransactionStatus::*;
        matches!(
            (self, to),
            (Pending, Processing)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Failed, Processing)
                | (Pending, Cancelled)
                | (Processing, Cancelled)
        )
    }

    /// True for states no transition leaves
    pub fn is_terminal(self) -> bool {
        matches!(self, TransactionStatus::Completed | TransactionStatus::Cancelled)
    }

    /// Status name for error messages and metrics labels
    pub fn as_str(self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Processing => "processing",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
            TransactionStatus::Cancelled => "cancelled",
        }
    }
}

/// A single money-movement attempt
///
/// Amount and parties are immutable after creation; only status and
/// retry bookkeeping change. Transactions are never deleted;
/// cancellation is a status transition, not a removal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction ID (UUIDv7 for time-ordering)
    pub transaction_id: Uuid,

    /// Movement type
    pub kind: TransactionKind,

    /// Amount to move
    pub amount: Money,

    /// Debit side
    pub from_account: AccountId,

    /// Credit side
    pub to_account: AccountId,

    /// Debit balance at the instant of application
    pub from_balance_before: Option<Money>,

    /// Debit balance after application
    pub from_balance_after: Option<Money>,

    /// Credit balance at the instant of application
    pub to_balance_before: Option<Money>,

    /// Credit balance after application
    pub to_balance_after: Option<Money>,

    /// Current lifecycle status
    pub status: TransactionStatus,

    /// Failed attempts so far
    pub retry_count: u32,

    /// Retry budget
    pub max_retries: u32,

    /// Reason for the most recent failure
    pub failure_reason: Option<String>,

    /// Expense this movement settles or charges, if any
    pub related_expense: Option<Uuid>,

    /// Group this movement belongs to, if any
    pub related_group: Option<GroupId>,

    /// Free-form description
    pub description: String,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// When the deltas were applied
    pub processed_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Create a new pending transaction
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        kind: TransactionKind,
        amount: Money,
        from_account: AccountId,
        to_account: AccountId,
        max_retries: u32,
        description: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            transaction_id: Uuid::now_v7(),
            kind,
            amount,
            from_account,
            to_account,
            from_balance_before: None,
            from_balance_after: None,
            to_balance_before: None,
            to_balance_after: None,
            status: TransactionStatus::Pending,
            retry_count: 0,
            max_retries,
            failure_reason: None,
            related_expense: None,
            related_group: None,
            description: description.into(),
            created_at,
            processed_at: None,
        }
    }

    /// Guarded status transition
    pub fn transition(&mut self, to: TransactionStatus) -> Result<()> {
        if !self.status.can_transition(to) {
            return Err(Error::InvalidState(format!(
                "transaction {}: {} -> {} is not permitted",
                self.transaction_id,
                self.status.as_str(),
                to.as_str()
            )));
        }
        self.status = to;
        Ok(())
    }

    /// Whether another retry attempt is within budget
    pub fn can_retry(&self) -> bool {
        self.status == TransactionStatus::Failed && self.retry_count < self.max_retries
    }

    /// Record a failed attempt
    pub fn record_failure(&mut self, reason: &Error) -> Result<()> {
        self.transition(TransactionStatus::Failed)?;
        self.retry_count += 1;
        self.failure_reason = Some(format!("{}: {}", reason.kind(), reason));
        Ok(())
    }
}

/// Per-(group, member) running balance
///
/// Derived, rebuildable projection, never the sole source of truth.
/// Positive net means the member is owed money; negative means they owe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberBalance {
    /// Group
    pub group: GroupId,

    /// Member
    pub user: UserId,

    /// Total this member paid into the group
    pub total_paid: Money,

    /// Total this member owes across group expenses
    pub total_owed: Money,

    /// `total_paid - total_owed`
    pub net_balance: Money,
}

impl MemberBalance {
    /// Fresh zero balance for a member
    pub fn zero(group: GroupId, user: UserId, currency: Currency) -> Self {
        Self {
            group,
            user,
            total_paid: Money::zero(currency),
            total_owed: Money::zero(currency),
            net_balance: Money::zero(currency),
        }
    }

    /// Add to the paid side
    pub fn add_paid(&mut self, amount: Money) -> Result<()> {
        self.total_paid = self.total_paid.checked_add(amount)?;
        self.net_balance = self.total_paid.checked_sub(self.total_owed)?;
        Ok(())
    }

    /// Add to the owed side
    pub fn add_owed(&mut self, amount: Money) -> Result<()> {
        self.total_owed = self.total_owed.checked_add(amount)?;
        self.net_balance = self.total_paid.checked_sub(self.total_owed)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wallet_account_id() {
        let user = UserId::new("alice");
        let account = AccountId::wallet(&user);
        assert_eq!(account.as_str(), "wallet:alice");
        assert_eq!(account.wallet_user(), Some(user));
        assert_eq!(AccountId::new("house").wallet_user(), None);
    }

    #[test]
    fn test_status_transition_table() {
        use TransactionStatus::*;
        assert!(Pending.can_transition(Processing));
        assert!(Processing.can_transition(Completed));
        assert!(Processing.can_transition(Failed));
        assert!(Failed.can_transition(Processing));
        assert!(Pending.can_transition(Cancelled));
        assert!(Processing.can_transition(Cancelled));

        // No transition out of terminal states
        assert!(!Completed.can_transition(Processing));
        assert!(!Completed.can_transition(Cancelled));
        assert!(!Cancelled.can_transition(Processing));
        // Failed may not be cancelled, only retried
        assert!(!Failed.can_transition(Cancelled));
        assert!(!Pending.can_transition(Completed));
    }

    #[test]
    fn test_transaction_transition_guard() {
        let mut tx = Transaction::new(
            TransactionKind::Transfer,
            Money::new(100, Currency::USD),
            AccountId::new("a"),
            AccountId::new("b"),
            3,
            "test",
            Utc::now(),
        );

        tx.transition(TransactionStatus::Processing).unwrap();
        tx.transition(TransactionStatus::Completed).unwrap();

        let err = tx.transition(TransactionStatus::Cancelled).unwrap_err();
        assert_eq!(err.kind(), "invalid_state");
        assert_eq!(tx.status, TransactionStatus::Completed);
    }

    #[test]
    fn test_member_balance_net() {
        let mut balance = MemberBalance::zero(
            GroupId::new("trip"),
            UserId::new("alice"),
            Currency::USD,
        );
        balance.add_paid(Money::new(1000, Currency::USD)).unwrap();
        balance.add_owed(Money::new(400, Currency::USD)).unwrap();
        assert_eq!(balance.net_balance, Money::new(600, Currency::USD));
    }

    #[test]
    fn test_expense_verify_exact_sum() {
        let currency = Currency::USD;
        let share = |user: &str, amount: i64| ParticipantShare {
            participant: UserId::new(user),
            basis: ShareBasis::Equal,
            amount: Money::new(amount, currency),
            percent_of_total: Decimal::ZERO,
            settled_amount: Money::zero(currency),
            settled: false,
            settled_at: None,
        };

        let mut expense = Expense {
            expense_id: Uuid::new_v4(),
            payer: UserId::new("alice"),
            total: Money::new(100, currency),
            policy: SplitPolicy::Equal,
            participants: vec![share("alice", 34), share("bob", 33), share("carol", 33)],
            group: None,
            description: "dinner".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        expense.verify().unwrap();

        expense.participants[0].amount = Money::new(35, currency);
        assert!(expense.verify().is_err());
    }

    #[test]
    fn test_transaction_serde_round_trip() {
        let tx = Transaction::new(
            TransactionKind::Settlement,
            Money::new(250, Currency::EUR),
            AccountId::new("wallet:bob"),
            AccountId::new("wallet:alice"),
            3,
            "dinner settle-up",
            Utc::now(),
        );

        let json = serde_json::to_string(&tx).unwrap();
        let back: Transaction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tx);
    }
}
