//! Error types for the ledger

use thiserror::Error;

/// Result type for ledger operations
pub type Result<T> = std::result::Result<T, Error>;

/// Ledger errors
#[derive(Error, Debug)]
pub enum Error {
    /// Split policy and amounts do not reconcile
    #[error("Invalid split: {0}")]
    InvalidSplit(String),

    /// Debit would take a non-overdraft account negative
    #[error("Insufficient funds on {account}: requested {requested}, available {available}")]
    InsufficientFunds {
        /// Account that would go negative
        account: String,
        /// Requested debit in minor units
        requested: i64,
        /// Available balance in minor units
        available: i64,
    },

    /// Attempted mutation of a closed expense or settled share
    #[error("Already settled: {0}")]
    AlreadySettled(String),

    /// Illegal state transition attempted
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Retry attempted after exhausting the retry budget
    #[error("Retry limit exceeded for transaction {transaction}: {max_retries} retries used")]
    RetryLimitExceeded {
        /// Transaction that exhausted its retries
        transaction: uuid::Uuid,
        /// Configured retry bound
        max_retries: u32,
    },

    /// Balance drift detected during reconciliation
    #[error("Ledger consistency violation: {0}")]
    LedgerConsistency(String),

    /// Concurrent modification detected (retryable)
    #[error("Concurrent modification: {0}")]
    Conflict(String),

    /// Arithmetic across two currencies
    #[error("Currency mismatch: expected {expected}, got {actual}")]
    CurrencyMismatch {
        /// Currency the operation expected
        expected: &'static str,
        /// Currency actually supplied
        actual: &'static str,
    },

    /// Minor-unit arithmetic overflowed i64
    #[error("Amount overflow in minor-unit arithmetic")]
    AmountOverflow,

    /// Identity resolution failed
    #[error("Unknown user: {0}")]
    UnknownUser(String),

    /// Group membership check failed
    #[error("Not an active group member: {0}")]
    NotAGroupMember(String),

    /// Expense not found
    #[error("Expense not found: {0}")]
    ExpenseNotFound(String),

    /// Transaction not found
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Account not found
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Stable machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            Error::InvalidSplit(_) => "invalid_split",
            Error::InsufficientFunds { .. } => "insufficient_funds",
            Error::AlreadySettled(_) => "already_settled",
            Error::InvalidState(_) => "invalid_state",
            Error::RetryLimitExceeded { .. } => "retry_limit_exceeded",
            Error::LedgerConsistency(_) => "ledger_consistency",
            Error::Conflict(_) => "conflict",
            Error::CurrencyMismatch { .. } => "currency_mismatch",
            Error::AmountOverflow => "amount_overflow",
            Error::UnknownUser(_) => "unknown_user",
            Error::NotAGroupMember(_) => "not_a_group_member",
            Error::ExpenseNotFound(_) => "expense_not_found",
            Error::TransactionNotFound(_) => "transaction_not_found",
            Error::AccountNotFound(_) => "account_not_found",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
            Error::Other(_) => "other",
        }
    }

    /// Whether an automatic retry may succeed.
    ///
    /// Only concurrent-modification conflicts are transient; validation
    /// failures (insufficient funds, invalid recipient) are terminal and
    /// surfaced to the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }
}

impl From<String> for Error {
    fn from(msg: String) -> Self {
        Error::Other(msg)
    }
}

impl From<&str> for Error {
    fn from(msg: &str) -> Self {
        Error::Other(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_are_stable() {
        assert_eq!(Error::InvalidSplit("x".into()).kind(), "invalid_split");
        assert_eq!(
            Error::InsufficientFunds {
                account: "a".into(),
                requested: 100,
                available: 50,
            }
            .kind(),
            "insufficient_funds"
        );
        assert_eq!(Error::AmountOverflow.kind(), "amount_overflow");
    }

    #[test]
    fn test_only_conflicts_are_retryable() {
        assert!(Error::Conflict("version changed".into()).is_retryable());
        assert!(!Error::InsufficientFunds {
            account: "a".into(),
            requested: 100,
            available: 50,
        }
        .is_retryable());
        assert!(!Error::InvalidState("done".into()).is_retryable());
    }
}
