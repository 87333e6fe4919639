//! Error types for the settlement engine

use thiserror::Error;

/// Result type for settlement operations
pub type Result<T> = std::result::Result<T, Error>;

/// Settlement errors
#[derive(Error, Debug)]
pub enum Error {
    /// Ledger error
    #[error("Ledger error: {0}")]
    Ledger(#[from] divvy_ledger::Error),

    /// Net positions do not sum to zero within tolerance; the upstream
    /// ledger is inconsistent and the imbalance is reported, never
    /// corrected here
    #[error("Imbalanced positions: {0}")]
    Imbalance(String),

    /// Group has no members with balances
    #[error("Empty group: {0}")]
    EmptyGroup(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
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
            Error::Ledger(e) => e.kind(),
            Error::Imbalance(_) => "imbalance",
            Error::EmptyGroup(_) => "empty_group",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
            Error::Other(_) => "other",
        }
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
    fn test_ledger_errors_keep_their_kind() {
        let err: Error = divvy_ledger::Error::AmountOverflow.into();
        assert_eq!(err.kind(), "amount_overflow");
        assert_eq!(Error::Imbalance("off by 3".into()).kind(), "imbalance");
    }
}
