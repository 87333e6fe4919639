//! Divvy Ledger Core
//!
//! Shared-expense ledger: who paid what, who owes whom, and how debts
//! get settled.
//!
//! # Architecture
//!
//! - **Integer money**: All balances are integer minor units; splits
//!   reconcile to the original total exactly, no penny lost or gained
//! - **Per-account locking**: Two concurrent deltas on one account are
//!   strictly serialized; disjoint accounts proceed in parallel
//! - **Append-only audit**: Transactions are never deleted; amounts and
//!   parties are immutable after creation
//! - **Rebuildable projections**: Group balances are derived state,
//!   always reconstructible from the expense and transaction log

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod balance;
pub mod config;
pub mod directory;
pub mod error;
pub mod group;
pub mod ledger;
pub mod metrics;
pub mod money;
pub mod split;
pub mod store;
pub mod transaction;
pub mod types;

// Re-exports
pub use balance::{Account, BalanceLedger};
pub use config::Config;
pub use directory::{Clock, Directory, OpenDirectory, SystemClock};
pub use error::{Error, Result};
pub use ledger::{ChargeReport, FailedCharge, Ledger};
pub use money::{Currency, Money};
pub use split::compute_split;
pub use store::{MemoryStore, Store};
pub use types::{
    AccountId, Expense, GroupId, MemberBalance, ParticipantShare, ShareBasis, ShareSpec,
    SplitPolicy, Transaction, TransactionKind, TransactionStatus, UserId,
};
