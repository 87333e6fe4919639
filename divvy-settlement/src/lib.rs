//! Divvy Settlement Engine
//!
//! Debt netting and group settle-up on top of the divvy ledger.
//!
//! # Architecture
//!
//! 1. **Positions**: Read each member's net balance from the ledger's
//!    group projection
//! 2. **Netting**: Reduce the debt web to a small clearing set with a
//!    deterministic greedy sweep
//! 3. **Execution**: Record one Settlement transaction per transfer,
//!    continuing past individual failures and reporting each one
//!
//! # Example
//!
//! ```
//! use divvy_settlement::{Config, SettlementEngine};
//! use divvy_ledger::{GroupId, Ledger};
//! use std::sync::Arc;
//!
//! fn main() -> divvy_settlement::Result<()> {
//!     let ledger = Arc::new(Ledger::open(divvy_ledger::Config::default())?);
//!     let engine = SettlementEngine::new(ledger, Config::default());
//!
//!     // ... record expenses through the ledger ...
//!
//!     let group = GroupId::new("trip");
//!     match engine.suggest_settlements(&group) {
//!         Ok(plan) => println!("{} transfers clear the group", plan.transfers.len()),
//!         Err(e) => println!("nothing to plan: {}", e),
//!     }
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod config;
pub mod engine;
pub mod error;
pub mod netting;
pub mod types;

// Re-exports
pub use config::Config;
pub use engine::SettlementEngine;
pub use error::{Error, Result};
pub use netting::SettlementOptimizer;
pub use types::{
    FailedSettlement, NetPosition, SettlementPlan, SettlementRun, SettlementTransfer,
};
