//! Settlement engine
//!
//! Plans and executes group settle-ups against the ledger. Planning is
//! read-only; execution records one Settlement transaction per planned
//! transfer, continuing past individual failures so one broke debtor
//! cannot block the rest of the group from clearing.

use crate::config::Config;
use crate::netting::SettlementOptimizer;
use crate::types::{FailedSettlement, NetPosition, SettlementPlan, SettlementRun};
use crate::{Error, Result};
use divvy_ledger::{GroupId, Ledger, Money};
use std::sync::Arc;
use uuid::Uuid;

/// Group settlement engine
pub struct SettlementEngine {
    /// Ledger to plan against and execute through
    ledger: Arc<Ledger>,

    /// Netting optimizer
    optimizer: SettlementOptimizer,

    /// Configuration
    config: Config,
}

impl SettlementEngine {
    /// Create an engine over a ledger
    pub fn new(ledger: Arc<Ledger>, config: Config) -> Self {
        let optimizer = SettlementOptimizer::new(config.tolerance_minor_units);
        Self {
            ledger,
            optimizer,
            config,
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Compute a clearing plan for a group without moving any money
    pub fn suggest_settlements(&self, group: &GroupId) -> Result<SettlementPlan> {
        let balances = self.ledger.group_balances(group);
        if balances.is_empty() {
            return Err(Error::EmptyGroup(group.to_string()));
        }

        let positions: Vec<NetPosition> = balances.iter().map(NetPosition::from).collect();
        let transfers = self.optimizer.optimize(&positions)?;

        let currency = self.ledger.currency();
        let mut total_debt = Money::zero(currency);
        for position in &positions {
            if position.net.is_negative() {
                total_debt = total_debt.checked_add(position.net.abs())?;
            }
        }
        let open_positions = positions.iter().filter(|p| !p.net.is_zero()).count();

        tracing::info!(
            group = %group,
            transfers = transfers.len(),
            total_debt = %total_debt,
            "Settlement plan computed"
        );
        Ok(SettlementPlan {
            group: group.clone(),
            transfers,
            total_debt,
            open_positions,
            generated_at: chrono::Utc::now(),
        })
    }

    /// Execute a group's clearing plan.
    ///
    /// Each transfer is recorded as its own Settlement transaction;
    /// failures are reported per transfer and do not stop the run.
    /// Completed transfers stay applied either way.
    pub fn settle_group(&self, group: &GroupId) -> Result<SettlementRun> {
        let plan = self.suggest_settlements(group)?;

        let mut run = SettlementRun {
            run_id: Uuid::now_v7(),
            group: group.clone(),
            completed: Vec::new(),
            failed: Vec::new(),
        };

        for transfer in plan.transfers {
            match self
                .ledger
                .settle_debt(group, &transfer.from, &transfer.to, transfer.amount)
            {
                Ok(tx) => run.completed.push(tx),
                Err(e) => {
                    tracing::warn!(
                        group = %group,
                        from = %transfer.from,
                        to = %transfer.to,
                        amount = %transfer.amount,
                        error = %e,
                        "Settlement transfer failed, continuing"
                    );
                    run.failed.push(FailedSettlement {
                        transfer,
                        error_kind: e.kind(),
                        message: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            run = %run.run_id,
            group = %group,
            completed = run.completed.len(),
            failed = run.failed.len(),
            "Settlement run finished"
        );
        Ok(run)
    }
}
