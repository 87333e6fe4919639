//! Types for settlement planning and execution

use chrono::{DateTime, Utc};
use divvy_ledger::{GroupId, MemberBalance, Money, Transaction, UserId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One member's net position going into netting.
///
/// Positive means the member is owed money (creditor); negative means
/// they owe (debtor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetPosition {
    /// Member
    pub user: UserId,

    /// Net balance (paid minus owed)
    pub net: Money,
}

impl From<&MemberBalance> for NetPosition {
    fn from(balance: &MemberBalance) -> Self {
        Self {
            user: balance.user.clone(),
            net: balance.net_balance,
        }
    }
}

/// One suggested transfer in a clearing set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementTransfer {
    /// Debtor paying
    pub from: UserId,

    /// Creditor receiving
    pub to: UserId,

    /// Amount to move
    pub amount: Money,
}

/// A computed clearing plan for a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementPlan {
    /// Group the plan clears
    pub group: GroupId,

    /// Transfers that drive every net to zero, in optimizer order
    /// (application order carries no semantic weight)
    pub transfers: Vec<SettlementTransfer>,

    /// Total debt the plan clears (sum of debtor magnitudes)
    pub total_debt: Money,

    /// Members with a non-zero position
    pub open_positions: usize,

    /// When the plan was computed
    pub generated_at: DateTime<Utc>,
}

impl SettlementPlan {
    /// True when nothing is owed
    pub fn is_settled(&self) -> bool {
        self.transfers.is_empty()
    }
}

/// Outcome of executing a settlement plan
#[derive(Debug)]
pub struct SettlementRun {
    /// Run ID
    pub run_id: Uuid,

    /// Group that was settled
    pub group: GroupId,

    /// Completed settlement transactions
    pub completed: Vec<Transaction>,

    /// Transfers that failed, with the reason for each
    pub failed: Vec<FailedSettlement>,
}

impl SettlementRun {
    /// True when every planned transfer completed
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// One planned transfer that could not be executed
#[derive(Debug)]
pub struct FailedSettlement {
    /// Planned transfer
    pub transfer: SettlementTransfer,

    /// Stable error kind
    pub error_kind: &'static str,

    /// Human-readable reason
    pub message: String,
}
