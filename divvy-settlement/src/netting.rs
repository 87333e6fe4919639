//! Debt netting algorithm
//!
//! Reduces a group's web of who-owes-whom to a small clearing set of
//! direct transfers.
//!
//! # Algorithm
//!
//! 1. Check the precondition: net positions sum to zero within
//!    tolerance (a violation means the upstream ledger is inconsistent
//!    and is reported, never corrected here)
//! 2. Partition members into creditors and debtors, each sorted
//!    descending by magnitude (ties by user id, for determinism)
//! 3. Two-pointer greedy sweep: match the largest creditor against the
//!    largest debtor, transfer the smaller magnitude, advance whichever
//!    side drops to within tolerance of zero
//!
//! # Example
//!
//! ```text
//! Net positions:
//!   alice: +500   (owed)
//!   bob:   -200   (owes)
//!   carol: -300   (owes)
//!
//! Clearing set:
//!   carol pays alice: 300
//!   bob   pays alice: 200
//! ```
//!
//! The greedy sweep is deterministic, runs in O(n log n), and always
//! produces a valid zero-sum clearing set of at most n-1 transfers. It
//! is an approximation: it does not guarantee the theoretical minimum
//! transfer count for every input.

use crate::types::{NetPosition, SettlementTransfer};
use crate::{Error, Result};
use divvy_ledger::{Money, UserId};

/// Greedy debt netting optimizer
pub struct SettlementOptimizer {
    /// Residue tolerance in minor units
    tolerance: i64,
}

impl Default for SettlementOptimizer {
    fn default() -> Self {
        Self { tolerance: 1 }
    }
}

impl SettlementOptimizer {
    /// Create an optimizer with an explicit tolerance
    pub fn new(tolerance: i64) -> Self {
        Self { tolerance }
    }

    /// Compute a clearing set for the given net positions.
    ///
    /// Applying the returned transfers (in any order) drives every
    /// member's net to within tolerance of zero.
    pub fn optimize(&self, positions: &[NetPosition]) -> Result<Vec<SettlementTransfer>> {
        let Some(first) = positions.first() else {
            return Ok(Vec::new());
        };
        let currency = first.net.currency();
        for position in positions {
            if position.net.currency() != currency {
                return Err(divvy_ledger::Error::CurrencyMismatch {
                    expected: currency.code(),
                    actual: position.net.currency().code(),
                }
                .into());
            }
        }

        let sum: i128 = positions.iter().map(|p| p.net.minor_units() as i128).sum();
        if sum.unsigned_abs() > self.tolerance as u128 {
            return Err(Error::Imbalance(format!(
                "net positions sum to {} minor units, expected 0 within {}",
                sum, self.tolerance
            )));
        }

        let mut creditors: Vec<(UserId, i64)> = positions
            .iter()
            .filter(|p| p.net.minor_units() > self.tolerance)
            .map(|p| (p.user.clone(), p.net.minor_units()))
            .collect();
        let mut debtors: Vec<(UserId, i64)> = positions
            .iter()
            .filter(|p| p.net.minor_units() < -self.tolerance)
            .map(|p| (p.user.clone(), -p.net.minor_units()))
            .collect();

        let by_magnitude_desc =
            |a: &(UserId, i64), b: &(UserId, i64)| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0));
        creditors.sort_by(by_magnitude_desc);
        debtors.sort_by(by_magnitude_desc);

        let mut transfers = Vec::new();
        let (mut i, mut j) = (0, 0);
        while i < creditors.len() && j < debtors.len() {
            let amount = creditors[i].1.min(debtors[j].1);
            if amount > 0 {
                transfers.push(SettlementTransfer {
                    from: debtors[j].0.clone(),
                    to: creditors[i].0.clone(),
                    amount: Money::new(amount, currency),
                });
            }
            creditors[i].1 -= amount;
            debtors[j].1 -= amount;

            if creditors[i].1 <= self.tolerance {
                i += 1;
            }
            if debtors[j].1 <= self.tolerance {
                j += 1;
            }
        }

        tracing::debug!(
            positions = positions.len(),
            transfers = transfers.len(),
            "Clearing set computed"
        );
        Ok(transfers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use divvy_ledger::Currency;

    fn position(user: &str, net: i64) -> NetPosition {
        NetPosition {
            user: UserId::new(user),
            net: Money::new(net, Currency::USD),
        }
    }

    fn apply(positions: &[NetPosition], transfers: &[SettlementTransfer]) -> Vec<i64> {
        positions
            .iter()
            .map(|p| {
                let mut net = p.net.minor_units();
                for t in transfers {
                    if t.from == p.user {
                        net += t.amount.minor_units();
                    }
                    if t.to == p.user {
                        net -= t.amount.minor_units();
                    }
                }
                net
            })
            .collect()
    }

    #[test]
    fn test_one_creditor_two_debtors() {
        let positions = vec![position("alice", 500), position("bob", -200), position("carol", -300)];
        let transfers = SettlementOptimizer::default().optimize(&positions).unwrap();

        assert_eq!(transfers.len(), 2);
        assert_eq!(transfers[0].from, UserId::new("carol"));
        assert_eq!(transfers[0].to, UserId::new("alice"));
        assert_eq!(transfers[0].amount.minor_units(), 300);
        assert_eq!(transfers[1].from, UserId::new("bob"));
        assert_eq!(transfers[1].amount.minor_units(), 200);

        assert!(apply(&positions, &transfers).iter().all(|n| *n == 0));
    }

    #[test]
    fn test_debt_cycle_nets_out() {
        // A owes B 100, B owes C 80, C owes A 50 nets to A:-50 B:+20 C:+30
        let positions = vec![position("a", -50), position("b", 20), position("c", 30)];
        let transfers = SettlementOptimizer::default().optimize(&positions).unwrap();

        assert_eq!(transfers.len(), 2);
        assert!(apply(&positions, &transfers).iter().all(|n| *n == 0));
    }

    #[test]
    fn test_imbalance_reported_not_corrected() {
        let positions = vec![position("a", 500), position("b", -200)];
        let err = SettlementOptimizer::default().optimize(&positions).unwrap_err();
        assert_eq!(err.kind(), "imbalance");
    }

    #[test]
    fn test_residue_within_tolerance_ignored() {
        // Off by one minor unit: inside the default tolerance
        let positions = vec![position("a", 301), position("b", -300)];
        let transfers = SettlementOptimizer::default().optimize(&positions).unwrap();
        assert_eq!(transfers.len(), 1);
        assert_eq!(transfers[0].amount.minor_units(), 300);
    }

    #[test]
    fn test_settled_group_yields_no_transfers() {
        let positions = vec![position("a", 0), position("b", 1), position("c", -1)];
        let transfers = SettlementOptimizer::default().optimize(&positions).unwrap();
        assert!(transfers.is_empty());
    }

    #[test]
    fn test_equal_magnitudes_ordered_by_user_id() {
        let positions = vec![
            position("zoe", 100),
            position("amy", 100),
            position("bob", -100),
            position("cal", -100),
        ];
        let transfers = SettlementOptimizer::default().optimize(&positions).unwrap();

        assert_eq!(transfers.len(), 2);
        // Ties broken by id: amy before zoe, bob before cal
        assert_eq!(transfers[0].to, UserId::new("amy"));
        assert_eq!(transfers[0].from, UserId::new("bob"));
        assert_eq!(transfers[1].to, UserId::new("zoe"));
        assert_eq!(transfers[1].from, UserId::new("cal"));
    }

    #[test]
    fn test_empty_positions() {
        let transfers = SettlementOptimizer::default().optimize(&[]).unwrap();
        assert!(transfers.is_empty());
    }
}
