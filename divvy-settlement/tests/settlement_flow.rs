//! End-to-end settlement flow against a live ledger
//!
//! Covers the full path: expenses recorded, plan computed, plan
//! executed as Settlement transactions, group nets driven to zero,
//! plus the zero-sum property of the optimizer under arbitrary
//! balanced inputs.

use divvy_ledger::{
    Config as LedgerConfig, Currency, GroupId, Ledger, Money, ShareSpec, SplitPolicy, UserId,
};
use divvy_settlement::{
    Config, NetPosition, SettlementEngine, SettlementOptimizer, SettlementTransfer,
};
use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::Arc;

fn usd(minor_units: i64) -> Money {
    Money::new(minor_units, Currency::USD)
}

fn ledger() -> Arc<Ledger> {
    Arc::new(Ledger::open(LedgerConfig::default()).unwrap())
}

fn equal_specs(users: &[&str]) -> Vec<ShareSpec> {
    users.iter().map(|u| ShareSpec::equal(*u)).collect()
}

#[test]
fn plan_then_settle_clears_the_group() {
    let ledger = ledger();
    let engine = SettlementEngine::new(ledger.clone(), Config::default());
    let group = GroupId::new("trip");

    // Alice fronts 1500 for three people: bob and carol owe 500 each
    ledger
        .create_expense(
            UserId::new("alice"),
            usd(1500),
            SplitPolicy::Equal,
            &equal_specs(&["alice", "bob", "carol"]),
            Some(group.clone()),
            "hotel",
        )
        .unwrap();

    let plan = engine.suggest_settlements(&group).unwrap();
    assert_eq!(plan.transfers.len(), 2);
    assert_eq!(plan.total_debt, usd(1000));
    assert!(!plan.is_settled());

    // Planning moved no money
    assert_eq!(ledger.balance_of(&UserId::new("alice")).unwrap(), usd(0));

    ledger.deposit(&UserId::new("bob"), usd(1000)).unwrap();
    ledger.deposit(&UserId::new("carol"), usd(1000)).unwrap();

    let run = engine.settle_group(&group).unwrap();
    assert!(run.is_complete());
    assert_eq!(run.completed.len(), 2);

    for member in ledger.group_balances(&group) {
        assert!(member.net_balance.is_zero());
    }
    assert_eq!(ledger.balance_of(&UserId::new("alice")).unwrap(), usd(1000));

    // The projection still reconciles against the stored records
    ledger.recompute_group_balances(&group).unwrap();

    // A settled group plans to nothing
    let plan = engine.suggest_settlements(&group).unwrap();
    assert!(plan.is_settled());
}

#[test]
fn concrete_scenario_two_transfers() {
    // A:+500, B:-200, C:-300 nets out in exactly two transfers
    let positions = vec![
        NetPosition {
            user: UserId::new("a"),
            net: usd(500),
        },
        NetPosition {
            user: UserId::new("b"),
            net: usd(-200),
        },
        NetPosition {
            user: UserId::new("c"),
            net: usd(-300),
        },
    ];
    let transfers = SettlementOptimizer::default().optimize(&positions).unwrap();
    assert_eq!(transfers.len(), 2);

    let to_a: i64 = transfers
        .iter()
        .filter(|t| t.to == UserId::new("a"))
        .map(|t| t.amount.minor_units())
        .sum();
    assert_eq!(to_a, 500);
}

#[test]
fn broke_debtor_does_not_block_the_rest() {
    let ledger = ledger();
    let engine = SettlementEngine::new(ledger.clone(), Config::default());
    let group = GroupId::new("trip");

    ledger
        .create_expense(
            UserId::new("alice"),
            usd(3000),
            SplitPolicy::Equal,
            &equal_specs(&["alice", "bob", "carol"]),
            Some(group.clone()),
            "dinner",
        )
        .unwrap();

    // Only bob can pay
    ledger.deposit(&UserId::new("bob"), usd(2000)).unwrap();

    let run = engine.settle_group(&group).unwrap();
    assert!(!run.is_complete());
    assert_eq!(run.completed.len(), 1);
    assert_eq!(run.failed.len(), 1);
    assert_eq!(run.failed[0].transfer.from, UserId::new("carol"));
    assert_eq!(run.failed[0].error_kind, "insufficient_funds");

    // Bob's completed settlement stays applied
    assert_eq!(ledger.balance_of(&UserId::new("alice")).unwrap(), usd(1000));
    let balances = ledger.group_balances(&group);
    let bob = balances.iter().find(|m| m.user == UserId::new("bob")).unwrap();
    assert!(bob.net_balance.is_zero());
}

#[test]
fn empty_group_is_an_error() {
    let ledger = ledger();
    let engine = SettlementEngine::new(ledger, Config::default());
    let err = engine.suggest_settlements(&GroupId::new("ghost")).unwrap_err();
    assert_eq!(err.kind(), "empty_group");
}

/// Strategy for balanced position sets: random integers, with a final
/// member absorbing the opposite of their sum
fn balanced_positions_strategy() -> impl Strategy<Value = Vec<NetPosition>> {
    prop::collection::vec(-100_000i64..100_000, 1..20).prop_map(|mut nets| {
        let sum: i64 = nets.iter().sum();
        nets.push(-sum);
        nets.iter()
            .enumerate()
            .map(|(i, net)| NetPosition {
                user: UserId::new(format!("user{:03}", i)),
                net: usd(*net),
            })
            .collect()
    })
}

fn apply_transfers(positions: &[NetPosition], transfers: &[SettlementTransfer]) -> HashMap<UserId, i64> {
    let mut nets: HashMap<UserId, i64> = positions
        .iter()
        .map(|p| (p.user.clone(), p.net.minor_units()))
        .collect();
    for t in transfers {
        *nets.get_mut(&t.from).unwrap() += t.amount.minor_units();
        *nets.get_mut(&t.to).unwrap() -= t.amount.minor_units();
    }
    nets
}

proptest! {
    /// For any exactly balanced input, a zero-tolerance clearing set
    /// drives every member to exactly zero using at most n-1 transfers
    #[test]
    fn prop_clearing_set_is_zero_sum(positions in balanced_positions_strategy()) {
        let transfers = SettlementOptimizer::new(0).optimize(&positions).unwrap();

        prop_assert!(transfers.len() < positions.len().max(1));
        for t in &transfers {
            prop_assert!(t.amount.minor_units() > 0);
        }

        let nets = apply_transfers(&positions, &transfers);
        for (user, net) in nets {
            prop_assert_eq!(net, 0, "{} left with a residue", user);
        }
    }
}
