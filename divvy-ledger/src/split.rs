//! Split calculator
//!
//! Turns (total, policy, participants) into per-participant owed
//! amounts that sum to the total exactly. Naive division loses or
//! gains pennies; this module never does. The remainder left by
//! integer division is handed out one minor unit at a time using the
//! largest-remainder method (ties broken by input order), so
//! `Σ amounts == total` holds for every policy.
//!
//! This is a pure function: it is invoked only at expense create and
//! update time, never from mutation hooks.

use crate::money::Money;
use crate::types::{ParticipantShare, ShareBasis, ShareSpec, SplitPolicy};
use crate::{Error, Result};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::HashSet;

/// Compute per-participant shares for an expense
pub fn compute_split(
    total: Money,
    policy: SplitPolicy,
    specs: &[ShareSpec],
) -> Result<Vec<ParticipantShare>> {
    if specs.is_empty() {
        return Err(Error::InvalidSplit(
            "participant list is empty".to_string(),
        ));
    }

    if !total.is_positive() {
        return Err(Error::InvalidSplit(format!(
            "expense total must be positive, got {}",
            total
        )));
    }

    let mut seen = HashSet::new();
    for spec in specs {
        if !seen.insert(&spec.participant) {
            return Err(Error::InvalidSplit(format!(
                "duplicate participant: {}",
                spec.participant
            )));
        }
    }

    let amounts = match policy {
        SplitPolicy::Equal => split_equal(total, specs)?,
        SplitPolicy::Percentage => split_percentage(total, specs)?,
        SplitPolicy::Shares => split_weighted(total, specs)?,
        SplitPolicy::Custom => split_custom(total, specs)?,
    };

    debug_assert_eq!(
        amounts.iter().sum::<i64>(),
        total.minor_units(),
        "split must reconcile exactly"
    );

    let total_dec = Decimal::from(total.minor_units());
    let shares = specs
        .iter()
        .zip(amounts)
        .map(|(spec, minor_units)| {
            let percent_of_total = match &spec.basis {
                ShareBasis::Percentage(pct) => pct.round_dp(2),
                _ => (Decimal::from(minor_units) * Decimal::from(100) / total_dec).round_dp(2),
            };
            ParticipantShare {
                participant: spec.participant.clone(),
                basis: spec.basis.clone(),
                amount: Money::new(minor_units, total.currency()),
                percent_of_total,
                settled_amount: Money::zero(total.currency()),
                // Nothing to collect on a zero share; it is settled
                // from the start
                settled: minor_units == 0,
                settled_at: None,
            }
        })
        .collect();

    Ok(shares)
}

/// Equal split: `total / n`, remainder one unit each to the first
/// `total % n` participants in input order
fn split_equal(total: Money, specs: &[ShareSpec]) -> Result<Vec<i64>> {
    for spec in specs {
        if spec.basis != ShareBasis::Equal {
            return Err(Error::InvalidSplit(format!(
                "equal split does not take a basis for {}",
                spec.participant
            )));
        }
    }

    let n = specs.len() as i64;
    let base = total.minor_units() / n;
    let remainder = total.minor_units() % n;

    Ok((0..n)
        .map(|i| if i < remainder { base + 1 } else { base })
        .collect())
}

/// Percentage split: `floor(total * pct / 100)` per participant,
/// leftover minor units to the largest fractional remainders
fn split_percentage(total: Money, specs: &[ShareSpec]) -> Result<Vec<i64>> {
    let mut percentages = Vec::with_capacity(specs.len());
    for spec in specs {
        match &spec.basis {
            ShareBasis::Percentage(pct) => {
                if pct.is_sign_negative() {
                    return Err(Error::InvalidSplit(format!(
                        "negative percentage for {}",
                        spec.participant
                    )));
                }
                percentages.push(*pct);
            }
            _ => {
                return Err(Error::InvalidSplit(format!(
                    "percentage split requires a percentage for {}",
                    spec.participant
                )))
            }
        }
    }

    let sum: Decimal = percentages.iter().sum();
    if sum != Decimal::from(100) {
        return Err(Error::InvalidSplit(format!(
            "percentages must sum to exactly 100, got {}",
            sum
        )));
    }

    let total_dec = Decimal::from(total.minor_units());
    let hundred = Decimal::from(100);

    let mut bases = Vec::with_capacity(percentages.len());
    let mut fractions = Vec::with_capacity(percentages.len());
    for pct in &percentages {
        let raw = total_dec * pct / hundred;
        let base = raw.floor();
        bases.push(base.to_i64().ok_or(Error::AmountOverflow)?);
        fractions.push(raw - base);
    }

    distribute_remainder(total.minor_units(), bases, &fractions)
}

/// Weighted split: `floor(total * weight / total_weight)`, leftover by
/// largest remainder
fn split_weighted(total: Money, specs: &[ShareSpec]) -> Result<Vec<i64>> {
    let mut weights = Vec::with_capacity(specs.len());
    for spec in specs {
        match spec.basis {
            ShareBasis::Weight(w) => {
                if w == 0 {
                    return Err(Error::InvalidSplit(format!(
                        "zero weight for {}",
                        spec.participant
                    )));
                }
                weights.push(w as i128);
            }
            _ => {
                return Err(Error::InvalidSplit(format!(
                    "weighted split requires a weight for {}",
                    spec.participant
                )))
            }
        }
    }

    let total_weight: i128 = weights.iter().sum();
    let total_units = total.minor_units() as i128;

    let mut bases = Vec::with_capacity(weights.len());
    let mut remainders = Vec::with_capacity(weights.len());
    for w in &weights {
        let product = total_units * w;
        bases.push(i64::try_from(product / total_weight).map_err(|_| Error::AmountOverflow)?);
        // Remainders share the divisor, so they compare directly
        remainders.push(Decimal::from(i64::try_from(product % total_weight)
            .map_err(|_| Error::AmountOverflow)?));
    }

    distribute_remainder(total.minor_units(), bases, &remainders)
}

/// Custom split: amounts supplied directly, validated to sum exactly
fn split_custom(total: Money, specs: &[ShareSpec]) -> Result<Vec<i64>> {
    let mut amounts = Vec::with_capacity(specs.len());
    let mut sum = Money::zero(total.currency());
    for spec in specs {
        match spec.basis {
            ShareBasis::Fixed(amount) => {
                if amount.is_negative() {
                    return Err(Error::InvalidSplit(format!(
                        "negative amount for {}",
                        spec.participant
                    )));
                }
                sum = sum.checked_add(amount)?;
                amounts.push(amount.minor_units());
            }
            _ => {
                return Err(Error::InvalidSplit(format!(
                    "custom split requires a fixed amount for {}",
                    spec.participant
                )))
            }
        }
    }

    if sum != total {
        return Err(Error::InvalidSplit(format!(
            "custom amounts sum to {} but total is {}",
            sum, total
        )));
    }

    Ok(amounts)
}

/// Largest-remainder allocation: assign `total - Σ base` leftover minor
/// units one at a time to the largest fractional remainders, ties
/// broken by input order
fn distribute_remainder(
    total_units: i64,
    mut bases: Vec<i64>,
    fractions: &[Decimal],
) -> Result<Vec<i64>> {
    let assigned: i64 = bases.iter().sum();
    let leftover = total_units - assigned;
    debug_assert!(leftover >= 0 && leftover <= bases.len() as i64);

    let mut order: Vec<usize> = (0..bases.len()).collect();
    // Stable sort keeps input order for equal remainders
    order.sort_by(|&a, &b| fractions[b].cmp(&fractions[a]));

    for &idx in order.iter().take(leftover as usize) {
        bases[idx] += 1;
    }

    Ok(bases)
}
