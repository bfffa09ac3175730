//! Pool-implied probabilities, decimal odds, and payout projections.
//!
//! All figures derive from the two pool totals alone. There is no
//! overround: fees are taken at settlement, never embedded in the odds,
//! so `probability × odds = 1` holds exactly on each priced side.

use rust_decimal::Decimal;
use tracing::debug;

use crate::types::{EmptyPool, Pool, Side, StakeProposal};

// ---------------------------------------------------------------------------
// Result shapes
// ---------------------------------------------------------------------------

/// The market's crowd-sourced probability estimate for each side.
///
/// `no` is always the exact complement of `yes`, never an independently
/// computed ratio, so the pair sums to one with no rounding drift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImpliedProbability {
    pub yes: Decimal,
    pub no: Decimal,
}

/// Return-per-unit-staked multipliers for each side.
///
/// `None` means that side holds no stake yet: the multiplier would be
/// infinite, and `Decimal` has no infinity, so "no payout multiplier
/// yet" is modelled as absence. With a non-empty pool at least one side
/// is always priced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolOdds {
    pub yes: Option<Decimal>,
    pub no: Option<Decimal>,
}

impl PoolOdds {
    /// The multiplier for the given side, if that side is priced.
    pub fn for_side(&self, side: Side) -> Option<Decimal> {
        match side {
            Side::Yes => self.yes,
            Side::No => self.no,
        }
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Implied probabilities from a pool snapshot.
///
/// `p_yes = pool.yes / total`, `p_no = 1 - p_yes`.
pub fn implied_probability(pool: &Pool) -> Result<ImpliedProbability, EmptyPool> {
    if pool.is_empty() {
        return Err(EmptyPool);
    }

    let yes = pool.yes / pool.total();
    Ok(ImpliedProbability {
        yes,
        no: Decimal::ONE - yes,
    })
}

/// Decimal odds from a pool snapshot: `total / side_pool` per side.
pub fn decimal_odds(pool: &Pool) -> Result<PoolOdds, EmptyPool> {
    if pool.is_empty() {
        return Err(EmptyPool);
    }

    let total = pool.total();
    let price = |staked: Decimal| {
        if staked.is_zero() {
            None
        } else {
            Some(total / staked)
        }
    };

    Ok(PoolOdds {
        yes: price(pool.yes),
        no: price(pool.no),
    })
}

/// Gross payout for a hypothetical stake, at the **pre-trade** odds
/// snapshot — the multiplier displayed to the user, not adjusted for
/// the stake's own dilution of the pool.
///
/// Fails with `EmptyPool` when the market or the chosen side holds no
/// stake: both are the same division-by-zero family.
pub fn projected_payout(pool: &Pool, proposal: &StakeProposal) -> Result<Decimal, EmptyPool> {
    let odds = decimal_odds(pool)?;
    let multiplier = odds.for_side(proposal.side).ok_or(EmptyPool)?;
    let payout = proposal.amount * multiplier;

    debug!(
        side = %proposal.side,
        amount = %proposal.amount,
        multiplier = %multiplier.round_dp(4),
        payout = %payout.round_dp(2),
        "Projected payout (pre-trade)"
    );

    Ok(payout)
}

/// Gross payout for a hypothetical stake after it joins the pool.
///
/// The conservative figure: the stake dilutes its own side, so this is
/// always at or below [`projected_payout`] and is defined even on an
/// empty market (a lone stake gets its money back, multiplier 1).
/// Assumes a positive amount, which bounds validation guarantees.
pub fn projected_payout_diluted(pool: &Pool, proposal: &StakeProposal) -> Decimal {
    let joined = pool.with_stake(proposal.side, proposal.amount);
    proposal.amount * joined.total() / joined.side(proposal.side)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
