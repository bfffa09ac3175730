//! Market settlement: platform fee, pro-rata winner distribution, and
//! void refunds.
//!
//! Payouts are allocated in minor currency units (cents) with a
//! largest-remainder pass, so the distributed total equals the net pool
//! to the cent no matter how many participants share it.

use std::collections::HashMap;

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use tracing::info;
use uuid::Uuid;

use crate::types::{Outcome, Pool, SettlementResult, Stake};

/// Fixed platform cut of the gross pool, taken at settlement.
/// Never embedded in displayed odds.
pub const PLATFORM_FEE_RATE: Decimal = dec!(0.10);

const CENTS: Decimal = dec!(100);

// ---------------------------------------------------------------------------
// Settlement
// ---------------------------------------------------------------------------

/// Reconstruct pool totals from a stake list.
pub fn pool_from_stakes(stakes: &[Stake]) -> Pool {
    stakes.iter().fold(Pool::new(Decimal::ZERO, Decimal::ZERO), |pool, s| {
        pool.with_stake(s.side, s.amount)
    })
}

/// Resolve a market: compute the fee and every participant's payout.
///
/// - `Voided` (or a winning side that nobody backed): every participant
///   is refunded their exact stake and the fee is waived.
/// - Otherwise the fee is `round₂(gross × fee_rate)`, and the remaining
///   net pool is split across winning-side participants pro rata to
///   their stake. Losers appear in the payout map with an explicit
///   zero.
///
/// A participant holding several stakes is paid on their aggregate.
/// An empty stake list settles to an all-zero result.
pub fn settle(stakes: &[Stake], outcome: Outcome, fee_rate: Decimal) -> SettlementResult {
    let pool = pool_from_stakes(stakes);
    let gross = pool.total();

    if stakes.is_empty() {
        return SettlementResult {
            outcome,
            fee_rate,
            gross_pool: Decimal::ZERO,
            fee_amount: Decimal::ZERO,
            net_pool: Decimal::ZERO,
            payouts: HashMap::new(),
        };
    }

    // Void, or a resolved market nobody backed on the winning side:
    // full fee-free refunds.
    let backed_winner = outcome
        .winning_side()
        .filter(|side| !pool.side(*side).is_zero());
    let Some(winning_side) = backed_winner else {
        let mut payouts: HashMap<Uuid, Decimal> = HashMap::new();
        for stake in stakes {
            *payouts.entry(stake.participant).or_insert(Decimal::ZERO) += stake.amount;
        }
        info!(
            outcome = %outcome,
            gross = %gross,
            participants = payouts.len(),
            "Market refunded in full"
        );
        return SettlementResult {
            outcome,
            fee_rate,
            gross_pool: gross,
            fee_amount: Decimal::ZERO,
            net_pool: gross,
            payouts,
        };
    };

    let winning_pool = pool.side(winning_side);
    let fee_amount =
        (gross * fee_rate).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let net_pool = gross - fee_amount;

    // Aggregate winning stakes per participant; everyone else gets an
    // explicit zero so the result is a complete ledger instruction set.
    let mut winning_totals: HashMap<Uuid, Decimal> = HashMap::new();
    let mut payouts: HashMap<Uuid, Decimal> = HashMap::new();
    for stake in stakes {
        payouts.entry(stake.participant).or_insert(Decimal::ZERO);
        if stake.side == winning_side {
            *winning_totals.entry(stake.participant).or_insert(Decimal::ZERO) += stake.amount;
        }
    }

    for (participant, amount) in allocate(net_pool, &winning_totals, winning_pool) {
        payouts.insert(participant, amount);
    }

    let result = SettlementResult {
        outcome,
        fee_rate,
        gross_pool: gross,
        fee_amount,
        net_pool,
        payouts,
    };

    info!(
        outcome = %outcome,
        gross = %result.gross_pool,
        fee = %result.fee_amount,
        net = %result.net_pool,
        winners = winning_totals.len(),
        participants = result.payouts.len(),
        "Market settled"
    );

    result
}

/// Split `net_pool` across winners pro rata to their share of
/// `winning_pool`, exactly, in cents.
///
/// Each winner first receives their share floored to the cent; the
/// leftover cents go one each to the largest fractional remainders
/// (ties broken by larger stake, then participant id, so the result is
/// deterministic).
fn allocate(
    net_pool: Decimal,
    winning_totals: &HashMap<Uuid, Decimal>,
    winning_pool: Decimal,
) -> Vec<(Uuid, Decimal)> {
    struct Share {
        participant: Uuid,
        staked: Decimal,
        cents: Decimal,
        remainder: Decimal,
    }

    let mut shares: Vec<Share> = winning_totals
        .iter()
        .map(|(&participant, &staked)| {
            let exact_cents = net_pool * CENTS * staked / winning_pool;
            let cents = exact_cents.floor();
            Share {
                participant,
                staked,
                cents,
                remainder: exact_cents - cents,
            }
        })
        .collect();

    let floored: Decimal = shares.iter().map(|s| s.cents).sum();
    let mut leftover = net_pool * CENTS - floored;

    shares.sort_by(|a, b| {
        b.remainder
            .cmp(&a.remainder)
            .then(b.staked.cmp(&a.staked))
            .then(a.participant.cmp(&b.participant))
    });

    for share in shares.iter_mut() {
        if leftover <= Decimal::ZERO {
            break;
        }
        share.cents += Decimal::ONE;
        leftover -= Decimal::ONE;
    }

    shares
        .into_iter()
        .map(|s| (s.participant, s.cents / CENTS))
        .collect()
}

/// A single participant's settled payout, computed from pool totals
/// alone — the per-winner formula without the full stake list.
///
/// Used when this service only knows its own stakes: the pool snapshot
/// already contains them, so the share is
/// `(stake / winning_pool) × net`. Rounded down to the cent, which can
/// sit one cent under the largest-remainder figure the ledger pays.
pub fn winner_payout(pool: &Pool, outcome: Outcome, stake: &Stake, fee_rate: Decimal) -> Decimal {
    let Some(winning_side) = outcome.winning_side() else {
        return stake.amount; // voided — refund
    };
    if stake.side != winning_side {
        return Decimal::ZERO;
    }

    let winning_pool = pool.side(winning_side);
    if winning_pool.is_zero() {
        return stake.amount;
    }

    let fee = (pool.total() * fee_rate)
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let net = pool.total() - fee;
    (net * stake.amount / winning_pool).round_dp_with_strategy(2, RoundingStrategy::ToZero)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Side;

    fn stake(side: Side, amount: Decimal) -> Stake {
        Stake::new(Uuid::new_v4(), side, amount)
    }

    #[test]
    fn test_pool_from_stakes() {
        let stakes = vec![
            stake(Side::Yes, dec!(280)),
            stake(Side::No, dec!(80)),
            stake(Side::No, dec!(40)),
        ];
        let pool = pool_from_stakes(&stakes);
        assert_eq!(pool.yes, dec!(280));
        assert_eq!(pool.no, dec!(120));
    }

    #[test]
    fn test_settle_worked_example() {
        // poolYes=280, poolNo=120, NO wins, fee 10%:
        // gross 400, fee 40, net 360; the $40 NO stake pays (40/120)*360 = 120
        let bettor = Uuid::new_v4();
        let stakes = vec![
            stake(Side::Yes, dec!(280)),
            stake(Side::No, dec!(80)),
            Stake::new(bettor, Side::No, dec!(40)),
        ];

        let result = settle(&stakes, Outcome::No, PLATFORM_FEE_RATE);

        assert_eq!(result.gross_pool, dec!(400));
        assert_eq!(result.fee_amount, dec!(40));
        assert_eq!(result.net_pool, dec!(360));
        assert_eq!(result.payout_for(&bettor), dec!(120));
        assert_eq!(result.total_paid(), dec!(360));
    }

    #[test]
    fn test_settle_losers_get_explicit_zero() {
        let loser = Uuid::new_v4();
        let stakes = vec![
            Stake::new(loser, Side::Yes, dec!(280)),
            stake(Side::No, dec!(120)),
        ];
        let result = settle(&stakes, Outcome::No, PLATFORM_FEE_RATE);

        assert_eq!(result.payouts.get(&loser), Some(&Decimal::ZERO));
        assert_eq!(result.payouts.len(), 2);
    }

    #[test]
    fn test_settle_conservation_with_awkward_thirds() {
        // gross 3.01, fee 0.30, net 2.71 split three equal ways:
        // 0.9033… each — largest remainder hands the odd cent to one winner
        let winners: Vec<Stake> = (0..3).map(|_| stake(Side::Yes, dec!(1))).collect();
        let mut stakes = winners.clone();
        stakes.push(stake(Side::No, dec!(0.01)));

        let result = settle(&stakes, Outcome::Yes, PLATFORM_FEE_RATE);

        assert_eq!(result.fee_amount, dec!(0.30));
        assert_eq!(result.net_pool, dec!(2.71));
        assert_eq!(result.total_paid(), dec!(2.71));

        let mut winner_payouts: Vec<Decimal> = winners
            .iter()
            .map(|w| result.payout_for(&w.participant))
            .collect();
        winner_payouts.sort();
        assert_eq!(winner_payouts, vec![dec!(0.90), dec!(0.90), dec!(0.91)]);
    }

    #[test]
    fn test_settle_conservation_many_winners() {
        // 97 winners of $0.07 against $13 of losing stake — none of the
        // shares land on whole cents
        let winners: Vec<Stake> = (0..97).map(|_| stake(Side::No, dec!(0.07))).collect();
        let mut stakes = winners.clone();
        stakes.push(stake(Side::Yes, dec!(13)));

        let result = settle(&stakes, Outcome::No, PLATFORM_FEE_RATE);

        assert_eq!(result.total_paid(), result.net_pool);
        // Any two equal stakes differ by at most one cent
        let payouts: Vec<Decimal> = winners
            .iter()
            .map(|w| result.payout_for(&w.participant))
            .collect();
        let min = payouts.iter().min().unwrap();
        let max = payouts.iter().max().unwrap();
        assert!(*max - *min <= dec!(0.01));
    }

    #[test]
    fn test_settle_voided_refunds_everyone_fee_free() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let stakes = vec![
            Stake::new(a, Side::Yes, dec!(280)),
            Stake::new(b, Side::No, dec!(40)),
            Stake::new(b, Side::No, dec!(80)),
        ];

        let result = settle(&stakes, Outcome::Voided, PLATFORM_FEE_RATE);

        assert_eq!(result.fee_amount, Decimal::ZERO);
        assert_eq!(result.payout_for(&a), dec!(280));
        // Both of b's stakes come back, aggregated
        assert_eq!(result.payout_for(&b), dec!(120));
        assert_eq!(result.total_paid(), dec!(400));
    }

    #[test]
    fn test_settle_no_winners_refunds() {
        // Everyone backed YES, NO won: nobody to pay, so refund fee-free
        let a = Uuid::new_v4();
        let stakes = vec![Stake::new(a, Side::Yes, dec!(150))];

        let result = settle(&stakes, Outcome::No, PLATFORM_FEE_RATE);

        assert_eq!(result.fee_amount, Decimal::ZERO);
        assert_eq!(result.payout_for(&a), dec!(150));
    }

    #[test]
    fn test_settle_empty_stake_list() {
        let result = settle(&[], Outcome::Yes, PLATFORM_FEE_RATE);
        assert_eq!(result.gross_pool, Decimal::ZERO);
        assert_eq!(result.fee_amount, Decimal::ZERO);
        assert!(result.payouts.is_empty());
    }

    #[test]
    fn test_settle_participant_on_both_sides() {
        let hedger = Uuid::new_v4();
        let stakes = vec![
            Stake::new(hedger, Side::Yes, dec!(50)),
            Stake::new(hedger, Side::No, dec!(30)),
            stake(Side::Yes, dec!(50)),
        ];
        // gross 130, fee 13, net 117; hedger's YES share: (50/100)*117 = 58.50
        let result = settle(&stakes, Outcome::Yes, PLATFORM_FEE_RATE);
        assert_eq!(result.payout_for(&hedger), dec!(58.50));
    }

    #[test]
    fn test_settle_zero_fee_rate() {
        let winner = Uuid::new_v4();
        let stakes = vec![
            Stake::new(winner, Side::No, dec!(120)),
            stake(Side::Yes, dec!(280)),
        ];
        let result = settle(&stakes, Outcome::No, Decimal::ZERO);
        assert_eq!(result.fee_amount, Decimal::ZERO);
        assert_eq!(result.payout_for(&winner), dec!(400));
    }

    #[test]
    fn test_allocation_is_deterministic() {
        let ids: Vec<Uuid> = (0..5).map(|_| Uuid::new_v4()).collect();
        let stakes: Vec<Stake> = ids
            .iter()
            .map(|&id| Stake::new(id, Side::Yes, dec!(0.07)))
            .chain(std::iter::once(stake(Side::No, dec!(1))))
            .collect();

        let first = settle(&stakes, Outcome::Yes, PLATFORM_FEE_RATE);
        let second = settle(&stakes, Outcome::Yes, PLATFORM_FEE_RATE);
        for id in &ids {
            assert_eq!(first.payout_for(id), second.payout_for(id));
        }
    }

    // -- winner_payout --

    #[test]
    fn test_winner_payout_worked_example() {
        let pool = Pool::new(dec!(280), dec!(120));
        let s = stake(Side::No, dec!(40));
        assert_eq!(
            winner_payout(&pool, Outcome::No, &s, PLATFORM_FEE_RATE),
            dec!(120)
        );
    }

    #[test]
    fn test_winner_payout_losing_side() {
        let pool = Pool::new(dec!(280), dec!(120));
        let s = stake(Side::Yes, dec!(40));
        assert_eq!(
            winner_payout(&pool, Outcome::No, &s, PLATFORM_FEE_RATE),
            Decimal::ZERO
        );
    }

    #[test]
    fn test_winner_payout_voided_refunds() {
        let pool = Pool::new(dec!(280), dec!(120));
        let s = stake(Side::No, dec!(40));
        assert_eq!(
            winner_payout(&pool, Outcome::Voided, &s, PLATFORM_FEE_RATE),
            dec!(40)
        );
    }

    #[test]
    fn test_winner_payout_rounds_down() {
        // net 90, share 90 * 10/30 = 30 exactly; use a pool where the
        // share is fractional: net 89.99 * 10 / 30 = 29.996… → 29.99
        let pool = Pool::new(dec!(69.99), dec!(30));
        let s = stake(Side::No, dec!(10));
        // gross 99.99, fee 10.00 (9.999 rounds half-up), net 89.99
        assert_eq!(
            winner_payout(&pool, Outcome::No, &s, PLATFORM_FEE_RATE),
            dec!(29.99)
        );
    }
}
