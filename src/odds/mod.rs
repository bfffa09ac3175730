//! Odds engine — pool-implied pricing and settlement arithmetic.
//!
//! Everything in this module is pure and stateless: pool snapshots in,
//! figures out. No I/O, no locking, no retries — callers may invoke any
//! of it concurrently. The only failure mode is pricing an empty pool,
//! surfaced as the recoverable [`EmptyPool`](crate::types::EmptyPool)
//! condition so the caller can render "market not seeded" instead of
//! garbage odds.

pub mod quote;
pub mod settlement;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::{EmptyPool, Pool};

/// The display shape consumed by the UI: implied probabilities plus
/// decimal odds for both sides.
///
/// Probabilities and odds are rounded to four decimal places for
/// display; `p_no` is re-derived as the complement of the rounded
/// `p_yes` so the pair still sums to exactly one. An absent odds value
/// means that side has no stake yet — there is no payout multiplier to
/// show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketQuote {
    pub p_yes: Decimal,
    pub p_no: Decimal,
    pub odds_yes: Option<Decimal>,
    pub odds_no: Option<Decimal>,
}

/// Price a pool snapshot for display.
pub fn quote(pool: &Pool) -> Result<MarketQuote, EmptyPool> {
    let implied = quote::implied_probability(pool)?;
    let odds = quote::decimal_odds(pool)?;

    let p_yes = implied.yes.round_dp(4);
    Ok(MarketQuote {
        p_yes,
        p_no: Decimal::ONE - p_yes,
        odds_yes: odds.yes.map(|o| o.round_dp(4)),
        odds_no: odds.no.map(|o| o.round_dp(4)),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
