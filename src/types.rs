//! Shared types for the WAGERPOOL service.
//!
//! These types form the data model used across all modules.
//! They are designed to be stable so that the odds, backend, board,
//! and dashboard modules can depend on them without circular references.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Sides & outcomes
// ---------------------------------------------------------------------------

/// Bet direction on a binary market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Yes,
    No,
}

impl Side {
    /// The opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Side::Yes => Side::No,
            Side::No => Side::Yes,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Yes => write!(f, "YES"),
            Side::No => write!(f, "NO"),
        }
    }
}

impl std::str::FromStr for Side {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yes" | "y" => Ok(Side::Yes),
            "no" | "n" => Ok(Side::No),
            _ => Err(anyhow::anyhow!("Unknown side: {s}")),
        }
    }
}

/// How a market resolved. `Voided` cancels the market: every stake is
/// refunded in full and no fee is taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Yes,
    No,
    Voided,
}

impl Outcome {
    /// The side that collects the pool, if any.
    pub fn winning_side(&self) -> Option<Side> {
        match self {
            Outcome::Yes => Some(Side::Yes),
            Outcome::No => Some(Side::No),
            Outcome::Voided => None,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Yes => write!(f, "YES"),
            Outcome::No => write!(f, "NO"),
            Outcome::Voided => write!(f, "VOIDED"),
        }
    }
}

impl std::str::FromStr for Outcome {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "yes" => Ok(Outcome::Yes),
            "no" => Ok(Outcome::No),
            "voided" | "void" => Ok(Outcome::Voided),
            _ => Err(anyhow::anyhow!("Unknown outcome: {s}")),
        }
    }
}

// ---------------------------------------------------------------------------
// Pool
// ---------------------------------------------------------------------------

/// Aggregate stakes on one market at a point in time.
///
/// Pools are snapshots: the backend mutates them every time a stake is
/// accepted, this service only ever reads them. Both sides are
/// non-negative; a pool with zero total has no defined odds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub yes: Decimal,
    pub no: Decimal,
}

impl Pool {
    pub fn new(yes: Decimal, no: Decimal) -> Self {
        Self { yes, no }
    }

    /// Combined stake across both sides.
    pub fn total(&self) -> Decimal {
        self.yes + self.no
    }

    /// The stake on the given side.
    pub fn side(&self, side: Side) -> Decimal {
        match side {
            Side::Yes => self.yes,
            Side::No => self.no,
        }
    }

    /// Whether nothing has been staked yet (odds are undefined).
    pub fn is_empty(&self) -> bool {
        self.total().is_zero()
    }

    /// The pool as it would look after `amount` joins the given side.
    pub fn with_stake(&self, side: Side, amount: Decimal) -> Self {
        match side {
            Side::Yes => Self::new(self.yes + amount, self.no),
            Side::No => Self::new(self.yes, self.no + amount),
        }
    }
}

impl fmt::Display for Pool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "YES ${:.2} / NO ${:.2} (total ${:.2})",
            self.yes,
            self.no,
            self.total(),
        )
    }
}

// ---------------------------------------------------------------------------
// Stakes
// ---------------------------------------------------------------------------

/// Per-market stake limits, supplied by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeBounds {
    pub min: Decimal,
    pub max: Decimal,
}

impl StakeBounds {
    /// Check a proposed amount against these limits.
    ///
    /// Bounds are a caller-side concern: the odds engine assumes
    /// validated inputs, so this is enforced before anything is priced
    /// or placed.
    pub fn validate(&self, amount: Decimal) -> Result<(), WagerError> {
        if amount < self.min || amount > self.max {
            return Err(WagerError::StakeOutOfRange {
                amount,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

impl fmt::Display for StakeBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2}..=${:.2}", self.min, self.max)
    }
}

/// A hypothetical or pending bet: which side, how much.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeProposal {
    pub side: Side,
    pub amount: Decimal,
}

impl fmt::Display for StakeProposal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${:.2} on {}", self.amount, self.side)
    }
}

/// An accepted bet — the unit of settlement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stake {
    pub participant: Uuid,
    pub side: Side,
    pub amount: Decimal,
}

impl Stake {
    pub fn new(participant: Uuid, side: Side, amount: Decimal) -> Self {
        Self {
            participant,
            side,
            amount,
        }
    }
}

impl fmt::Display for Stake {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ${:.2} [{}]", self.side, self.amount, self.participant)
    }
}

// ---------------------------------------------------------------------------
// Market snapshot
// ---------------------------------------------------------------------------

/// One market as read from the backend: pool totals, stake limits, and
/// resolution state. Immutable once fetched — the refresher replaces
/// whole snapshots rather than patching them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketSnapshot {
    pub id: String,
    pub question: String,
    pub pool: Pool,
    pub bounds: StakeBounds,
    /// `Some` once the backend has resolved or voided the market.
    pub resolution: Option<Outcome>,
    /// When this snapshot was fetched.
    pub fetched_at: DateTime<Utc>,
}

impl MarketSnapshot {
    /// Whether the market is still taking stakes.
    pub fn is_open(&self) -> bool {
        self.resolution.is_none()
    }

    /// Helper to build a test market with sensible defaults.
    #[cfg(test)]
    pub fn sample(id: &str, yes: Decimal, no: Decimal) -> Self {
        use rust_decimal_macros::dec;
        MarketSnapshot {
            id: id.to_string(),
            question: format!("Test market {id}?"),
            pool: Pool::new(yes, no),
            bounds: StakeBounds {
                min: dec!(1),
                max: dec!(500),
            },
            resolution: None,
            fetched_at: Utc::now(),
        }
    }
}

impl fmt::Display for MarketSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}{})",
            self.id,
            self.question,
            self.pool,
            match self.resolution {
                Some(o) => format!(" | resolved {o}"),
                None => String::new(),
            },
        )
    }
}

/// Receipt returned by the backend after a stake is accepted.
///
/// `pool_after` carries the authoritative post-trade pool totals, which
/// the board folds back into its snapshot immediately instead of waiting
/// for the next refresh tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StakeReceipt {
    pub stake_id: String,
    pub market_id: String,
    pub side: Side,
    pub amount: Decimal,
    pub pool_after: Pool,
    pub accepted_at: DateTime<Utc>,
}

impl fmt::Display for StakeReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ${:.2} on {} → {}",
            self.stake_id, self.market_id, self.amount, self.side, self.pool_after,
        )
    }
}

// ---------------------------------------------------------------------------
// Settlement
// ---------------------------------------------------------------------------

/// Output of resolving a market. Computed once at market close and
/// immutable thereafter.
///
/// `payouts` lists every participant: winners with their share of the
/// net pool, losers with an explicit zero. On a voided market every
/// participant maps to their original stake and `fee_amount` is zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettlementResult {
    pub outcome: Outcome,
    pub fee_rate: Decimal,
    pub gross_pool: Decimal,
    pub fee_amount: Decimal,
    pub net_pool: Decimal,
    pub payouts: HashMap<Uuid, Decimal>,
}

impl SettlementResult {
    /// Payout owed to a participant; zero for anyone not in the map.
    pub fn payout_for(&self, participant: &Uuid) -> Decimal {
        self.payouts
            .get(participant)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Sum of all payouts.
    pub fn total_paid(&self) -> Decimal {
        self.payouts.values().copied().sum()
    }
}

impl fmt::Display for SettlementResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | gross ${:.2} fee ${:.2} net ${:.2} → {} payouts",
            self.outcome,
            self.gross_pool,
            self.fee_amount,
            self.net_pool,
            self.payouts.len(),
        )
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// The odds engine's single recoverable failure: pricing was requested
/// on a pool (or pool side) with zero stake. Callers render "market not
/// seeded" instead of garbage odds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Pool has no stake to price against")]
pub struct EmptyPool;

/// Domain-specific error types for WAGERPOOL.
#[derive(Debug, thiserror::Error)]
pub enum WagerError {
    #[error("Backend error ({backend}): {message}")]
    Backend { backend: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Market not found: {0}")]
    MarketNotFound(String),

    #[error("Market closed: {0}")]
    MarketClosed(String),

    #[error("Stake ${amount:.2} outside allowed range ${min:.2}..=${max:.2}")]
    StakeOutOfRange {
        amount: Decimal,
        min: Decimal,
        max: Decimal,
    },

    #[error("Insufficient funds: need ${needed:.2}, have ${available:.2}")]
    InsufficientFunds { needed: Decimal, available: Decimal },

    #[error(transparent)]
    EmptyPool(#[from] EmptyPool),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    // -- Side tests --

    #[test]
    fn test_side_display() {
        assert_eq!(format!("{}", Side::Yes), "YES");
        assert_eq!(format!("{}", Side::No), "NO");
    }

    #[test]
    fn test_side_opposite() {
        assert_eq!(Side::Yes.opposite(), Side::No);
        assert_eq!(Side::No.opposite(), Side::Yes);
    }

    #[test]
    fn test_side_from_str() {
        assert_eq!("yes".parse::<Side>().unwrap(), Side::Yes);
        assert_eq!("NO".parse::<Side>().unwrap(), Side::No);
        assert_eq!("y".parse::<Side>().unwrap(), Side::Yes);
        assert!("maybe".parse::<Side>().is_err());
    }

    #[test]
    fn test_side_wire_format() {
        // Wire shape is lowercase — "yes" | "no"
        assert_eq!(serde_json::to_string(&Side::Yes).unwrap(), "\"yes\"");
        assert_eq!(serde_json::to_string(&Side::No).unwrap(), "\"no\"");

        let side: Side = serde_json::from_str("\"yes\"").unwrap();
        assert_eq!(side, Side::Yes);
    }

    // -- Outcome tests --

    #[test]
    fn test_outcome_winning_side() {
        assert_eq!(Outcome::Yes.winning_side(), Some(Side::Yes));
        assert_eq!(Outcome::No.winning_side(), Some(Side::No));
        assert_eq!(Outcome::Voided.winning_side(), None);
    }

    #[test]
    fn test_outcome_from_str() {
        assert_eq!("yes".parse::<Outcome>().unwrap(), Outcome::Yes);
        assert_eq!("VOIDED".parse::<Outcome>().unwrap(), Outcome::Voided);
        assert_eq!("void".parse::<Outcome>().unwrap(), Outcome::Voided);
        assert!("draw".parse::<Outcome>().is_err());
    }

    #[test]
    fn test_outcome_wire_format() {
        assert_eq!(
            serde_json::to_string(&Outcome::Voided).unwrap(),
            "\"voided\""
        );
        let o: Outcome = serde_json::from_str("\"no\"").unwrap();
        assert_eq!(o, Outcome::No);
    }

    // -- Pool tests --

    #[test]
    fn test_pool_total() {
        let pool = Pool::new(dec!(280), dec!(120));
        assert_eq!(pool.total(), dec!(400));
    }

    #[test]
    fn test_pool_side() {
        let pool = Pool::new(dec!(280), dec!(120));
        assert_eq!(pool.side(Side::Yes), dec!(280));
        assert_eq!(pool.side(Side::No), dec!(120));
    }

    #[test]
    fn test_pool_is_empty() {
        assert!(Pool::new(dec!(0), dec!(0)).is_empty());
        assert!(!Pool::new(dec!(0), dec!(500)).is_empty());
    }

    #[test]
    fn test_pool_with_stake() {
        let pool = Pool::new(dec!(280), dec!(120));
        let after = pool.with_stake(Side::No, dec!(40));
        assert_eq!(after.yes, dec!(280));
        assert_eq!(after.no, dec!(160));
        // Original snapshot untouched
        assert_eq!(pool.no, dec!(120));
    }

    #[test]
    fn test_pool_display() {
        let pool = Pool::new(dec!(280), dec!(120));
        let display = format!("{pool}");
        assert!(display.contains("280.00"));
        assert!(display.contains("120.00"));
        assert!(display.contains("400.00"));
    }

    #[test]
    fn test_pool_serialization_roundtrip() {
        let pool = Pool::new(dec!(10.50), dec!(3.25));
        let json = serde_json::to_string(&pool).unwrap();
        let parsed: Pool = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, pool);
    }

    // -- StakeBounds tests --

    #[test]
    fn test_bounds_accepts_in_range() {
        let bounds = StakeBounds {
            min: dec!(1),
            max: dec!(500),
        };
        assert!(bounds.validate(dec!(1)).is_ok());
        assert!(bounds.validate(dec!(40)).is_ok());
        assert!(bounds.validate(dec!(500)).is_ok());
    }

    #[test]
    fn test_bounds_rejects_out_of_range() {
        let bounds = StakeBounds {
            min: dec!(1),
            max: dec!(500),
        };
        assert!(matches!(
            bounds.validate(dec!(0.50)),
            Err(WagerError::StakeOutOfRange { .. })
        ));
        assert!(matches!(
            bounds.validate(dec!(500.01)),
            Err(WagerError::StakeOutOfRange { .. })
        ));
    }

    #[test]
    fn test_bounds_display() {
        let bounds = StakeBounds {
            min: dec!(1),
            max: dec!(500),
        };
        assert_eq!(format!("{bounds}"), "$1.00..=$500.00");
    }

    // -- StakeProposal / Stake tests --

    #[test]
    fn test_proposal_display() {
        let p = StakeProposal {
            side: Side::No,
            amount: dec!(40),
        };
        assert_eq!(format!("{p}"), "$40.00 on NO");
    }

    #[test]
    fn test_proposal_wire_format() {
        let p = StakeProposal {
            side: Side::Yes,
            amount: dec!(12.50),
        };
        let json = serde_json::to_string(&p).unwrap();
        assert!(json.contains("\"yes\""));
        let parsed: StakeProposal = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, p);
    }

    #[test]
    fn test_stake_display() {
        let id = Uuid::new_v4();
        let stake = Stake::new(id, Side::Yes, dec!(25));
        let display = format!("{stake}");
        assert!(display.contains("YES"));
        assert!(display.contains("25.00"));
    }

    // -- MarketSnapshot tests --

    #[test]
    fn test_snapshot_is_open() {
        let mut m = MarketSnapshot::sample("m1", dec!(280), dec!(120));
        assert!(m.is_open());
        m.resolution = Some(Outcome::No);
        assert!(!m.is_open());
    }

    #[test]
    fn test_snapshot_display() {
        let m = MarketSnapshot::sample("m1", dec!(280), dec!(120));
        let display = format!("{m}");
        assert!(display.contains("m1"));
        assert!(display.contains("280.00"));
        assert!(!display.contains("resolved"));

        let mut resolved = m;
        resolved.resolution = Some(Outcome::Voided);
        assert!(format!("{resolved}").contains("resolved VOIDED"));
    }

    #[test]
    fn test_snapshot_serialization_roundtrip() {
        let m = MarketSnapshot::sample("m1", dec!(280), dec!(120));
        let json = serde_json::to_string(&m).unwrap();
        let parsed: MarketSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id, "m1");
        assert_eq!(parsed.pool, m.pool);
        assert!(parsed.resolution.is_none());
    }

    // -- StakeReceipt tests --

    #[test]
    fn test_receipt_display() {
        let receipt = StakeReceipt {
            stake_id: "S-001".to_string(),
            market_id: "m1".to_string(),
            side: Side::No,
            amount: dec!(40),
            pool_after: Pool::new(dec!(280), dec!(160)),
            accepted_at: Utc::now(),
        };
        let display = format!("{receipt}");
        assert!(display.contains("S-001"));
        assert!(display.contains("NO"));
        assert!(display.contains("160.00"));
    }

    // -- SettlementResult tests --

    fn sample_settlement() -> (Uuid, Uuid, SettlementResult) {
        let winner = Uuid::new_v4();
        let loser = Uuid::new_v4();
        let mut payouts = HashMap::new();
        payouts.insert(winner, dec!(120));
        payouts.insert(loser, Decimal::ZERO);
        (
            winner,
            loser,
            SettlementResult {
                outcome: Outcome::No,
                fee_rate: dec!(0.10),
                gross_pool: dec!(400),
                fee_amount: dec!(40),
                net_pool: dec!(360),
                payouts,
            },
        )
    }

    #[test]
    fn test_settlement_payout_for() {
        let (winner, loser, result) = sample_settlement();
        assert_eq!(result.payout_for(&winner), dec!(120));
        assert_eq!(result.payout_for(&loser), Decimal::ZERO);
        assert_eq!(result.payout_for(&Uuid::new_v4()), Decimal::ZERO);
    }

    #[test]
    fn test_settlement_total_paid() {
        let (_, _, result) = sample_settlement();
        assert_eq!(result.total_paid(), dec!(120));
    }

    #[test]
    fn test_settlement_serializes() {
        let (_, _, result) = sample_settlement();
        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"no\""));
        assert!(json.contains("payouts"));
    }

    #[test]
    fn test_settlement_display() {
        let (_, _, result) = sample_settlement();
        let display = format!("{result}");
        assert!(display.contains("gross $400.00"));
        assert!(display.contains("fee $40.00"));
        assert!(display.contains("2 payouts"));
    }

    // -- Error tests --

    #[test]
    fn test_empty_pool_display() {
        assert_eq!(format!("{EmptyPool}"), "Pool has no stake to price against");
    }

    #[test]
    fn test_wager_error_display() {
        let e = WagerError::StakeOutOfRange {
            amount: dec!(750),
            min: dec!(1),
            max: dec!(500),
        };
        let msg = format!("{e}");
        assert!(msg.contains("750.00"));
        assert!(msg.contains("500.00"));

        let e = WagerError::InsufficientFunds {
            needed: dec!(40),
            available: dec!(12.50),
        };
        assert!(format!("{e}").contains("12.50"));
    }

    #[test]
    fn test_empty_pool_wraps_into_wager_error() {
        let e: WagerError = EmptyPool.into();
        assert!(matches!(e, WagerError::EmptyPool(_)));
    }
}
