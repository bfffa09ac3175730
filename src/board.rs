//! Market board — the in-memory read-model of backend pool snapshots.
//!
//! The refresher writes snapshots in, the dashboard and stake-placement
//! path read them out. The board also owns all caller-side validation
//! (stake bounds, market open, wallet funds) so the odds engine below
//! it can assume validated inputs.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::backend::WagerBackend;
use crate::odds::{self, MarketQuote};
use crate::types::{
    MarketSnapshot, Stake, StakeProposal, StakeReceipt, WagerError,
};
use crate::wallet::WalletStore;

/// Shared market view plus the stakes this service has placed itself
/// (tracked so settled winnings can be credited back to the wallet).
pub struct MarketBoard {
    markets: RwLock<HashMap<String, MarketSnapshot>>,
    local_stakes: RwLock<HashMap<String, Vec<Stake>>>,
}

impl Default for MarketBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl MarketBoard {
    pub fn new() -> Self {
        Self {
            markets: RwLock::new(HashMap::new()),
            local_stakes: RwLock::new(HashMap::new()),
        }
    }

    // -- Snapshot intake -------------------------------------------------

    /// Fold a batch of fetched snapshots into the board. Markets the
    /// backend stopped listing are kept until their resolution is seen.
    pub async fn absorb(&self, snapshots: Vec<MarketSnapshot>) {
        let mut markets = self.markets.write().await;
        for snapshot in snapshots {
            markets.insert(snapshot.id.clone(), snapshot);
        }
    }

    /// Replace a single market's snapshot.
    pub async fn upsert(&self, snapshot: MarketSnapshot) {
        self.markets
            .write()
            .await
            .insert(snapshot.id.clone(), snapshot);
    }

    /// Fold a stake receipt's authoritative post-trade pool back into
    /// the market's snapshot without waiting for the next refresh.
    pub async fn apply_receipt(&self, receipt: &StakeReceipt) {
        let mut markets = self.markets.write().await;
        if let Some(market) = markets.get_mut(&receipt.market_id) {
            market.pool = receipt.pool_after;
        }
    }

    // -- Reads -----------------------------------------------------------

    /// A market's current snapshot.
    pub async fn get(&self, market_id: &str) -> Option<MarketSnapshot> {
        self.markets.read().await.get(market_id).cloned()
    }

    /// All known markets, sorted by id for stable listings.
    pub async fn list(&self) -> Vec<MarketSnapshot> {
        let mut markets: Vec<MarketSnapshot> =
            self.markets.read().await.values().cloned().collect();
        markets.sort_by(|a, b| a.id.cmp(&b.id));
        markets
    }

    /// Price a market for display.
    pub async fn quote(&self, market_id: &str) -> Result<MarketQuote, WagerError> {
        let market = self
            .get(market_id)
            .await
            .ok_or_else(|| WagerError::MarketNotFound(market_id.to_string()))?;
        Ok(odds::quote(&market.pool)?)
    }

    /// Bounds-validated projected payout for a proposal, at the
    /// displayed (pre-trade) odds.
    pub async fn project(
        &self,
        market_id: &str,
        proposal: &StakeProposal,
    ) -> Result<Decimal, WagerError> {
        let market = self
            .get(market_id)
            .await
            .ok_or_else(|| WagerError::MarketNotFound(market_id.to_string()))?;
        market.bounds.validate(proposal.amount)?;
        Ok(odds::quote::projected_payout(&market.pool, proposal)?)
    }

    // -- Stake placement -------------------------------------------------

    /// Validate, debit, and submit a stake.
    ///
    /// The wallet is debited before the backend call; if the backend
    /// rejects the stake the debit is refunded in full. On acceptance
    /// the receipt's pool totals are folded into the snapshot and the
    /// stake is tracked for settlement crediting.
    pub async fn place_stake(
        &self,
        backend: &dyn WagerBackend,
        wallet: &WalletStore,
        participant: Uuid,
        market_id: &str,
        proposal: &StakeProposal,
    ) -> Result<StakeReceipt, WagerError> {
        let market = self
            .get(market_id)
            .await
            .ok_or_else(|| WagerError::MarketNotFound(market_id.to_string()))?;

        if !market.is_open() {
            return Err(WagerError::MarketClosed(market_id.to_string()));
        }
        market.bounds.validate(proposal.amount)?;
        wallet.debit(proposal.amount)?;

        let receipt = match backend.place_stake(market_id, proposal).await {
            Ok(receipt) => receipt,
            Err(e) => {
                // The money never left: undo the debit.
                wallet.credit(proposal.amount);
                warn!(
                    market_id,
                    proposal = %proposal,
                    error = %e,
                    "Stake rejected, wallet refunded"
                );
                return Err(WagerError::Backend {
                    backend: backend.name().to_string(),
                    message: e.to_string(),
                });
            }
        };

        self.apply_receipt(&receipt).await;
        self.local_stakes
            .write()
            .await
            .entry(market_id.to_string())
            .or_default()
            .push(Stake::new(participant, proposal.side, proposal.amount));

        info!(
            market_id,
            stake_id = %receipt.stake_id,
            proposal = %proposal,
            pool_after = %receipt.pool_after,
            "Stake placed"
        );

        Ok(receipt)
    }

    // -- Local stake tracking --------------------------------------------

    /// Markets in which this service currently holds stakes.
    pub async fn staked_markets(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.local_stakes.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// The stakes held on one market.
    pub async fn stakes_for(&self, market_id: &str) -> Vec<Stake> {
        self.local_stakes
            .read()
            .await
            .get(market_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Remove and return a market's tracked stakes (called once its
    /// settlement has been credited).
    pub async fn take_stakes(&self, market_id: &str) -> Vec<Stake> {
        self.local_stakes
            .write()
            .await
            .remove(market_id)
            .unwrap_or_default()
    }
}

/// Convenience alias used by the dashboard and refresher wiring.
pub type SharedBoard = Arc<MarketBoard>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
