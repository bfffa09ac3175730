//! Backend API integration.
//!
//! The wagering backend is a black box: it owns auth, the ledger, and
//! the pools themselves. This service reads market/pool snapshots from
//! it, submits stake placements, and polls it for resolutions. The
//! `WagerBackend` trait is the seam — the HTTP client implements it for
//! production and tests substitute deterministic in-memory fakes.

pub mod http;

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{MarketSnapshot, Outcome, StakeProposal, StakeReceipt};

/// Abstraction over the wagering backend.
///
/// All mutations happen on the backend side; implementors only move
/// snapshots and receipts across the boundary.
#[async_trait]
pub trait WagerBackend: Send + Sync {
    /// Fetch all listed markets with current pool totals and limits.
    async fn fetch_markets(&self) -> Result<Vec<MarketSnapshot>>;

    /// Fetch a single market by id.
    async fn fetch_market(&self, market_id: &str) -> Result<MarketSnapshot>;

    /// Submit a stake. The backend validates and, on acceptance,
    /// returns a receipt carrying the post-trade pool totals.
    async fn place_stake(&self, market_id: &str, proposal: &StakeProposal)
        -> Result<StakeReceipt>;

    /// The market's resolution, once the backend has settled it.
    /// `None` while the market is still open.
    async fn fetch_resolution(&self, market_id: &str) -> Result<Option<Outcome>>;

    /// Backend name for logging and identification.
    fn name(&self) -> &str;
}
