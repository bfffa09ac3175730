//! Scheduled market refresh.
//!
//! Replaces ad-hoc interval polling with an explicit task whose
//! lifetime is tied to its handle: `stop()` shuts the loop down
//! gracefully, and dropping the handle aborts it outright, so a
//! consumer that goes away cannot leak a timer.
//!
//! Each tick re-fetches market snapshots into the board, then polls
//! resolutions for markets this service holds stakes in; when a
//! resolution lands the settled winnings are credited to the wallet and
//! the stakes are cleared.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use rust_decimal::Decimal;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::backend::WagerBackend;
use crate::board::SharedBoard;
use crate::odds::settlement::{winner_payout, PLATFORM_FEE_RATE};
use crate::types::Outcome;
use crate::wallet::WalletStore;

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Owns the refresh task. Drop aborts; [`RefreshHandle::stop`] waits
/// for a clean exit.
pub struct RefreshHandle {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    /// Ask the loop to finish its current tick and exit, then wait for
    /// it.
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ---------------------------------------------------------------------------
// Refresher
// ---------------------------------------------------------------------------

/// Start the refresh loop. The first fetch happens immediately, then
/// every `interval` thereafter.
pub fn spawn_refresher(
    backend: Arc<dyn WagerBackend>,
    board: SharedBoard,
    wallet: Arc<WalletStore>,
    interval: Duration,
) -> RefreshHandle {
    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        info!(interval_secs = interval.as_secs_f64(), "Refresher started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    run_tick(backend.as_ref(), &board, &wallet).await;
                }
                _ = shutdown_rx.changed() => {
                    info!("Refresher stopping");
                    break;
                }
            }
        }
    });

    RefreshHandle {
        shutdown: shutdown_tx,
        task: Some(task),
    }
}

/// One refresh pass: snapshots, then resolutions for staked markets.
async fn run_tick(backend: &dyn WagerBackend, board: &SharedBoard, wallet: &WalletStore) {
    match backend.fetch_markets().await {
        Ok(snapshots) => {
            debug!(count = snapshots.len(), "Markets refreshed");
            board.absorb(snapshots).await;
        }
        Err(e) => {
            warn!(backend = backend.name(), error = %e, "Market refresh failed, keeping last snapshots");
        }
    }

    settle_resolved(backend, board, wallet).await;
}

/// Poll resolutions for every market we hold stakes in; credit the
/// wallet once a market resolves.
async fn settle_resolved(backend: &dyn WagerBackend, board: &SharedBoard, wallet: &WalletStore) {
    let staked = board.staked_markets().await;
    if staked.is_empty() {
        return;
    }

    let polls = staked.iter().map(|id| backend.fetch_resolution(id));
    let results: Vec<_> = join_all(polls).await;

    for (market_id, result) in staked.iter().zip(results) {
        let outcome = match result {
            Ok(Some(outcome)) => outcome,
            Ok(None) => continue,
            Err(e) => {
                warn!(market_id = %market_id, error = %e, "Resolution poll failed");
                continue;
            }
        };

        credit_settlement(board, wallet, market_id, outcome).await;
    }
}

/// Compute this service's payout for a resolved market from the final
/// pool snapshot and its own stakes, credit the wallet, and retire the
/// stakes.
async fn credit_settlement(
    board: &SharedBoard,
    wallet: &WalletStore,
    market_id: &str,
    outcome: Outcome,
) {
    let Some(mut market) = board.get(market_id).await else {
        return;
    };

    let stakes = board.take_stakes(market_id).await;
    let payout: Decimal = stakes
        .iter()
        .map(|stake| winner_payout(&market.pool, outcome, stake, PLATFORM_FEE_RATE))
        .sum();

    wallet.credit(payout);

    market.resolution = Some(outcome);
    board.upsert(market).await;

    info!(
        market_id,
        outcome = %outcome,
        stakes = stakes.len(),
        payout = %payout,
        "Settled winnings credited"
    );
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
