//! Wallet store — explicit balance state with change subscriptions.
//!
//! The balance lives inside a `tokio::sync::watch` channel: the sender
//! is the single source of truth and every `subscribe()` hands out a
//! receiver that observes each change. There is no module-level
//! singleton; construct one store, wrap it in an `Arc`, and pass it to
//! whoever needs it. Dropping the last receiver costs nothing, and
//! mutations are atomic under the channel's internal lock.

use rust_decimal::Decimal;
use tokio::sync::watch;
use tracing::debug;

use crate::types::WagerError;

/// In-memory wallet balance with observable updates.
pub struct WalletStore {
    balance: watch::Sender<Decimal>,
}

impl WalletStore {
    /// Create a store holding the given opening balance.
    pub fn new(opening_balance: Decimal) -> Self {
        let (balance, _) = watch::channel(opening_balance);
        Self { balance }
    }

    /// Current balance.
    pub fn balance(&self) -> Decimal {
        *self.balance.borrow()
    }

    /// Observe balance changes. The receiver sees the value at
    /// subscription time and is notified on every subsequent change.
    pub fn subscribe(&self) -> watch::Receiver<Decimal> {
        self.balance.subscribe()
    }

    /// Add funds (stake refunds, settled winnings).
    pub fn credit(&self, amount: Decimal) {
        if amount.is_zero() {
            return;
        }
        self.balance.send_modify(|balance| *balance += amount);
        debug!(amount = %amount, balance = %self.balance(), "Wallet credited");
    }

    /// Remove funds, atomically refusing to overdraw.
    pub fn debit(&self, amount: Decimal) -> Result<Decimal, WagerError> {
        let mut outcome = Err(WagerError::InsufficientFunds {
            needed: amount,
            available: Decimal::ZERO,
        });

        self.balance.send_if_modified(|balance| {
            if *balance < amount {
                outcome = Err(WagerError::InsufficientFunds {
                    needed: amount,
                    available: *balance,
                });
                false
            } else {
                *balance -= amount;
                outcome = Ok(*balance);
                true
            }
        });

        if let Ok(remaining) = &outcome {
            debug!(amount = %amount, balance = %remaining, "Wallet debited");
        }
        outcome
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
