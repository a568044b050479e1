//! Ledger confirmation polling.
//!
//! Every submitted ledger transaction gets one [`ConfirmationPoller`] task.
//! It checks the ledger on a fixed interval until the transfer confirms, the
//! deadline passes, or the owning [`PollerSet`] is shut down.

use crate::config::Settings;
use crate::domain::dead_letter::{DeadLetter, DeadLetterKind};
use crate::domain::ledger::LedgerStatus;
use crate::domain::payment::PaymentStatus;
use crate::domain::ports::{
    DeadLetterSinkRef, LedgerAdapterRef, LedgerStoreRef, PaymentStoreRef,
};
use crate::error::Result;
use futures_util::FutureExt;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Confirmed,
    TimedOut,
    Cancelled,
    /// The poller task panicked before reaching any other outcome.
    Aborted,
}

/// Shortest interval between two status checks.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval: Duration,
    pub deadline: Duration,
}

impl PollConfig {
    /// Builds a config, raising `interval` to [`MIN_POLL_INTERVAL`] if needed.
    pub fn new(interval: Duration, deadline: Duration) -> Self {
        Self {
            interval: interval.max(MIN_POLL_INTERVAL),
            deadline,
        }
    }
}

impl From<&Settings> for PollConfig {
    fn from(settings: &Settings) -> Self {
        Self::new(settings.poll_interval, settings.confirmation_deadline)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

pub struct ConfirmationPoller {
    tx_hash: String,
    ledger: LedgerAdapterRef,
    ledger_store: LedgerStoreRef,
    payments: PaymentStoreRef,
    dead_letters: DeadLetterSinkRef,
    config: PollConfig,
}

impl ConfirmationPoller {
    pub fn new(
        tx_hash: impl Into<String>,
        ledger: LedgerAdapterRef,
        ledger_store: LedgerStoreRef,
        payments: PaymentStoreRef,
        dead_letters: DeadLetterSinkRef,
        config: PollConfig,
    ) -> Self {
        Self {
            tx_hash: tx_hash.into(),
            ledger,
            ledger_store,
            payments,
            dead_letters,
            config,
        }
    }

    pub fn tx_hash(&self) -> &str {
        &self.tx_hash
    }

    /// Polls until the transaction confirms, the deadline elapses, or `cancel` fires.
    ///
    /// A timeout leaves the ledger row at `SUBMITTED` and files a dead letter.
    pub async fn run(self, cancel: CancellationToken) -> PollOutcome {
        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => PollOutcome::Cancelled,
            _ = tokio::time::sleep(self.config.deadline) => PollOutcome::TimedOut,
            _ = self.poll_until_confirmed() => PollOutcome::Confirmed,
        };

        match outcome {
            PollOutcome::Confirmed => {
                tracing::info!(tx_hash = %self.tx_hash, "ledger transaction confirmed")
            }
            PollOutcome::Cancelled | PollOutcome::Aborted => {
                tracing::info!(tx_hash = %self.tx_hash, "confirmation polling cancelled")
            }
            PollOutcome::TimedOut => {
                tracing::warn!(
                    tx_hash = %self.tx_hash,
                    deadline_secs = self.config.deadline.as_secs(),
                    "ledger transaction not confirmed before deadline"
                );
                self.dead_letters
                    .record(DeadLetter::new(
                        DeadLetterKind::ConfirmationTimeout,
                        &self.tx_hash,
                        format!("not confirmed within {:?}", self.config.deadline),
                    ))
                    .await;
            }
        }
        outcome
    }

    async fn poll_until_confirmed(&self) {
        let period = self.config.interval.max(MIN_POLL_INTERVAL);
        let Some(start) = Instant::now().checked_add(period) else {
            tracing::warn!(
                tx_hash = %self.tx_hash,
                "poll interval out of range, waiting for the deadline"
            );
            return std::future::pending().await;
        };
        let mut ticker = tokio::time::interval_at(start, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut attempt: u32 = 0;

        loop {
            ticker.tick().await;
            attempt += 1;
            match self.ledger.check_status(&self.tx_hash).await {
                Ok(LedgerStatus::Confirmed) => match self.record_confirmation().await {
                    Ok(()) => return,
                    Err(e) => tracing::error!(
                        tx_hash = %self.tx_hash,
                        error = %e,
                        "could not record confirmation"
                    ),
                },
                Ok(status) => {
                    tracing::debug!(tx_hash = %self.tx_hash, attempt, %status, "not yet confirmed")
                }
                Err(e) => tracing::warn!(
                    tx_hash = %self.tx_hash,
                    attempt,
                    error = %e,
                    "ledger status check failed"
                ),
            }
        }
    }

    async fn record_confirmation(&self) -> Result<()> {
        let tx = self
            .ledger_store
            .update_ledger_transaction_status(&self.tx_hash, LedgerStatus::Confirmed)
            .await?;

        // The ledger row is the source of truth; completing the payment is best effort.
        match self.payments.get_payment(tx.payment_id).await {
            Ok(Some(payment)) if payment.status == PaymentStatus::Processing => {
                if let Err(e) = self
                    .payments
                    .update_payment_status(tx.payment_id, PaymentStatus::Completed, None)
                    .await
                {
                    tracing::warn!(
                        payment_id = %tx.payment_id,
                        error = %e,
                        "could not complete payment"
                    );
                }
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(payment_id = %tx.payment_id, error = %e, "could not load payment")
            }
        }
        Ok(())
    }
}

/// Supervises running pollers.
///
/// At most one poller runs per transaction hash. [`PollerSet::shutdown`]
/// cancels the remaining pollers and waits for them to exit.
#[derive(Clone, Default)]
pub struct PollerSet {
    tracker: TaskTracker,
    shutdown: CancellationToken,
    active: Arc<std::sync::Mutex<HashSet<String>>>,
    outcomes: Arc<Mutex<Vec<(String, PollOutcome)>>>,
}

/// Releases a hash from the active set when its poller task ends, even by panic.
struct ActiveEntry {
    active: Arc<std::sync::Mutex<HashSet<String>>>,
    tx_hash: String,
}

impl Drop for ActiveEntry {
    fn drop(&mut self) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.tx_hash);
    }
}

impl PollerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts `poller` unless one is already running for its hash.
    pub async fn spawn(&self, poller: ConfirmationPoller) -> bool {
        let tx_hash = poller.tx_hash().to_string();
        let inserted = self
            .active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(tx_hash.clone());
        if !inserted {
            tracing::warn!(tx_hash = %tx_hash, "poller already running");
            return false;
        }

        let entry = ActiveEntry {
            active: Arc::clone(&self.active),
            tx_hash,
        };
        let token = self.shutdown.child_token();
        let outcomes = Arc::clone(&self.outcomes);
        let dead_letters = poller.dead_letters.clone();
        self.tracker.spawn(async move {
            let outcome = match AssertUnwindSafe(poller.run(token)).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(_) => {
                    tracing::error!(tx_hash = %entry.tx_hash, "confirmation poller panicked");
                    dead_letters
                        .record(DeadLetter::new(
                            DeadLetterKind::PollerAborted,
                            &entry.tx_hash,
                            "confirmation poller panicked",
                        ))
                        .await;
                    PollOutcome::Aborted
                }
            };
            let tx_hash = entry.tx_hash.clone();
            drop(entry);
            outcomes.lock().await.push((tx_hash, outcome));
        });
        true
    }

    pub async fn active(&self) -> usize {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Waits for every poller spawned so far to finish.
    ///
    /// Returns the outcomes recorded since the previous `wait`.
    pub async fn wait(&self) -> Vec<(String, PollOutcome)> {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
        std::mem::take(&mut *self.outcomes.lock().await)
    }

    pub async fn shutdown(&self) -> Vec<(String, PollOutcome)> {
        self.shutdown.cancel();
        self.wait().await
    }
}
