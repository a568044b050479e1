use super::poller::{ConfirmationPoller, PollConfig, PollerSet};
use crate::domain::dead_letter::{DeadLetter, DeadLetterKind};
use crate::domain::event::SettlementEvent;
use crate::domain::ledger::LedgerTransaction;
use crate::domain::ports::{
    DeadLetterSinkRef, LeaseDirectoryRef, LedgerAdapterRef, LedgerStoreRef, MessageStream,
    PaymentStoreRef,
};
use crate::error::Result;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;

/// Consumes settlement events and records each one on the ledger.
///
/// For every event the recorder submits a transfer, stores the resulting
/// ledger transaction, links it to the payment and starts a confirmation
/// poller. Events are never retried; anything that cannot be completed is
/// handed to the dead-letter sink.
pub struct SettlementRecorder {
    payments: PaymentStoreRef,
    ledger_store: LedgerStoreRef,
    ledger: LedgerAdapterRef,
    directory: LeaseDirectoryRef,
    dead_letters: DeadLetterSinkRef,
    pollers: PollerSet,
    poll_config: PollConfig,
}

impl SettlementRecorder {
    pub fn new(
        payments: PaymentStoreRef,
        ledger_store: LedgerStoreRef,
        ledger: LedgerAdapterRef,
        directory: LeaseDirectoryRef,
        dead_letters: DeadLetterSinkRef,
        poll_config: PollConfig,
    ) -> Self {
        Self {
            payments,
            ledger_store,
            ledger,
            directory,
            dead_letters,
            pollers: PollerSet::new(),
            poll_config,
        }
    }

    pub fn pollers(&self) -> &PollerSet {
        &self.pollers
    }

    /// Handles one raw settlement event.
    pub async fn on_settlement_event(&self, payload: &[u8]) -> Result<LedgerTransaction> {
        let event = match SettlementEvent::decode(payload) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, "dropping malformed settlement event");
                self.dead_letter(
                    DeadLetterKind::MalformedEvent,
                    String::from_utf8_lossy(payload),
                    e.to_string(),
                )
                .await;
                return Err(e);
            }
        };
        let payment_id = event.payment_id;
        tracing::debug!(
            payment_id = %payment_id,
            provider_tx = %event.provider_tx,
            "settlement event received"
        );

        let target = match self.directory.settlement_target(payment_id).await {
            Ok(target) => target,
            Err(e) => {
                self.dead_letter(
                    DeadLetterKind::UnresolvedTarget,
                    payment_id.to_string(),
                    e.to_string(),
                )
                .await;
                return Err(e);
            }
        };

        let submission = match self.ledger.submit(&target.destination, target.amount).await {
            Ok(submission) => submission,
            Err(e) => {
                self.dead_letter(
                    DeadLetterKind::LedgerSubmission,
                    payment_id.to_string(),
                    e.to_string(),
                )
                .await;
                return Err(e);
            }
        };
        let tx_hash = submission.tx_hash.clone();

        let tx = LedgerTransaction::from_submission(payment_id, submission);
        if let Err(e) = self.ledger_store.save_ledger_transaction(tx.clone()).await {
            self.dead_letter(
                DeadLetterKind::Persistence,
                tx_hash.clone(),
                format!("ledger transaction for payment {} not saved: {}", payment_id, e),
            )
            .await;
            return Err(e);
        }

        // The transfer is already on the ledger, so a failed link does not stop polling.
        if let Err(e) = self.payments.link_payment_to_ledger_tx(payment_id, &tx_hash).await {
            self.dead_letter(
                DeadLetterKind::Persistence,
                tx_hash.clone(),
                format!("payment {} not linked: {}", payment_id, e),
            )
            .await;
        }

        self.pollers
            .spawn(ConfirmationPoller::new(
                tx_hash.clone(),
                self.ledger.clone(),
                self.ledger_store.clone(),
                self.payments.clone(),
                self.dead_letters.clone(),
                self.poll_config,
            ))
            .await;

        tracing::info!(
            payment_id = %payment_id,
            tx_hash = %tx_hash,
            destination = %tx.to_address,
            amount = %tx.amount,
            "settlement recorded on ledger"
        );
        Ok(tx)
    }

    /// Processes events until the stream ends or `cancel` fires.
    ///
    /// Returns the number of events that produced a ledger transaction.
    pub async fn run(&self, mut events: MessageStream, cancel: CancellationToken) -> usize {
        let mut recorded = 0;
        loop {
            let payload = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = events.next() => match next {
                    Some(payload) => payload,
                    None => break,
                },
            };
            if self.on_settlement_event(&payload).await.is_ok() {
                recorded += 1;
            }
        }
        tracing::debug!(recorded, "settlement consumer stopped");
        recorded
    }

    async fn dead_letter(
        &self,
        kind: DeadLetterKind,
        reference: impl Into<String>,
        reason: String,
    ) {
        self.dead_letters
            .record(DeadLetter::new(kind, reference, reason))
            .await;
    }
}
