use super::selector::StrategyRegistry;
use crate::config::Settings;
use crate::domain::event::SettlementEvent;
use crate::domain::payment::{
    Payment, PaymentId, PaymentReceipt, PaymentRequest, PaymentStatus, ProviderResponse,
};
use crate::domain::ports::{EventTransportRef, PaymentStoreRef};
use crate::error::{Result, SettlementError};
use std::time::Duration;

/// Drives one payment request from persistence through the provider rail to
/// the settlement event.
///
/// The payment is committed to storage before anything is published, so a
/// lost event never loses a payment.
pub struct PaymentOrchestrator {
    payments: PaymentStoreRef,
    strategies: StrategyRegistry,
    transport: EventTransportRef,
    channel: String,
    publish_timeout: Duration,
}

impl PaymentOrchestrator {
    pub fn new(
        payments: PaymentStoreRef,
        strategies: StrategyRegistry,
        transport: EventTransportRef,
        settings: &Settings,
    ) -> Self {
        Self {
            payments,
            strategies,
            transport,
            channel: settings.channel.clone(),
            publish_timeout: settings.publish_timeout,
        }
    }

    /// Creates and processes a payment.
    ///
    /// An unsupported provider leaves the payment `PENDING`. Validation and
    /// provider failures mark it `FAILED`. Publishing the settlement event is
    /// best effort and never fails the request.
    pub async fn create_payment(&self, request: &PaymentRequest) -> Result<PaymentReceipt> {
        let payment = Payment::pending(request)?;
        let id = payment.id;
        let created_at = payment.created_at;
        self.payments.create_payment(payment).await?;
        tracing::debug!(
            payment_id = %id,
            provider = %request.provider,
            "payment recorded as PENDING"
        );

        let strategy = match self.strategies.resolve(&request.provider) {
            Ok(strategy) => strategy,
            Err(e) => {
                tracing::warn!(
                    payment_id = %id,
                    provider = %request.provider,
                    "no strategy for provider"
                );
                return Err(e);
            }
        };

        if let Err(e) = strategy.validate(request) {
            self.mark_failed(id, &e).await;
            return Err(e);
        }

        let response = match strategy.process(request).await.and_then(accepted) {
            Ok(response) => response,
            Err(e) => {
                self.mark_failed(id, &e).await;
                return Err(e);
            }
        };

        let payment = self
            .payments
            .update_payment_status(id, response.status, Some(response.provider_tx_id.clone()))
            .await?;
        tracing::info!(
            payment_id = %id,
            status = %payment.status,
            provider_tx = %response.provider_tx_id,
            "payment accepted by provider"
        );

        self.publish(SettlementEvent::payment_completed(
            id,
            response.provider_tx_id.clone(),
            payment.status,
        ))
        .await;

        Ok(PaymentReceipt {
            payment_id: id,
            status: payment.status,
            provider_tx_id: response.provider_tx_id,
            created_at,
        })
    }

    async fn mark_failed(&self, id: PaymentId, cause: &SettlementError) {
        tracing::warn!(payment_id = %id, error = %cause, "payment failed");
        if let Err(e) = self
            .payments
            .update_payment_status(id, PaymentStatus::Failed, None)
            .await
        {
            tracing::error!(payment_id = %id, error = %e, "could not mark payment FAILED");
        }
    }

    async fn publish(&self, event: SettlementEvent) {
        let payload = match event.encode() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(
                    payment_id = %event.payment_id,
                    error = %e,
                    "could not encode settlement event"
                );
                return;
            }
        };
        let publish = self.transport.publish(&self.channel, payload);
        let payment_id = event.payment_id;
        match tokio::time::timeout(self.publish_timeout, publish).await {
            Ok(Ok(())) => {
                tracing::debug!(%payment_id, channel = %self.channel, "settlement event published")
            }
            Ok(Err(e)) => {
                tracing::error!(%payment_id, error = %e, "failed to publish settlement event")
            }
            Err(_) => tracing::error!(%payment_id, "settlement event publish timed out"),
        }
    }
}

/// A provider success must carry a reference and a non-initial, non-failed status.
fn accepted(response: ProviderResponse) -> Result<ProviderResponse> {
    if response.provider_tx_id.trim().is_empty() {
        return Err(SettlementError::ProviderRejected(
            "provider returned no transaction reference".to_string(),
        ));
    }
    match response.status {
        PaymentStatus::Processing | PaymentStatus::Completed => Ok(response),
        other => Err(SettlementError::ProviderRejected(format!(
            "provider reported {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ports::{EventTransport, MessageStream, PaymentStore, PaymentStrategy};
    use crate::infrastructure::channel::InMemoryChannel;
    use crate::infrastructure::in_memory::InMemoryPaymentStore;
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_stream::StreamExt;

    struct Scripted {
        status: PaymentStatus,
        tx: &'static str,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl PaymentStrategy for Scripted {
        fn validate(&self, _request: &PaymentRequest) -> Result<()> {
            Ok(())
        }

        async fn process(&self, _request: &PaymentRequest) -> Result<ProviderResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ProviderResponse {
                status: self.status,
                provider_tx_id: self.tx.to_string(),
                completed_at: Utc::now(),
            })
        }
    }

    struct BrokenTransport;

    #[async_trait]
    impl EventTransport for BrokenTransport {
        async fn publish(&self, _channel: &str, _message: Vec<u8>) -> Result<()> {
            Err(SettlementError::TransportError("connection refused".to_string()))
        }

        async fn subscribe(&self, _channel: &str) -> Result<MessageStream> {
            Err(SettlementError::TransportError("connection refused".to_string()))
        }
    }

    struct StalledTransport;

    #[async_trait]
    impl EventTransport for StalledTransport {
        async fn publish(&self, _channel: &str, _message: Vec<u8>) -> Result<()> {
            std::future::pending::<()>().await;
            Ok(())
        }

        async fn subscribe(&self, _channel: &str) -> Result<MessageStream> {
            Err(SettlementError::TransportError("stalled".to_string()))
        }
    }

    fn request(provider: &str) -> PaymentRequest {
        PaymentRequest {
            lease_id: "lease-1".to_string(),
            lease_payment_id: "lp-1".to_string(),
            user_id: "user-1".to_string(),
            amount: dec!(500),
            currency: "USD".to_string(),
            method: "transfer".to_string(),
            provider: provider.to_string(),
            instrument: None,
        }
    }

    fn scripted(status: PaymentStatus, tx: &'static str) -> (StrategyRegistry, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = StrategyRegistry::new().register(
            "bank_api",
            Box::new(Scripted {
                status,
                tx,
                calls: Arc::clone(&calls),
            }),
        );
        (registry, calls)
    }

    #[tokio::test]
    async fn test_provider_status_and_reference_are_persisted() {
        let store = Arc::new(InMemoryPaymentStore::new());
        let (registry, _) = scripted(PaymentStatus::Completed, "card_tx_9");
        let orchestrator = PaymentOrchestrator::new(
            store.clone(),
            registry,
            Arc::new(InMemoryChannel::new()),
            &Settings::default(),
        );

        let receipt = orchestrator.create_payment(&request("bank_api")).await.unwrap();
        assert_eq!(receipt.status, PaymentStatus::Completed);

        let payment = store.get_payment(receipt.payment_id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Completed);
        assert_eq!(payment.transaction_id.as_deref(), Some("card_tx_9"));
    }

    #[tokio::test]
    async fn test_empty_reference_fails_payment() {
        let store = Arc::new(InMemoryPaymentStore::new());
        let channel = InMemoryChannel::new();
        let mut events = channel.subscribe("payments").await.unwrap();
        let (registry, _) = scripted(PaymentStatus::Processing, "");
        let orchestrator = PaymentOrchestrator::new(
            store.clone(),
            registry,
            Arc::new(channel.clone()),
            &Settings::default(),
        );

        let result = orchestrator.create_payment(&request("bank_api")).await;
        assert!(matches!(result, Err(SettlementError::ProviderRejected(_))));

        let payments = store.all_payments().await.unwrap();
        assert_eq!(payments[0].status, PaymentStatus::Failed);
        channel.close("payments").await.unwrap();
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn test_reported_pending_is_rejected() {
        let store = Arc::new(InMemoryPaymentStore::new());
        let (registry, _) = scripted(PaymentStatus::Pending, "bank_tx_1");
        let orchestrator = PaymentOrchestrator::new(
            store.clone(),
            registry,
            Arc::new(InMemoryChannel::new()),
            &Settings::default(),
        );

        assert!(orchestrator.create_payment(&request("bank_api")).await.is_err());
        assert_eq!(store.all_payments().await.unwrap()[0].status, PaymentStatus::Failed);
    }

    #[tokio::test]
    async fn test_non_positive_amount_is_rejected_before_persisting() {
        let store = Arc::new(InMemoryPaymentStore::new());
        let (registry, calls) = scripted(PaymentStatus::Processing, "bank_tx_1");
        let orchestrator = PaymentOrchestrator::new(
            store.clone(),
            registry,
            Arc::new(InMemoryChannel::new()),
            &Settings::default(),
        );
        let mut req = request("bank_api");
        req.amount = dec!(-5);

        assert!(matches!(
            orchestrator.create_payment(&req).await,
            Err(SettlementError::ValidationError(_))
        ));
        assert!(store.all_payments().await.unwrap().is_empty());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_publish_failure_does_not_fail_request() {
        let store = Arc::new(InMemoryPaymentStore::new());
        let (registry, _) = scripted(PaymentStatus::Processing, "bank_tx_1");
        let orchestrator = PaymentOrchestrator::new(
            store.clone(),
            registry,
            Arc::new(BrokenTransport),
            &Settings::default(),
        );

        let receipt = orchestrator.create_payment(&request("bank_api")).await.unwrap();
        let payment = store.get_payment(receipt.payment_id).await.unwrap().unwrap();
        assert_eq!(payment.status, PaymentStatus::Processing);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_publish_is_bounded() {
        let store = Arc::new(InMemoryPaymentStore::new());
        let (registry, _) = scripted(PaymentStatus::Processing, "bank_tx_1");
        let orchestrator = PaymentOrchestrator::new(
            store.clone(),
            registry,
            Arc::new(StalledTransport),
            &Settings::default(),
        );

        let receipt = orchestrator.create_payment(&request("bank_api")).await.unwrap();
        assert_eq!(receipt.provider_tx_id, "bank_tx_1");
    }
}
