use super::dead_letter::DeadLetter;
use super::ledger::{LedgerStatus, LedgerSubmission, LedgerTransaction};
use super::payment::{Payment, PaymentId, PaymentRequest, PaymentStatus, ProviderResponse};
use crate::error::Result;
use async_trait::async_trait;
use futures_util::Stream;
use rust_decimal::Decimal;
use std::pin::Pin;
use std::sync::Arc;

#[async_trait]
pub trait PaymentStore: Send + Sync {
    async fn create_payment(&self, payment: Payment) -> Result<()>;
    /// Applies a lifecycle transition and returns the updated payment.
    async fn update_payment_status(
        &self,
        id: PaymentId,
        status: PaymentStatus,
        transaction_id: Option<String>,
    ) -> Result<Payment>;
    async fn link_payment_to_ledger_tx(&self, id: PaymentId, tx_hash: &str) -> Result<()>;
    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>>;
    async fn all_payments(&self) -> Result<Vec<Payment>>;
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn save_ledger_transaction(&self, tx: LedgerTransaction) -> Result<()>;
    /// Applies a ledger-reported status. Repeating a confirmation is a no-op.
    async fn update_ledger_transaction_status(
        &self,
        tx_hash: &str,
        status: LedgerStatus,
    ) -> Result<LedgerTransaction>;
    async fn get_ledger_transaction(&self, tx_hash: &str) -> Result<Option<LedgerTransaction>>;
    async fn all_ledger_transactions(&self) -> Result<Vec<LedgerTransaction>>;
}

/// Messages delivered to one subscriber, in publish order.
pub type MessageStream = Pin<Box<dyn Stream<Item = Vec<u8>> + Send>>;

/// Fire-and-forget publish/subscribe transport.
///
/// `publish` returns once the transport has the message. Nothing is
/// acknowledged or persisted: a subscriber only sees messages published while
/// its subscription is live.
#[async_trait]
pub trait EventTransport: Send + Sync {
    async fn publish(&self, channel: &str, message: Vec<u8>) -> Result<()>;
    async fn subscribe(&self, channel: &str) -> Result<MessageStream>;
    /// Stops accepting messages on `channel` so local subscriptions can drain
    /// and end. Transports without that notion keep the default no-op.
    async fn close(&self, _channel: &str) -> Result<()> {
        Ok(())
    }
}

/// One external payment rail.
#[async_trait]
pub trait PaymentStrategy: Send + Sync {
    /// Checks the fields this rail needs. Must not have side effects.
    fn validate(&self, request: &PaymentRequest) -> Result<()>;
    /// Submits the payment to the rail. Not retried.
    async fn process(&self, request: &PaymentRequest) -> Result<ProviderResponse>;
}

#[async_trait]
pub trait LedgerAdapter: Send + Sync {
    async fn submit(&self, destination: &str, amount: Decimal) -> Result<LedgerSubmission>;
    async fn check_status(&self, tx_hash: &str) -> Result<LedgerStatus>;
}

/// Where and how much to transfer on the ledger for a settled payment.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementTarget {
    pub destination: String,
    pub amount: Decimal,
}

#[async_trait]
pub trait LeaseDirectory: Send + Sync {
    async fn settlement_target(&self, payment_id: PaymentId) -> Result<SettlementTarget>;
}

#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    async fn record(&self, letter: DeadLetter);
}

pub type PaymentStoreRef = Arc<dyn PaymentStore>;
pub type LedgerStoreRef = Arc<dyn LedgerStore>;
pub type EventTransportRef = Arc<dyn EventTransport>;
pub type LedgerAdapterRef = Arc<dyn LedgerAdapter>;
pub type LeaseDirectoryRef = Arc<dyn LeaseDirectory>;
pub type DeadLetterSinkRef = Arc<dyn DeadLetterSink>;
pub type PaymentStrategyBox = Box<dyn PaymentStrategy>;
