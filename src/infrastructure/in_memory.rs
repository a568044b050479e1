use crate::domain::dead_letter::DeadLetter;
use crate::domain::ledger::{LedgerStatus, LedgerTransaction};
use crate::domain::payment::{Payment, PaymentId, PaymentStatus};
use crate::domain::ports::{DeadLetterSink, LedgerStore, PaymentStore};
use crate::error::{Result, SettlementError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory store for payments.
///
/// Each write holds the lock for the whole read-modify-write, so updates to a
/// single payment are atomic.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    payments: Arc<RwLock<HashMap<PaymentId, Payment>>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn create_payment(&self, payment: Payment) -> Result<()> {
        let mut payments = self.payments.write().await;
        payments.insert(payment.id, payment);
        Ok(())
    }

    async fn update_payment_status(
        &self,
        id: PaymentId,
        status: PaymentStatus,
        transaction_id: Option<String>,
    ) -> Result<Payment> {
        let mut payments = self.payments.write().await;
        let payment = payments
            .get_mut(&id)
            .ok_or_else(|| SettlementError::NotFound(format!("payment {}", id)))?;
        payment.transition(status, transaction_id)?;
        Ok(payment.clone())
    }

    async fn link_payment_to_ledger_tx(&self, id: PaymentId, tx_hash: &str) -> Result<()> {
        let mut payments = self.payments.write().await;
        let payment = payments
            .get_mut(&id)
            .ok_or_else(|| SettlementError::NotFound(format!("payment {}", id)))?;
        payment.link_ledger_tx(tx_hash)
    }

    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        let payments = self.payments.read().await;
        Ok(payments.get(&id).cloned())
    }

    async fn all_payments(&self) -> Result<Vec<Payment>> {
        let payments = self.payments.read().await;
        let mut all: Vec<Payment> = payments.values().cloned().collect();
        all.sort_by_key(|p| p.created_at);
        Ok(all)
    }
}

/// A thread-safe in-memory store for ledger transactions, keyed by hash.
#[derive(Default, Clone)]
pub struct InMemoryLedgerStore {
    transactions: Arc<RwLock<HashMap<String, LedgerTransaction>>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn save_ledger_transaction(&self, tx: LedgerTransaction) -> Result<()> {
        let mut transactions = self.transactions.write().await;
        transactions.insert(tx.tx_hash.clone(), tx);
        Ok(())
    }

    async fn update_ledger_transaction_status(
        &self,
        tx_hash: &str,
        status: LedgerStatus,
    ) -> Result<LedgerTransaction> {
        let mut transactions = self.transactions.write().await;
        let tx = transactions
            .get_mut(tx_hash)
            .ok_or_else(|| SettlementError::NotFound(format!("ledger transaction {}", tx_hash)))?;
        tx.apply_status(status);
        Ok(tx.clone())
    }

    async fn get_ledger_transaction(&self, tx_hash: &str) -> Result<Option<LedgerTransaction>> {
        let transactions = self.transactions.read().await;
        Ok(transactions.get(tx_hash).cloned())
    }

    async fn all_ledger_transactions(&self) -> Result<Vec<LedgerTransaction>> {
        let transactions = self.transactions.read().await;
        let mut all: Vec<LedgerTransaction> = transactions.values().cloned().collect();
        all.sort_by_key(|tx| tx.created_at);
        Ok(all)
    }
}

/// Keeps dead letters in memory and logs each one as it arrives.
#[derive(Default, Clone)]
pub struct InMemoryDeadLetters {
    letters: Arc<RwLock<Vec<DeadLetter>>>,
}

impl InMemoryDeadLetters {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn letters(&self) -> Vec<DeadLetter> {
        self.letters.read().await.clone()
    }
}

#[async_trait]
impl DeadLetterSink for InMemoryDeadLetters {
    async fn record(&self, letter: DeadLetter) {
        tracing::error!(
            kind = ?letter.kind,
            reference = %letter.reference,
            reason = %letter.reason,
            "dead letter recorded"
        );
        self.letters.write().await.push(letter);
    }
}
