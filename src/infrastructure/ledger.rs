use crate::domain::ledger::{LedgerStatus, LedgerSubmission};
use crate::domain::ports::LedgerAdapter;
use crate::error::{Result, SettlementError};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// A stand-in for the blockchain ledger.
///
/// Transfers are accepted immediately and report `CONFIRMED` on the
/// `confirm_after`-th status check. Signing is out of scope; the wallet
/// address only labels the source of each transfer.
#[derive(Clone)]
pub struct SimulatedLedger {
    wallet: String,
    confirm_after: u32,
    checks: Arc<Mutex<HashMap<String, u32>>>,
}

impl SimulatedLedger {
    pub fn new(wallet: impl Into<String>, confirm_after: u32) -> Self {
        Self {
            wallet: wallet.into(),
            confirm_after,
            checks: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl LedgerAdapter for SimulatedLedger {
    async fn submit(&self, destination: &str, amount: Decimal) -> Result<LedgerSubmission> {
        if self.wallet.is_empty() {
            return Err(SettlementError::LedgerError("ledger wallet not configured".to_string()));
        }
        if destination.is_empty() {
            return Err(SettlementError::LedgerError("missing destination address".to_string()));
        }
        let tx_hash = format!("ltx_{}", Uuid::new_v4().simple());
        self.checks.lock().await.insert(tx_hash.clone(), 0);
        tracing::info!(tx_hash = %tx_hash, destination, %amount, "ledger transfer submitted");
        Ok(LedgerSubmission {
            tx_hash,
            from: self.wallet.clone(),
            to: destination.to_string(),
            amount,
            status: LedgerStatus::Submitted,
        })
    }

    async fn check_status(&self, tx_hash: &str) -> Result<LedgerStatus> {
        let mut checks = self.checks.lock().await;
        let count = checks.get_mut(tx_hash).ok_or_else(|| {
            SettlementError::LedgerError(format!("unknown transaction {}", tx_hash))
        })?;
        *count += 1;
        if *count >= self.confirm_after {
            Ok(LedgerStatus::Confirmed)
        } else {
            Ok(LedgerStatus::Submitted)
        }
    }
}
