use crate::domain::payment::PaymentId;
use crate::domain::ports::{LeaseDirectory, PaymentStoreRef, SettlementTarget};
use crate::error::{Result, SettlementError};
use async_trait::async_trait;
use std::collections::HashMap;

/// Resolves ledger transfers from the payment record and a lease → address map.
///
/// Leases without an entry settle to the default recipient.
pub struct StaticLeaseDirectory {
    payments: PaymentStoreRef,
    default_recipient: String,
    recipients: HashMap<String, String>,
}

impl StaticLeaseDirectory {
    pub fn new(payments: PaymentStoreRef, default_recipient: impl Into<String>) -> Self {
        Self {
            payments,
            default_recipient: default_recipient.into(),
            recipients: HashMap::new(),
        }
    }

    pub fn with_recipient(
        mut self,
        lease_id: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        self.recipients.insert(lease_id.into(), address.into());
        self
    }
}

#[async_trait]
impl LeaseDirectory for StaticLeaseDirectory {
    async fn settlement_target(&self, payment_id: PaymentId) -> Result<SettlementTarget> {
        let payment = self
            .payments
            .get_payment(payment_id)
            .await?
            .ok_or_else(|| SettlementError::NotFound(format!("payment {}", payment_id)))?;
        let destination = self
            .recipients
            .get(&payment.lease_id)
            .unwrap_or(&self.default_recipient)
            .clone();
        Ok(SettlementTarget {
            destination,
            amount: payment.amount.value(),
        })
    }
}
