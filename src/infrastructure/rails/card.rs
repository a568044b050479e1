use super::{instrument, reference, validate_common};
use crate::domain::payment::{PaymentRequest, PaymentStatus, ProviderResponse};
use crate::domain::ports::PaymentStrategy;
use crate::error::{Result, SettlementError};
use async_trait::async_trait;
use chrono::Utc;

/// Provider name the card rail is registered under.
pub const CARD_PROVIDER: &str = "stripe";

/// Token the simulated processor always declines.
pub const DECLINED_TOKEN: &str = "tok_declined";

/// Card payments are captured synchronously and report `COMPLETED`.
#[derive(Debug, Default)]
pub struct CardStrategy;

impl CardStrategy {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PaymentStrategy for CardStrategy {
    fn validate(&self, request: &PaymentRequest) -> Result<()> {
        validate_common(request)?;
        let token = instrument(request)?;
        if !token.starts_with("tok_") || token.len() <= "tok_".len() {
            return Err(SettlementError::ValidationError(
                "Card payments need a tok_ card token".to_string(),
            ));
        }
        Ok(())
    }

    async fn process(&self, request: &PaymentRequest) -> Result<ProviderResponse> {
        if instrument(request)? == DECLINED_TOKEN {
            return Err(SettlementError::ProviderRejected("card declined".to_string()));
        }
        let provider_tx_id = reference("card_tx");
        tracing::info!(provider_tx = %provider_tx_id, "card charge captured");
        Ok(ProviderResponse {
            status: PaymentStatus::Completed,
            provider_tx_id,
            completed_at: Utc::now(),
        })
    }
}
