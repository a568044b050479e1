//! Simulated payment rails.
//!
//! Neither rail talks to a real network; they reproduce the responses and
//! failure modes the orchestrator has to handle.

pub mod bank;
pub mod card;

use crate::application::selector::StrategyRegistry;
use crate::config::Settings;
use crate::domain::payment::PaymentRequest;
use crate::error::{Result, SettlementError};
use bank::{BANK_PROVIDER, BankAdapter, BankStrategy};
use card::{CARD_PROVIDER, CardStrategy};
use rust_decimal::Decimal;
use uuid::Uuid;

/// Registry with the bank and card rails under their provider names.
pub fn standard_registry(settings: &Settings) -> StrategyRegistry {
    StrategyRegistry::new()
        .register(
            BANK_PROVIDER,
            Box::new(BankStrategy::new(BankAdapter::new(settings.bank_endpoint.clone()))),
        )
        .register(CARD_PROVIDER, Box::new(CardStrategy::new()))
}

/// Checks shared by every rail: a positive amount and an ISO-4217 style code.
pub(crate) fn validate_common(request: &PaymentRequest) -> Result<()> {
    if request.amount <= Decimal::ZERO {
        return Err(SettlementError::ValidationError(
            "Amount must be positive".to_string(),
        ));
    }
    let currency = request.currency.as_bytes();
    if currency.len() != 3 || !currency.iter().all(u8::is_ascii_uppercase) {
        return Err(SettlementError::ValidationError(format!(
            "Invalid currency code: {:?}",
            request.currency
        )));
    }
    Ok(())
}

pub(crate) fn instrument(request: &PaymentRequest) -> Result<&str> {
    request
        .instrument
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| SettlementError::ValidationError("Missing payer instrument".to_string()))
}

pub(crate) fn reference(prefix: &str) -> String {
    format!("{}_{}", prefix, Uuid::new_v4().simple())
}
