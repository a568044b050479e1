use crate::error::{Result, SettlementError};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Opaque payment identifier, generated when the payment is first persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PaymentId(Uuid);

impl PaymentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for PaymentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PaymentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for PaymentId {
    type Err = SettlementError;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| SettlementError::ValidationError(format!("invalid payment id: {}", e)))
    }
}

/// Represents a positive monetary amount for a payment.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Amount(Decimal);

impl Amount {
    pub fn new(value: Decimal) -> Result<Self> {
        if value > Decimal::ZERO {
            Ok(Self(value))
        } else {
            Err(SettlementError::ValidationError(
                "Amount must be positive".to_string(),
            ))
        }
    }

    pub fn value(&self) -> Decimal {
        self.0
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = SettlementError;

    fn try_from(value: Decimal) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Amount> for Decimal {
    fn from(amount: Amount) -> Self {
        amount.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl PaymentStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PaymentStatus::Completed | PaymentStatus::Failed)
    }

    /// Whether the lifecycle allows moving from `self` to `next`.
    pub fn can_transition_to(&self, next: PaymentStatus) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, next),
            (Pending, Processing | Completed | Failed) | (Processing, Completed | Failed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Processing => "PROCESSING",
            PaymentStatus::Completed => "COMPLETED",
            PaymentStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to settle one lease payment through a provider rail.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PaymentRequest {
    pub lease_id: String,
    #[serde(default)]
    pub lease_payment_id: String,
    #[serde(default)]
    pub user_id: String,
    pub amount: Decimal,
    pub currency: String,
    #[serde(default)]
    pub method: String,
    pub provider: String,
    /// Payer instrument understood by the rail: an account number for bank
    /// transfers, a card token for card payments.
    #[serde(default)]
    pub instrument: Option<String>,
}

/// What a provider rail reports after accepting a payment.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub status: PaymentStatus,
    pub provider_tx_id: String,
    pub completed_at: DateTime<Utc>,
}

/// Returned to the caller of `PaymentOrchestrator::create_payment`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PaymentReceipt {
    pub payment_id: PaymentId,
    pub status: PaymentStatus,
    pub provider_tx_id: String,
    pub created_at: DateTime<Utc>,
}

/// The persisted state of a lease payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub lease_id: String,
    pub lease_payment_id: String,
    pub user_id: String,
    pub amount: Amount,
    pub currency: String,
    pub method: String,
    pub provider: String,
    pub status: PaymentStatus,
    /// Reference assigned by the provider rail.
    pub transaction_id: Option<String>,
    /// Hash of the ledger transaction recording this payment, once submitted.
    pub ledger_tx_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    /// Builds a `PENDING` payment from a request. Fails on a non-positive amount.
    pub fn pending(request: &PaymentRequest) -> Result<Self> {
        let now = Utc::now();
        Ok(Self {
            id: PaymentId::new(),
            lease_id: request.lease_id.clone(),
            lease_payment_id: request.lease_payment_id.clone(),
            user_id: request.user_id.clone(),
            amount: Amount::new(request.amount)?,
            currency: request.currency.clone(),
            method: request.method.clone(),
            provider: request.provider.clone(),
            status: PaymentStatus::Pending,
            transaction_id: None,
            ledger_tx_hash: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Moves the payment to `status`, optionally recording the provider reference.
    ///
    /// Terminal payments are never mutated; re-applying the current terminal
    /// status is a no-op so redelivered confirmations are harmless.
    pub fn transition(
        &mut self,
        status: PaymentStatus,
        transaction_id: Option<String>,
    ) -> Result<()> {
        if self.status == status && status.is_terminal() {
            return Ok(());
        }
        if !self.status.can_transition_to(status) {
            return Err(SettlementError::InvalidTransition {
                from: self.status,
                to: status,
            });
        }
        self.status = status;
        if let Some(tx) = transaction_id {
            self.transaction_id = Some(tx);
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Records the ledger transaction hash. Failed payments are never linked.
    pub fn link_ledger_tx(&mut self, tx_hash: &str) -> Result<()> {
        if self.status == PaymentStatus::Failed {
            return Err(SettlementError::InvalidTransition {
                from: self.status,
                to: self.status,
            });
        }
        self.ledger_tx_hash = Some(tx_hash.to_string());
        self.updated_at = Utc::now();
        Ok(())
    }
}
