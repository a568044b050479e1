use crate::domain::payment::PaymentStatus;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SettlementError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),
    #[error("Provider rejected payment: {0}")]
    ProviderRejected(String),
    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: PaymentStatus,
        to: PaymentStatus,
    },
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Malformed settlement event: {0}")]
    MalformedEvent(#[from] serde_json::Error),
    #[error("Unexpected event: {0}")]
    UnexpectedEvent(String),
    #[error("Transport error: {0}")]
    TransportError(String),
    #[error("Ledger error: {0}")]
    LedgerError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
}

#[cfg(feature = "storage-rocksdb")]
impl From<rocksdb::Error> for SettlementError {
    fn from(err: rocksdb::Error) -> Self {
        SettlementError::StorageError(err.to_string())
    }
}

#[cfg(feature = "transport-redis")]
impl From<redis::RedisError> for SettlementError {
    fn from(err: redis::RedisError) -> Self {
        SettlementError::TransportError(err.to_string())
    }
}

impl SettlementError {
    /// Errors raised by a provider rail. These mark the payment `FAILED`.
    pub fn is_provider_error(&self) -> bool {
        matches!(
            self,
            SettlementError::ValidationError(_)
                | SettlementError::ProviderUnavailable(_)
                | SettlementError::ProviderRejected(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, SettlementError>;
