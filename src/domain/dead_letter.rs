use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeadLetterKind {
    /// A settlement event that could not be decoded.
    MalformedEvent,
    /// No ledger destination or amount could be resolved for the payment.
    UnresolvedTarget,
    /// The ledger refused or failed to accept the transfer.
    LedgerSubmission,
    /// The ledger accepted the transfer but recording it failed.
    Persistence,
    /// No confirmation arrived before the poller deadline.
    ConfirmationTimeout,
    /// The confirmation poller stopped abnormally.
    PollerAborted,
}

/// Work the pipeline gave up on, kept for operator follow-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetter {
    pub kind: DeadLetterKind,
    /// Payment id, ledger hash, or the raw payload for undecodable events.
    pub reference: String,
    pub reason: String,
    pub recorded_at: DateTime<Utc>,
}

impl DeadLetter {
    pub fn new(
        kind: DeadLetterKind,
        reference: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            reference: reference.into(),
            reason: reason.into(),
            recorded_at: Utc::now(),
        }
    }
}
