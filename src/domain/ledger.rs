use super::payment::PaymentId;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LedgerStatus {
    Submitted,
    Confirmed,
}

impl fmt::Display for LedgerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerStatus::Submitted => f.write_str("SUBMITTED"),
            LedgerStatus::Confirmed => f.write_str("CONFIRMED"),
        }
    }
}

/// What the ledger adapter hands back after accepting a transfer.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerSubmission {
    pub tx_hash: String,
    pub from: String,
    pub to: String,
    pub amount: Decimal,
    pub status: LedgerStatus,
}

/// A transfer recorded on the external ledger, tracked until confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerTransaction {
    pub tx_hash: String,
    pub payment_id: PaymentId,
    pub from_address: String,
    pub to_address: String,
    pub amount: Decimal,
    pub status: LedgerStatus,
    pub confirmed: bool,
    pub confirmed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LedgerTransaction {
    /// Records a transfer in the status the adapter reported when accepting it.
    pub fn from_submission(payment_id: PaymentId, submission: LedgerSubmission) -> Self {
        let now = Utc::now();
        let confirmed = submission.status == LedgerStatus::Confirmed;
        Self {
            tx_hash: submission.tx_hash,
            payment_id,
            from_address: submission.from,
            to_address: submission.to,
            amount: submission.amount,
            status: submission.status,
            confirmed,
            confirmed_at: confirmed.then_some(now),
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies a status reported by the ledger.
    ///
    /// Returns `true` when the record changed. Confirmation is sticky: a
    /// confirmed transaction keeps its original confirmation time.
    pub fn apply_status(&mut self, status: LedgerStatus) -> bool {
        match (self.status, status) {
            (LedgerStatus::Confirmed, _) => false,
            (LedgerStatus::Submitted, LedgerStatus::Submitted) => false,
            (LedgerStatus::Submitted, LedgerStatus::Confirmed) => {
                let now = Utc::now();
                self.status = LedgerStatus::Confirmed;
                self.confirmed = true;
                self.confirmed_at = Some(now);
                self.updated_at = now;
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn submitted() -> LedgerTransaction {
        LedgerTransaction::from_submission(
            PaymentId::new(),
            LedgerSubmission {
                tx_hash: "ltx_1".to_string(),
                from: "0:wallet".to_string(),
                to: "0:lessor".to_string(),
                amount: dec!(500),
                status: LedgerStatus::Submitted,
            },
        )
    }

    #[test]
    fn test_submission_status_is_kept() {
        let tx = submitted();
        assert_eq!(tx.status, LedgerStatus::Submitted);
        assert!(!tx.confirmed);
        assert!(tx.confirmed_at.is_none());

        let tx = LedgerTransaction::from_submission(
            PaymentId::new(),
            LedgerSubmission {
                tx_hash: "ltx_2".to_string(),
                from: "0:wallet".to_string(),
                to: "0:lessor".to_string(),
                amount: dec!(500),
                status: LedgerStatus::Confirmed,
            },
        );
        assert_eq!(tx.status, LedgerStatus::Confirmed);
        assert!(tx.confirmed);
        assert_eq!(tx.confirmed_at, Some(tx.created_at));
    }

    #[test]
    fn test_confirm_sets_flag_and_timestamp() {
        let mut tx = submitted();
        assert!(tx.apply_status(LedgerStatus::Confirmed));
        assert_eq!(tx.status, LedgerStatus::Confirmed);
        assert!(tx.confirmed);
        assert!(tx.confirmed_at.is_some());
    }

    #[test]
    fn test_confirm_twice_keeps_first_timestamp() {
        let mut tx = submitted();
        tx.apply_status(LedgerStatus::Confirmed);
        let first = tx.confirmed_at;

        assert!(!tx.apply_status(LedgerStatus::Confirmed));
        assert!(!tx.apply_status(LedgerStatus::Submitted));
        assert_eq!(tx.confirmed_at, first);
        assert_eq!(tx.status, LedgerStatus::Confirmed);
    }
}
