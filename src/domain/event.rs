//! Settlement events exchanged between the payment and ledger halves of the
//! pipeline.
//!
//! The wire shape is a flat JSON object. Field names are stable; new fields
//! may be added, so decoding ignores keys it does not know.

use super::payment::{PaymentId, PaymentStatus};
use crate::error::{Result, SettlementError};
use serde::{Deserialize, Serialize};

/// Event name carried by every settlement event.
pub const PAYMENT_COMPLETED: &str = "payment.completed";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettlementEvent {
    pub event: String,
    pub payment_id: PaymentId,
    pub provider_tx: String,
    pub status: PaymentStatus,
}

impl SettlementEvent {
    pub fn payment_completed(
        payment_id: PaymentId,
        provider_tx: String,
        status: PaymentStatus,
    ) -> Self {
        Self {
            event: PAYMENT_COMPLETED.to_string(),
            payment_id,
            provider_tx,
            status,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parses a payload, rejecting anything that is not a `payment.completed` event.
    pub fn decode(payload: &[u8]) -> Result<Self> {
        let event: SettlementEvent = serde_json::from_slice(payload)?;
        if event.event != PAYMENT_COMPLETED {
            return Err(SettlementError::UnexpectedEvent(event.event));
        }
        Ok(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let id = PaymentId::new();
        let event = SettlementEvent::payment_completed(
            id,
            "bank_tx_123".to_string(),
            PaymentStatus::Processing,
        );
        let value: serde_json::Value = serde_json::from_slice(&event.encode().unwrap()).unwrap();

        assert_eq!(value["event"], "payment.completed");
        assert_eq!(value["payment_id"], id.to_string());
        assert_eq!(value["provider_tx"], "bank_tx_123");
        assert_eq!(value["status"], "PROCESSING");
        assert_eq!(value.as_object().unwrap().len(), 4);
    }

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let id = PaymentId::new();
        let payload = format!(
            r#"{{"event":"payment.completed","payment_id":"{}","provider_tx":"card_tx_1","status":"COMPLETED","trace":"abc"}}"#,
            id
        );
        let event = SettlementEvent::decode(payload.as_bytes()).unwrap();
        assert_eq!(event.payment_id, id);
        assert_eq!(event.status, PaymentStatus::Completed);
    }

    #[test]
    fn test_decode_rejects_malformed_payload() {
        assert!(matches!(
            SettlementEvent::decode(b"not json"),
            Err(SettlementError::MalformedEvent(_))
        ));
        assert!(matches!(
            SettlementEvent::decode(br#"{"event":"payment.completed"}"#),
            Err(SettlementError::MalformedEvent(_))
        ));
    }

    #[test]
    fn test_decode_rejects_other_events() {
        let payload = format!(
            r#"{{"event":"payment.refunded","payment_id":"{}","provider_tx":"x","status":"COMPLETED"}}"#,
            PaymentId::new()
        );
        assert!(matches!(
            SettlementEvent::decode(payload.as_bytes()),
            Err(SettlementError::UnexpectedEvent(name)) if name == "payment.refunded"
        ));
    }
}
