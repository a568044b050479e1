use crate::domain::ledger::LedgerTransaction;
use crate::domain::payment::{Payment, PaymentStatus};
use crate::error::Result;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;

/// One line of the settlement report.
#[derive(Debug, Serialize)]
struct PaymentRow<'a> {
    payment_id: String,
    lease_id: &'a str,
    provider: &'a str,
    amount: Decimal,
    currency: &'a str,
    status: PaymentStatus,
    provider_tx: &'a str,
    ledger_tx: &'a str,
    confirmed: bool,
}

/// Writes the final state of each payment, joined with its ledger transaction.
pub struct PaymentWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> PaymentWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_payments(
        &mut self,
        payments: &[Payment],
        ledger: &[LedgerTransaction],
    ) -> Result<()> {
        let by_hash: HashMap<&str, &LedgerTransaction> =
            ledger.iter().map(|tx| (tx.tx_hash.as_str(), tx)).collect();

        for payment in payments {
            let ledger_tx = payment.ledger_tx_hash.as_deref().unwrap_or_default();
            let confirmed = by_hash.get(ledger_tx).is_some_and(|tx| tx.confirmed);
            self.writer.serialize(PaymentRow {
                payment_id: payment.id.to_string(),
                lease_id: &payment.lease_id,
                provider: &payment.provider,
                amount: payment.amount.value().normalize(),
                currency: &payment.currency,
                status: payment.status,
                provider_tx: payment.transaction_id.as_deref().unwrap_or_default(),
                ledger_tx,
                confirmed,
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ledger::{LedgerStatus, LedgerSubmission};
    use crate::domain::payment::PaymentRequest;
    use rust_decimal_macros::dec;

    #[test]
    fn test_writes_joined_rows() {
        let mut payment = Payment::pending(&PaymentRequest {
            lease_id: "lease-1".to_string(),
            lease_payment_id: String::new(),
            user_id: String::new(),
            amount: dec!(500.00),
            currency: "USD".to_string(),
            method: String::new(),
            provider: "bank_api".to_string(),
            instrument: None,
        })
        .unwrap();
        payment
            .transition(PaymentStatus::Processing, Some("bank_tx_1".to_string()))
            .unwrap();
        payment.link_ledger_tx("ltx_1").unwrap();

        let mut tx = LedgerTransaction::from_submission(
            payment.id,
            LedgerSubmission {
                tx_hash: "ltx_1".to_string(),
                from: "0:wallet".to_string(),
                to: "0:lessor".to_string(),
                amount: dec!(500),
                status: LedgerStatus::Submitted,
            },
        );
        tx.apply_status(LedgerStatus::Confirmed);

        let mut out = Vec::new();
        PaymentWriter::new(&mut out)
            .write_payments(&[payment.clone()], &[tx])
            .unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.starts_with(
            "payment_id,lease_id,provider,amount,currency,status,provider_tx,ledger_tx,confirmed\n"
        ));
        assert!(text.contains(&format!(
            "{},lease-1,bank_api,500,USD,PROCESSING,bank_tx_1,ltx_1,true",
            payment.id
        )));
    }
}
