use lease_settlement::domain::ledger::LedgerStatus;
use lease_settlement::domain::payment::{Payment, PaymentRequest, PaymentStatus};
use lease_settlement::domain::ports::{EventTransportRef, LedgerAdapterRef, PaymentStoreRef};
use lease_settlement::infrastructure::channel::InMemoryChannel;
use lease_settlement::infrastructure::in_memory::InMemoryPaymentStore;
use lease_settlement::infrastructure::ledger::SimulatedLedger;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tokio_stream::StreamExt;

#[tokio::test]
async fn test_ports_as_trait_objects() {
    let payment_store: PaymentStoreRef = Arc::new(InMemoryPaymentStore::new());
    let transport: EventTransportRef = Arc::new(InMemoryChannel::new());
    let ledger: LedgerAdapterRef = Arc::new(SimulatedLedger::new("0:wallet", 1));

    let payment = Payment::pending(&PaymentRequest {
        lease_id: "lease-1".to_string(),
        lease_payment_id: "lp-1".to_string(),
        user_id: "user-1".to_string(),
        amount: dec!(100.0),
        currency: "USD".to_string(),
        method: "card".to_string(),
        provider: "stripe".to_string(),
        instrument: Some("tok_visa".to_string()),
    })
    .unwrap();
    let id = payment.id;

    let mut events = transport.subscribe("payments").await.unwrap();

    // Verify Send + Sync by spawning tasks
    let store_handle = tokio::spawn({
        let payment_store = payment_store.clone();
        async move {
            payment_store.create_payment(payment).await.unwrap();
            payment_store
                .update_payment_status(id, PaymentStatus::Completed, Some("card_tx_1".to_string()))
                .await
                .unwrap()
        }
    });

    let transport_handle = tokio::spawn({
        let transport = transport.clone();
        async move { transport.publish("payments", b"hello".to_vec()).await.unwrap() }
    });

    let ledger_handle = tokio::spawn(async move {
        let submission = ledger.submit("0:lessor", dec!(100.0)).await.unwrap();
        ledger.check_status(&submission.tx_hash).await.unwrap()
    });

    let updated = store_handle.await.unwrap();
    assert_eq!(updated.status, PaymentStatus::Completed);
    assert_eq!(updated.transaction_id.as_deref(), Some("card_tx_1"));

    transport_handle.await.unwrap();
    assert_eq!(events.next().await, Some(b"hello".to_vec()));

    assert_eq!(ledger_handle.await.unwrap(), LedgerStatus::Confirmed);
}
