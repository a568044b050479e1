use crate::domain::ledger::{LedgerStatus, LedgerTransaction};
use crate::domain::payment::{Payment, PaymentId, PaymentStatus};
use crate::domain::ports::{LedgerStore, PaymentStore};
use crate::error::{Result, SettlementError};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Column Family for storing payments.
pub const CF_PAYMENTS: &str = "payments";
/// Column Family for storing ledger transactions.
pub const CF_LEDGER: &str = "ledger_transactions";

/// A persistent store implementation using RocksDB.
///
/// Payments and ledger transactions live in separate Column Families as JSON
/// values. Read-modify-write updates are serialized through `write_lock` so
/// each update stays atomic per identifier.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
    write_lock: Arc<Mutex<()>>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_payments = ColumnFamilyDescriptor::new(CF_PAYMENTS, Options::default());
        let cf_ledger = ColumnFamilyDescriptor::new(CF_LEDGER, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_payments, cf_ledger])?;

        Ok(Self {
            db: Arc::new(db),
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn put<T: Serialize>(&self, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        let bytes = serde_json::to_vec(value)
            .map_err(|e| SettlementError::StorageError(format!("Serialization error: {}", e)))?;
        self.db.put_cf(cf, key, bytes)?;
        Ok(())
    }

    fn read<T: DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key)? {
            Some(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(|e| {
                SettlementError::StorageError(format!("Deserialization error: {}", e))
            }),
            None => Ok(None),
        }
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut values = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            let decoded = serde_json::from_slice(&value).map_err(|e| {
                SettlementError::StorageError(format!("Deserialization error: {}", e))
            })?;
            values.push(decoded);
        }
        Ok(values)
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            SettlementError::StorageError(format!("{} column family not found", name))
        })
    }
}

#[async_trait]
impl PaymentStore for RocksDBStore {
    async fn create_payment(&self, payment: Payment) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.put(CF_PAYMENTS, payment.id.as_bytes(), &payment)
    }

    async fn update_payment_status(
        &self,
        id: PaymentId,
        status: PaymentStatus,
        transaction_id: Option<String>,
    ) -> Result<Payment> {
        let _guard = self.write_lock.lock().await;
        let mut payment: Payment = self
            .read(CF_PAYMENTS, id.as_bytes())?
            .ok_or_else(|| SettlementError::NotFound(format!("payment {}", id)))?;
        payment.transition(status, transaction_id)?;
        self.put(CF_PAYMENTS, id.as_bytes(), &payment)?;
        Ok(payment)
    }

    async fn link_payment_to_ledger_tx(&self, id: PaymentId, tx_hash: &str) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut payment: Payment = self
            .read(CF_PAYMENTS, id.as_bytes())?
            .ok_or_else(|| SettlementError::NotFound(format!("payment {}", id)))?;
        payment.link_ledger_tx(tx_hash)?;
        self.put(CF_PAYMENTS, id.as_bytes(), &payment)
    }

    async fn get_payment(&self, id: PaymentId) -> Result<Option<Payment>> {
        self.read(CF_PAYMENTS, id.as_bytes())
    }

    async fn all_payments(&self) -> Result<Vec<Payment>> {
        let mut payments: Vec<Payment> = self.scan(CF_PAYMENTS)?;
        payments.sort_by_key(|p| p.created_at);
        Ok(payments)
    }
}

#[async_trait]
impl LedgerStore for RocksDBStore {
    async fn save_ledger_transaction(&self, tx: LedgerTransaction) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        self.put(CF_LEDGER, tx.tx_hash.as_bytes(), &tx)
    }

    async fn update_ledger_transaction_status(
        &self,
        tx_hash: &str,
        status: LedgerStatus,
    ) -> Result<LedgerTransaction> {
        let _guard = self.write_lock.lock().await;
        let mut tx: LedgerTransaction = self
            .read(CF_LEDGER, tx_hash.as_bytes())?
            .ok_or_else(|| SettlementError::NotFound(format!("ledger transaction {}", tx_hash)))?;
        if tx.apply_status(status) {
            self.put(CF_LEDGER, tx_hash.as_bytes(), &tx)?;
        }
        Ok(tx)
    }

    async fn get_ledger_transaction(&self, tx_hash: &str) -> Result<Option<LedgerTransaction>> {
        self.read(CF_LEDGER, tx_hash.as_bytes())
    }

    async fn all_ledger_transactions(&self) -> Result<Vec<LedgerTransaction>> {
        let mut transactions: Vec<LedgerTransaction> = self.scan(CF_LEDGER)?;
        transactions.sort_by_key(|tx| tx.created_at);
        Ok(transactions)
    }
}
