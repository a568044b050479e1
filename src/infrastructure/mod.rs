//! Adapters implementing the domain ports.

pub mod channel;
pub mod directory;
pub mod in_memory;
pub mod ledger;
pub mod rails;
#[cfg(feature = "transport-redis")]
pub mod redis;
#[cfg(feature = "storage-rocksdb")]
pub mod rocksdb;
