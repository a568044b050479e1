//! Application layer: the two halves of the settlement pipeline.
//!
//! The payment side (`selector`, `orchestrator`) turns requests into provider
//! calls and publishes a settlement event per accepted payment. The ledger
//! side (`recorder`, `poller`) consumes those events, records transfers on the
//! ledger and tracks them until they confirm. The halves only share storage
//! and the event transport.

pub mod orchestrator;
pub mod poller;
pub mod recorder;
pub mod selector;
