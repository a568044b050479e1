//! Domain types and the ports the pipeline talks through.

pub mod dead_letter;
pub mod event;
pub mod ledger;
pub mod payment;
pub mod ports;
