//! Outer interfaces: CSV input of payment requests and the settlement report.

pub mod csv;
