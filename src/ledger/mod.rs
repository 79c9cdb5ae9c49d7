//! Per-month aggregation of extracted values.

pub mod monthly;

pub use monthly::*;
