//! Value extraction from payslip text.

pub mod extractor;

pub use extractor::*;
