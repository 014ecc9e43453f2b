//! Numeric utilities for the balmine reward calculator.
//!
//! - [`conversion`] - Raw chain integer scaling, decimal truncation, f64 lifting

mod conversion;

pub use conversion::{bdec, truncate18, u256_to_scaled};
