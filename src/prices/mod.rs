//! Historical USD price series.
//!
//! - [`client`] - Market-data API fetching (whitelist-bounded, rate-paced)
//! - [`lookup`] - Nearest-sample price resolution

mod client;
mod lookup;

pub use client::{apply_aliases, PriceClient};
pub use lookup::resolve_nearest;

use rustc_hash::FxHashMap;

/// Ordered `(timestamp-ms, price-USD)` samples for one token.
pub type PriceSeries = Vec<(i64, f64)>;

/// Price series per token address (lowercase hex). An absent or empty entry
/// means the token is unpriced and excluded from valuation, not an error.
pub type PriceBook = FxHashMap<String, PriceSeries>;
