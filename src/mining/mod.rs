//! The valuation-and-allocation engine.
//!
//! - [`valuation`] - Values one pool at one block (fetch stage + pure compute)
//! - [`aggregate`] - Balancer-wide token totals and cap correction
//! - [`allocator`] - Three-pass per-block reward allocation
//! - [`driver`] - Walks the block range and persists snapshots

pub mod aggregate;
pub mod allocator;
pub mod driver;
pub mod valuation;

pub use aggregate::{fold_market_caps, pool_market_cap, TokenMarketCaps};
pub use allocator::RewardAllocator;
pub use driver::SnapshotDriver;
pub use valuation::PoolValuationEngine;
