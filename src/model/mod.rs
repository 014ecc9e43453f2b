//! Data model for the reward calculation.
//!
//! - [`pool`] - Pool directory records (subgraph snapshot state)
//! - [`valuation`] - Per-pool valuation results and skip reasons
//! - [`rewards`] - Per-block reward snapshots and user breakdowns

pub mod pool;
pub mod rewards;
pub mod valuation;

pub use pool::{BlockHeader, Pool};
pub use rewards::{RewardSnapshot, UserPoolShare};
pub use valuation::{PoolOutcome, PoolValuation, SkipReason, TokenValuation};
