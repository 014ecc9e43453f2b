//! Point-in-time chain state reads.
//!
//! Every contract read is pinned to an explicit historical block so a run
//! is reproducible against an archive node. Raw integer results are scaled
//! into decimals here; callers never see wei-denominated values.

mod provider;

pub use provider::ChainClient;
