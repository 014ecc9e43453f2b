pub mod abis;
pub mod chain;
pub mod config;
pub mod directory;
pub mod factors;
pub mod mining;
pub mod model;
pub mod prices;
pub mod store;
pub mod utils;

pub use chain::ChainClient;
pub use config::Settings;
pub use directory::PoolDirectory;
pub use factors::{AdjustmentPolicy, StandardPolicy};
pub use mining::{RewardAllocator, SnapshotDriver};
pub use prices::PriceClient;
pub use store::ReportStore;
