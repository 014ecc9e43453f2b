pub mod bpool;
pub mod erc20;

pub use bpool::BPool;
pub use erc20::IERC20;
