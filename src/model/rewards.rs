use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

/// One user's stake in one pool at one block, as persisted in the reward
/// record. Decimal fields serialize as strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPoolShare {
    pub pool: String,
    pub fee_factor: BigDecimal,
    pub bal_and_ratio_factor: BigDecimal,
    pub wrap_factor: BigDecimal,
    /// User's slice of the cap-corrected pool value, in USD.
    pub value_usd: BigDecimal,
    /// User's slice of the factor-adjusted pool value, in USD. This is the
    /// amount that feeds the reward conversion.
    pub factor_usd: BigDecimal,
}

/// Rewards for one snapshot block. Written once, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardSnapshot {
    pub block_number: u64,
    /// Per-user breakdown of every pool position that earned at this block.
    pub user_pools: FxHashMap<String, Vec<UserPoolShare>>,
    /// Per-user token reward for this block.
    pub user_rewards: FxHashMap<String, BigDecimal>,
    /// Balancer-wide adjusted market cap per token at this block.
    pub token_market_caps: FxHashMap<String, BigDecimal>,
    pub computed_at: DateTime<Utc>,
}

impl RewardSnapshot {
    pub fn new(
        block_number: u64,
        user_pools: FxHashMap<String, Vec<UserPoolShare>>,
        user_rewards: FxHashMap<String, BigDecimal>,
        token_market_caps: FxHashMap<String, BigDecimal>,
    ) -> Self {
        Self {
            block_number,
            user_pools,
            user_rewards,
            token_market_caps,
            computed_at: Utc::now(),
        }
    }
}
