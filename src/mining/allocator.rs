//! Per-block reward allocation.
//!
//! Three ordered passes; the barrier between pass 1 and pass 2 is load
//! bearing, since cap correction needs the complete global totals before any
//! pool's final value is known:
//!
//! 1. value every pool, fold eligible valuations into global token totals;
//! 2. cap-correct each eligible pool, fetch share supply and holder
//!    balances, attribute value to the controller (private pool) or pro rata
//!    to holders (shared pool);
//! 3. convert each user's accumulated liquidity into a token reward against
//!    the block budget.

use anyhow::Result;
use bigdecimal::BigDecimal;
use futures::{stream, StreamExt, TryStreamExt};
use log::{debug, info};
use rustc_hash::FxHashMap;
use std::sync::Arc;

use crate::{
    chain::ChainClient,
    factors::AdjustmentPolicy,
    mining::{
        aggregate::{fold_market_caps, pool_market_cap, TokenMarketCaps},
        valuation::PoolValuationEngine,
    },
    model::{
        BlockHeader, Pool, PoolOutcome, PoolValuation, RewardSnapshot, SkipReason, UserPoolShare,
    },
    prices::PriceBook,
    utils::truncate18,
};

/// Bounded concurrency for pool valuation in pass 1. Pools are mutually
/// independent; results are collected before the single-writer fold.
const POOL_CONCURRENCY: usize = 8;

/// Bounded concurrency for holder balance reads in pass 2.
const HOLDER_CONCURRENCY: usize = 16;

/// Allocates one block's token budget across liquidity providers.
pub struct RewardAllocator {
    engine: PoolValuationEngine,
    chain: ChainClient,
    policy: Arc<dyn AdjustmentPolicy>,
    market_cap_cap: BigDecimal,
}

impl RewardAllocator {
    pub fn new(
        chain: ChainClient,
        policy: Arc<dyn AdjustmentPolicy>,
        market_cap_cap: BigDecimal,
    ) -> Self {
        Self {
            engine: PoolValuationEngine::new(chain.clone(), policy.clone()),
            chain,
            policy,
            market_cap_cap,
        }
    }

    /// Compute the full reward snapshot for one block.
    pub async fn run_block(
        &self,
        block: &BlockHeader,
        pools: &[Pool],
        prices: &PriceBook,
        block_budget: &BigDecimal,
    ) -> Result<RewardSnapshot> {
        // Pass 1: valuation + aggregation.
        let outcomes: Vec<PoolOutcome> = stream::iter(pools)
            .map(|pool| self.engine.evaluate(pool, block, prices))
            .buffered(POOL_CONCURRENCY)
            .try_collect()
            .await?;

        let mut valued = Vec::new();
        let mut skipped = [0usize; 3];
        for outcome in outcomes {
            match outcome {
                PoolOutcome::Valued(valuation) => valued.push(*valuation),
                PoolOutcome::Skipped(SkipReason::NotCreatedByBlock) => skipped[0] += 1,
                PoolOutcome::Skipped(SkipReason::PrivatePool) => skipped[1] += 1,
                PoolOutcome::Skipped(SkipReason::Unpriceable) => skipped[2] += 1,
            }
        }
        debug!(
            "Block {}: {} pools valued, {} not created, {} private, {} unpriceable",
            block.number,
            valued.len(),
            skipped[0],
            skipped[1],
            skipped[2]
        );

        let totals = valued
            .iter()
            .fold(TokenMarketCaps::default(), fold_market_caps);

        // Pass 2: correction + attribution.
        let mut user_pools: FxHashMap<String, Vec<UserPoolShare>> = FxHashMap::default();
        let mut user_liquidity: FxHashMap<String, BigDecimal> = FxHashMap::default();
        let mut total_balancer_liquidity = BigDecimal::from(0);

        for valuation in &valued {
            let corrected = pool_market_cap(
                &totals,
                &valuation.tokens,
                &self.market_cap_cap,
                self.policy.as_ref(),
            );
            let final_factor = truncate18(
                &(&valuation.fee_factor
                    * &valuation.bal_and_ratio_factor
                    * &valuation.wrap_factor
                    * &corrected),
            );

            total_balancer_liquidity += &final_factor;

            let supply = self.chain.total_supply(&valuation.pool, block.number).await?;

            if supply == BigDecimal::from(0) {
                // Private pool: the controller owns the whole value.
                attribute(
                    &mut user_pools,
                    &mut user_liquidity,
                    &valuation.controller,
                    valuation,
                    corrected,
                    final_factor,
                );
            } else {
                let balances: Vec<BigDecimal> = stream::iter(&valuation.share_holders)
                    .map(|holder| self.chain.share_balance(&valuation.pool, holder, block.number))
                    .buffered(HOLDER_CONCURRENCY)
                    .try_collect()
                    .await?;

                for (holder, balance) in valuation.share_holders.iter().zip(balances) {
                    let (value, factor) =
                        holder_share(&balance, &supply, &corrected, &final_factor);
                    attribute(
                        &mut user_pools,
                        &mut user_liquidity,
                        holder,
                        valuation,
                        value,
                        factor,
                    );
                }
            }
        }

        // Pass 3: reward conversion.
        let user_rewards =
            convert_rewards(&user_liquidity, block_budget, &total_balancer_liquidity);

        if user_rewards.is_empty() {
            info!("Block {}: no eligible liquidity, no rewards", block.number);
        }

        Ok(RewardSnapshot::new(
            block.number,
            user_pools,
            user_rewards,
            totals,
        ))
    }
}

/// Record one user's stake in one pool and accumulate their block liquidity.
fn attribute(
    user_pools: &mut FxHashMap<String, Vec<UserPoolShare>>,
    user_liquidity: &mut FxHashMap<String, BigDecimal>,
    user: &str,
    valuation: &PoolValuation,
    value_usd: BigDecimal,
    factor_usd: BigDecimal,
) {
    user_pools
        .entry(user.to_string())
        .or_default()
        .push(UserPoolShare {
            pool: valuation.pool.clone(),
            fee_factor: valuation.fee_factor.clone(),
            bal_and_ratio_factor: valuation.bal_and_ratio_factor.clone(),
            wrap_factor: valuation.wrap_factor.clone(),
            value_usd,
            factor_usd: factor_usd.clone(),
        });

    *user_liquidity
        .entry(user.to_string())
        .or_insert_with(|| BigDecimal::from(0)) += factor_usd;
}

/// One holder's slice of a shared pool: `(balance/supply)` applied to the
/// corrected market cap and to the final factor, each truncated to 18
/// digits.
pub(crate) fn holder_share(
    balance: &BigDecimal,
    supply: &BigDecimal,
    corrected_market_cap: &BigDecimal,
    final_factor: &BigDecimal,
) -> (BigDecimal, BigDecimal) {
    let ownership = truncate18(&(balance / supply));

    (
        truncate18(&(&ownership * corrected_market_cap)),
        truncate18(&(&ownership * final_factor)),
    )
}

/// Convert accumulated user liquidity into token rewards:
/// `reward = liquidity × budget / totalLiquidity`.
///
/// A block with zero total liquidity produces no rewards; this is a defined
/// outcome, not a division fault.
pub(crate) fn convert_rewards(
    user_liquidity: &FxHashMap<String, BigDecimal>,
    block_budget: &BigDecimal,
    total_balancer_liquidity: &BigDecimal,
) -> FxHashMap<String, BigDecimal> {
    let mut rewards = FxHashMap::default();

    if *total_balancer_liquidity == BigDecimal::from(0) {
        return rewards;
    }

    for (user, liquidity) in user_liquidity {
        let reward = truncate18(&(liquidity * block_budget / total_balancer_liquidity));
        rewards.insert(user.clone(), reward);
    }

    rewards
}
