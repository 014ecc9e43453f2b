//! Per-pool valuation at one block.
//!
//! Split into an explicit fetch stage (chain reads, bounded-concurrent) and
//! a pure compute stage, so the monetary math is testable without a node.

use anyhow::{Context, Result};
use bigdecimal::BigDecimal;
use futures::future::try_join_all;
use std::sync::Arc;

use crate::{
    chain::ChainClient,
    factors::AdjustmentPolicy,
    model::{BlockHeader, Pool, PoolOutcome, PoolValuation, SkipReason, TokenValuation},
    prices::{resolve_nearest, PriceBook},
    utils::{bdec, truncate18},
};

/// On-chain state of one priced token within a pool at one block.
#[derive(Debug, Clone)]
pub(crate) struct TokenState {
    pub token: String,
    /// Pool balance, scaled by the token's decimals.
    pub balance: BigDecimal,
    /// Fraction of the pool's total weight.
    pub norm_weight: BigDecimal,
}

/// Values one pool at one block, applying the adjustment policy.
pub struct PoolValuationEngine {
    chain: ChainClient,
    policy: Arc<dyn AdjustmentPolicy>,
}

impl PoolValuationEngine {
    pub fn new(chain: ChainClient, policy: Arc<dyn AdjustmentPolicy>) -> Self {
        Self { chain, policy }
    }

    /// Evaluate one pool: either a full [`PoolValuation`] or the reason it
    /// is excluded from this block. Chain read failures abort the run.
    pub async fn evaluate(
        &self,
        pool: &Pool,
        block: &BlockHeader,
        prices: &PriceBook,
    ) -> Result<PoolOutcome> {
        if let Some(reason) = pre_chain_skip(pool, block) {
            return Ok(PoolOutcome::Skipped(reason));
        }

        if !self.chain.is_public_swap(&pool.id, block.number).await? {
            return Ok(PoolOutcome::Skipped(SkipReason::PrivatePool));
        }

        let current_tokens = self.chain.current_tokens(&pool.id, block.number).await?;

        let priced = priced_tokens(&current_tokens, prices);
        if priced.len() < 2 {
            return Ok(PoolOutcome::Skipped(SkipReason::Unpriceable));
        }

        // Fetch stage: per-token reads are independent.
        let states = try_join_all(
            priced
                .iter()
                .map(|token| self.fetch_token_state(&pool.id, token.as_str(), block.number)),
        )
        .await?;

        let swap_fee = self
            .chain
            .swap_fee_fraction(&pool.id, block.number)
            .await?;

        // Compute stage is pure.
        let valuation = value_pool(
            pool,
            block.timestamp,
            &states,
            &swap_fee,
            prices,
            self.policy.as_ref(),
        )?;

        Ok(PoolOutcome::Valued(Box::new(valuation)))
    }

    async fn fetch_token_state(
        &self,
        pool_id: &str,
        token: &str,
        block: u64,
    ) -> Result<TokenState> {
        let (balance, norm_weight) = tokio::try_join!(
            self.chain.token_balance(pool_id, token, block),
            self.chain.normalized_weight(pool_id, token, block),
        )?;

        Ok(TokenState {
            token: token.to_string(),
            balance,
            norm_weight,
        })
    }
}

/// Exclusion that can be decided before any chain read: pools created at or
/// after the block timestamp, or with no reported token list.
pub(crate) fn pre_chain_skip(pool: &Pool, block: &BlockHeader) -> Option<SkipReason> {
    if pool.create_time >= block.timestamp || pool.tokens_list.is_empty() {
        return Some(SkipReason::NotCreatedByBlock);
    }

    None
}

/// Tokens with a non-empty price series. Unpriced tokens are excluded from
/// valuation entirely; a pool needs at least two priced tokens to be
/// eligible at all.
pub(crate) fn priced_tokens<'a>(tokens: &'a [String], prices: &PriceBook) -> Vec<&'a String> {
    tokens
        .iter()
        .filter(|t| prices.get(*t).is_some_and(|s| !s.is_empty()))
        .collect()
}

/// Pure valuation of one pool from prefetched chain state.
///
/// Accumulates, over priced tokens only:
/// - `origin market cap` = balance × nearest price, truncated to 18 digits
/// - `eligible total weight` = Σ normalized weights
///
/// and derives `originalPoolMarketCapFactor` = feeFactor × balAndRatioFactor
/// × wrapFactor × Σ(origin market caps), truncated to 18 digits.
pub(crate) fn value_pool(
    pool: &Pool,
    timestamp: u64,
    states: &[TokenState],
    swap_fee_fraction: &BigDecimal,
    prices: &PriceBook,
    policy: &dyn AdjustmentPolicy,
) -> Result<PoolValuation> {
    let mut tokens = Vec::with_capacity(states.len());
    let mut eligible_total_weight = BigDecimal::from(0);
    let mut original_market_cap = BigDecimal::from(0);

    for state in states {
        // Callers pre-check series emptiness; hitting this means a priced
        // token lost its series mid-run.
        let price = prices
            .get(&state.token)
            .and_then(|series| resolve_nearest(series, timestamp))
            .with_context(|| format!("No price available for token {}", state.token))?;

        let orig_market_cap = truncate18(&(&state.balance * bdec(price)));

        eligible_total_weight += &state.norm_weight;
        original_market_cap += &orig_market_cap;

        tokens.push(TokenValuation {
            token: state.token.clone(),
            orig_market_cap,
            norm_weight: state.norm_weight.clone(),
        });
    }

    let token_list: Vec<String> = states.iter().map(|s| s.token.clone()).collect();
    let weights: Vec<BigDecimal> = states.iter().map(|s| s.norm_weight.clone()).collect();

    let fee_factor = policy.fee_factor(swap_fee_fraction);
    let bal_and_ratio_factor = policy.bal_and_ratio_factor(&token_list, &weights);
    let wrap_factor = policy.wrap_factor(&token_list, &weights);

    let original_market_cap_factor = truncate18(
        &(&fee_factor * &bal_and_ratio_factor * &wrap_factor * &original_market_cap),
    );

    Ok(PoolValuation {
        pool: pool.id.clone(),
        controller: pool.controller.clone(),
        share_holders: pool.share_holders.clone(),
        tokens,
        eligible_total_weight,
        fee_factor,
        bal_and_ratio_factor,
        wrap_factor,
        original_market_cap,
        original_market_cap_factor,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::str::FromStr;

    /// Policy returning neutral factors, used to isolate the valuation math.
    pub(crate) struct UnitPolicy;

    impl AdjustmentPolicy for UnitPolicy {
        fn fee_factor(&self, _swap_fee_fraction: &BigDecimal) -> BigDecimal {
            BigDecimal::from(1)
        }

        fn bal_and_ratio_factor(&self, _tokens: &[String], _weights: &[BigDecimal]) -> BigDecimal {
            BigDecimal::from(1)
        }

        fn wrap_factor(&self, _tokens: &[String], _weights: &[BigDecimal]) -> BigDecimal {
            BigDecimal::from(1)
        }

        fn is_exempt(&self, _token: &str) -> bool {
            false
        }
    }

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    fn test_pool() -> Pool {
        Pool {
            id: "0xp001".to_string(),
            controller: "0xc001".to_string(),
            create_time: 1_000,
            tokens_list: vec!["0xaaa".to_string(), "0xbbb".to_string()],
            share_holders: vec!["0xu001".to_string()],
        }
    }

    fn test_prices() -> PriceBook {
        let mut prices = PriceBook::default();
        prices.insert("0xaaa".to_string(), vec![(2_000_000, 2.0)]);
        prices.insert("0xbbb".to_string(), vec![(2_000_000, 1.0)]);
        prices
    }

    fn header(timestamp: u64) -> BlockHeader {
        BlockHeader {
            number: 10_100,
            timestamp,
        }
    }

    #[test]
    fn pool_created_after_the_block_is_skipped() {
        // test_pool has create_time 1_000
        assert_eq!(
            pre_chain_skip(&test_pool(), &header(900)),
            Some(SkipReason::NotCreatedByBlock)
        );
    }

    #[test]
    fn pool_created_exactly_at_the_block_is_skipped() {
        assert_eq!(
            pre_chain_skip(&test_pool(), &header(1_000)),
            Some(SkipReason::NotCreatedByBlock)
        );
    }

    #[test]
    fn pool_without_a_token_list_is_skipped() {
        let mut pool = test_pool();
        pool.tokens_list.clear();
        assert_eq!(
            pre_chain_skip(&pool, &header(2_000)),
            Some(SkipReason::NotCreatedByBlock)
        );
    }

    #[test]
    fn existing_pool_with_tokens_passes_the_gate() {
        assert_eq!(pre_chain_skip(&test_pool(), &header(2_000)), None);
    }

    #[test]
    fn tokens_with_empty_or_missing_series_are_unpriced() {
        let mut prices = test_prices();
        prices.insert("0xccc".to_string(), Vec::new());

        let tokens = vec![
            "0xaaa".to_string(),
            "0xbbb".to_string(),
            "0xccc".to_string(),
            "0xddd".to_string(),
        ];

        let priced = priced_tokens(&tokens, &prices);

        assert_eq!(priced, vec!["0xaaa", "0xbbb"]);
    }

    #[test]
    fn single_priced_token_leaves_the_pool_unpriceable() {
        let mut prices = PriceBook::default();
        prices.insert("0xaaa".to_string(), vec![(2_000_000, 2.0)]);

        let tokens = vec!["0xaaa".to_string(), "0xbbb".to_string()];

        assert!(priced_tokens(&tokens, &prices).len() < 2);
    }

    /// Worked example: token A (price $2, balance 100, weight 0.5) and
    /// token B (price $1, balance 100, weight 0.3), all factors 1.
    #[test]
    fn values_the_worked_example_pool() {
        let states = vec![
            TokenState {
                token: "0xaaa".to_string(),
                balance: dec("100"),
                norm_weight: dec("0.5"),
            },
            TokenState {
                token: "0xbbb".to_string(),
                balance: dec("100"),
                norm_weight: dec("0.3"),
            },
        ];

        let valuation = value_pool(
            &test_pool(),
            2_000,
            &states,
            &dec("0"),
            &test_prices(),
            &UnitPolicy,
        )
        .unwrap();

        assert_eq!(valuation.original_market_cap, dec("300"));
        assert_eq!(valuation.eligible_total_weight, dec("0.8"));
        assert_eq!(valuation.original_market_cap_factor, dec("300"));
        assert_eq!(valuation.tokens.len(), 2);
        assert_eq!(valuation.tokens[0].orig_market_cap, dec("200"));
        assert_eq!(valuation.tokens[1].orig_market_cap, dec("100"));
    }

    #[test]
    fn origin_market_caps_are_truncated_toward_zero() {
        let states = vec![TokenState {
            token: "0xaaa".to_string(),
            balance: dec("0.0000000000000000015"),
            norm_weight: dec("0.5"),
        }];
        let mut prices = PriceBook::default();
        prices.insert("0xaaa".to_string(), vec![(2_000_000, 1.0)]);

        let valuation = value_pool(
            &test_pool(),
            2_000,
            &states,
            &dec("0"),
            &prices,
            &UnitPolicy,
        )
        .unwrap();

        // 1.5e-18 truncates down to 1e-18
        assert_eq!(
            valuation.tokens[0].orig_market_cap,
            dec("0.000000000000000001")
        );
    }

    #[test]
    fn missing_price_series_is_an_internal_error() {
        let states = vec![TokenState {
            token: "0xmissing".to_string(),
            balance: dec("1"),
            norm_weight: dec("0.5"),
        }];

        let result = value_pool(
            &test_pool(),
            2_000,
            &states,
            &dec("0"),
            &test_prices(),
            &UnitPolicy,
        );

        assert!(result.is_err());
    }
}
