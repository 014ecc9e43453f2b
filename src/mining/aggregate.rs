//! Balancer-wide token totals and market-cap cap correction.
//!
//! `fold_market_caps` accumulates per-pool token contributions into global
//! per-token totals for one block; the fold is commutative, so pools can be
//! valued in any order (or in parallel) before folding. `pool_market_cap`
//! re-scales a pool's valuation for any non-exempt token whose global total
//! exceeds the cap — totals only ever shrink a pool's value, never inflate
//! it.

use bigdecimal::BigDecimal;
use rustc_hash::FxHashMap;

use crate::{factors::AdjustmentPolicy, model::PoolValuation, utils::truncate18};

/// Cumulative adjusted market cap per token across all eligible pools at one
/// block. Scoped to a single block, discarded after use.
pub type TokenMarketCaps = FxHashMap<String, BigDecimal>;

/// Fold one pool valuation into the global per-token totals.
///
/// Each priced token contributes its weight share of the pool's adjusted
/// market cap: `(normWeight / eligibleTotalWeight) × originalPoolMarketCapFactor`.
pub fn fold_market_caps(mut totals: TokenMarketCaps, valuation: &PoolValuation) -> TokenMarketCaps {
    // All-zero reported weights leave nothing to attribute.
    if valuation.eligible_total_weight == BigDecimal::from(0) {
        return totals;
    }

    for record in &valuation.tokens {
        let weight_share = truncate18(&(&record.norm_weight / &valuation.eligible_total_weight));
        let contribution = weight_share * &valuation.original_market_cap_factor;

        *totals
            .entry(record.token.clone())
            .or_insert_with(|| BigDecimal::from(0)) += contribution;
    }

    totals
}

/// Cap-corrected market cap of one pool.
///
/// For each token: if the token is not exempt and its global total exceeds
/// `cap`, scale its origin market cap by `cap / total`; otherwise use it
/// unscaled. Sums the per-token values.
pub fn pool_market_cap(
    totals: &TokenMarketCaps,
    tokens: &[crate::model::TokenValuation],
    cap: &BigDecimal,
    policy: &dyn AdjustmentPolicy,
) -> BigDecimal {
    let zero = BigDecimal::from(0);

    tokens.iter().fold(BigDecimal::from(0), |aggregate, t| {
        let total = totals.get(&t.token).unwrap_or(&zero);
        let should_adjust = !policy.is_exempt(&t.token) && total > cap;

        if should_adjust {
            let scale = truncate18(&(cap / total));
            aggregate + truncate18(&(&t.orig_market_cap * scale))
        } else {
            aggregate + &t.orig_market_cap
        }
    })
}
