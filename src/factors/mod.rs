//! Adjustment-factor policy.
//!
//! Each factor is a multiplier in (0, 1] discounting a pool's raw valuation
//! per the incentive policy: `fee_factor` penalizes high swap fees,
//! `bal_and_ratio_factor` penalizes skewed weight ratios (boosting
//! governance-token pairs under the v2 policy), and `wrap_factor` discounts
//! pairs of wrapped equivalents of the same asset. The policy is pluggable
//! and versioned; pools never see its internals, only the multipliers.

use bigdecimal::BigDecimal;
use num_traits::ToPrimitive;
use rustc_hash::FxHashSet;

use crate::{
    config::{PolicyVersion, RewardSettings},
    utils::{bdec, truncate18},
};

/// Pure adjustment-factor policy applied during pool valuation.
pub trait AdjustmentPolicy: Send + Sync {
    /// Multiplier for the pool's swap fee, fee given as a fraction.
    fn fee_factor(&self, swap_fee_fraction: &BigDecimal) -> BigDecimal;

    /// Multiplier for the pool's weight distribution.
    fn bal_and_ratio_factor(&self, tokens: &[String], weights: &[BigDecimal]) -> BigDecimal;

    /// Multiplier penalizing wrapped-equivalent token pairs.
    fn wrap_factor(&self, tokens: &[String], weights: &[BigDecimal]) -> BigDecimal;

    /// Whether a token is exempt from market-cap correction.
    fn is_exempt(&self, token: &str) -> bool;
}

/// Discount applied to a pair of wrapped equivalents.
const WRAP_PAIR_FACTOR: f64 = 0.1;

/// The shipped, versioned policy implementation.
///
/// v1 applies the plain pair-ratio factor; v2 additionally boosts pairs of
/// the governance token against an exempt token by the configured
/// multiplier.
pub struct StandardPolicy {
    version: PolicyVersion,
    bal_token: Option<String>,
    bal_multiplier: BigDecimal,
    wrap_pairs: Vec<(String, String)>,
    exempt_tokens: FxHashSet<String>,
}

impl StandardPolicy {
    pub fn from_settings(settings: &RewardSettings) -> Self {
        Self {
            version: settings.policy_version,
            bal_token: settings.bal_token.as_ref().map(|t| t.to_lowercase()),
            bal_multiplier: settings.bal_multiplier.clone(),
            wrap_pairs: settings
                .wrap_pairs
                .iter()
                .map(|(a, b)| (a.to_lowercase(), b.to_lowercase()))
                .collect(),
            exempt_tokens: settings
                .exempt_tokens
                .iter()
                .map(|t| t.to_lowercase())
                .collect(),
        }
    }

    fn is_wrap_pair(&self, token_a: &str, token_b: &str) -> bool {
        self.wrap_pairs
            .iter()
            .any(|(a, b)| (a == token_a && b == token_b) || (a == token_b && b == token_a))
    }

    /// Boost for one token pair under the v2 policy: pairs of the
    /// governance token against an exempt token count the governance side's
    /// weight `bal_multiplier` times.
    fn pair_boost(
        &self,
        token_a: &str,
        token_b: &str,
        weight_a: &BigDecimal,
        weight_b: &BigDecimal,
    ) -> BigDecimal {
        let one = BigDecimal::from(1);

        if self.version == PolicyVersion::V1 {
            return one;
        }
        let Some(bal) = self.bal_token.as_deref() else {
            return one;
        };

        let total = weight_a + weight_b;
        if total == BigDecimal::from(0) {
            return one;
        }

        if token_a == bal && self.is_exempt(token_b) {
            truncate18(&((&self.bal_multiplier * weight_a + weight_b) / &total))
        } else if token_b == bal && self.is_exempt(token_a) {
            truncate18(&((weight_a + &self.bal_multiplier * weight_b) / &total))
        } else {
            one
        }
    }

    /// Pair-weighted mean of `term(pair)` over all distinct token pairs.
    /// Pools with no weighted pair (single token, or all-zero weights) get a
    /// neutral factor of 1.
    fn pair_weighted_mean<F>(&self, tokens: &[String], weights: &[BigDecimal], term: F) -> BigDecimal
    where
        F: Fn(&str, &str, &BigDecimal, &BigDecimal) -> BigDecimal,
    {
        let zero = BigDecimal::from(0);
        let mut term_sum = zero.clone();
        let mut pair_weight_sum = zero.clone();

        for j in 0..weights.len() {
            if weights[j] == zero {
                continue;
            }
            for k in (j + 1)..weights.len() {
                let pair_weight = &weights[j] * &weights[k];
                term_sum += term(&tokens[j], &tokens[k], &weights[j], &weights[k]) * &pair_weight;
                pair_weight_sum += pair_weight;
            }
        }

        if pair_weight_sum == zero {
            return BigDecimal::from(1);
        }

        truncate18(&(term_sum / pair_weight_sum))
    }
}

impl AdjustmentPolicy for StandardPolicy {
    fn fee_factor(&self, swap_fee_fraction: &BigDecimal) -> BigDecimal {
        let fee_percent = swap_fee_fraction.to_f64().unwrap_or(0.0) * 100.0;
        bdec((-(fee_percent * 0.25).powi(2)).exp())
    }

    fn bal_and_ratio_factor(&self, tokens: &[String], weights: &[BigDecimal]) -> BigDecimal {
        self.pair_weighted_mean(tokens, weights, |token_a, token_b, weight_a, weight_b| {
            let pair_total = weight_a + weight_b;
            let norm_a = truncate18(&(weight_a / &pair_total));
            let norm_b = truncate18(&(weight_b / &pair_total));

            self.pair_boost(token_a, token_b, weight_a, weight_b)
                * BigDecimal::from(4)
                * norm_a
                * norm_b
        })
    }

    fn wrap_factor(&self, tokens: &[String], weights: &[BigDecimal]) -> BigDecimal {
        self.pair_weighted_mean(tokens, weights, |token_a, token_b, _, _| {
            if self.is_wrap_pair(token_a, token_b) {
                bdec(WRAP_PAIR_FACTOR)
            } else {
                BigDecimal::from(1)
            }
        })
    }

    fn is_exempt(&self, token: &str) -> bool {
        self.exempt_tokens.contains(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn settings(version: PolicyVersion) -> RewardSettings {
        RewardSettings {
            weekly_budget: BigDecimal::from(145_000),
            blocks_per_snapshot: 256,
            market_cap_cap: BigDecimal::from(10_000_000),
            policy_version: version,
            bal_token: Some("0xba1".to_string()),
            bal_multiplier: BigDecimal::from(2),
            exempt_tokens: vec!["0xuncapped".to_string()],
            wrap_pairs: vec![("0xdai".to_string(), "0xcdai".to_string())],
            price_aliases: vec![],
        }
    }

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn zero_fee_has_neutral_factor() {
        let policy = StandardPolicy::from_settings(&settings(PolicyVersion::V1));
        assert_eq!(policy.fee_factor(&dec("0")), BigDecimal::from(1));
    }

    #[test]
    fn higher_fee_shrinks_the_factor() {
        let policy = StandardPolicy::from_settings(&settings(PolicyVersion::V1));
        let low = policy.fee_factor(&dec("0.001"));
        let high = policy.fee_factor(&dec("0.01"));
        assert!(high < low);
        assert!(high > BigDecimal::from(0));
        assert!(low < BigDecimal::from(1));
    }

    #[test]
    fn balanced_two_token_pool_has_ratio_one() {
        let policy = StandardPolicy::from_settings(&settings(PolicyVersion::V1));
        let tokens = vec!["0xaaa".to_string(), "0xbbb".to_string()];
        let weights = vec![dec("0.5"), dec("0.5")];
        assert_eq!(
            policy.bal_and_ratio_factor(&tokens, &weights),
            BigDecimal::from(1)
        );
    }

    #[test]
    fn skewed_pool_is_discounted() {
        let policy = StandardPolicy::from_settings(&settings(PolicyVersion::V1));
        let tokens = vec!["0xaaa".to_string(), "0xbbb".to_string()];
        let weights = vec![dec("0.5"), dec("0.3")];
        // 4 * (0.5/0.8) * (0.3/0.8) = 0.9375
        assert_eq!(
            policy.bal_and_ratio_factor(&tokens, &weights),
            dec("0.9375")
        );
    }

    #[test]
    fn single_token_pool_gets_neutral_factors() {
        let policy = StandardPolicy::from_settings(&settings(PolicyVersion::V1));
        let tokens = vec!["0xaaa".to_string()];
        let weights = vec![dec("1")];
        assert_eq!(
            policy.bal_and_ratio_factor(&tokens, &weights),
            BigDecimal::from(1)
        );
        assert_eq!(policy.wrap_factor(&tokens, &weights), BigDecimal::from(1));
    }

    #[test]
    fn zero_weights_are_skipped() {
        let policy = StandardPolicy::from_settings(&settings(PolicyVersion::V1));
        let tokens = vec!["0xaaa".to_string(), "0xbbb".to_string()];
        let weights = vec![dec("0"), dec("1")];
        assert_eq!(
            policy.bal_and_ratio_factor(&tokens, &weights),
            BigDecimal::from(1)
        );
    }

    #[test]
    fn wrap_pair_is_discounted_to_a_tenth() {
        let policy = StandardPolicy::from_settings(&settings(PolicyVersion::V1));
        let tokens = vec!["0xdai".to_string(), "0xcdai".to_string()];
        let weights = vec![dec("0.5"), dec("0.5")];
        assert_eq!(policy.wrap_factor(&tokens, &weights), dec("0.1"));
    }

    #[test]
    fn wrap_pair_matches_either_order() {
        let policy = StandardPolicy::from_settings(&settings(PolicyVersion::V1));
        let tokens = vec!["0xcdai".to_string(), "0xdai".to_string()];
        let weights = vec![dec("0.5"), dec("0.5")];
        assert_eq!(policy.wrap_factor(&tokens, &weights), dec("0.1"));
    }

    #[test]
    fn unrelated_pair_keeps_full_wrap_factor() {
        let policy = StandardPolicy::from_settings(&settings(PolicyVersion::V1));
        let tokens = vec!["0xaaa".to_string(), "0xbbb".to_string()];
        let weights = vec![dec("0.5"), dec("0.5")];
        assert_eq!(policy.wrap_factor(&tokens, &weights), BigDecimal::from(1));
    }

    #[test]
    fn v1_ignores_the_governance_boost() {
        let policy = StandardPolicy::from_settings(&settings(PolicyVersion::V1));
        let tokens = vec!["0xba1".to_string(), "0xuncapped".to_string()];
        let weights = vec![dec("0.5"), dec("0.5")];
        assert_eq!(
            policy.bal_and_ratio_factor(&tokens, &weights),
            BigDecimal::from(1)
        );
    }

    #[test]
    fn v2_boosts_governance_pairs_against_exempt_tokens() {
        let policy = StandardPolicy::from_settings(&settings(PolicyVersion::V2));
        let tokens = vec!["0xba1".to_string(), "0xuncapped".to_string()];
        let weights = vec![dec("0.5"), dec("0.5")];
        // boost = (2*0.5 + 0.5) / 1 = 1.5, ratio term = 1
        assert_eq!(policy.bal_and_ratio_factor(&tokens, &weights), dec("1.5"));
    }

    #[test]
    fn v2_leaves_non_governance_pairs_alone() {
        let policy = StandardPolicy::from_settings(&settings(PolicyVersion::V2));
        let tokens = vec!["0xaaa".to_string(), "0xbbb".to_string()];
        let weights = vec![dec("0.5"), dec("0.5")];
        assert_eq!(
            policy.bal_and_ratio_factor(&tokens, &weights),
            BigDecimal::from(1)
        );
    }

    #[test]
    fn exempt_set_is_case_insensitive_on_construction() {
        let mut s = settings(PolicyVersion::V1);
        s.exempt_tokens = vec!["0xUNCAPPED".to_string()];
        let policy = StandardPolicy::from_settings(&s);
        assert!(policy.is_exempt("0xuncapped"));
        assert!(!policy.is_exempt("0xother"));
    }
}
