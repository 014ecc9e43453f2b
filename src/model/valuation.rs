use bigdecimal::BigDecimal;

/// Why a pool was excluded from one snapshot block.
///
/// Expected, non-fatal outcomes: the pool simply contributes nothing to the
/// block. Provider failures are *not* skip reasons, they abort the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Pool was created at or after the block timestamp, or the directory
    /// reported no token list.
    NotCreatedByBlock,
    /// `isPublicSwap` returned false at this block.
    PrivatePool,
    /// Fewer than two of the pool's tokens have a non-empty price series.
    Unpriceable,
}

/// One priced token's contribution to a pool valuation.
#[derive(Debug, Clone)]
pub struct TokenValuation {
    /// Token address (lowercase hex).
    pub token: String,
    /// Balance × resolved price, truncated to 18 fractional digits.
    pub orig_market_cap: BigDecimal,
    /// Token's fraction of the pool's total weight.
    pub norm_weight: BigDecimal,
}

/// Valuation of one pool at one block. Created once per (pool, block);
/// immutable thereafter.
#[derive(Debug, Clone)]
pub struct PoolValuation {
    pub pool: String,
    pub controller: String,
    pub share_holders: Vec<String>,
    /// Per-token breakdown, priced tokens only.
    pub tokens: Vec<TokenValuation>,
    /// Sum of normalized weights over priced tokens only.
    pub eligible_total_weight: BigDecimal,
    pub fee_factor: BigDecimal,
    pub bal_and_ratio_factor: BigDecimal,
    pub wrap_factor: BigDecimal,
    /// Σ origin market caps over priced tokens.
    pub original_market_cap: BigDecimal,
    /// feeFactor × balAndRatioFactor × wrapFactor × Σ(origin market caps),
    /// truncated to 18 fractional digits.
    pub original_market_cap_factor: BigDecimal,
}

/// Result of valuing one pool at one block.
///
/// Tagged so callers must handle exclusion explicitly instead of probing
/// sentinel fields.
#[derive(Debug)]
pub enum PoolOutcome {
    Valued(Box<PoolValuation>),
    Skipped(SkipReason),
}
