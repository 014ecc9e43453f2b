use alloy::{
    eips::BlockId,
    primitives::Address,
    providers::{DynProvider, Provider, ProviderBuilder},
};
use anyhow::{Context, Result};
use bigdecimal::BigDecimal;
use url::Url;

use crate::{
    abis::{BPool, IERC20},
    model::BlockHeader,
    utils::u256_to_scaled,
};

/// Pool share tokens are standard 18-decimal ERC20s.
const SHARE_TOKEN_DECIMALS: u8 = 18;

/// Archive-node client for historical pool state.
///
/// Wraps an alloy HTTP provider; all pool reads take an explicit block
/// number. Any failed read is fatal to the run (recovery is re-invocation
/// with a resume watermark), so every method propagates errors with context
/// instead of retrying.
#[derive(Clone)]
pub struct ChainClient {
    provider: DynProvider,
}

impl ChainClient {
    pub fn new(rpc_url: &str) -> Result<Self> {
        let url = Url::parse(rpc_url).context("Invalid RPC URL")?;

        let client = ProviderBuilder::new().connect_http(url);
        let provider = DynProvider::new(client);

        Ok(Self { provider })
    }

    /// Fetch number and timestamp of a block.
    pub async fn get_block(&self, number: u64) -> Result<BlockHeader> {
        let block = self
            .provider
            .get_block_by_number(number.into())
            .await
            .with_context(|| format!("Failed to fetch block {number}"))?
            .with_context(|| format!("Block {number} not found"))?;

        Ok(BlockHeader {
            number,
            timestamp: block.header.timestamp,
        })
    }

    /// Whether the pool was publicly swappable at the given block.
    pub async fn is_public_swap(&self, pool: &str, block: u64) -> Result<bool> {
        let contract = BPool::new(parse_address(pool)?, &self.provider);

        contract
            .isPublicSwap()
            .block(BlockId::number(block))
            .call()
            .await
            .with_context(|| format!("isPublicSwap failed for pool {pool} at block {block}"))
    }

    /// The pool's bound token list at the given block, lowercase hex.
    pub async fn current_tokens(&self, pool: &str, block: u64) -> Result<Vec<String>> {
        let contract = BPool::new(parse_address(pool)?, &self.provider);

        let tokens = contract
            .getCurrentTokens()
            .block(BlockId::number(block))
            .call()
            .await
            .with_context(|| format!("getCurrentTokens failed for pool {pool} at block {block}"))?;

        Ok(tokens.into_iter().map(|a| format!("{a:#x}")).collect())
    }

    /// A token's pool balance at the given block, scaled by its decimals.
    pub async fn token_balance(&self, pool: &str, token: &str, block: u64) -> Result<BigDecimal> {
        let pool_contract = BPool::new(parse_address(pool)?, &self.provider);
        let token_contract = IERC20::new(parse_address(token)?, &self.provider);

        // Token decimals are immutable, no block pin needed.
        let (raw, decimals) = tokio::try_join!(
            async {
                pool_contract
                    .getBalance(parse_address(token)?)
                    .block(BlockId::number(block))
                    .call()
                    .await
                    .with_context(|| {
                        format!("getBalance({token}) failed for pool {pool} at block {block}")
                    })
            },
            async {
                token_contract
                    .decimals()
                    .call()
                    .await
                    .with_context(|| format!("decimals() failed for token {token}"))
            },
        )?;

        Ok(u256_to_scaled(raw, decimals))
    }

    /// A token's normalized weight within the pool at the given block, as a
    /// fraction of the pool's total weight.
    pub async fn normalized_weight(
        &self,
        pool: &str,
        token: &str,
        block: u64,
    ) -> Result<BigDecimal> {
        let contract = BPool::new(parse_address(pool)?, &self.provider);

        let raw = contract
            .getNormalizedWeight(parse_address(token)?)
            .block(BlockId::number(block))
            .call()
            .await
            .with_context(|| {
                format!("getNormalizedWeight({token}) failed for pool {pool} at block {block}")
            })?;

        Ok(u256_to_scaled(raw, SHARE_TOKEN_DECIMALS))
    }

    /// The pool's swap fee at the given block, as a fraction (0.01 = 1%).
    pub async fn swap_fee_fraction(&self, pool: &str, block: u64) -> Result<BigDecimal> {
        let contract = BPool::new(parse_address(pool)?, &self.provider);

        let raw = contract
            .getSwapFee()
            .block(BlockId::number(block))
            .call()
            .await
            .with_context(|| format!("getSwapFee failed for pool {pool} at block {block}"))?;

        Ok(u256_to_scaled(raw, SHARE_TOKEN_DECIMALS))
    }

    /// Total supply of the pool's liquidity-share token at the given block.
    /// Zero supply marks a private pool.
    pub async fn total_supply(&self, pool: &str, block: u64) -> Result<BigDecimal> {
        let contract = BPool::new(parse_address(pool)?, &self.provider);

        let raw = contract
            .totalSupply()
            .block(BlockId::number(block))
            .call()
            .await
            .with_context(|| format!("totalSupply failed for pool {pool} at block {block}"))?;

        Ok(u256_to_scaled(raw, SHARE_TOKEN_DECIMALS))
    }

    /// A holder's balance of the pool's share token at the given block.
    pub async fn share_balance(&self, pool: &str, holder: &str, block: u64) -> Result<BigDecimal> {
        let contract = BPool::new(parse_address(pool)?, &self.provider);

        let raw = contract
            .balanceOf(parse_address(holder)?)
            .block(BlockId::number(block))
            .call()
            .await
            .with_context(|| {
                format!("balanceOf({holder}) failed for pool {pool} at block {block}")
            })?;

        Ok(u256_to_scaled(raw, SHARE_TOKEN_DECIMALS))
    }
}

fn parse_address(addr: &str) -> Result<Address> {
    addr.parse()
        .with_context(|| format!("Invalid address: {addr}"))
}
