//! Snapshot driver: walks the block range and persists results.
//!
//! Blocks run from `end_block` down to `start_block` in fixed strides. Every
//! snapshot gets an identical budget share computed once by ceiling
//! division; the final, possibly shorter, stride still receives a full share
//! (intentional approximation, kept from the original distribution scheme).

use anyhow::{bail, Context, Result};
use bigdecimal::BigDecimal;
use log::info;
use std::sync::Arc;

use crate::{
    chain::ChainClient,
    config::Settings,
    directory::PoolDirectory,
    factors::AdjustmentPolicy,
    mining::allocator::RewardAllocator,
    model::Pool,
    prices::{apply_aliases, PriceBook, PriceClient},
    store::ReportStore,
    utils::truncate18,
};

/// One-shot run over a week's block range.
pub struct SnapshotDriver {
    settings: Arc<Settings>,
    chain: ChainClient,
    directory: PoolDirectory,
    price_client: PriceClient,
    store: ReportStore,
    allocator: RewardAllocator,
}

impl SnapshotDriver {
    pub fn new(settings: Arc<Settings>, policy: Arc<dyn AdjustmentPolicy>) -> Result<Self> {
        let chain = ChainClient::new(&settings.endpoints.rpc_url)?;
        let directory = PoolDirectory::new(&settings.endpoints.subgraph_url);
        let price_client = PriceClient::new(&settings.endpoints.price_api_url);
        let store = ReportStore::new(&settings.run.reports_dir, settings.run.week);
        let allocator = RewardAllocator::new(
            chain.clone(),
            policy,
            settings.rewards.market_cap_cap.clone(),
        );

        Ok(Self {
            settings,
            chain,
            directory,
            price_client,
            store,
            allocator,
        })
    }

    pub async fn run(&self) -> Result<()> {
        let run = &self.settings.run;
        let stride = self.settings.rewards.blocks_per_snapshot;

        if run.end_block <= run.start_block {
            bail!(
                "end_block ({}) must be greater than start_block ({})",
                run.end_block,
                run.start_block
            );
        }
        if stride == 0 {
            bail!("blocks_per_snapshot must be nonzero");
        }

        self.store.ensure_dir()?;

        let start_header = self.chain.get_block(run.start_block).await?;
        let end_header = self.chain.get_block(run.end_block).await?;

        let pools = self.directory.fetch_all_pools(run.end_block).await?;
        self.store.write_pools(&pools)?;

        let prices = self
            .load_prices(start_header.timestamp, end_header.timestamp)
            .await?;

        let block_budget = per_snapshot_budget(
            &self.settings.rewards.weekly_budget,
            run.start_block,
            run.end_block,
            stride,
        );
        info!(
            "Week {}: blocks {}..{} (stride {}), budget {} per snapshot",
            run.week, run.start_block, run.end_block, stride, block_budget
        );

        let mut block_number = run.end_block;
        while block_number > run.start_block {
            self.process_snapshot(block_number, &pools, &prices, &block_budget)
                .await?;
            block_number = block_number.saturating_sub(stride);
        }

        info!("Week {} run complete", run.week);

        Ok(())
    }

    /// Load the price book: a persisted snapshot short-circuits re-fetching
    /// on restart.
    async fn load_prices(&self, start_secs: u64, end_secs: u64) -> Result<PriceBook> {
        if self.store.prices_available() {
            info!("Using persisted price snapshot");
            return self.store.read_prices();
        }

        let whitelist = self
            .price_client
            .fetch_eligible_tokens(&self.settings.endpoints.eligible_tokens_url)
            .await?;
        info!("Fetching prices for {} eligible tokens", whitelist.len());

        let mut book = self
            .price_client
            .fetch_token_prices(&whitelist, start_secs, end_secs)
            .await?;

        apply_aliases(&mut book, &self.settings.rewards.price_aliases);

        self.store.write_prices(&book)?;

        Ok(book)
    }

    async fn process_snapshot(
        &self,
        block_number: u64,
        pools: &[Pool],
        prices: &PriceBook,
        block_budget: &BigDecimal,
    ) -> Result<()> {
        if should_skip(
            block_number,
            self.settings.run.watermark,
            self.store.has_block_rewards(block_number),
        ) {
            info!("Block {block_number}: already covered by a previous run, skipping");
            return Ok(());
        }

        let header = self
            .chain
            .get_block(block_number)
            .await
            .with_context(|| format!("Failed to load snapshot block {block_number}"))?;

        let snapshot = self
            .allocator
            .run_block(&header, pools, prices, block_budget)
            .await?;

        self.store.write_block_rewards(&snapshot)?;

        info!(
            "Block {block_number}: {} earning users persisted",
            snapshot.user_rewards.len()
        );

        Ok(())
    }
}

/// Whether a snapshot block is already covered by a previous run: at or
/// above the resume watermark, or with a persisted reward record on disk.
pub(crate) fn should_skip(
    block_number: u64,
    watermark: Option<u64>,
    already_persisted: bool,
) -> bool {
    already_persisted || watermark.is_some_and(|w| block_number >= w)
}

/// Per-snapshot budget: weekly budget divided by the snapshot count,
/// `ceil((end − start) / stride)`, truncated to 18 digits.
pub(crate) fn per_snapshot_budget(
    weekly_budget: &BigDecimal,
    start_block: u64,
    end_block: u64,
    stride: u64,
) -> BigDecimal {
    let snapshots = (end_block - start_block).div_ceil(stride);

    truncate18(&(weekly_budget / BigDecimal::from(snapshots)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn blocks_below_the_watermark_are_processed() {
        assert!(!should_skip(10_100, Some(10_200), false));
    }

    #[test]
    fn blocks_at_the_watermark_are_skipped() {
        assert!(should_skip(10_200, Some(10_200), false));
    }

    #[test]
    fn blocks_above_the_watermark_are_skipped() {
        assert!(should_skip(10_456, Some(10_200), false));
    }

    #[test]
    fn no_watermark_processes_everything() {
        assert!(!should_skip(10_100, None, false));
    }

    #[test]
    fn persisted_records_are_skipped_regardless_of_watermark() {
        assert!(should_skip(10_100, None, true));
        assert!(should_skip(10_100, Some(10_200), true));
    }

    #[test]
    fn budget_splits_evenly_over_full_strides() {
        // 1024 blocks = exactly 4 strides of 256
        let budget = per_snapshot_budget(&dec("1000"), 10_000, 11_024, 256);
        assert_eq!(budget, dec("250"));
    }

    #[test]
    fn partial_final_stride_still_counts_as_a_snapshot() {
        // 1025 blocks = 4 full strides + 1 block, ceil -> 5 snapshots
        let budget = per_snapshot_budget(&dec("1000"), 10_000, 11_025, 256);
        assert_eq!(budget, dec("200"));
    }

    #[test]
    fn single_short_range_gets_the_whole_budget() {
        let budget = per_snapshot_budget(&dec("145000"), 10_000, 10_001, 256);
        assert_eq!(budget, dec("145000"));
    }

    #[test]
    fn budget_division_truncates_toward_zero() {
        // 100 / 3 snapshots
        let budget = per_snapshot_budget(&dec("100"), 0, 768, 256);
        assert_eq!(budget, dec("33.333333333333333333"));
    }
}
