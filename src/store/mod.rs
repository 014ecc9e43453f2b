//! Persisted run state under the per-week reports directory.
//!
//! Layout: `<reports_dir>/<week>/_pools.json`, `_prices.json`, and one
//! `<block>.json` reward record per processed snapshot. Reward writes go
//! through a temp-file rename, so a record either exists complete or not at
//! all; together with the block-keyed file names this makes re-running past
//! already-persisted blocks a no-op.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{
    model::{Pool, RewardSnapshot},
    prices::PriceBook,
};

const POOLS_FILE: &str = "_pools.json";
const PRICES_FILE: &str = "_prices.json";

/// File store for one week's run outputs.
pub struct ReportStore {
    week_dir: PathBuf,
}

impl ReportStore {
    pub fn new(reports_dir: &str, week: u32) -> Self {
        Self {
            week_dir: Path::new(reports_dir).join(week.to_string()),
        }
    }

    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.week_dir)
            .with_context(|| format!("Failed to create reports directory {:?}", self.week_dir))
    }

    pub fn write_pools(&self, pools: &[Pool]) -> Result<()> {
        self.write_json(POOLS_FILE, pools)
    }

    /// Whether a price snapshot from a previous run exists; if so, price
    /// fetching is skipped entirely.
    pub fn prices_available(&self) -> bool {
        self.week_dir.join(PRICES_FILE).exists()
    }

    pub fn read_prices(&self) -> Result<PriceBook> {
        let path = self.week_dir.join(PRICES_FILE);
        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read price snapshot {path:?}"))?;

        serde_json::from_str(&contents)
            .with_context(|| format!("Failed to decode price snapshot {path:?}"))
    }

    pub fn write_prices(&self, prices: &PriceBook) -> Result<()> {
        self.write_json(PRICES_FILE, prices)
    }

    pub fn has_block_rewards(&self, block_number: u64) -> bool {
        self.week_dir.join(format!("{block_number}.json")).exists()
    }

    pub fn write_block_rewards(&self, snapshot: &RewardSnapshot) -> Result<()> {
        self.write_json(&format!("{}.json", snapshot.block_number), snapshot)
    }

    fn write_json<T: Serialize + ?Sized>(&self, name: &str, value: &T) -> Result<()> {
        let path = self.week_dir.join(name);
        let tmp = self.week_dir.join(format!("{name}.tmp"));

        let contents = serde_json::to_vec(value)
            .with_context(|| format!("Failed to encode {name}"))?;
        fs::write(&tmp, contents).with_context(|| format!("Failed to write {tmp:?}"))?;
        fs::rename(&tmp, &path).with_context(|| format!("Failed to move {tmp:?} into place"))?;

        Ok(())
    }
}
