use std::sync::Arc;

use anyhow::Context;
use jemallocator::Jemalloc;
use log::{info, LevelFilter};
use simple_logger::SimpleLogger;

#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

use balmine::{Settings, SnapshotDriver, StandardPolicy};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .init()
        .unwrap();

    // Load configuration
    let settings = Arc::new(
        Settings::new()
            .context("Failed to load config.yaml. Please ensure it exists and is valid")?,
    );

    info!(
        "Starting mining run: week {}, blocks {}..{}",
        settings.run.week, settings.run.start_block, settings.run.end_block
    );

    let policy = Arc::new(StandardPolicy::from_settings(&settings.rewards));

    let driver = SnapshotDriver::new(settings, policy)
        .context("Failed to initialize snapshot driver")?;

    driver.run().await
}
