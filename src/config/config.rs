use bigdecimal::BigDecimal;
use config::{Config, ConfigError, File};
use serde::Deserialize;

/// External service endpoints.
///
/// Every network dependency of a run lives here:
/// - JSON-RPC archive node for point-in-time contract reads
/// - GraphQL pool directory (subgraph) for the pool list
/// - Market-data API for historical USD price series
/// - Eligible-token whitelist bounding which tokens get priced
#[derive(Debug, Deserialize, Clone)]
pub struct EndpointSettings {
    pub rpc_url: String,
    pub subgraph_url: String,
    #[serde(default = "default_price_api_url")]
    pub price_api_url: String,
    #[serde(default = "default_eligible_tokens_url")]
    pub eligible_tokens_url: String,
}

fn default_price_api_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

fn default_eligible_tokens_url() -> String {
    "https://raw.githubusercontent.com/balancer-labs/assets/master/lists/eligible.json"
        .to_string()
}

/// Parameters of a single mining run.
///
/// A run covers one distribution week: blocks are walked from `end_block`
/// down to `start_block` in strides of `blocks_per_snapshot`. Setting
/// `watermark` resumes an interrupted run; blocks at or above it are assumed
/// already persisted and skipped.
#[derive(Debug, Deserialize, Clone)]
pub struct RunSettings {
    /// Distribution week number, names the reports subdirectory.
    pub week: u32,
    pub start_block: u64,
    pub end_block: u64,
    #[serde(default)]
    pub watermark: Option<u64>,
    #[serde(default = "default_reports_dir")]
    pub reports_dir: String,
}

fn default_reports_dir() -> String {
    "./reports".to_string()
}

/// Which generation of the adjustment policy to apply.
///
/// The factor policy changed between protocol versions: v1 uses the plain
/// pair-ratio factor, v2 boosts pairs holding the governance token.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PolicyVersion {
    V1,
    V2,
}

/// Incentive policy knobs: budget, cap, and adjustment-factor inputs.
#[derive(Debug, Deserialize, Clone)]
pub struct RewardSettings {
    /// Tokens distributed across the whole week.
    #[serde(default = "default_weekly_budget")]
    pub weekly_budget: BigDecimal,
    #[serde(default = "default_blocks_per_snapshot")]
    pub blocks_per_snapshot: u64,
    /// Ceiling on any one token's Balancer-wide attributed liquidity, USD.
    #[serde(default = "default_market_cap_cap")]
    pub market_cap_cap: BigDecimal,
    #[serde(default = "default_policy_version")]
    pub policy_version: PolicyVersion,
    /// Governance token address, required for the v2 pair boost.
    #[serde(default)]
    pub bal_token: Option<String>,
    #[serde(default = "default_bal_multiplier")]
    pub bal_multiplier: BigDecimal,
    /// Tokens exempt from cap correction (uncapped).
    #[serde(default)]
    pub exempt_tokens: Vec<String>,
    /// Token pairs treated as wraps of the same asset (e.g. DAI/cDAI);
    /// their pairs are discounted by the wrap factor.
    #[serde(default)]
    pub wrap_pairs: Vec<(String, String)>,
    /// Copy one token's fetched price series onto another after fetching,
    /// `(source, target)` per entry.
    #[serde(default)]
    pub price_aliases: Vec<(String, String)>,
}

fn default_weekly_budget() -> BigDecimal {
    BigDecimal::from(145_000)
}

fn default_blocks_per_snapshot() -> u64 {
    256
}

fn default_market_cap_cap() -> BigDecimal {
    BigDecimal::from(10_000_000)
}

fn default_policy_version() -> PolicyVersion {
    PolicyVersion::V1
}

fn default_bal_multiplier() -> BigDecimal {
    BigDecimal::from(2)
}

/// Root application configuration, loaded from `config.yaml` at startup.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub endpoints: EndpointSettings,
    pub run: RunSettings,
    pub rewards: RewardSettings,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name("config"))
            .build()?;

        let settings: Settings = s.try_deserialize()?;

        Ok(settings)
    }
}
