use serde::{Deserialize, Serialize};

/// A Balancer pool as reported by the pool directory (subgraph).
///
/// Immutable snapshot of protocol state fetched once per run at the end
/// block; consumed read-only by every snapshot. Addresses are normalized to
/// lowercase hex so they can be used as map keys against the price book.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pool {
    /// Pool contract address.
    pub id: String,
    /// Administrator address; receives the full attribution for private
    /// pools (zero share supply).
    pub controller: String,
    /// Pool creation timestamp in seconds.
    pub create_time: u64,
    /// Ordered token list. Empty when the directory reported none, which
    /// excludes the pool from every snapshot.
    #[serde(default)]
    pub tokens_list: Vec<String>,
    /// Addresses holding a nonzero balance of the pool's share token.
    #[serde(default)]
    pub share_holders: Vec<String>,
}

/// Number and timestamp of one snapshot block.
#[derive(Debug, Clone, Copy)]
pub struct BlockHeader {
    pub number: u64,
    /// Seconds since epoch.
    pub timestamp: u64,
}
