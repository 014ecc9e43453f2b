//! GraphQL pool directory (subgraph) client.
//!
//! Fetches the full pool list as of a given block, transparently paginating
//! both the pool list and any pool's share-holder list past the subgraph's
//! 1000-entry page limit.

use anyhow::{bail, Context, Result};
use log::info;
use serde::Deserialize;
use serde_json::json;

use crate::model::Pool;

/// Subgraph page limit.
const QUERY_PAGE_SIZE: usize = 1000;

#[derive(Debug, Deserialize)]
struct GraphResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Vec<GraphError>,
}

#[derive(Debug, Deserialize)]
struct GraphError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct PoolsData {
    pools: Vec<RawPool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPool {
    id: String,
    controller: String,
    create_time: u64,
    #[serde(default)]
    tokens_list: Option<Vec<String>>,
    #[serde(default)]
    shares: Vec<RawShare>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawShare {
    user_address: RawUser,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    id: String,
}

/// Pool directory client.
pub struct PoolDirectory {
    http: reqwest::Client,
    url: String,
}

impl PoolDirectory {
    pub fn new(subgraph_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: subgraph_url.to_string(),
        }
    }

    /// Fetch every pool registered as of `block`, with controller, creation
    /// time, token list and the full share-holder list.
    pub async fn fetch_all_pools(&self, block: u64) -> Result<Vec<Pool>> {
        let mut raw_pools = Vec::new();
        let mut skip = 0;

        loop {
            let query = format!(
                r#"{{
                    pools (first: {QUERY_PAGE_SIZE}, skip: {skip}, block: {{ number: {block} }}) {{
                        id
                        controller
                        createTime
                        tokensList
                        shares (first: {QUERY_PAGE_SIZE}) {{
                            userAddress {{
                                id
                            }}
                        }}
                    }}
                }}"#
            );

            let page = self.query(&query).await?.pools;
            let no_more_pages = page.len() < QUERY_PAGE_SIZE;
            raw_pools.extend(page);

            if no_more_pages {
                break;
            }

            skip += QUERY_PAGE_SIZE;
        }

        let mut pools = Vec::with_capacity(raw_pools.len());

        for raw in raw_pools {
            let mut share_holders: Vec<String> = raw
                .shares
                .iter()
                .map(|s| s.user_address.id.to_lowercase())
                .collect();

            // A full first page means the holder list may be truncated;
            // re-fetch it with its own pagination.
            if share_holders.len() == QUERY_PAGE_SIZE {
                share_holders = self.fetch_all_share_holders(&raw.id, block).await?;
            }

            pools.push(Pool {
                id: raw.id.to_lowercase(),
                controller: raw.controller.to_lowercase(),
                create_time: raw.create_time,
                tokens_list: raw
                    .tokens_list
                    .unwrap_or_default()
                    .into_iter()
                    .map(|t| t.to_lowercase())
                    .collect(),
                share_holders,
            });
        }

        info!("Fetched {} pools from directory at block {block}", pools.len());

        Ok(pools)
    }

    async fn fetch_all_share_holders(&self, pool_id: &str, block: u64) -> Result<Vec<String>> {
        let mut holders = Vec::new();
        let mut skip = 0;

        loop {
            let query = format!(
                r#"{{
                    pools (where: {{ id: "{pool_id}" }}, block: {{ number: {block} }}) {{
                        id
                        controller
                        createTime
                        shares (first: {QUERY_PAGE_SIZE}, skip: {skip}) {{
                            userAddress {{
                                id
                            }}
                        }}
                    }}
                }}"#
            );

            let mut data = self.query(&query).await?;
            let pool = data
                .pools
                .pop()
                .with_context(|| format!("Pool {pool_id} vanished while paginating holders"))?;

            let page: Vec<String> = pool
                .shares
                .iter()
                .map(|s| s.user_address.id.to_lowercase())
                .collect();
            let no_more_pages = page.len() < QUERY_PAGE_SIZE;
            holders.extend(page);

            if no_more_pages {
                break;
            }

            skip += QUERY_PAGE_SIZE;
        }

        Ok(holders)
    }

    async fn query(&self, query: &str) -> Result<PoolsData> {
        let response: GraphResponse<PoolsData> = self
            .http
            .post(&self.url)
            .json(&json!({ "query": query }))
            .send()
            .await
            .context("Pool directory request failed")?
            .error_for_status()
            .context("Pool directory returned an error status")?
            .json()
            .await
            .context("Failed to decode pool directory response")?;

        if let Some(err) = response.errors.first() {
            bail!("Pool directory query failed: {}", err.message);
        }

        response
            .data
            .context("Pool directory response carried no data")
    }
}
