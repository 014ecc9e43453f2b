use anyhow::{Context, Result};
use log::{info, warn};
use serde::Deserialize;
use std::time::Duration;

use super::PriceBook;

/// Pause between market-API requests to stay under rate limits.
const REQUEST_PACING: Duration = Duration::from_secs(1);

#[derive(Debug, Deserialize)]
struct MarketChart {
    #[serde(default)]
    prices: Vec<[f64; 2]>,
}

#[derive(Debug, Deserialize)]
struct EligibleTokens {
    homestead: Vec<String>,
}

/// Historical price fetcher against a CoinGecko-compatible market API.
pub struct PriceClient {
    http: reqwest::Client,
    base_url: String,
}

impl PriceClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Fetch the eligible-token whitelist bounding which tokens get priced.
    pub async fn fetch_eligible_tokens(&self, url: &str) -> Result<Vec<String>> {
        let list: EligibleTokens = self
            .http
            .get(url)
            .send()
            .await
            .context("Eligible-token list request failed")?
            .error_for_status()
            .context("Eligible-token list returned an error status")?
            .json()
            .await
            .context("Failed to decode eligible-token list")?;

        Ok(list
            .homestead
            .into_iter()
            .map(|t| t.to_lowercase())
            .collect())
    }

    /// Fetch USD price series for each token over `[start_secs, end_secs]`.
    ///
    /// Tokens the API does not know get an empty series and are thereby
    /// excluded from valuation; transport failures abort the run.
    pub async fn fetch_token_prices(
        &self,
        tokens: &[String],
        start_secs: u64,
        end_secs: u64,
    ) -> Result<PriceBook> {
        let mut book = PriceBook::default();

        for (i, token) in tokens.iter().enumerate() {
            let url = format!(
                "{}/coins/ethereum/contract/{}/market_chart/range?vs_currency=usd&from={}&to={}",
                self.base_url, token, start_secs, end_secs
            );

            let response = self
                .http
                .get(&url)
                .send()
                .await
                .with_context(|| format!("Price request failed for token {token}"))?;

            if !response.status().is_success() {
                // Unknown contract: the token stays unpriced for the week.
                warn!(
                    "Market API returned {} for token {token}, treating as unpriced",
                    response.status()
                );
                book.insert(token.clone(), Vec::new());
            } else {
                let chart: MarketChart = response
                    .json()
                    .await
                    .with_context(|| format!("Failed to decode price series for token {token}"))?;

                let series = chart
                    .prices
                    .into_iter()
                    .map(|[ts, price]| (ts as i64, price))
                    .collect();
                book.insert(token.clone(), series);
            }

            if i + 1 < tokens.len() {
                tokio::time::sleep(REQUEST_PACING).await;
            }
        }

        info!(
            "Fetched price series for {} of {} whitelisted tokens",
            book.values().filter(|s| !s.is_empty()).count(),
            tokens.len()
        );

        Ok(book)
    }
}

/// Copy one token's fetched series onto another, `(source, target)` per
/// alias. Covers assets quoted under a different address than the one bound
/// in pools (e.g. a migrated token contract).
pub fn apply_aliases(book: &mut PriceBook, aliases: &[(String, String)]) {
    for (source, target) in aliases {
        let series = book
            .get(&source.to_lowercase())
            .cloned()
            .unwrap_or_default();
        book.insert(target.to_lowercase(), series);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aliases_copy_series_onto_target() {
        let mut book = PriceBook::default();
        book.insert("0xaa".to_string(), vec![(1, 1.0)]);

        apply_aliases(
            &mut book,
            &[("0xAA".to_string(), "0xBB".to_string())],
        );

        assert_eq!(book.get("0xbb"), Some(&vec![(1, 1.0)]));
    }

    #[test]
    fn alias_of_unknown_source_yields_empty_series() {
        let mut book = PriceBook::default();

        apply_aliases(
            &mut book,
            &[("0xaa".to_string(), "0xbb".to_string())],
        );

        assert_eq!(book.get("0xbb"), Some(&Vec::new()));
    }
}
