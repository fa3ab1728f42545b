//! CoinGecko client for the tradeable-asset reference list.

use crate::config::AssetsConfig;
use anyhow::{Context, Result};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{info, instrument};

/// Response entry from /coins/list
#[derive(Debug, Deserialize)]
struct CoinListEntry {
    #[allow(dead_code)]
    id: String,
    symbol: String,
}

/// Fetches the set of asset tickers known to CoinGecko.
#[derive(Debug, Clone)]
pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl CoinGeckoClient {
    pub fn new(config: &AssetsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    /// Every listed coin symbol, upper-cased.
    #[instrument(skip(self))]
    pub async fn get_coin_symbols(&self) -> Result<HashSet<String>> {
        let url = format!("{}/coins/list", self.base_url);
        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header("x-cg-demo-api-key", key);
        }

        let response = request
            .send()
            .await
            .context("Failed to fetch CoinGecko coin list")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("CoinGecko API error {}: {}", status, body);
        }

        let coins: Vec<CoinListEntry> = response
            .json()
            .await
            .context("Failed to parse CoinGecko coin list")?;

        let symbols: HashSet<String> = coins.into_iter().map(|c| c.symbol.to_uppercase()).collect();
        info!("Loaded {} tradeable asset symbols", symbols.len());

        Ok(symbols)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_get_coin_symbols_uppercases_and_dedups() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/coins/list"))
            .and(header("x-cg-demo-api-key", "demo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"id": "solana", "symbol": "sol", "name": "Solana"},
                {"id": "wrapped-solana", "symbol": "sol", "name": "Wrapped SOL"},
                {"id": "chiliz", "symbol": "chz", "name": "Chiliz"}
            ])))
            .mount(&server)
            .await;

        let client = CoinGeckoClient::new(&AssetsConfig {
            base_url: server.uri(),
            api_key: Some("demo".to_string()),
        })
        .unwrap();

        let symbols = client.get_coin_symbols().await.unwrap();
        assert_eq!(symbols.len(), 2);
        assert!(symbols.contains("SOL"));
        assert!(symbols.contains("CHZ"));
    }

    #[tokio::test]
    async fn test_rate_limited_response_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/coins/list"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = CoinGeckoClient::new(&AssetsConfig {
            base_url: server.uri(),
            api_key: None,
        })
        .unwrap();

        assert!(client.get_coin_symbols().await.is_err());
    }
}
