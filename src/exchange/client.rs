//! Binance Futures REST API client.

use crate::config::BinanceConfig;
use crate::exchange::traits::FuturesExchange;
use crate::exchange::types::*;
use anyhow::{Context, Result};
use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::{Client, Method, Response};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use sha2::Sha256;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, instrument, warn};

const FUTURES_BASE_URL: &str = "https://fapi.binance.com";
const FUTURES_TESTNET_URL: &str = "https://testnet.binancefuture.com";
const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Binance USDⓈ-M futures client.
pub struct BinanceClient {
    http: Client,
    api_key: String,
    secret_key: String,
    base_url: String,
}

impl BinanceClient {
    /// Create a new Binance client from configuration.
    pub fn new(config: &BinanceConfig) -> Result<Self> {
        let base_url = if config.testnet {
            FUTURES_TESTNET_URL
        } else {
            FUTURES_BASE_URL
        };
        Self::with_base_url(&config.api_key, &config.secret_key, base_url)
    }

    /// Create a client against a custom base URL.
    pub fn with_base_url(api_key: &str, secret_key: &str, base_url: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            api_key: api_key.to_string(),
            secret_key: secret_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Generate HMAC-SHA256 signature for authenticated requests.
    fn sign(&self, query_string: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret_key.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(query_string.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Get current timestamp in milliseconds.
    fn timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or_default()
    }

    fn encode_query(params: &[(&str, String)]) -> String {
        params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&")
    }

    /// Send a signed request; `timestamp` and `signature` are appended.
    async fn send_signed(
        &self,
        method: Method,
        path: &str,
        mut params: Vec<(&str, String)>,
    ) -> Result<Response> {
        params.push(("timestamp", Self::timestamp().to_string()));
        let query = Self::encode_query(&params);
        let signature = self.sign(&query);
        let url = format!("{}{}?{}&signature={}", self.base_url, path, query, signature);

        self.http
            .request(method, &url)
            .header("X-MBX-APIKEY", &self.api_key)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", path))
    }

    /// Turn non-2xx answers into errors carrying Binance's code and message.
    async fn parse_response<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => anyhow::bail!(
                    "Binance API error {} on {}: code {} {}",
                    status,
                    what,
                    api_err.code,
                    api_err.msg
                ),
                Err(_) => anyhow::bail!("Binance API error {} on {}: {}", status, what, body),
            }
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", what))
    }

    // ==================== Market Data (Public) ====================

    /// Get exchange information for all futures symbols.
    #[instrument(skip(self))]
    pub async fn get_exchange_info(&self) -> Result<FuturesExchangeInfo> {
        let url = format!("{}/fapi/v1/exchangeInfo", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("Failed to fetch exchange info")?;

        Self::parse_response(response, "exchange info").await
    }

    /// Get the latest price for a symbol.
    #[instrument(skip(self))]
    pub async fn get_symbol_price(&self, symbol: &str) -> Result<Option<Decimal>> {
        let url = format!(
            "{}/fapi/v1/ticker/price?symbol={}",
            self.base_url,
            urlencoding::encode(symbol)
        );
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("Failed to fetch price")?;

        let prices: PriceResponse = Self::parse_response(response, "ticker price").await?;
        Ok(prices.price_of(symbol))
    }

    // ==================== Orders (Authenticated) ====================

    /// Set leverage for a symbol.
    #[instrument(skip(self))]
    pub async fn change_leverage(&self, symbol: &str, leverage: u32) -> Result<()> {
        let params = vec![("symbol", symbol.to_string()), ("leverage", leverage.to_string())];
        let response = self
            .send_signed(Method::POST, "/fapi/v1/leverage", params)
            .await?;

        let _: serde_json::Value = Self::parse_response(response, "change leverage").await?;
        Ok(())
    }

    /// Place a new futures order.
    #[instrument(skip(self))]
    pub async fn place_futures_order(&self, order: &NewOrder) -> Result<OrderResponse> {
        debug!("Placing futures order: {:?}", order);

        let response = self
            .send_signed(Method::POST, "/fapi/v1/order", order.to_params())
            .await?;

        Self::parse_response(response, "create order").await
    }

    /// Query a futures order.
    #[instrument(skip(self))]
    pub async fn query_futures_order(&self, symbol: &str, order_id: i64) -> Result<OrderResponse> {
        let params = vec![("symbol", symbol.to_string()), ("orderId", order_id.to_string())];
        let response = self
            .send_signed(Method::GET, "/fapi/v1/order", params)
            .await?;

        Self::parse_response(response, "get order").await
    }
}

#[async_trait]
impl FuturesExchange for BinanceClient {
    async fn get_symbols(&self) -> Result<Vec<TradableSymbol>> {
        let info = self.get_exchange_info().await?;

        let symbols = info
            .symbols
            .iter()
            .filter_map(|s| match s.to_tradable() {
                Ok(tradable) => Some(tradable),
                Err(e) => {
                    warn!(symbol = %s.symbol, error = %e, "Skipping symbol with unusable metadata");
                    None
                }
            })
            .collect::<Vec<_>>();

        debug!("Fetched {} tradable futures symbols", symbols.len());
        Ok(symbols)
    }

    async fn get_price(&self, symbol: &str) -> Result<Option<Decimal>> {
        self.get_symbol_price(symbol).await
    }

    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<()> {
        self.change_leverage(symbol, leverage).await
    }

    async fn place_order(&self, order: &NewOrder) -> Result<OrderResponse> {
        self.place_futures_order(order).await
    }

    async fn get_order(&self, symbol: &str, order_id: i64) -> Result<OrderResponse> {
        self.query_futures_order(symbol, order_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn order_json(status: &str, avg_price: &str) -> serde_json::Value {
        serde_json::json!({
            "orderId": 4242,
            "symbol": "SOLUSDT",
            "status": status,
            "clientOrderId": "abc",
            "price": "0",
            "avgPrice": avg_price,
            "origQty": "10",
            "executedQty": "10",
            "side": "BUY",
            "type": "MARKET",
            "timeInForce": "GTC",
            "updateTime": 1700000000000i64
        })
    }

    async fn client_for(server: &MockServer) -> BinanceClient {
        BinanceClient::with_base_url("key", "secret", &server.uri()).unwrap()
    }

    #[test]
    fn test_sign_is_hex_sha256() {
        let client = BinanceClient::with_base_url("key", "secret", "http://localhost").unwrap();
        let signature = client.sign("symbol=BTCUSDT&timestamp=1");
        assert_eq!(signature.len(), 64);
        assert!(signature.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(signature, client.sign("symbol=BTCUSDT&timestamp=1"));
    }

    #[tokio::test]
    async fn test_get_symbols_skips_unusable_entries() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fapi/v1/exchangeInfo"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "symbols": [
                    {
                        "symbol": "BTCUSDT",
                        "quantityPrecision": 3,
                        "filters": [{"filterType": "PRICE_FILTER", "tickSize": "0.10"}]
                    },
                    {
                        "symbol": "BROKENUSDT",
                        "quantityPrecision": 0,
                        "filters": [{"filterType": "PRICE_FILTER", "tickSize": "n/a"}]
                    }
                ]
            })))
            .mount(&server)
            .await;

        let symbols = client_for(&server).await.get_symbols().await.unwrap();
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols[0].symbol, "BTCUSDT");
        assert_eq!(symbols[0].tick_size, dec!(0.1));
    }

    #[tokio::test]
    async fn test_get_price() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fapi/v1/ticker/price"))
            .and(query_param("symbol", "BTCUSDT"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "symbol": "BTCUSDT", "price": "50000.00", "time": 1
            })))
            .mount(&server)
            .await;

        let price = client_for(&server).await.get_price("BTCUSDT").await.unwrap();
        assert_eq!(price, Some(dec!(50000)));
    }

    #[tokio::test]
    async fn test_api_error_carries_code() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fapi/v1/leverage"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "code": -4028, "msg": "Leverage 200 is not valid"
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .set_leverage("BTCUSDT", 200)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("-4028"));
    }

    #[tokio::test]
    async fn test_place_order_is_signed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/fapi/v1/order"))
            .and(header("X-MBX-APIKEY", "key"))
            .and(query_param("symbol", "SOLUSDT"))
            .and(query_param("type", "MARKET"))
            .and(query_param("quantity", "10"))
            .respond_with(ResponseTemplate::new(200).set_body_json(order_json("NEW", "0.00")))
            .expect(1)
            .mount(&server)
            .await;

        let order = NewOrder::market("SOLUSDT", OrderSide::Buy, dec!(10));
        let response = client_for(&server).await.place_order(&order).await.unwrap();
        assert_eq!(response.order_id, 4242);
        assert_eq!(response.status, OrderStatus::New);

        let requests = server.received_requests().await.unwrap();
        let query = requests[0].url.query().unwrap_or_default().to_string();
        assert!(query.contains("timestamp="));
        assert!(query.contains("signature="));
    }

    #[tokio::test]
    async fn test_get_order_returns_avg_price() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fapi/v1/order"))
            .and(query_param("orderId", "4242"))
            .respond_with(ResponseTemplate::new(200).set_body_json(order_json("FILLED", "51.234")))
            .mount(&server)
            .await;

        let order = client_for(&server).await.get_order("SOLUSDT", 4242).await.unwrap();
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.avg_price, dec!(51.234));
    }
}
