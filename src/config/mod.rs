//! Configuration management for the listing trader.
//!
//! Loads settings from a `.env` file, an optional `config` file and
//! `LISTING_`-prefixed environment variables (`__` separates sections).

use crate::error::ConfigError;
use crate::signal::COINBASE_PRO_USER_ID;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

const MAX_LEVERAGE: u32 = 125;

/// Main application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Binance API credentials
    #[serde(default)]
    pub binance: BinanceConfig,
    /// Social feed connection
    #[serde(default)]
    pub feed: FeedConfig,
    /// Tradeable-asset reference list
    #[serde(default)]
    pub assets: AssetsConfig,
    /// Position sizing and order behaviour
    #[serde(default)]
    pub futures: FuturesConfig,
    /// Symbol metadata refresh
    #[serde(default)]
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BinanceConfig {
    /// API key for authentication
    #[serde(default)]
    pub api_key: String,
    /// Secret key for signing requests
    #[serde(default)]
    pub secret_key: String,
    /// Use testnet instead of production
    #[serde(default = "default_testnet")]
    pub testnet: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Base URL of the filtered-stream API
    #[serde(default = "default_feed_base_url")]
    pub base_url: String,
    /// Bearer token for the stream
    #[serde(default)]
    pub bearer_token: String,
    /// Author ids whose posts are streamed
    #[serde(default = "default_tracked_author_ids")]
    pub tracked_author_ids: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// CoinGecko API base URL
    #[serde(default = "default_assets_base_url")]
    pub base_url: String,
    /// Optional CoinGecko demo API key
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Raw futures settings as configured. Zero values mean "use the default",
/// see [`FuturesOptions::from_config`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuturesConfig {
    #[serde(default = "default_leverage")]
    pub leverage: u32,
    #[serde(default = "default_each_trade_amount_usd")]
    pub each_trade_amount_usd: Decimal,
    #[serde(default = "default_take_profit_percentage")]
    pub take_profit_percentage: Decimal,
    /// Submit real orders. When false only the intended trade is logged.
    #[serde(default)]
    pub will_execute_order: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Seconds between full symbol metadata refreshes
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_secs: u64,
}

// Default value functions
fn default_testnet() -> bool {
    true
}

fn default_feed_base_url() -> String {
    "https://api.twitter.com".to_string()
}

fn default_tracked_author_ids() -> Vec<String> {
    vec![COINBASE_PRO_USER_ID.to_string()]
}

fn default_assets_base_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

fn default_leverage() -> u32 {
    5
}

fn default_each_trade_amount_usd() -> Decimal {
    dec!(500)
}

fn default_take_profit_percentage() -> Decimal {
    dec!(5.0)
}

fn default_refresh_interval() -> u64 {
    3600
}

impl Config {
    /// Load configuration from environment variables and config files.
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = config::Config::builder()
            .add_source(config::File::with_name("config").required(false))
            .add_source(
                config::Environment::with_prefix("LISTING")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("feed.tracked_author_ids"),
            )
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.binance.api_key.is_empty() {
            return Err(ConfigError::MissingCredential("binance api key"));
        }
        if self.binance.secret_key.is_empty() {
            return Err(ConfigError::MissingCredential("binance secret key"));
        }
        if self.feed.bearer_token.is_empty() {
            return Err(ConfigError::MissingCredential("feed bearer token"));
        }
        if self.feed.tracked_author_ids.is_empty() {
            return Err(ConfigError::Invalid(
                "at least one tracked author id is required".to_string(),
            ));
        }
        if self.futures.leverage > MAX_LEVERAGE {
            return Err(ConfigError::Invalid(format!(
                "leverage must be <= {MAX_LEVERAGE}, got {}",
                self.futures.leverage
            )));
        }
        if self.futures.each_trade_amount_usd < Decimal::ZERO {
            return Err(ConfigError::Invalid(
                "each_trade_amount_usd must not be negative".to_string(),
            ));
        }
        if self.cache.refresh_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "refresh_interval_secs must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for BinanceConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            secret_key: String::new(),
            testnet: default_testnet(),
        }
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_feed_base_url(),
            bearer_token: String::new(),
            tracked_author_ids: default_tracked_author_ids(),
        }
    }
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            base_url: default_assets_base_url(),
            api_key: None,
        }
    }
}

impl Default for FuturesConfig {
    fn default() -> Self {
        Self {
            leverage: default_leverage(),
            each_trade_amount_usd: default_each_trade_amount_usd(),
            take_profit_percentage: default_take_profit_percentage(),
            will_execute_order: false,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval(),
        }
    }
}

/// Validated settings consumed by the order executor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuturesOptions {
    pub leverage: u32,
    pub each_trade_amount_usd: Decimal,
    pub take_profit_percentage: Decimal,
    pub will_execute_order: bool,
}

impl Default for FuturesOptions {
    fn default() -> Self {
        Self {
            leverage: default_leverage(),
            each_trade_amount_usd: default_each_trade_amount_usd(),
            take_profit_percentage: default_take_profit_percentage(),
            will_execute_order: false,
        }
    }
}

impl FuturesOptions {
    /// Apply configured overrides on top of the defaults. Unset values
    /// (zero leverage, non-positive amount, zero take-profit) keep the default.
    pub fn from_config(config: &FuturesConfig) -> Self {
        let mut options = Self::default();

        if config.leverage > 0 {
            options.leverage = config.leverage;
        }
        if config.each_trade_amount_usd > Decimal::ZERO {
            options.each_trade_amount_usd = config.each_trade_amount_usd;
        }
        if config.take_profit_percentage != Decimal::ZERO {
            options.take_profit_percentage = config.take_profit_percentage;
        }
        options.will_execute_order = config.will_execute_order;

        options
    }
}
