//! Type definitions for Binance Futures API requests and responses.

use anyhow::{anyhow, Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Cached metadata for a tradable derivatives pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradableSymbol {
    pub symbol: String,
    /// Decimal places accepted for order quantities
    pub quantity_precision: u32,
    /// Minimum price increment, always positive
    pub tick_size: Decimal,
}

/// Exchange information for futures.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuturesExchangeInfo {
    pub symbols: Vec<FuturesSymbolInfo>,
}

/// Symbol information for futures.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuturesSymbolInfo {
    pub symbol: String,
    pub quantity_precision: u32,
    #[serde(default)]
    pub price_precision: u32,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub base_asset: String,
    #[serde(default)]
    pub quote_asset: String,
    #[serde(default)]
    pub filters: Vec<SymbolFilter>,
}

/// Trading rule attached to a symbol. Only the price filter is used.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "filterType")]
pub enum SymbolFilter {
    #[serde(rename = "PRICE_FILTER")]
    Price {
        #[serde(rename = "tickSize")]
        tick_size: String,
    },
    #[serde(other)]
    Other,
}

impl FuturesSymbolInfo {
    /// Raw tick size from the price filter.
    pub fn tick_size(&self) -> Option<&str> {
        self.filters.iter().find_map(|f| match f {
            SymbolFilter::Price { tick_size } => Some(tick_size.as_str()),
            SymbolFilter::Other => None,
        })
    }

    /// Convert into cache metadata, validating the tick size.
    pub fn to_tradable(&self) -> Result<TradableSymbol> {
        let raw = self
            .tick_size()
            .ok_or_else(|| anyhow!("{} has no PRICE_FILTER", self.symbol))?;
        let tick_size: Decimal = raw
            .parse()
            .with_context(|| format!("convert tick size {raw:?} of {} to decimal", self.symbol))?;
        anyhow::ensure!(
            tick_size > Decimal::ZERO,
            "{} has non-positive tick size {}",
            self.symbol,
            tick_size
        );

        Ok(TradableSymbol {
            symbol: self.symbol.clone(),
            quantity_precision: self.quantity_precision,
            tick_size,
        })
    }
}

/// Latest price for a symbol.
#[derive(Debug, Clone, Deserialize)]
pub struct SymbolPrice {
    pub symbol: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
}

/// `/ticker/price` answers with an object when a symbol is given and a list otherwise.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum PriceResponse {
    Single(SymbolPrice),
    Many(Vec<SymbolPrice>),
}

impl PriceResponse {
    /// Price for `symbol`, if the response contains one.
    pub fn price_of(&self, symbol: &str) -> Option<Decimal> {
        match self {
            Self::Single(p) if p.symbol == symbol => Some(p.price),
            Self::Single(_) => None,
            Self::Many(prices) => prices.iter().find(|p| p.symbol == symbol).map(|p| p.price),
        }
    }
}

/// Error body returned by Binance on non-2xx responses.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    pub code: i64,
    pub msg: String,
}

/// Order side (buy or sell).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    Limit,
    Market,
    StopMarket,
    TakeProfitMarket,
}

impl OrderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Limit => "LIMIT",
            Self::Market => "MARKET",
            Self::StopMarket => "STOP_MARKET",
            Self::TakeProfitMarket => "TAKE_PROFIT_MARKET",
        }
    }
}

/// Time in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TimeInForce {
    Gtc, // Good Till Cancel
    Ioc, // Immediate or Cancel
    Fok, // Fill or Kill
    Gtx, // Post Only
}

impl TimeInForce {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gtc => "GTC",
            Self::Ioc => "IOC",
            Self::Fok => "FOK",
            Self::Gtx => "GTX",
        }
    }
}

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    PartiallyFilled,
    Filled,
    Canceled,
    Rejected,
    Expired,
    ExpiredInMatch,
}

/// New order request.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    pub symbol: String,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub quantity: Option<Decimal>,
    pub price: Option<Decimal>,
    pub stop_price: Option<Decimal>,
    pub time_in_force: Option<TimeInForce>,
    pub close_position: Option<bool>,
    pub reduce_only: Option<bool>,
    pub new_client_order_id: Option<String>,
}

impl NewOrder {
    /// Market order for a fixed quantity.
    pub fn market(symbol: &str, side: OrderSide, quantity: Decimal) -> Self {
        Self {
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::Market,
            quantity: Some(quantity),
            price: None,
            stop_price: None,
            time_in_force: None,
            close_position: None,
            reduce_only: None,
            new_client_order_id: None,
        }
    }

    /// Take-profit market order that closes the whole position once
    /// `stop_price` is touched.
    pub fn take_profit_close(symbol: &str, side: OrderSide, stop_price: Decimal) -> Self {
        Self {
            symbol: symbol.to_string(),
            side,
            order_type: OrderType::TakeProfitMarket,
            quantity: None,
            price: None,
            stop_price: Some(stop_price),
            time_in_force: Some(TimeInForce::Gtc),
            close_position: Some(true),
            reduce_only: None,
            new_client_order_id: None,
        }
    }

    /// Request parameters in Binance's wire format, unsigned.
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("symbol", self.symbol.clone()),
            ("side", self.side.as_str().to_string()),
            ("type", self.order_type.as_str().to_string()),
        ];

        if let Some(qty) = &self.quantity {
            params.push(("quantity", qty.to_string()));
        }
        if let Some(price) = &self.price {
            params.push(("price", price.to_string()));
        }
        if let Some(stop_price) = &self.stop_price {
            params.push(("stopPrice", stop_price.to_string()));
        }
        if let Some(tif) = &self.time_in_force {
            params.push(("timeInForce", tif.as_str().to_string()));
        }
        if let Some(close_position) = self.close_position {
            params.push(("closePosition", close_position.to_string()));
        }
        if let Some(reduce_only) = self.reduce_only {
            params.push(("reduceOnly", reduce_only.to_string()));
        }
        if let Some(client_id) = &self.new_client_order_id {
            params.push(("newClientOrderId", client_id.clone()));
        }

        params
    }
}

/// Order response from the exchange.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub order_id: i64,
    pub symbol: String,
    pub status: OrderStatus,
    #[serde(default)]
    pub client_order_id: String,
    #[serde(with = "rust_decimal::serde::str")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub avg_price: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub orig_qty: Decimal,
    #[serde(with = "rust_decimal::serde::str")]
    pub executed_qty: Decimal,
    pub side: OrderSide,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub time_in_force: Option<TimeInForce>,
    #[serde(default)]
    pub update_time: i64,
}
