//! Venue-agnostic interface for the derivatives exchange.
//!
//! The order executor and symbol cache only see this trait, which keeps the
//! Binance client swappable and lets tests script exchange behaviour.

use super::types::{NewOrder, OrderResponse, TradableSymbol};
use anyhow::Result;
use async_trait::async_trait;
use rust_decimal::Decimal;

/// Operations the executor needs from a futures venue. Every call is
/// fallible and never retried by callers.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FuturesExchange: Send + Sync {
    /// Fetch metadata for every tradable pair.
    async fn get_symbols(&self) -> Result<Vec<TradableSymbol>>;

    /// Current price, or `None` when the venue has no price for the symbol.
    async fn get_price(&self, symbol: &str) -> Result<Option<Decimal>>;

    /// Set account leverage for a symbol.
    async fn set_leverage(&self, symbol: &str, leverage: u32) -> Result<()>;

    /// Submit a new order.
    async fn place_order(&self, order: &NewOrder) -> Result<OrderResponse>;

    /// Fetch an existing order by id.
    async fn get_order(&self, symbol: &str, order_id: i64) -> Result<OrderResponse>;
}
