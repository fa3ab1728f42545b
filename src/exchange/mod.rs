//! Exchange integration.
//!
//! ## Binance USDⓈ-M Futures
//! REST connectivity for:
//! - Symbol metadata (quantity precision, tick size)
//! - Latest prices
//! - Leverage changes, order placement and order lookup

mod client;
mod traits;
mod types;

pub use client::BinanceClient;
pub use traits::FuturesExchange;
#[cfg(test)]
pub use traits::MockFuturesExchange;
pub use types::*;
