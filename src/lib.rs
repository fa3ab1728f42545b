//! # Listing Trader
//!
//! Watches an exchange's announcement account for "new asset listing" posts
//! and opens a leveraged long on Binance Futures for every announced ticker
//! that is also a known tradeable asset, protected by a take-profit order.
//!
//! ## Architecture
//!
//! - `config`: Configuration loading, validation and futures defaults
//! - `exchange`: Binance Futures REST client behind the `FuturesExchange` trait
//! - `feed`: Social stream transport and the multi-subscription listener
//! - `signal`: Announcement classification, ticker extraction, asset filtering
//! - `strategy`: Symbol metadata cache and the order executor
//! - `pipeline`: Task wiring between listener, detector and executor
//! - `utils`: Shared decimal rounding helpers

pub mod config;
pub mod error;
pub mod exchange;
pub mod feed;
pub mod pipeline;
pub mod signal;
pub mod strategy;
pub mod utils;

pub use config::Config;
pub use error::{ConfigError, ExecutionError, FeedError};
