//! Error taxonomy.
//!
//! `ConfigError` and `FeedError::Connection` are fatal at startup. Every
//! `ExecutionError` is scoped to a single buy-signal attempt: it is logged
//! and the signal is dropped.

use thiserror::Error;

/// Invalid or incomplete configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failures of the social feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// Subscription setup failed; surfaced synchronously from `start`.
    #[error("feed connection failed: {0}")]
    Connection(#[source] anyhow::Error),
    /// The stream broke after it was established.
    #[error("feed transport error: {0}")]
    Transport(String),
    /// A single record could not be decoded.
    #[error("malformed feed record: {0}")]
    Decode(String),
}

/// Per-attempt failures of the order executor.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("exchange query failed: {0:#}")]
    ExchangeQuery(#[source] anyhow::Error),
    #[error("exchange returned no tradable symbols")]
    EmptySymbolCache,
    #[error("futures symbol not found: {0}")]
    SymbolNotFound(String),
    #[error("no price available for {0}")]
    PriceUnavailable(String),
    #[error("price query for {symbol} failed: {source:#}")]
    Query {
        symbol: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("change leverage for {symbol} failed: {source:#}")]
    LeverageChange {
        symbol: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("create buy order for {symbol} failed: {source:#}")]
    OrderSubmission {
        symbol: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("get order {order_id} for {symbol} failed: {source:#}")]
    OrderLookup {
        symbol: String,
        order_id: i64,
        #[source]
        source: anyhow::Error,
    },
    #[error("create take profit order for {symbol} failed, position left unprotected: {source:#}")]
    TakeProfitSubmission {
        symbol: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ExecutionError {
    /// Symbol the failed attempt was about, when known.
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Self::SymbolNotFound(symbol) | Self::PriceUnavailable(symbol) => Some(symbol),
            Self::Query { symbol, .. }
            | Self::LeverageChange { symbol, .. }
            | Self::OrderSubmission { symbol, .. }
            | Self::OrderLookup { symbol, .. }
            | Self::TakeProfitSubmission { symbol, .. } => Some(symbol),
            Self::ExchangeQuery(_) | Self::EmptySymbolCache => None,
        }
    }
}
