use chrono::{DateTime, Duration, Utc};

/// Request to open a long position in `symbol`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuySignal {
    /// Upper-case base asset ticker, e.g. "SOL"
    pub symbol: String,
    /// Link to the post the ticker came from
    pub source: String,
    /// When the announcement was classified; logged to correlate attempts
    pub detected_at: DateTime<Utc>,
}

impl BuySignal {
    pub fn new(symbol: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            source: source.into(),
            detected_at: Utc::now(),
        }
    }

    /// Time elapsed since detection.
    pub fn age(&self) -> Duration {
        Utc::now() - self.detected_at
    }

    /// USDT-margined perpetual pair for this asset.
    pub fn pair_symbol(&self) -> String {
        format!("{}USDT", self.symbol)
    }
}
