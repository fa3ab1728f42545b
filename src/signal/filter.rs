//! Tradeable-asset filter.

use super::types::BuySignal;
use std::collections::HashSet;

/// Immutable set of known asset tickers, upper-cased on construction.
#[derive(Debug, Clone, Default)]
pub struct AssetFilter {
    assets: HashSet<String>,
}

impl AssetFilter {
    pub fn new<I, S>(assets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            assets: assets
                .into_iter()
                .map(|s| s.as_ref().to_uppercase())
                .collect(),
        }
    }

    /// Exact membership after upper-casing.
    pub fn accept(&self, ticker: &str) -> bool {
        self.assets.contains(&ticker.to_uppercase())
    }

    /// One buy signal per accepted ticker, in input order.
    pub fn buy_signals(&self, tickers: &[String], source: &str) -> Vec<BuySignal> {
        tickers
            .iter()
            .filter(|t| self.accept(t))
            .map(|t| BuySignal::new(t.as_str(), source))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}
