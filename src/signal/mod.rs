//! Signal detection.
//!
//! Turns feed messages into buy signals:
//! - `detector`: eligibility, fuzzy announcement classification, ticker extraction
//! - `filter`: intersection with the tradeable-asset set
//! - `assets`: CoinGecko provider for that set

mod assets;
mod detector;
mod filter;
mod types;

pub use assets::CoinGeckoClient;
pub use detector::{
    classify_announcement, extract_tickers, SignalDetector, COINBASE_PRO_USER_ID,
};
pub use filter::AssetFilter;
pub use types::BuySignal;
