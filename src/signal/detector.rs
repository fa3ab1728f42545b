//! Listing announcement detection.

use super::filter::AssetFilter;
use super::types::BuySignal;
use crate::feed::Message;
use tracing::{debug, info};

/// Author id of the Coinbase Pro announcement account.
pub const COINBASE_PRO_USER_ID: &str = "720487892670410753";

const LISTING_TEMPLATE: &str = "Starting today, inbound transfers for XXX are now available in the regions where trading is supported. Traders cannot place orders and no orders will be filled. Trading will begin on or after 9AM PT on Mon 1/1 if liquidity conditions are met.";
const SIMILARITY_THRESHOLD: f64 = 0.75;
const REQUIRED_KEYWORD: &str = "transfer";
const TRIM_CHARS: &[char] = &['&', ',', '.'];

const PREFIX_SCALE: f64 = 0.1;
const MAX_PREFIX: usize = 4;

/// True when `text` reads like a new-listing announcement.
pub fn classify_announcement(text: &str) -> bool {
    template_similarity(text) > SIMILARITY_THRESHOLD && text.contains(REQUIRED_KEYWORD)
}

/// Jaro-Winkler similarity of `text` to the listing template.
///
/// The common-prefix boost applies to any Jaro score strictly between 0
/// and 1. `strsim::jaro_winkler` only boosts scores above 0.7, which would
/// reject truncated announcements that still open with "Starting today".
fn template_similarity(text: &str) -> f64 {
    let jaro = strsim::jaro(text, LISTING_TEMPLATE);
    if jaro <= 0.0 || jaro >= 1.0 {
        return jaro;
    }

    let prefix = text
        .chars()
        .zip(LISTING_TEMPLATE.chars())
        .take_while(|(a, b)| a == b)
        .take(MAX_PREFIX)
        .count();

    jaro + PREFIX_SCALE * prefix as f64 * (1.0 - jaro)
}

/// First contiguous run of ticker-like words in `text`.
///
/// Words are split on whitespace and stripped of surrounding `&`, `,` and `.`;
/// words that strip to nothing are skipped without ending the run.
pub fn extract_tickers(text: &str) -> Vec<String> {
    let mut tickers = Vec::new();

    for word in text.split_whitespace() {
        let token = word.trim_matches(TRIM_CHARS);
        if token.is_empty() {
            continue;
        }

        if is_ticker_like(token) {
            tickers.push(token.to_string());
        } else if !tickers.is_empty() {
            break;
        }
    }

    tickers
}

/// No lowercase letters; digits and punctuation are allowed.
fn is_ticker_like(token: &str) -> bool {
    !token
        .chars()
        .any(|c| c.is_alphabetic() && !c.is_uppercase())
}

/// Detects listing announcements from one tracked account.
#[derive(Debug, Clone)]
pub struct SignalDetector {
    tracked_author_id: String,
    filter: AssetFilter,
}

impl SignalDetector {
    pub fn new(tracked_author_id: impl Into<String>, filter: AssetFilter) -> Self {
        Self {
            tracked_author_id: tracked_author_id.into(),
            filter,
        }
    }

    /// Original posts by the tracked author; replies and reposts are ignored.
    pub fn is_eligible(&self, message: &Message) -> bool {
        message.author_id == self.tracked_author_id && !message.is_reply && !message.is_repost
    }

    /// Buy signals for every known asset announced in `message`.
    pub fn handle(&self, message: &Message) -> Vec<BuySignal> {
        if !self.is_eligible(message) {
            debug!(id = %message.id, author = %message.author_id, "Ignoring ineligible message");
            return Vec::new();
        }
        if !classify_announcement(&message.text) {
            debug!(id = %message.id, "Message is not a listing announcement");
            return Vec::new();
        }

        let tickers = extract_tickers(&message.text);
        let signals = self.filter.buy_signals(&tickers, &message.url());

        info!(
            id = %message.id,
            tickers = ?tickers,
            accepted = signals.len(),
            "Listing announcement detected"
        );

        signals
    }
}
