//! Social feed integration.
//!
//! - `types`: `Message` records and the stream's wire format
//! - `transport`: the `FeedTransport` seam and its HTTP filtered-stream implementation
//! - `listener`: multi-subscription listener with per-task stop signals

mod listener;
mod transport;
mod types;

pub use listener::StreamListener;
pub use transport::{FeedStream, FeedTransport, HttpFeed};
pub use types::{status_url, Message};
