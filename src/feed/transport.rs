//! Feed transports.

use super::types::{decode_line, Message};
use crate::config::FeedConfig;
use crate::error::FeedError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, instrument};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const RULE_TAG: &str = "listing-trader";

/// Decoded records of one live subscription. Dropping it closes the connection.
pub type FeedStream = BoxStream<'static, Result<Message, FeedError>>;

/// Opens filtered subscriptions on the social feed.
#[async_trait]
pub trait FeedTransport: Send + Sync {
    /// Subscribe to posts by `author_ids`. Fails with `FeedError::Connection`
    /// when the subscription cannot be established.
    async fn connect(&self, author_ids: &[String]) -> Result<FeedStream, FeedError>;
}

/// Filtered-stream client speaking newline-delimited JSON over HTTP.
#[derive(Debug, Clone)]
pub struct HttpFeed {
    http: Client,
    base_url: String,
    bearer_token: String,
}

#[derive(Debug, Serialize)]
struct AddRules {
    add: Vec<StreamRule>,
}

#[derive(Debug, Serialize)]
struct StreamRule {
    value: String,
    tag: &'static str,
}

impl HttpFeed {
    /// Create a new feed client from configuration.
    pub fn new(config: &FeedConfig) -> Result<Self> {
        // No overall timeout: the stream response stays open indefinitely
        let http = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            bearer_token: config.bearer_token.clone(),
        })
    }

    /// Register one `from:<id>` rule per tracked author.
    #[instrument(skip(self))]
    async fn register_rules(&self, author_ids: &[String]) -> Result<()> {
        let body = AddRules {
            add: author_ids
                .iter()
                .map(|id| StreamRule {
                    value: format!("from:{}", id),
                    tag: RULE_TAG,
                })
                .collect(),
        };

        let url = format!("{}/2/tweets/search/stream/rules", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.bearer_token)
            .json(&body)
            .send()
            .await
            .context("Failed to register stream rules")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Stream rules rejected {}: {}", status, body);
        }

        debug!("Registered {} stream rules", author_ids.len());
        Ok(())
    }

    async fn open_stream(&self) -> Result<reqwest::Response> {
        let url = format!(
            "{}/2/tweets/search/stream?tweet.fields=author_id,in_reply_to_user_id,referenced_tweets&expansions=author_id&user.fields=username",
            self.base_url
        );
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.bearer_token)
            .send()
            .await
            .context("Failed to open filtered stream")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Filtered stream refused {}: {}", status, body);
        }

        Ok(response)
    }
}

#[async_trait]
impl FeedTransport for HttpFeed {
    async fn connect(&self, author_ids: &[String]) -> Result<FeedStream, FeedError> {
        self.register_rules(author_ids)
            .await
            .map_err(FeedError::Connection)?;
        let response = self.open_stream().await.map_err(FeedError::Connection)?;

        info!(authors = ?author_ids, "Filtered stream connected");

        let mut buffer = LineBuffer::default();
        let records = response
            .bytes_stream()
            .map(Some)
            .chain(stream::once(async { None }))
            .flat_map(move |chunk| {
                let lines = match chunk {
                    Some(Ok(bytes)) => buffer.push(&bytes),
                    Some(Err(e)) => vec![Err(FeedError::Transport(e.to_string()))],
                    // Body ended; the last record may lack its newline
                    None => buffer.finish().into_iter().map(Ok).collect(),
                };
                stream::iter(
                    lines
                        .into_iter()
                        .map(|line| line.and_then(|l| decode_line(&l))),
                )
            });

        Ok(records.boxed())
    }
}

/// Upper bound for one buffered record without a newline.
const MAX_RECORD_BYTES: usize = 1024 * 1024;

/// Splits a chunked body into complete, non-blank lines.
#[derive(Debug, Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, chunk: &[u8]) -> Vec<Result<String, FeedError>> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.pending.drain(..=pos).collect();
            if let Some(line) = Self::non_blank(&raw) {
                lines.push(Ok(line));
            }
        }

        if self.pending.len() > MAX_RECORD_BYTES {
            let dropped = self.pending.len();
            self.pending.clear();
            lines.push(Err(FeedError::Decode(format!(
                "record exceeds {} bytes without a line break ({} dropped)",
                MAX_RECORD_BYTES, dropped
            ))));
        }
        lines
    }

    /// Whatever is left once the body ends.
    fn finish(&mut self) -> Option<String> {
        let raw = std::mem::take(&mut self.pending);
        Self::non_blank(&raw)
    }

    fn non_blank(raw: &[u8]) -> Option<String> {
        let line = String::from_utf8_lossy(raw).trim().to_string();
        // Blank lines are keep-alives
        (!line.is_empty()).then_some(line)
    }
}
