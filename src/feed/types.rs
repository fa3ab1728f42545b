//! Feed records and their wire representation.

use crate::error::FeedError;
use serde::Deserialize;

/// One post from the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: String,
    pub author_id: String,
    pub author_handle: String,
    pub text: String,
    pub is_reply: bool,
    pub is_repost: bool,
}

impl Message {
    /// Public link to this post.
    pub fn url(&self) -> String {
        status_url(&self.author_handle, &self.id)
    }
}

/// Public link to a post by `handle`.
pub fn status_url(handle: &str, id: &str) -> String {
    format!("https://twitter.com/{}/status/{}", handle, id)
}

/// One line of the filtered stream.
#[derive(Debug, Deserialize)]
pub(crate) struct StreamEnvelope {
    pub data: Option<PostData>,
    #[serde(default)]
    pub includes: Includes,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PostData {
    pub id: String,
    pub text: String,
    pub author_id: String,
    pub in_reply_to_user_id: Option<String>,
    #[serde(default)]
    pub referenced_tweets: Vec<ReferencedPost>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReferencedPost {
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Includes {
    #[serde(default)]
    pub users: Vec<User>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct User {
    pub id: String,
    pub username: String,
}

impl StreamEnvelope {
    pub(crate) fn into_message(self) -> Result<Message, FeedError> {
        let data = self
            .data
            .ok_or_else(|| FeedError::Decode("stream record without data".to_string()))?;

        let is_reply = data.in_reply_to_user_id.is_some()
            || data.referenced_tweets.iter().any(|r| r.kind == "replied_to");
        let is_repost = data.referenced_tweets.iter().any(|r| r.kind == "retweeted");
        let author_handle = self
            .includes
            .users
            .iter()
            .find(|u| u.id == data.author_id)
            .map(|u| u.username.clone())
            .unwrap_or_else(|| data.author_id.clone());

        Ok(Message {
            id: data.id,
            author_id: data.author_id,
            author_handle,
            text: data.text,
            is_reply,
            is_repost,
        })
    }
}

/// Decode one non-blank stream line.
pub(crate) fn decode_line(line: &str) -> Result<Message, FeedError> {
    serde_json::from_str::<StreamEnvelope>(line)
        .map_err(|e| FeedError::Decode(e.to_string()))?
        .into_message()
}
