//! AI search conversation.
//!
//! A [`ChatSession`] keeps the message history of the AI search mode. Each
//! user message triggers one AI search; the assistant answers with a count
//! and a short preview of the matching businesses.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::lookup::{AI_PREVIEW_LIMIT, AbnLookup};
use crate::types::Business;
use crate::view::group_thousands;
use crate::{Result, SearchResponse};

/// Reply used when the search failed.
pub const FAILURE_REPLY: &str = "Sorry, something went wrong. Please try again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message of the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub businesses: Option<Vec<Business>>,
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// Message history plus the in-flight flag.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    messages: Vec<ChatMessage>,
    is_loading: bool,
    sequence: u64,
}

impl ChatSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Send `input` and wait for the assistant's answer.
    ///
    /// Blank input is ignored and returns `None`.
    pub async fn send(&mut self, lookup: &AbnLookup, input: &str) -> Option<&ChatMessage> {
        let text = self.begin(input)?;
        let outcome = lookup.ai_search_once(&text).await;
        Some(self.finish(&text, outcome))
    }

    /// Record the user message and mark the session loading.
    ///
    /// Returns the trimmed query, or `None` for blank input.
    pub fn begin(&mut self, input: &str) -> Option<String> {
        let text = input.trim();
        if text.is_empty() {
            return None;
        }
        let id = self.next_id("user");
        self.messages.push(ChatMessage {
            id,
            role: Role::User,
            content: text.to_string(),
            businesses: None,
            timestamp: now_millis(),
        });
        self.is_loading = true;
        Some(text.to_string())
    }

    /// Record the assistant's answer to `query` and clear the loading flag.
    pub fn finish(&mut self, query: &str, outcome: Result<SearchResponse>) -> &ChatMessage {
        let message = match outcome {
            Ok(response) => {
                let mut businesses = response.data;
                businesses.truncate(AI_PREVIEW_LIMIT as usize);
                ChatMessage {
                    id: self.next_id("assistant"),
                    role: Role::Assistant,
                    content: assistant_reply(query, response.pagination.total),
                    businesses: (!businesses.is_empty()).then_some(businesses),
                    timestamp: now_millis(),
                }
            }
            Err(e) => {
                debug!(query, error = %e, "AI search failed");
                ChatMessage {
                    id: self.next_id("error"),
                    role: Role::Assistant,
                    content: FAILURE_REPLY.to_string(),
                    businesses: None,
                    timestamp: now_millis(),
                }
            }
        };
        self.is_loading = false;
        self.messages.push(message);
        &self.messages[self.messages.len() - 1]
    }

    /// Forget the conversation.
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    fn next_id(&mut self, prefix: &str) -> String {
        self.sequence += 1;
        format!("{prefix}-{}", self.sequence)
    }
}

/// Assistant text for a search that matched `total` businesses.
pub fn assistant_reply(query: &str, total: u64) -> String {
    if total > 0 {
        format!(
            "Found {} businesses matching \"{query}\".",
            group_thousands(total)
        )
    } else {
        format!("No businesses found matching \"{query}\". Try a different query.")
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
