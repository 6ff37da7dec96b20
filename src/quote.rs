//! Quote responder.
//!
//! A qualifying message whose text contains "quote" gets a reply carrying a
//! random quote from a public API, in addition to its debounced
//! acknowledgment. The reply goes through the retrying sender; fetch or
//! delivery failure is logged and dropped, since the inbound request was
//! already answered.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{error, info};

use crate::sender::RetryingSender;
use crate::types::ChannelId;

/// Substring that triggers the responder.
const TRIGGER: &str = "quote";

/// Whether a message text asks for a quote.
pub fn wants_quote(text: &str) -> bool {
    text.contains(TRIGGER)
}

/// Why a quote could not be fetched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuoteError {
    #[error("quote API unreachable: {0}")]
    Network(String),

    #[error("quote API returned an unusable payload")]
    Malformed,
}

/// A fetched quote with its attribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub text: String,
    pub author: String,
}

impl Quote {
    pub fn attributed(&self) -> String {
        format!("{} — {}", self.text, self.author)
    }
}

/// Fetches one random quote; may fail transiently.
#[async_trait]
pub trait QuoteFetcher: Send + Sync {
    async fn fetch_random(&self) -> Result<Quote, QuoteError>;
}

/// Element shape of the zenquotes.io `/random` response array.
#[derive(Debug, Deserialize)]
struct ZenQuote {
    q: String,
    a: String,
}

/// Real fetcher backed by zenquotes.io.
pub struct ZenQuotesClient {
    http: reqwest::Client,
    base_url: String,
}

impl ZenQuotesClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: "https://zenquotes.io/api".to_string(),
        }
    }

    /// Point the client at a different API host (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl QuoteFetcher for ZenQuotesClient {
    async fn fetch_random(&self) -> Result<Quote, QuoteError> {
        let url = format!("{}/random", self.base_url);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| QuoteError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(QuoteError::Network(format!(
                "quote API returned status {}",
                response.status()
            )));
        }

        let quotes: Vec<ZenQuote> = response.json().await.map_err(|_| QuoteError::Malformed)?;
        let first = quotes.into_iter().next().ok_or(QuoteError::Malformed)?;

        Ok(Quote {
            text: first.q,
            author: first.a,
        })
    }
}

/// Fetches a quote and replies into the originating channel, greeting the
/// requesting user.
#[derive(Clone)]
pub struct QuoteResponder {
    fetcher: Arc<dyn QuoteFetcher>,
    sender: Arc<RetryingSender>,
}

impl QuoteResponder {
    pub fn new(fetcher: Arc<dyn QuoteFetcher>, sender: Arc<RetryingSender>) -> Self {
        Self { fetcher, sender }
    }

    /// Fetch and reply. Failures are logged and dropped; the inbound
    /// request was already acknowledged by the time this runs.
    pub async fn respond(&self, channel: ChannelId, user: Option<String>) {
        let quote = match self.fetcher.fetch_random().await {
            Ok(quote) => quote,
            Err(err) => {
                error!(channel = %channel, error = %err, "quote fetch failed");
                return;
            }
        };

        let reply = match user {
            Some(user) => format!("Hello, <@{user}>, {}", quote.attributed()),
            None => quote.attributed(),
        };

        match self.sender.send(&channel, &reply).await {
            Ok(_) => info!(channel = %channel, "quote reply delivered"),
            Err(err) => {
                error!(
                    channel = %channel,
                    error = %err,
                    "quote reply delivery failed after retries"
                );
            }
        }
    }
}
