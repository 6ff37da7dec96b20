//! Outbound message delivery with bounded retry.
//!
//! `DeliveryClient` is the seam to the external send API; `RetryingSender`
//! wraps any client with a fixed-delay, fixed-bound retry loop. This is a
//! bounded-retry policy, not exponential backoff: the acknowledgment either
//! lands within a few seconds or is dropped.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::time::sleep;
use tracing::warn;

use crate::types::{ChannelId, DeliveryResult};

/// Why a single delivery attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    #[error("network error: {0}")]
    Network(String),

    #[error("send API rejected the message: {0}")]
    Api(String),
}

/// Sends one message to one channel; may fail transiently.
#[async_trait]
pub trait DeliveryClient: Send + Sync {
    async fn post_message(
        &self,
        channel: &ChannelId,
        text: &str,
    ) -> Result<DeliveryResult, DeliveryError>;
}

/// Retry policy for the sender.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the initial attempt (total attempts = max_retries + 1).
    pub max_retries: u32,

    /// Fixed delay between attempts.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            delay: Duration::from_millis(1000),
        }
    }
}

/// Wraps a [`DeliveryClient`] with a bounded, fixed-delay retry loop.
///
/// Exhausting the retries surfaces the last failure; deciding whether that
/// is fatal is the caller's business.
pub struct RetryingSender {
    client: Arc<dyn DeliveryClient>,
    policy: RetryPolicy,
}

impl RetryingSender {
    pub fn new(client: Arc<dyn DeliveryClient>, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub async fn send(
        &self,
        channel: &ChannelId,
        text: &str,
    ) -> Result<DeliveryResult, DeliveryError> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.client.post_message(channel, text).await {
                Ok(result) => return Ok(result),
                Err(err) if attempt <= self.policy.max_retries => {
                    warn!(
                        channel = %channel,
                        attempt,
                        error = %err,
                        "delivery attempt failed, retrying"
                    );
                    sleep(self.policy.delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Response shape of the platform's `chat.postMessage` API.
#[derive(Debug, Deserialize)]
struct PostMessageResponse {
    ok: bool,
    error: Option<String>,
    channel: Option<String>,
    ts: Option<String>,
}

/// Real delivery client backed by the Slack Web API.
pub struct SlackApiClient {
    http: reqwest::Client,
    bot_token: String,
    base_url: String,
}

impl SlackApiClient {
    pub fn new(http: reqwest::Client, bot_token: impl Into<String>) -> Self {
        Self {
            http,
            bot_token: bot_token.into(),
            base_url: "https://slack.com/api".to_string(),
        }
    }

    /// Point the client at a different API host (tests, proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl DeliveryClient for SlackApiClient {
    async fn post_message(
        &self,
        channel: &ChannelId,
        text: &str,
    ) -> Result<DeliveryResult, DeliveryError> {
        let url = format!("{}/chat.postMessage", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.bot_token)
            .json(&serde_json::json!({
                "channel": channel.as_str(),
                "text": text,
            }))
            .send()
            .await
            .map_err(|e| DeliveryError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(DeliveryError::Network(format!(
                "send API returned status {}",
                response.status()
            )));
        }

        let body: PostMessageResponse = response
            .json()
            .await
            .map_err(|e| DeliveryError::Network(e.to_string()))?;

        if !body.ok {
            return Err(DeliveryError::Api(
                body.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        Ok(DeliveryResult {
            channel: body.channel.unwrap_or_else(|| channel.as_str().to_string()),
            ts: body.ts,
        })
    }
}
