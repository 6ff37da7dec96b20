//! Environment-sourced process configuration.

use crate::types::ChannelId;

const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("environment variable {0} is not valid: {1}")]
    Invalid(&'static str, String),
}

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Shared secret for verifying inbound platform signatures.
    pub signing_secret: String,

    /// Bot credential for the outbound send API.
    pub bot_token: String,

    /// Channel targeted by the manual send endpoint.
    pub default_channel: ChannelId,

    /// Secret for signing and verifying bearer tokens. Independent of the
    /// platform signing secret.
    pub jwt_secret: String,

    /// Listen port.
    pub port: u16,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match std::env::var("PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| ConfigError::Invalid("PORT", raw))?,
            Err(_) => DEFAULT_PORT,
        };

        Ok(Self {
            signing_secret: require("SLACK_SIGNING_SECRET")?,
            bot_token: require("SLACK_BOT_TOKEN")?,
            default_channel: ChannelId::new(require("SLACK_CHANNEL_ID")?),
            jwt_secret: require("JWT_SECRET")?,
            port,
        })
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}
