use serde::{Deserialize, Serialize};

/// Envelope kinds the platform delivers to the events endpoint.
pub const KIND_URL_VERIFICATION: &str = "url_verification";
pub const KIND_EVENT_CALLBACK: &str = "event_callback";

/// Event type that qualifies for debounced acknowledgment.
pub const EVENT_TYPE_MESSAGE: &str = "message";

const SUBTYPE_BOT_MESSAGE: &str = "bot_message";

/// Unique identifier for a channel (the debounce partitioning key).
///
/// This is a strongly-typed wrapper to avoid accidental mixing
/// of channel IDs with other string identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outer payload delivered by the platform to `POST /slack/events`.
///
/// Immutable once parsed. Unknown fields (`event_id`, `team_id`, ...) are
/// accepted and ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundEnvelope {
    /// Envelope kind: `url_verification`, `event_callback`, or other.
    #[serde(rename = "type")]
    pub kind: String,

    /// Echo value for the verification handshake.
    pub challenge: Option<String>,

    /// Inner event, present on `event_callback` envelopes.
    pub event: Option<InboundEvent>,
}

/// Inner event of an `event_callback` envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundEvent {
    #[serde(rename = "type")]
    pub event_type: String,

    /// Channel the event belongs to.
    pub channel: Option<String>,

    pub user: Option<String>,
    pub text: Option<String>,
    pub ts: Option<String>,

    /// Present when the message was produced by a bot.
    pub bot_id: Option<String>,
    pub subtype: Option<String>,
}

impl InboundEvent {
    /// Whether this event originated from a bot. Bot-originated events must
    /// never reach the debounce scheduler (the acknowledgment would feed
    /// back into itself).
    pub fn is_bot_originated(&self) -> bool {
        self.bot_id.is_some() || self.subtype.as_deref() == Some(SUBTYPE_BOT_MESSAGE)
    }
}

impl InboundEnvelope {
    /// Qualification gate for the debounce core: a non-bot `message` event
    /// inside an `event_callback` envelope, with a channel to key on.
    pub fn qualifying_channel(&self) -> Option<ChannelId> {
        if self.kind != KIND_EVENT_CALLBACK {
            return None;
        }
        let event = self.event.as_ref()?;
        if event.event_type != EVENT_TYPE_MESSAGE || event.is_bot_originated() {
            return None;
        }
        event.channel.as_deref().map(ChannelId::new)
    }
}

/// Body of `POST /send-message`.
#[derive(Debug, Clone, Deserialize)]
pub struct SendRequest {
    pub text: String,
}

/// Outcome of a successful outbound delivery, echoed to `/send-message`
/// callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryResult {
    pub channel: String,

    /// Platform timestamp of the posted message, when the API returned one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ts: Option<String>,
}
