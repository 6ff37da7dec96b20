//! Structural validation of inbound payloads, applied before any business
//! logic runs. On failure the caller gets a list of violated fields to map
//! into a client error response.

use serde::Serialize;

use crate::types::{InboundEnvelope, SendRequest, EVENT_TYPE_MESSAGE, KIND_URL_VERIFICATION};

/// A single violated field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldViolation {
    pub field: String,
    pub message: String,
}

impl FieldViolation {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate an inbound envelope beyond what deserialization enforces.
pub fn validate_envelope(envelope: &InboundEnvelope) -> Result<(), Vec<FieldViolation>> {
    let mut violations = Vec::new();

    if envelope.kind.is_empty() {
        violations.push(FieldViolation::new("type", "Envelope type is required"));
    }

    if envelope.kind == KIND_URL_VERIFICATION && envelope.challenge.is_none() {
        violations.push(FieldViolation::new(
            "challenge",
            "Verification handshake requires a challenge",
        ));
    }

    if let Some(event) = &envelope.event {
        if event.event_type.is_empty() {
            violations.push(FieldViolation::new("event.type", "Event type is required"));
        }
        if event.event_type == EVENT_TYPE_MESSAGE
            && event.channel.as_deref().map_or(true, str::is_empty)
        {
            violations.push(FieldViolation::new(
                "event.channel",
                "Message events require a channel",
            ));
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}

/// Validate the `/send-message` body.
pub fn validate_send_request(request: &SendRequest) -> Result<(), Vec<FieldViolation>> {
    if request.text.is_empty() {
        return Err(vec![FieldViolation::new(
            "text",
            "Message text is required",
        )]);
    }
    Ok(())
}
