//! A single-process bridge between a chat platform's event webhook and
//! outbound message delivery.
//!
//! The crate receives signed platform events over HTTP, collapses bursts of
//! messages per channel into one delayed acknowledgment, and exposes an
//! authenticated endpoint for manual sends.
//!
//! ## Guarantees
//! - Inbound requests are HMAC-verified with a bounded replay window
//! - At most one pending acknowledgment timer per channel
//! - Bounded, fixed-delay retry on outbound delivery
//!
//! ## Non-Guarantees
//! - Durability across restarts (debounce state is in-memory)
//! - Multi-instance coordination
//! - Exactly-once delivery
//!
//! The debounce registry grows by one entry per distinct channel seen and
//! shrinks as timers fire; that is the only eviction.

pub mod auth;
pub mod config;
pub mod debounce;
pub mod error;
pub mod quote;
pub mod sender;
pub mod server;
pub mod signing;
pub mod types;
pub mod validate;

pub use auth::{authorize_bearer, mint_token, verify_token, AuthClaims, AuthError};
pub use config::{Config, ConfigError};
pub use debounce::{AckScheduler, DebounceConfig};
pub use error::{ApiError, ApiResult, ErrorResponse};
pub use quote::{wants_quote, Quote, QuoteError, QuoteFetcher, QuoteResponder, ZenQuotesClient};
pub use sender::{DeliveryClient, DeliveryError, RetryPolicy, RetryingSender, SlackApiClient};
pub use server::{router, AppState};
pub use signing::{
    compute_signature, parse_signature_headers, verify_event_request, verify_signature,
    Disposition, VerificationError, REPLAY_WINDOW_SECS, RETRY_NUM_HEADER, SIGNATURE_HEADER,
    TIMESTAMP_HEADER,
};
pub use types::{ChannelId, DeliveryResult, InboundEnvelope, InboundEvent, SendRequest};
pub use validate::{validate_envelope, validate_send_request, FieldViolation};
