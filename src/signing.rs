use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the request signature.
pub const SIGNATURE_HEADER: &str = "x-platform-signature";
/// Header carrying the timestamp the signature was computed over.
pub const TIMESTAMP_HEADER: &str = "x-platform-request-timestamp";
/// Header the platform sets when re-delivering an already-sent request.
pub const RETRY_NUM_HEADER: &str = "x-platform-retry-num";

/// Maximum age of a signed request. Anything older is rejected even if the
/// signature itself is valid.
pub const REPLAY_WINDOW_SECS: u64 = 300;

const SIGNATURE_VERSION: &str = "v0";

/// Why an inbound request was rejected by the signature gate.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VerificationError {
    #[error("missing signature or timestamp header")]
    MissingCredentials,

    #[error("timestamp header is not a valid unix timestamp")]
    InvalidTimestamp,

    #[error("request timestamp is outside the replay window")]
    StaleRequest,

    #[error("signature mismatch")]
    BadSignature,
}

/// Result of an accepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Fresh request, safe to process.
    Process,

    /// Platform re-delivery of a request whose side effects already ran.
    /// The caller must respond with success to stop further retries, but
    /// must not process the event again.
    DuplicateDelivery,
}

/// Signature and timestamp values pulled out of the request headers.
#[derive(Debug, Clone, Default)]
pub struct ParsedHeaders {
    pub signature: Option<String>,
    pub timestamp: Option<String>,
    pub retry_num: Option<String>,
}

/// Scan request headers for the signature, timestamp and retry markers.
/// Header names are matched case-insensitively.
pub fn parse_signature_headers<'a, I>(headers: I) -> ParsedHeaders
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut parsed = ParsedHeaders::default();
    for (name, value) in headers {
        if name.eq_ignore_ascii_case(SIGNATURE_HEADER) {
            parsed.signature = Some(value.to_string());
        } else if name.eq_ignore_ascii_case(TIMESTAMP_HEADER) {
            parsed.timestamp = Some(value.to_string());
        } else if name.eq_ignore_ascii_case(RETRY_NUM_HEADER) {
            parsed.retry_num = Some(value.to_string());
        }
    }
    parsed
}

/// Compute the expected signature for a request: HMAC-SHA256 over
/// `"v0:{timestamp}:{raw_body}"`, hex-encoded and prefixed with `"v0="`.
///
/// The body must be the exact bytes that arrived on the wire; any
/// re-serialization breaks the signature.
pub fn compute_signature(secret: &[u8], timestamp: &str, body: &[u8]) -> String {
    // HMAC-SHA256 accepts keys of any length.
    let mut mac =
        <HmacSha256 as Mac>::new_from_slice(secret).expect("hmac key of any length is valid");
    mac.update(SIGNATURE_VERSION.as_bytes());
    mac.update(b":");
    mac.update(timestamp.as_bytes());
    mac.update(b":");
    mac.update(body);
    format!("{SIGNATURE_VERSION}={}", hex::encode(mac.finalize().into_bytes()))
}

/// Compare a provided signature against the expected one in constant time.
/// A length mismatch is an ordinary mismatch, never a panic.
pub fn verify_signature(secret: &[u8], timestamp: &str, body: &[u8], provided: &str) -> bool {
    let expected = compute_signature(secret, timestamp, body);
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

/// Full inbound-request gate, applied before the body is parsed.
///
/// Checks run in order: header presence, duplicate-delivery short-circuit,
/// replay window, signature. Pure; the caller maps the error to a 400.
pub fn verify_event_request<'a, I>(
    headers: I,
    body: &[u8],
    secret: &[u8],
    now_secs: u64,
) -> Result<Disposition, VerificationError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let parsed = parse_signature_headers(headers);

    let signature = parsed
        .signature
        .ok_or(VerificationError::MissingCredentials)?;
    let timestamp = parsed
        .timestamp
        .ok_or(VerificationError::MissingCredentials)?;

    // Transport-level idempotency guard: the platform re-delivers when it
    // did not see a timely 2xx. Side effects for this request already ran.
    if parsed.retry_num.is_some() {
        return Ok(Disposition::DuplicateDelivery);
    }

    let ts_secs: u64 = timestamp
        .parse()
        .map_err(|_| VerificationError::InvalidTimestamp)?;
    if !is_timestamp_fresh(ts_secs, now_secs, REPLAY_WINDOW_SECS) {
        return Err(VerificationError::StaleRequest);
    }

    if verify_signature(secret, &timestamp, body, &signature) {
        Ok(Disposition::Process)
    } else {
        Err(VerificationError::BadSignature)
    }
}

/// Freshness check closing the replay window. Timestamps from the future
/// beyond the window are also rejected.
pub fn is_timestamp_fresh(timestamp_secs: u64, now_secs: u64, max_age_secs: u64) -> bool {
    now_secs.abs_diff(timestamp_secs) <= max_age_secs
}
