//! Bearer token gate for the outbound-send endpoint.
//!
//! Independent of the platform signature scheme in `signing`: different
//! secret, different verification path, different trust boundary
//! (client-to-server rather than platform-to-server).

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Scope minted tokens carry; the send endpoint requires it.
pub const SEND_MESSAGE_SCOPE: &str = "send-message";

/// Lifetime of tokens produced by the offline minting utility.
pub const TOKEN_TTL_SECS: i64 = 2 * 60 * 60;

/// Claims carried by an access token. Verified on every request, never
/// stored server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthClaims {
    /// Who the token was issued to.
    pub sub: String,

    /// What the token allows.
    pub scope: String,

    /// Issued at (unix seconds).
    pub iat: i64,

    /// Expiry (unix seconds).
    pub exp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("missing or malformed authorization header")]
    MissingToken,

    #[error("invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("token lacks the send-message scope")]
    InsufficientScope,
}

/// Mint a signed access token for manual distribution.
pub fn mint_token(secret: &[u8], subject: &str) -> Result<String, AuthError> {
    let now = Utc::now().timestamp();
    let claims = AuthClaims {
        sub: subject.to_string(),
        scope: SEND_MESSAGE_SCOPE.to_string(),
        iat: now,
        exp: now + TOKEN_TTL_SECS,
    };

    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )
    .map_err(|_| AuthError::InvalidOrExpiredToken)
}

/// Verify a raw token string: signature, expiry, scope.
pub fn verify_token(token: &str, secret: &[u8]) -> Result<AuthClaims, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.required_spec_claims.insert("exp".to_string());

    let data = decode::<AuthClaims>(token, &DecodingKey::from_secret(secret), &validation)
        .map_err(|_| AuthError::InvalidOrExpiredToken)?;

    if data.claims.scope != SEND_MESSAGE_SCOPE {
        return Err(AuthError::InsufficientScope);
    }

    Ok(data.claims)
}

/// Pull the token out of an `Authorization: Bearer <token>` header value and
/// verify it.
pub fn authorize_bearer(
    authorization: Option<&str>,
    secret: &[u8],
) -> Result<AuthClaims, AuthError> {
    let header = authorization.ok_or(AuthError::MissingToken)?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::MissingToken)?;
    verify_token(token, secret)
}
