use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use thiserror::Error;

/// Used when a token's expiry can't be read, so refreshes still happen.
pub const FALLBACK_EXPIRY_MINUTES: i64 = 10;

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("token is not a three-part JWT")]
    Malformed,
    #[error("invalid base64 in JWT payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid JWT claims: {0}")]
    Claims(#[from] serde_json::Error),
    #[error("JWT has no exp claim")]
    NoExpiry,
    #[error("JWT exp claim {0} is out of range")]
    OutOfRange(i64),
}

#[derive(Debug, Deserialize)]
struct Claims {
    exp: Option<i64>,
}

/// Reads the `exp` claim of a JWT. The signature is not verified: the value
/// only schedules a local refresh.
pub fn parse_expiry(token: &str) -> Result<DateTime<Utc>, JwtError> {
    let mut parts = token.split('.');
    let (Some(_header), Some(payload), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(JwtError::Malformed);
    };
    let decoded = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
    let claims: Claims = serde_json::from_slice(&decoded)?;
    let exp = claims.exp.ok_or(JwtError::NoExpiry)?;
    DateTime::from_timestamp(exp, 0).ok_or(JwtError::OutOfRange(exp))
}

/// Like [`parse_expiry`], but falls back to `now + 10 minutes`.
pub fn expiry_or_fallback(token: &str, now: DateTime<Utc>) -> DateTime<Utc> {
    parse_expiry(token).unwrap_or_else(|_| now + Duration::minutes(FALLBACK_EXPIRY_MINUTES))
}

#[cfg(test)]
pub(crate) fn make_token(claims: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"ES256K","typ":"at+jwt"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}
