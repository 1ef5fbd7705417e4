//! Local decoding of the bearer token's claims.
//!
//! The signature is not verified: the backend does that on every call.
//! Decoding here only serves to read the expiry without a network round
//! trip.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Token is not a JWT (expected 3 segments, found {0})")]
    Malformed(usize),

    #[error("Token payload is not valid base64url: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("Token payload is not valid JSON: {0}")]
    Payload(#[from] serde_json::Error),

    #[error("Token carries no expiry claim")]
    MissingExpiry,

    #[error("Token expiry {0} is out of range")]
    InvalidExpiry(i64),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    /// Expiry (seconds since epoch)
    #[serde(default)]
    pub exp: Option<i64>,
    #[serde(default)]
    pub sub: Option<String>,
}

pub fn decode_claims(token: &str) -> Result<Claims, TokenError> {
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        return Err(TokenError::Malformed(segments.len()));
    }
    let payload = URL_SAFE_NO_PAD.decode(segments[1].trim_end_matches('='))?;
    Ok(serde_json::from_slice(&payload)?)
}

pub fn expires_at(token: &str) -> Result<DateTime<Utc>, TokenError> {
    let exp = decode_claims(token)?.exp.ok_or(TokenError::MissingExpiry)?;
    Utc.timestamp_opt(exp, 0)
        .single()
        .ok_or(TokenError::InvalidExpiry(exp))
}

/// A token is valid when its expiry can be read and lies after `now`.
pub fn is_token_valid(token: &str, now: DateTime<Utc>) -> bool {
    expires_at(token).map(|exp| exp > now).unwrap_or(false)
}

#[cfg(test)]
pub(crate) fn encode_test_token(payload: &serde_json::Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
    let body = URL_SAFE_NO_PAD.encode(payload.to_string());
    format!("{}.{}.signature", header, body)
}
