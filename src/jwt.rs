//! Read-only view into the JWTs the logserver issues.
//!
//! The client never validates tokens. This only decodes the header and
//! payload segments so a user can see what a stored token claims.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("expected 3 dot-separated segments, found {0}")]
    Segments(usize),

    #[error("{segment} is not base64url: {source}")]
    Base64 {
        segment: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    #[error("{segment} is not JSON: {source}")]
    Json {
        segment: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Decoded header and payload of a token. The signature is left alone.
#[derive(Debug, Clone, PartialEq)]
pub struct Claims {
    pub header: Value,
    pub payload: Value,
}

pub fn decode_claims(token: &str) -> Result<Claims, JwtError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(JwtError::Segments(parts.len()));
    }
    Ok(Claims {
        header: decode_segment("header", parts[0])?,
        payload: decode_segment("payload", parts[1])?,
    })
}

fn decode_segment(segment: &'static str, encoded: &str) -> Result<Value, JwtError> {
    // some issuers keep the padding
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded.trim_end_matches('='))
        .map_err(|source| JwtError::Base64 { segment, source })?;
    serde_json::from_slice(&bytes).map_err(|source| JwtError::Json { segment, source })
}
