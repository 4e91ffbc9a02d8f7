//! Unverified JWT claim decoding.
//!
//! Tokens reach us straight from the identity provider over TLS, so the
//! signature is not checked here. This is not a resource-server validation path.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use serde_json::{Map, Value};

use crate::error::AuthError;
use crate::helpers::time::now_i64;

pub type Claims = Map<String, Value>;

/// Decode the payload segment of a `header.payload.signature` token.
pub fn decode_claims(token: &str) -> Result<Claims, AuthError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(AuthError::Decode(format!(
            "expected 3 token segments, found {}",
            parts.len()
        )));
    }

    // padding is optional in base64url, strip whatever the issuer sent
    let payload = parts[1].trim_end_matches('=');
    let decoded = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| AuthError::Decode(format!("base64 decode error: {}", e)))?;

    match serde_json::from_slice::<Value>(&decoded) {
        Ok(Value::Object(claims)) => Ok(claims),
        Ok(_) => Err(AuthError::Decode("token payload is not a JSON object".into())),
        Err(e) => Err(AuthError::Decode(format!("invalid token payload: {}", e))),
    }
}

/// `exp` claim as UNIX seconds.
pub fn expiry_claim(claims: &Claims) -> Option<i64> {
    claims.get("exp").and_then(|exp| match exp {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        _ => None,
    })
}

/// Fail-closed expiry check: undecodable tokens and tokens without `exp` are expired.
pub fn is_expired(token: &str, buffer_seconds: i64) -> bool {
    is_expired_at(token, now_i64(), buffer_seconds)
}

pub fn is_expired_at(token: &str, now: i64, buffer_seconds: i64) -> bool {
    match decode_claims(token) {
        Ok(claims) => now + buffer_seconds >= expiry_claim(&claims).unwrap_or(0),
        Err(_) => true,
    }
}

#[cfg(test)]
pub(crate) fn encode_test_token(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.c2lnbmF0dXJl")
}
