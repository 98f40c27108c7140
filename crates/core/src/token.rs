//! Access token inspection
//!
//! Tokens are compact JWTs. Only the payload's `exp` claim is read; the
//! signature is the server's business and is never checked here.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Check whether a token has expired as of now
///
/// Fails closed: a token that cannot be decoded counts as expired. A token
/// without an `exp` claim never expires.
pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, Utc::now())
}

/// Check whether a token has expired as of `now`
pub fn is_expired_at(token: &str, now: DateTime<Utc>) -> bool {
    match expiry(token) {
        Ok(Some(exp)) => now.timestamp_millis() as f64 / 1000.0 >= exp,
        Ok(None) => false,
        Err(reason) => {
            tracing::debug!(reason, "Treating undecodable token as expired");
            true
        }
    }
}

/// Read the `exp` claim, in seconds since the epoch
pub fn expiry(token: &str) -> Result<Option<f64>, &'static str> {
    let mut segments = token.split('.');
    let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
        (Some(_), Some(payload), Some(_), None) => payload,
        _ => return Err("token is not a three-segment JWT"),
    };

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| "payload is not valid base64url")?;
    let claims: Value = serde_json::from_slice(&bytes).map_err(|_| "payload is not JSON")?;
    let claims = claims.as_object().ok_or("payload is not a JSON object")?;

    match claims.get("exp") {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(exp)) => exp.as_f64().map(Some).ok_or("exp is out of range"),
        Some(_) => Err("exp is not numeric"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;

    fn sign(claims: &Value) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap()
    }

    #[test]
    fn test_future_expiry_is_not_expired() {
        let exp = (Utc::now() + Duration::hours(1)).timestamp();
        let token = sign(&json!({ "sub": "u1", "exp": exp }));
        assert!(!is_expired(&token));
    }

    #[test]
    fn test_past_expiry_is_expired() {
        let exp = (Utc::now() - Duration::minutes(5)).timestamp();
        let token = sign(&json!({ "sub": "u1", "exp": exp }));
        assert!(is_expired(&token));
    }

    #[test]
    fn test_expiry_boundary_counts_as_expired() {
        let now = Utc::now();
        let token = sign(&json!({ "exp": now.timestamp() }));
        let at_exp = DateTime::from_timestamp(now.timestamp(), 0).unwrap();
        assert!(is_expired_at(&token, at_exp));
        assert!(!is_expired_at(&token, at_exp - Duration::seconds(1)));
    }

    #[test]
    fn test_missing_exp_never_expires() {
        let token = sign(&json!({ "sub": "u1" }));
        assert!(!is_expired(&token));
        assert_eq!(expiry(&token), Ok(None));
    }

    #[test]
    fn test_float_exp_is_accepted() {
        let exp = (Utc::now() + Duration::hours(1)).timestamp() as f64 + 0.5;
        let token = sign(&json!({ "exp": exp }));
        assert!(!is_expired(&token));
    }

    #[test]
    fn test_malformed_tokens_fail_closed() {
        assert!(is_expired(""));
        assert!(is_expired("not-a-jwt"));
        assert!(is_expired("a.b"));
        assert!(is_expired("a.!!!.c"));
        assert!(is_expired("a.b.c.d"));

        let not_json = URL_SAFE_NO_PAD.encode(b"hello");
        assert!(is_expired(&format!("h.{not_json}.s")));

        let string_exp = URL_SAFE_NO_PAD.encode(br#"{"exp":"tomorrow"}"#);
        assert!(is_expired(&format!("h.{string_exp}.s")));

        let array = URL_SAFE_NO_PAD.encode(b"[1,2]");
        assert!(is_expired(&format!("h.{array}.s")));
    }
}
