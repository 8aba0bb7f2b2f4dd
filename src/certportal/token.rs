use base64::Engine;
use chrono::{DateTime, Utc};
use serde_json::Value;

/// Format the bearer header value once per client instance.
pub fn format_bearer(token: &str) -> String {
    format!("Bearer {}", token.trim())
}

/// Check whether a portal token is still usable.
///
/// The token is a three-part dot-separated JWT; the middle segment decodes to
/// a JSON claim set that must carry a numeric `exp`. Anything malformed is
/// reported as inactive — a broken token is an operational condition, not a
/// crash.
pub fn is_token_active(token: &str, now: DateTime<Utc>) -> bool {
    let token = token.trim();
    if token.is_empty() {
        return false;
    }

    let mut segments = token.split('.');
    let (Some(_), Some(claims_segment), Some(_), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return false;
    };

    let Ok(decoded) = base64::engine::general_purpose::URL_SAFE_NO_PAD.decode(claims_segment)
    else {
        return false;
    };
    let Ok(claims) = serde_json::from_slice::<Value>(&decoded) else {
        return false;
    };
    let Some(exp) = claims.get("exp").and_then(Value::as_i64) else {
        return false;
    };

    exp > now.timestamp()
}
