use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// The gateway expects timestamps in East Africa Time (UTC+3), formatted as `YYYYMMDDHHmmss`.
pub fn gateway_timestamp(now: DateTime<Utc>) -> String {
    (now + Duration::hours(3)).format("%Y%m%d%H%M%S").to_string()
}

/// The request password is `base64(shortcode + passkey + timestamp)`, using the same timestamp sent with the request.
pub fn request_password(shortcode: &str, passkey: &str, timestamp: &str) -> String {
    base64::encode(format!("{shortcode}{passkey}{timestamp}"))
}

/// Interprets a JSON number or numeric string as an integer. The gateway is inconsistent about which it sends.
pub fn value_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

pub(crate) fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<i64>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_as_i64))
}
