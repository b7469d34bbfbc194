//! JSON helpers for exchange payloads.
//!
//! Handles the common exchange pattern where numeric values may be encoded as
//! either JSON strings (`"30000.5"`) or native numbers (`30000.5`).

use serde::{Deserialize, Deserializer, de::Error as _};
use serde_json::Value;

#[derive(Deserialize)]
#[serde(untagged)]
enum NumOrStr {
    Num(f64),
    Str(String),
}

/// Serde `deserialize_with` helper accepting a string or a number as `f64`.
///
/// `"inf"`, `"NaN"` and friends are rejected: a price must be finite.
pub fn de_price<'de, D: Deserializer<'de>>(de: D) -> Result<f64, D::Error> {
    let price = match NumOrStr::deserialize(de)? {
        NumOrStr::Num(n) => n,
        NumOrStr::Str(s) => s
            .trim()
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid decimal string {s:?}")))?,
    };
    if !price.is_finite() {
        return Err(D::Error::custom(format!("non-finite price {price}")));
    }
    Ok(price)
}

/// Copy of `value` with the top-level `key` removed, for logging payloads
/// that carry bulky binary fields.
pub fn without_key(value: &Value, key: &str) -> Value {
    match value {
        Value::Object(map) => {
            let mut map = map.clone();
            map.remove(key);
            Value::Object(map)
        }
        other => other.clone(),
    }
}
