//! Header-safe encoding of context objects.
//!
//! The value is compact JSON with every byte outside printable ASCII, and `%`
//! itself, written as `%XX`. The result is a legal HTTP header value and its
//! length is the byte count checked against the budget.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("context header is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("context header is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

fn needs_escape(b: u8) -> bool {
    b < 0x20 || b >= 0x7f || b == b'%'
}

/// Serialize `value` and escape it for use as a header value.
pub fn encode<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let json = serde_json::to_vec(value)?;
    let mut out = String::with_capacity(json.len());
    for b in json {
        if needs_escape(b) {
            out.push_str(&format!("%{:02X}", b));
        } else {
            out.push(char::from(b));
        }
    }
    Ok(out)
}

/// Reverse of [`encode`].
pub fn decode<T: DeserializeOwned>(value: &str) -> Result<T, DecodeError> {
    let bytes = value.as_bytes();
    let mut raw = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let hex = bytes
                .get(i + 1..i + 3)
                .and_then(|h| std::str::from_utf8(h).ok());
            if let Some(b) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                raw.push(b);
                i += 3;
                continue;
            }
        }
        raw.push(bytes[i]);
        i += 1;
    }

    let json = String::from_utf8(raw)?;
    Ok(serde_json::from_str(&json)?)
}
