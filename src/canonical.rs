//! Canonical JSON encoding for stable content digests.
//!
//! Two documents that parse to the same value must produce identical bytes:
//! - Object keys sorted by code point at every depth
//! - No whitespace between tokens
//! - `,` and `:` separators only
//! - Strings are ASCII: anything beyond U+007F is written as `\uXXXX`
//!   (UTF-16 surrogate pairs above the BMP), matching digests of objects
//!   written by earlier Python-based publishers
//!
//! Numbers use serde_json's compact formatting.

use serde_json::Value;

use crate::error::{MirrorError, Result};

/// Encode a parsed value to canonical bytes
pub fn canonical_bytes(value: &Value) -> Vec<u8> {
    let mut out = Vec::new();
    write_value(value, &mut out);
    out
}

/// Parse raw JSON and re-encode it canonically
pub fn canonicalize(raw: &[u8]) -> Result<Vec<u8>> {
    let value: Value = serde_json::from_slice(raw)
        .map_err(|e| MirrorError::Parse(format!("invalid JSON: {}", e)))?;
    Ok(canonical_bytes(&value))
}

fn write_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            out.push(b'{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_string(key, out);
                out.push(b':');
                write_value(item, out);
            }
            out.push(b'}');
        }
        Value::Array(items) => {
            out.push(b'[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(b',');
                }
                write_value(item, out);
            }
            out.push(b']');
        }
        Value::String(text) => write_string(text, out),
        // Display for the remaining scalars is already compact JSON
        scalar => out.extend_from_slice(scalar.to_string().as_bytes()),
    }
}

fn write_string(s: &str, out: &mut Vec<u8>) {
    // serde_json handles quotes, backslashes and control characters
    let escaped = Value::from(s).to_string();
    let mut units = [0u16; 2];
    for c in escaped.chars() {
        if c.is_ascii() {
            out.push(c as u8);
        } else {
            for unit in c.encode_utf16(&mut units) {
                out.extend_from_slice(format!("\\u{:04x}", unit).as_bytes());
            }
        }
    }
}
