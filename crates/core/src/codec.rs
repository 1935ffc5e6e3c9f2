//! Reversible field transforms.
//!
//! Two families of transforms operate on named document fields:
//!
//! - **base64 fields**: a key ending in `.b64` holds base64 text; decoding
//!   strips the suffix and replaces the value with raw bytes.
//! - **compressed fields**: a named field is zstd-compressed and stored under
//!   `<name>_zstd` as base64 text so the document stays valid JSON on
//!   text-based transports. Decompression strips the suffix and restores
//!   either UTF-8 text or base64 text, depending on the call site.
//!
//! Missing-field policy is asymmetric on purpose: compressing a field that is
//! not present is an error, while decompressing a field that is not present
//! is a no-op. Callers rely on both halves of that contract.

use once_cell::sync::Lazy;
use regex::Regex;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::{Error, Result, Value};

/// Suffix marking a field as base64-encoded text
pub const B64_SUFFIX: &str = ".b64";

/// Suffix marking a field as zstd-compressed
pub const ZSTD_SUFFIX: &str = "_zstd";

/// zstd compression level used for stored fields
pub const COMPRESSION_LEVEL: i32 = 10;

/// Appended to truncated display values
pub const ELLIPSIS: &str = " ...";

/// Full-string match for the standard base64 alphabet, including padding.
static B64_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new("^(?:[A-Za-z0-9+/]{4})*(?:[A-Za-z0-9+/]{3}=|[A-Za-z0-9+/]{2}==)?$")
        .expect("base64 pattern is valid")
});

/// Decode every `.b64`-suffixed string field into raw bytes, renaming the
/// field with the suffix stripped. Recurses into nested objects. Non-object
/// input is a no-op.
pub fn decode_b64_fields(doc: &mut Value) -> Result<()> {
    let Some(map) = doc.as_object_mut() else {
        return Ok(());
    };
    let keys: Vec<String> = map.keys().cloned().collect();
    for key in keys {
        if key.ends_with(B64_SUFFIX) && matches!(map.get(&key), Some(Value::String(_))) {
            let Some(Value::String(text)) = map.remove(&key) else {
                continue;
            };
            let decoded = BASE64.decode(text.as_bytes()).map_err(|source| Error::Base64 {
                field: key.clone(),
                source,
            })?;
            let stripped = key[..key.len() - B64_SUFFIX.len()].to_string();
            map.insert(stripped, Value::Bytes(decoded));
        } else if let Some(child @ Value::Object(_)) = map.get_mut(&key) {
            decode_b64_fields(child)?;
        }
    }
    Ok(())
}

/// Compress each named field and store it under `<field>_zstd` as base64 text.
///
/// The current value may be base64 text (detected via the base64 alphabet),
/// plain text, or raw bytes. A named field that is absent is an error; a
/// field holding null is dropped without producing a compressed counterpart.
pub fn compress_fields(doc: &mut Value, fields: &[&str]) -> Result<()> {
    let Some(map) = doc.as_object_mut() else {
        return Ok(());
    };
    for &field in fields {
        let value = map.remove(field).ok_or_else(|| Error::MissingField {
            field: field.to_string(),
        })?;
        let payload = match value {
            Value::Null => continue,
            Value::String(text) => text_payload(field, &text)?,
            Value::Bytes(bytes) => bytes,
            other => {
                return Err(Error::FieldType {
                    field: field.to_string(),
                    type_name: other.type_name(),
                })
            }
        };
        let compressed =
            zstd::encode_all(&payload[..], COMPRESSION_LEVEL).map_err(|e| Error::Compression {
                field: field.to_string(),
                message: e.to_string(),
            })?;
        map.insert(
            format!("{field}{ZSTD_SUFFIX}"),
            Value::String(BASE64.encode(compressed)),
        );
    }
    Ok(())
}

/// How a decompressed payload is put back into the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restore {
    /// Decode the payload as UTF-8 text
    Utf8Text,
    /// Re-encode the payload as base64 text
    Base64Text,
}

/// Decompress each named `_zstd` field back under its suffix-stripped name.
///
/// Fields are popped, base64-decoded, and zstd-decompressed; the restored
/// value is stored per `restore`. A named field that is absent (or not
/// `_zstd`-suffixed) is a no-op — see the module docs for why this differs
/// from [`compress_fields`].
pub fn decompress_fields(doc: &mut Value, fields: &[&str], restore: Restore) -> Result<()> {
    let Some(map) = doc.as_object_mut() else {
        return Ok(());
    };
    for &field in fields {
        let Some(stripped) = field.strip_suffix(ZSTD_SUFFIX) else {
            continue;
        };
        let Some(value) = map.remove(field) else {
            continue;
        };
        let raw = match value {
            Value::Null => continue,
            Value::String(text) => text_payload(field, &text)?,
            Value::Bytes(bytes) => bytes,
            other => {
                return Err(Error::FieldType {
                    field: field.to_string(),
                    type_name: other.type_name(),
                })
            }
        };
        let payload = zstd::decode_all(&raw[..]).map_err(|e| Error::Compression {
            field: field.to_string(),
            message: e.to_string(),
        })?;
        let restored = match restore {
            Restore::Utf8Text => Value::String(String::from_utf8(payload).map_err(|_| {
                Error::Utf8 {
                    field: field.to_string(),
                }
            })?),
            Restore::Base64Text => Value::String(BASE64.encode(payload)),
        };
        map.insert(stripped.to_string(), restored);
    }
    Ok(())
}

/// Truncate long values for display, in place.
///
/// Strings longer than `max_size` characters get cut with an ellipsis; bytes
/// are rendered with `\x{..}` escapes first. Recurses into nested objects
/// only — array elements are left alone.
pub fn deep_truncate(doc: &mut Value, max_size: usize) {
    let Some(map) = doc.as_object_mut() else {
        return;
    };
    for value in map.values_mut() {
        match value {
            Value::Object(_) => deep_truncate(value, max_size),
            Value::Bytes(bytes) => {
                let mut text = bytes_to_str(bytes);
                if text.chars().count() > max_size {
                    text = truncate_chars(&text, max_size);
                    text.push_str(ELLIPSIS);
                }
                *value = Value::String(text);
            }
            Value::String(s) => {
                if s.chars().count() > max_size {
                    let mut text = truncate_chars(s, max_size);
                    text.push_str(ELLIPSIS);
                    *value = Value::String(text);
                }
            }
            _ => {}
        }
    }
}

/// Render bytes for display: printable ASCII as-is, everything else as a
/// `\x{..}` escape.
pub fn bytes_to_str(bytes: &[u8]) -> String {
    use std::fmt::Write;

    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        if b > 32 && b < 128 {
            out.push(b as char);
        } else {
            let _ = write!(out, "\\x{{{b:02x}}}");
        }
    }
    out
}

/// Interpret a text field as a byte payload: base64-decode when the whole
/// string fits the base64 alphabet, otherwise take the raw UTF-8 bytes.
fn text_payload(field: &str, text: &str) -> Result<Vec<u8>> {
    if B64_RE.is_match(text) {
        BASE64.decode(text.as_bytes()).map_err(|source| Error::Base64 {
            field: field.to_string(),
            source,
        })
    } else {
        Ok(text.as_bytes().to_vec())
    }
}

fn truncate_chars(s: &str, max_size: usize) -> String {
    s.chars().take(max_size).collect()
}
