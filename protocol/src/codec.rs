//! Defensive decoding of backend JSON.
//!
//! The backend answers either with an envelope (`{ "success", "message",
//! "data" }`) or with the raw resource, and list endpoints have been observed
//! returning a single object or nothing at all. All shape checks live here so
//! callers get a tagged `Result` instead of poking at `serde_json::Value`.

use serde::de::DeserializeOwned;
use serde_json::Value;

const ENVELOPE_DATA_KEY: &str = "data";
const MONGO_ID_KEY: &str = "_id";
const ID_KEY: &str = "id";

/// Errors produced while decoding backend payloads.
#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error("expected a list, got {found}")]
    NotASequence { found: &'static str },

    #[error("expected an object, got {found}")]
    NotARecord { found: &'static str },

    #[error("payload is missing")]
    Missing,

    #[error("record does not match expected shape: {0}")]
    Shape(#[from] serde_json::Error),
}

/// Items decoded from a list where some entries could not be read.
#[derive(Clone, Debug, PartialEq)]
pub struct LenientList<T> {
    pub items: Vec<T>,
    pub skipped: usize,
}

/// Short name of a JSON value's type, used in error messages and logs.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Strips the `{ data: ... }` envelope if present, otherwise returns the value
/// unchanged.
pub fn unwrap_envelope(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key(ENVELOPE_DATA_KEY) => map
            .remove(ENVELOPE_DATA_KEY)
            .unwrap_or(Value::Null),
        other => other,
    }
}

/// Unwraps the envelope, then descends into `key` when the payload is an
/// object carrying it (`{ "bets": [...] }`).
pub fn unwrap_named(value: Value, key: &str) -> Value {
    match unwrap_envelope(value) {
        Value::Object(mut map) if map.contains_key(key) => map.remove(key).unwrap_or(Value::Null),
        other => other,
    }
}

/// Human readable message from an error body (`message` or `error` field, or a
/// bare string body).
pub fn error_message(body: &Value) -> Option<String> {
    match body {
        Value::String(text) if !text.trim().is_empty() => Some(text.trim().to_string()),
        Value::Object(map) => ["message", "error"]
            .iter()
            .filter_map(|key| map.get(*key))
            .find_map(|v| v.as_str())
            .filter(|text| !text.trim().is_empty())
            .map(|text| text.trim().to_string()),
        _ => None,
    }
}

/// Maps a Mongo-style `_id` onto `id`. When both are present `id` wins.
pub fn normalize_record(value: Value) -> Value {
    match value {
        Value::Object(mut map) => {
            if let Some(mongo_id) = map.remove(MONGO_ID_KEY) {
                map.entry(ID_KEY).or_insert(mongo_id);
            }
            Value::Object(map)
        }
        other => other,
    }
}

/// Unwraps the envelope and checks the payload is an object.
pub fn expect_record(value: Value) -> Result<Value, CodecError> {
    match unwrap_envelope(value) {
        Value::Null => Err(CodecError::Missing),
        record @ Value::Object(_) => Ok(normalize_record(record)),
        other => Err(CodecError::NotARecord {
            found: value_kind(&other),
        }),
    }
}

/// Unwraps the envelope and checks the payload is an array.
pub fn expect_sequence(value: Value) -> Result<Vec<Value>, CodecError> {
    match unwrap_envelope(value) {
        Value::Array(items) => Ok(items.into_iter().map(normalize_record).collect()),
        other => Err(CodecError::NotASequence {
            found: value_kind(&other),
        }),
    }
}

pub fn decode_record<T: DeserializeOwned>(value: Value) -> Result<T, CodecError> {
    let record = expect_record(value)?;
    Ok(serde_json::from_value(record)?)
}

/// Decodes every element; the first element that does not fit fails the list.
pub fn decode_list<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, CodecError> {
    expect_sequence(value)?
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(CodecError::from))
        .collect()
}

/// Decodes the elements that fit and counts the ones that do not.
pub fn decode_list_lenient<T: DeserializeOwned>(
    value: Value,
) -> Result<LenientList<T>, CodecError> {
    let raw = expect_sequence(value)?;
    let total = raw.len();
    let items: Vec<T> = raw
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();
    let skipped = total - items.len();

    Ok(LenientList { items, skipped })
}
