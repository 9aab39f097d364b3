//! Value codec: per-scalar wire encoding and the type-tag vocabulary that
//! makes row cells decodable.
//!
//! A row frame is a plain JSON array, so a cell on its own does not say what
//! type it holds. Each column's [`TypeTag`] is announced once in a schema
//! increment frame and remembered by the decoder for every later row.
//!
//! | Tag         | JSON cell                                  |
//! |-------------|--------------------------------------------|
//! | `bool`      | `true` / `false`                           |
//! | `int64`     | integer                                    |
//! | `float64`   | number                                     |
//! | `string`    | string                                     |
//! | `time.Time` | `"2006-01-02T15:04:05.000Z"` (UTC, millis) |
//! | `[]uint8`   | base64 string                              |
//!
//! `null` marks an absent cell under any tag.

use crate::error::DecodeError;
use crate::model::Value;
use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Timestamp pattern on the wire. Sub-millisecond digits are dropped.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

const TIMESTAMP_LEN: usize = "2006-01-02T15:04:05.000Z".len();

/// Padded standard base64 on encode; padded or unpadded on decode.
const BLOB: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Column type announced in schema increment frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeTag {
    Bool,
    Int64,
    Float64,
    String,
    Timestamp,
    Blob,
}

impl TypeTag {
    pub const ALL: [TypeTag; 6] = [
        TypeTag::Bool,
        TypeTag::Int64,
        TypeTag::Float64,
        TypeTag::String,
        TypeTag::Timestamp,
        TypeTag::Blob,
    ];

    /// Literal wire token for this tag.
    pub fn as_str(self) -> &'static str {
        match self {
            TypeTag::Bool => "bool",
            TypeTag::Int64 => "int64",
            TypeTag::Float64 => "float64",
            TypeTag::String => "string",
            TypeTag::Timestamp => "time.Time",
            TypeTag::Blob => "[]uint8",
        }
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TypeTag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TypeTag::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// Whether `ts` fits the four-digit year of the wire pattern.
pub fn timestamp_in_range(ts: &DateTime<Utc>) -> bool {
    (0..=9999).contains(&ts.year())
}

/// Format a timestamp in the wire pattern.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse the exact wire timestamp pattern.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if s.len() != TIMESTAMP_LEN || s.as_bytes()[19] != b'.' {
        return None;
    }
    NaiveDateTime::parse_from_str(s, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Base64 text of a byte blob, as written in row cells.
pub fn encode_blob(bytes: &[u8]) -> String {
    BLOB.encode(bytes)
}

/// Serializes a [`Value`] as a row cell.
pub(crate) struct WireValue<'a>(pub &'a Value);

impl Serialize for WireValue<'_> {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        match self.0 {
            Value::Bool(b) => s.serialize_bool(*b),
            Value::Int(i) => s.serialize_i64(*i),
            Value::Float(f) => s.serialize_f64(*f),
            Value::String(v) => s.serialize_str(v),
            Value::Timestamp(ts) => s.serialize_str(&format_timestamp(ts)),
            Value::Bytes(b) => s.serialize_str(&encode_blob(b)),
        }
    }
}

/// Decode one raw JSON cell under its column's tag.
///
/// Returns `Ok(None)` for the `null` token.
///
/// # Errors
/// [`DecodeError::InvalidValue`] naming the column, tag and raw token when the
/// cell does not parse.
pub fn decode_cell(column: &str, tag: TypeTag, raw: &str) -> Result<Option<Value>, DecodeError> {
    if raw == "null" {
        return Ok(None);
    }
    let parsed = match tag {
        TypeTag::Bool => match raw {
            "true" => Some(Value::Bool(true)),
            "false" => Some(Value::Bool(false)),
            _ => None,
        },
        TypeTag::Int64 => raw.parse::<i64>().ok().map(Value::Int),
        TypeTag::Float64 => raw
            .parse::<f64>()
            .ok()
            .filter(|f| f.is_finite())
            .map(Value::Float),
        TypeTag::String => serde_json::from_str::<String>(raw).ok().map(Value::String),
        TypeTag::Timestamp => serde_json::from_str::<String>(raw)
            .ok()
            .and_then(|s| parse_timestamp(&s))
            .map(Value::Timestamp),
        TypeTag::Blob => serde_json::from_str::<String>(raw)
            .ok()
            .and_then(|s| BLOB.decode(s).ok())
            .map(Value::Bytes),
    };
    parsed.map(Some).ok_or_else(|| DecodeError::InvalidValue {
        column: column.to_string(),
        tag,
        raw: raw.to_string(),
    })
}
