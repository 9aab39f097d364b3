//! Frame codec: entities to newline-delimited JSON frames and back.
//!
//! Two kinds of frame share one stream:
//!
//! ```text
//! {"FieldsFrom":0,"Fields":[{"n":"Age","t":"int64","i":false},{"n":"Name","t":"string","i":true}]}
//! {"k":"/Person,42","d":[31,"Ada"]}
//! {"k":"/Person,43","d":[null,"Bob"]}
//! ```
//!
//! A schema increment frame defines columns `FieldsFrom..FieldsFrom+len` and is
//! written right before the first row that uses them. A row frame carries the
//! encoded key and a positional cell array; `null` marks a hole. The `i` flag
//! is set for columns excluded from indexes.

use crate::error::{DecodeError, EncodeError};
use crate::key::{decode_key, encode_key, validate_key};
use crate::model::{Entity, Property, Value};
use crate::schema::{ColumnDef, ColumnTable, SchemaDictionary};
use crate::value::{WireValue, decode_cell, format_timestamp, timestamp_in_range};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::borrow::Cow;

/// One column definition inside a schema increment frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFrame {
    #[serde(rename = "n")]
    pub name: String,
    #[serde(rename = "t")]
    pub tag: String,
    #[serde(rename = "i", default)]
    pub no_index: bool,
}

#[derive(Serialize)]
struct SchemaFrame<'a> {
    #[serde(rename = "FieldsFrom")]
    fields_from: usize,
    #[serde(rename = "Fields")]
    fields: &'a [FieldFrame],
}

#[derive(Serialize)]
struct RowFrame<'a> {
    #[serde(rename = "k")]
    key: String,
    #[serde(rename = "d")]
    row: Vec<Option<WireValue<'a>>>,
}

/// Any frame line, as read back.
#[derive(Deserialize)]
struct RawFrame<'a> {
    #[serde(rename = "FieldsFrom", default)]
    fields_from: usize,
    #[serde(rename = "Fields", default)]
    fields: Option<Vec<FieldFrame>>,
    #[serde(rename = "k", default, borrow)]
    key: Option<Cow<'a, str>>,
    #[serde(rename = "d", default, borrow)]
    row: Option<Vec<&'a RawValue>>,
}

/// Frames produced for one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedFrames {
    /// Schema increment for columns first used by this entity.
    pub schema: Option<Vec<u8>>,
    pub row: Vec<u8>,
}

impl EncodedFrames {
    /// Frames in write order (schema first).
    pub fn into_frames(self) -> impl Iterator<Item = Vec<u8>> {
        self.schema.into_iter().chain(std::iter::once(self.row))
    }
}

/// Stateful entity → frames encoder. One per output stream.
#[derive(Debug, Default)]
pub struct FrameEncoder {
    schema: SchemaDictionary,
}

impl FrameEncoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schema(&self) -> &SchemaDictionary {
        &self.schema
    }

    /// Encode one entity, growing the dictionary with any unseen property names.
    ///
    /// Properties are sorted by name first so that column assignment does not
    /// depend on the order the source produced them in. When a name appears
    /// twice, the later value wins.
    ///
    /// # Errors
    /// Any [`EncodeError`]; the stream must be aborted, since the dictionary
    /// may already hold columns from this entity.
    pub fn encode(&mut self, mut entity: Entity) -> Result<EncodedFrames, EncodeError> {
        validate_key(&entity.key)?;
        entity.properties.sort_by(|a, b| a.name.cmp(&b.name));

        let mut fields_from = None;
        let mut new_fields = Vec::new();
        let mut cells: Vec<Option<WireValue<'_>>> = Vec::new();
        for p in &entity.properties {
            match &p.value {
                Value::Float(f) if !f.is_finite() => {
                    return Err(EncodeError::NonFiniteFloat {
                        name: p.name.clone(),
                        value: *f,
                    });
                }
                Value::Timestamp(ts) if !timestamp_in_range(ts) => {
                    return Err(EncodeError::TimestampOutOfRange {
                        name: p.name.clone(),
                        value: format_timestamp(ts),
                    });
                }
                _ => {}
            }
            let tag = p.value.type_tag();
            let (idx, created) = self.schema.resolve(&p.name, tag, p.indexed)?;
            if created {
                fields_from.get_or_insert(idx);
                new_fields.push(FieldFrame {
                    name: p.name.clone(),
                    tag: tag.as_str().to_string(),
                    no_index: !p.indexed,
                });
            }
            if idx >= cells.len() {
                cells.resize_with(idx + 1, || None);
            }
            cells[idx] = Some(WireValue(&p.value));
        }

        let schema = match fields_from {
            Some(fields_from) => Some(serde_json::to_vec(&SchemaFrame {
                fields_from,
                fields: &new_fields,
            })?),
            None => None,
        };
        let row = serde_json::to_vec(&RowFrame {
            key: encode_key(&entity.key),
            row: cells,
        })?;
        Ok(EncodedFrames { schema, row })
    }
}

/// Stateful frames → entity decoder. One per input stream.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    columns: ColumnTable,
}

impl FrameDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &ColumnTable {
        &self.columns
    }

    /// Decode one frame line.
    ///
    /// Returns `Ok(None)` for schema increment frames and for rows that carry
    /// no key or no non-null cell.
    ///
    /// # Errors
    /// Malformed JSON, unknown column references, unsupported tags, cells that
    /// do not parse under their tag, and malformed keys.
    pub fn decode_line(&mut self, line: &[u8]) -> Result<Option<Entity>, DecodeError> {
        let frame: RawFrame<'_> = serde_json::from_slice(line)?;

        if let Some(fields) = frame.fields
            && !fields.is_empty()
        {
            for (i, f) in fields.into_iter().enumerate() {
                let index = frame.fields_from.checked_add(i).ok_or(
                    DecodeError::ColumnIndexOutOfRange {
                        fields_from: frame.fields_from,
                        offset: i,
                    },
                )?;
                let def = ColumnDef::new(f.name, f.tag, !f.no_index);
                self.columns.register(index, def)?;
            }
            return Ok(None);
        }

        let (Some(key), Some(row)) = (frame.key, frame.row) else {
            return Ok(None);
        };
        if key.is_empty() {
            return Ok(None);
        }

        let mut properties = Vec::new();
        for (idx, raw) in row.iter().enumerate() {
            let raw = raw.get();
            if raw == "null" {
                continue;
            }
            let col = self
                .columns
                .get(idx)
                .ok_or(DecodeError::UnknownColumn { index: idx })?;
            let tag = col.tag.ok_or_else(|| DecodeError::UnsupportedType {
                column: col.name.clone(),
                tag: col.raw_tag.clone(),
            })?;
            if let Some(value) = decode_cell(&col.name, tag, raw)? {
                properties.push(Property {
                    name: col.name.clone(),
                    value,
                    indexed: col.indexed,
                });
            }
        }
        if properties.is_empty() {
            return Ok(None);
        }

        let key = decode_key(&key)?;
        Ok(Some(Entity { key, properties }))
    }
}
