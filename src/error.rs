//! Error types for entline.
//!
//! Each layer of the crate has its own error enum:
//! - [`KeyError`] for malformed key strings
//! - [`EncodeError`] for entities that have no wire representation
//! - [`DecodeError`] for frame lines that cannot be turned back into entities
//! - [`TransferError`] for the single terminal result of a pipeline run
//!
//! Pipelines never retry. The first failure observed decides the outcome, and
//! output produced before it is not rolled back.

use crate::value::TypeTag;
use thiserror::Error;

/// Boxed error returned by external collaborators (record sources, stores,
/// batch callbacks).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result alias for pipeline entry points.
pub type Result<T, E = TransferError> = std::result::Result<T, E>;

/// Errors raised while parsing an encoded key string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum KeyError {
    #[error("empty key string")]
    Empty,

    #[error("key must start with '/': {0:?}")]
    MissingLeadingSlash(String),

    #[error("segment {segment} has no ',' between kind and identity")]
    MissingComma { segment: usize },

    #[error("segment {segment} has an empty kind")]
    EmptyKind { segment: usize },

    #[error("segment {segment} has an empty identity")]
    EmptyIdentity { segment: usize },

    #[error("numeric id {value:?} in segment {segment} is out of range")]
    IdOutOfRange { segment: usize, value: String },

    #[error("dangling escape character at end of key")]
    DanglingEscape,

    #[error("kind {kind:?} in segment {segment} contains reserved character {found:?}")]
    ReservedInKind {
        segment: usize,
        kind: String,
        found: char,
    },
}

/// Errors raised while turning an entity into frames.
#[derive(Error, Debug)]
pub enum EncodeError {
    #[error("property {name:?} holds a non-finite float ({value}) which has no JSON form")]
    NonFiniteFloat { name: String, value: f64 },

    #[error("property {name:?} is {got} but its column was established as {expected}")]
    TypeConflict {
        name: String,
        expected: TypeTag,
        got: TypeTag,
    },

    #[error("property {name:?} holds timestamp {value} outside years 0000-9999")]
    TimestampOutOfRange { name: String, value: String },

    #[error("key cannot be written: {0}")]
    InvalidKey(#[from] KeyError),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised while turning a frame line back into an entity.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("JSON frame error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("reference to unknown column {index}")]
    UnknownColumn { index: usize },

    #[error("column index FieldsFrom {fields_from} + {offset} is out of range")]
    ColumnIndexOutOfRange { fields_from: usize, offset: usize },

    #[error("unsupported data type {tag:?} in column {column:?}")]
    UnsupportedType { column: String, tag: String },

    #[error("unable to decode {raw} as {tag} in column {column:?}")]
    InvalidValue {
        column: String,
        tag: TypeTag,
        raw: String,
    },

    #[error("column {index} ({name:?}) redefined as {new_tag}, was {old_tag}")]
    ColumnRedefined {
        index: usize,
        name: String,
        old_tag: String,
        new_tag: String,
    },

    #[error("property {name:?} redeclared as {new_tag}, was {old_tag}")]
    TypeConflict {
        name: String,
        old_tag: String,
        new_tag: String,
    },

    #[error("invalid key: {0}")]
    Key(#[from] KeyError),
}

/// The terminal error of an export/import/convert run.
#[derive(Error, Debug)]
pub enum TransferError {
    /// Structural or value decode failure; carries the 1-based line number
    /// and the raw line for diagnostics.
    #[error("line {line}: {source}. Line: {content}")]
    Line {
        line: usize,
        content: String,
        #[source]
        source: DecodeError,
    },

    #[error("line {line} exceeds the {limit} byte limit")]
    LineTooLong { line: usize, limit: usize },

    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The external record iterator failed.
    #[error("record source error: {0}")]
    Source(#[source] BoxError),

    /// Bulk write/delete or a batch callback failed.
    #[error("sink error: {0}")]
    Sink(#[source] BoxError),

    #[error("no model mapping for kind {0:?}")]
    UnknownKind(String),

    #[error("cannot assign property {field:?}: {reason}")]
    Mapping { field: String, reason: String },

    #[error("pipeline worker panicked: {0}")]
    WorkerPanic(&'static str),
}

impl TransferError {
    /// Wrap any collaborator error as a sink failure.
    pub fn sink_failure(err: impl Into<BoxError>) -> Self {
        TransferError::Sink(err.into())
    }

    /// Wrap any collaborator error as a source failure.
    pub fn source_failure(err: impl Into<BoxError>) -> Self {
        TransferError::Source(err.into())
    }
}
