//! # entline
//!
//! Streaming bulk transfer of hierarchical key/value **entities** to and from
//! newline-delimited frame files, with a schema that grows as the stream goes.
//!
//! ## Key Features
//!
//! - **Compact line format** - a column dictionary is announced once, rows are
//!   positional JSON arrays with `null` holes
//! - **Hierarchical keys** - ancestors, numeric ids or names, per-segment
//!   namespaces, all in one escaped string
//! - **Concurrent pipelines** - export, import, delete and convert run as
//!   three-stage pipelines over bounded queues with first-error-wins
//!   cancellation
//! - **Typed record mapping** - project decoded entities onto your own structs
//! - **Gzip files** - chosen by file name, detected on read (feature
//!   `compression-gzip`, on by default)
//!
//! ## Quick Start
//!
//! ```
//! use entline::testing::MemoryStore;
//! use entline::{Entity, Key, TransferConfig, export, import};
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let cfg = TransferConfig::default();
//! let people = vec![
//!     Entity::new(Key::id("Person", 1)).with("Name", "Ada").with("Age", 36i64),
//!     Entity::new(Key::id("Person", 2)).with("Name", "Bob"),
//! ];
//!
//! // Export to any writer
//! let mut file = Vec::new();
//! let exported = export(people.into_iter().map(Ok::<_, std::io::Error>), &mut file, &cfg)?;
//! assert_eq!(exported.entities, 2);
//!
//! // Import into any EntityStore
//! let mut store = MemoryStore::new();
//! let imported = import(file.as_slice(), &mut store, &cfg)?;
//! assert_eq!(imported.entities, 2);
//! assert_eq!(store.len(), 2);
//! # Ok(())
//! # }
//! ```
//!
//! ## File Format
//!
//! ```text
//! {"FieldsFrom":0,"Fields":[{"n":"Age","t":"int64","i":false},{"n":"Name","t":"string","i":false}]}
//! {"k":"/Person,1","d":[36,"Ada"]}
//! {"k":"/Person,2","d":[null,"Bob"]}
//! ```
//!
//! See [`frame`] for the frames, [`key`] for the key grammar and [`value`]
//! for the type tags.
//!
//! ## Core Concepts
//!
//! ### Entities
//!
//! An [`Entity`] is a [`Key`] plus a flat list of [`Property`] values. Values
//! are one of bool, i64, f64, string, UTC timestamp (millisecond precision)
//! or a byte blob.
//!
//! ### Pipelines
//!
//! - [`export`] - [`EntitySource`] → frames → writer
//! - [`import`] / [`delete`] - reader → frames → batches for an [`EntityStore`]
//! - [`import_mapped`](mapper::import_mapped) - reader → frames → typed records
//! - [`convert`](convert::convert) - reader → frames → object-notation dump
//!
//! Each returns a summary or the first error observed. Nothing is retried and
//! nothing is rolled back.
//!
//! ### Files
//!
//! The [`io`] module wraps the pipelines for files and glob patterns:
//! [`io::export_file`], [`io::import_files`], [`io::delete_files`] and so on.
//!
//! ## Configuration
//!
//! [`TransferConfig`] carries queue depth, batch size, buffer sizes and the
//! maximum line length.
//!
//! ## Logging
//!
//! The crate logs through `tracing`; install any subscriber to see pipeline
//! progress.

pub mod config;
pub mod convert;
pub mod error;
pub mod frame;
pub mod io;
pub mod key;
pub mod mapper;
pub mod model;
pub mod pipeline;
pub mod schema;
pub mod store;
pub mod testing;
pub mod value;

pub use config::TransferConfig;
pub use convert::{ConvertOptions, convert};
pub use error::{BoxError, DecodeError, EncodeError, KeyError, Result, TransferError};
pub use frame::{EncodedFrames, FrameDecoder, FrameEncoder};
pub use key::{decode_key, encode_key, escape_key_part, validate_key};
pub use mapper::{FieldTable, MappedRecord, ModelMapping, Reflector, Settable, import_mapped};
pub use model::{Entity, Identity, Key, Property, Segment, Value};
pub use pipeline::{ExportSummary, ImportSummary, delete, export, import, run_import};
pub use schema::{ColumnDef, ColumnSpec, ColumnTable, SchemaDictionary};
pub use store::{BatchCounts, BatchSink, EntitySource, EntityStore};
pub use value::TypeTag;
