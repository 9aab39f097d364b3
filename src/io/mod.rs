//! File handles and whole-file helpers.
//!
//! - [`compression`]: gzip detection and transparent (de)compression
//! - [`glob`]: pattern expansion for multi-file runs
//! - [`files`]: `export_file`, `import_file`, `delete_file` and friends

pub mod compression;
pub mod files;
pub mod glob;

pub use compression::{Compression, FileWriter, open_for_reading, open_for_writing};
pub use files::{
    convert_file, delete_file, delete_files, export_file, import_file, import_file_mapped,
    import_files,
};
pub use glob::{expand_glob, expand_patterns};
