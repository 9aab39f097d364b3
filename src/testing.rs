//! Test doubles for code built on entline.
//!
//! - [`MemoryStore`]: an [`EntityStore`](crate::EntityStore) that keeps
//!   entities in memory, logs batch sizes and can be told to fail
//! - [`FailingWriter`]: a writer that errors after a byte budget
//! - [`TempDirPath`]: scratch directories for file-level tests
//! - [`sample_entities`], [`numbered_entities`], [`failing_source`]: fixtures
//!
//! # Quick Start
//!
//! ```
//! use entline::testing::{MemoryStore, sample_entities};
//! use entline::{TransferConfig, export, import};
//!
//! # fn main() -> anyhow::Result<()> {
//! let cfg = TransferConfig::default();
//! let mut file = Vec::new();
//! export(sample_entities().into_iter().map(Ok::<_, std::io::Error>), &mut file, &cfg)?;
//!
//! let mut store = MemoryStore::new();
//! import(file.as_slice(), &mut store, &cfg)?;
//! assert_eq!(store.len(), sample_entities().len());
//! # Ok(())
//! # }
//! ```

pub mod fixtures;
pub mod memory_store;
pub mod mock_io;

pub use fixtures::{failing_source, numbered_entities, sample_entities};
pub use memory_store::MemoryStore;
pub use mock_io::{FailingWriter, TempDirPath};
