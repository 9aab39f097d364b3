//! Pipeline tunables.

use serde::{Deserialize, Serialize};

/// Queue depth between pipeline stages.
pub const DEFAULT_QUEUE_DEPTH: usize = 10;
/// Entities per bulk write/delete call.
pub const DEFAULT_BATCH_SIZE: usize = 200;
pub const DEFAULT_WRITE_BUFFER: usize = 32 * 1024;
pub const DEFAULT_READ_BUFFER: usize = 32 * 1024;
/// Longest accepted frame line, in bytes.
pub const DEFAULT_MAX_LINE_BYTES: usize = 1024 * 1024 * 1024;

/// Configuration shared by the export, import, delete and convert pipelines.
///
/// Every field has a default, so a partial JSON document is enough:
///
/// ```
/// use entline::TransferConfig;
///
/// let cfg = TransferConfig::from_json_str(r#"{"batch_size": 500}"#).unwrap();
/// assert_eq!(cfg.batch_size, 500);
/// assert_eq!(cfg.queue_depth, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    pub queue_depth: usize,
    pub batch_size: usize,
    pub write_buffer: usize,
    pub read_buffer: usize,
    pub max_line_bytes: usize,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            queue_depth: DEFAULT_QUEUE_DEPTH,
            batch_size: DEFAULT_BATCH_SIZE,
            write_buffer: DEFAULT_WRITE_BUFFER,
            read_buffer: DEFAULT_READ_BUFFER,
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
        }
    }
}

impl TransferConfig {
    /// Parse a JSON document; missing fields take their defaults.
    ///
    /// # Errors
    /// Malformed JSON or a field of the wrong type.
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Self>(s).map(|cfg| cfg.normalized())
    }

    #[must_use]
    pub fn with_queue_depth(mut self, n: usize) -> Self {
        self.queue_depth = n;
        self
    }

    #[must_use]
    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = n;
        self
    }

    #[must_use]
    pub fn with_write_buffer(mut self, n: usize) -> Self {
        self.write_buffer = n;
        self
    }

    #[must_use]
    pub fn with_read_buffer(mut self, n: usize) -> Self {
        self.read_buffer = n;
        self
    }

    #[must_use]
    pub fn with_max_line_bytes(mut self, n: usize) -> Self {
        self.max_line_bytes = n;
        self
    }

    /// Copy with every zero field raised to 1.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            queue_depth: self.queue_depth.max(1),
            batch_size: self.batch_size.max(1),
            write_buffer: self.write_buffer.max(1),
            read_buffer: self.read_buffer.max(1),
            max_line_bytes: self.max_line_bytes.max(1),
        }
    }
}
