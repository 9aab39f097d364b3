//! I/O doubles: scratch directories, pre-written frame files and writers
//! that fail on demand.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary directory that is deleted when dropped.
pub struct TempDirPath {
    #[allow(dead_code)]
    temp_dir: TempDir,
    path: PathBuf,
}

impl TempDirPath {
    /// Create a new temporary directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the temporary directory cannot be created.
    pub fn new() -> io::Result<Self> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().to_path_buf();
        Ok(Self { temp_dir, path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A path inside this directory.
    #[must_use]
    pub fn file_path(&self, filename: &str) -> PathBuf {
        self.path.join(filename)
    }

    /// Glob pattern over this directory, e.g. `pattern("*.ds")`.
    #[must_use]
    pub fn pattern(&self, glob: &str) -> String {
        format!("{}/{glob}", self.path.display())
    }

    /// Write `lines` (newline-terminated) into `filename`, uncompressed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_lines(&self, filename: &str, lines: &[&str]) -> io::Result<PathBuf> {
        let path = self.file_path(filename);
        let mut body = lines.join("\n");
        body.push('\n');
        std::fs::write(&path, body)?;
        Ok(path)
    }
}

/// Writer that accepts `limit` bytes and then fails every write.
///
/// `flush` fails only after a write has failed.
#[derive(Debug, Default)]
pub struct FailingWriter {
    pub written: Vec<u8>,
    limit: usize,
    failed: bool,
}

impl FailingWriter {
    #[must_use]
    pub fn after(limit: usize) -> Self {
        Self {
            written: Vec::new(),
            limit,
            failed: false,
        }
    }
}

impl Write for FailingWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let room = self.limit.saturating_sub(self.written.len());
        if room == 0 && !buf.is_empty() {
            self.failed = true;
            return Err(io::Error::other("injected write failure"));
        }
        let n = room.min(buf.len());
        self.written.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.failed {
            return Err(io::Error::other("injected flush failure"));
        }
        Ok(())
    }
}
