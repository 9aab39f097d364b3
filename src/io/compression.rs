//! Transparent gzip handling for frame files.
//!
//! Detection rules:
//! - **Writing**: a path ending in `gz` (any case, so `.gz` and `.tgz` both
//!   count) is gzip-compressed; anything else is written as-is.
//! - **Reading**: the same suffix rule, with a fallback on the gzip magic
//!   bytes `1f 8b` for compressed files that were renamed.
//!
//! Gzip support is behind the default `compression-gzip` feature. Without it,
//! gzip paths and gzip content are reported as errors instead of being read as
//! garbage.
//!
//! ```no_run
//! use entline::io::compression::{open_for_reading, open_for_writing};
//! use std::io::{Read, Write};
//! # fn main() -> anyhow::Result<()> {
//!
//! let mut w = open_for_writing("people.ds.gz")?;
//! w.write_all(b"{\"k\":\"/P,1\",\"d\":[]}\n")?;
//! w.finish()?;
//!
//! let mut text = String::new();
//! open_for_reading("people.ds.gz")?.read_to_string(&mut text)?;
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use std::fs::{File, create_dir_all};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::Path;

#[cfg(feature = "compression-gzip")]
use flate2::{read::MultiGzDecoder, write::GzEncoder};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Compression applied to a frame file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
}

impl Compression {
    /// Compression implied by the file name.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let name = path.as_ref().to_string_lossy().to_ascii_lowercase();
        if name.ends_with("gz") {
            Compression::Gzip
        } else {
            Compression::None
        }
    }

    /// Compression implied by the first bytes of the content.
    pub fn from_magic(head: &[u8]) -> Self {
        if head.starts_with(&GZIP_MAGIC) {
            Compression::Gzip
        } else {
            Compression::None
        }
    }
}

/// Open `path` for reading, decompressing when it is gzip.
///
/// # Errors
/// The file cannot be opened or peeked, or it is gzip and the
/// `compression-gzip` feature is disabled.
pub fn open_for_reading(path: impl AsRef<Path>) -> Result<Box<dyn Read + Send>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut compression = Compression::from_path(path);
    if compression == Compression::None {
        let head = reader
            .fill_buf()
            .with_context(|| format!("read header of {}", path.display()))?;
        compression = Compression::from_magic(head);
    }
    match compression {
        Compression::None => Ok(Box::new(reader)),
        Compression::Gzip => gzip_reader(reader, path),
    }
}

#[cfg(feature = "compression-gzip")]
fn gzip_reader(reader: BufReader<File>, _path: &Path) -> Result<Box<dyn Read + Send>> {
    Ok(Box::new(MultiGzDecoder::new(reader)))
}

#[cfg(not(feature = "compression-gzip"))]
fn gzip_reader(_reader: BufReader<File>, path: &Path) -> Result<Box<dyn Read + Send>> {
    anyhow::bail!(
        "{} is gzip-compressed but the compression-gzip feature is disabled",
        path.display()
    )
}

/// Writable frame file. Call [`FileWriter::finish`] when done so a gzip
/// trailer gets written.
#[derive(Debug)]
pub enum FileWriter {
    Plain(File),
    #[cfg(feature = "compression-gzip")]
    Gzip(GzEncoder<File>),
}

impl FileWriter {
    pub fn compression(&self) -> Compression {
        match self {
            FileWriter::Plain(_) => Compression::None,
            #[cfg(feature = "compression-gzip")]
            FileWriter::Gzip(_) => Compression::Gzip,
        }
    }

    /// Flush all data and, for gzip, write the trailer.
    ///
    /// # Errors
    /// Any I/O error from the final writes.
    pub fn finish(self) -> io::Result<()> {
        match self {
            FileWriter::Plain(mut f) => f.flush(),
            #[cfg(feature = "compression-gzip")]
            FileWriter::Gzip(enc) => enc.finish()?.flush(),
        }
    }
}

impl Write for FileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            FileWriter::Plain(f) => f.write(buf),
            #[cfg(feature = "compression-gzip")]
            FileWriter::Gzip(enc) => enc.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            FileWriter::Plain(f) => f.flush(),
            #[cfg(feature = "compression-gzip")]
            FileWriter::Gzip(enc) => enc.flush(),
        }
    }
}

#[cfg(feature = "compression-gzip")]
fn ensure_writable(_compression: Compression, _path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(not(feature = "compression-gzip"))]
fn ensure_writable(compression: Compression, path: &Path) -> Result<()> {
    if compression == Compression::Gzip {
        anyhow::bail!(
            "cannot write {}: the compression-gzip feature is disabled",
            path.display()
        );
    }
    Ok(())
}

/// Create (or truncate) `path` for writing, gzip-compressing when the name
/// ends in `gz`. Parent directories are created as needed.
///
/// # Errors
/// The file or its directories cannot be created, or the name asks for gzip
/// and the `compression-gzip` feature is disabled.
pub fn open_for_writing(path: impl AsRef<Path>) -> Result<FileWriter> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        create_dir_all(parent).with_context(|| format!("mkdir -p {}", parent.display()))?;
    }
    let compression = Compression::from_path(path);
    ensure_writable(compression, path)?;
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    Ok(match compression {
        #[cfg(feature = "compression-gzip")]
        Compression::Gzip => FileWriter::Gzip(GzEncoder::new(file, flate2::Compression::default())),
        _ => FileWriter::Plain(file),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn suffix_detection_is_case_insensitive() {
        assert_eq!(Compression::from_path("a.ds.gz"), Compression::Gzip);
        assert_eq!(Compression::from_path("A.DS.GZ"), Compression::Gzip);
        assert_eq!(Compression::from_path("backup.tgz"), Compression::Gzip);
        assert_eq!(Compression::from_path("a.ds"), Compression::None);
        assert_eq!(Compression::from_path("gz/a.ds"), Compression::None);
    }

    #[test]
    fn magic_detection() {
        assert_eq!(Compression::from_magic(&[0x1f, 0x8b, 8]), Compression::Gzip);
        assert_eq!(Compression::from_magic(b"{\"k\""), Compression::None);
        assert_eq!(Compression::from_magic(&[]), Compression::None);
    }

    #[test]
    fn plain_round_trip_creates_parents() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("nested/out.ds");
        let mut w = open_for_writing(&path)?;
        assert_eq!(w.compression(), Compression::None);
        w.write_all(b"hello\n")?;
        w.finish()?;
        let mut s = String::new();
        open_for_reading(&path)?.read_to_string(&mut s)?;
        assert_eq!(s, "hello\n");
        Ok(())
    }

    #[cfg(feature = "compression-gzip")]
    #[test]
    fn gzip_round_trip_and_sniffing() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("out.ds.gz");
        let mut w = open_for_writing(&path)?;
        assert_eq!(w.compression(), Compression::Gzip);
        w.write_all(b"compressed\n")?;
        w.finish()?;

        let raw = std::fs::read(&path)?;
        assert!(raw.starts_with(&GZIP_MAGIC));

        let renamed = dir.path().join("renamed.ds");
        std::fs::rename(&path, &renamed)?;
        let mut s = String::new();
        open_for_reading(&renamed)?.read_to_string(&mut s)?;
        assert_eq!(s, "compressed\n");
        Ok(())
    }
}
