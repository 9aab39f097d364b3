//! Human-readable dump of a frame stream.
//!
//! Each entity becomes one line of object notation, properties in stream
//! order:
//!
//! ```text
//! {Age:31,Name:"Ada",Born:"1815-12-10T00:00:00.000Z"},
//! ```
//!
//! The key is not printed.

use crate::config::TransferConfig;
use crate::error::Result;
use crate::model::{Entity, Value};
use crate::pipeline::{ImportSummary, run_import};
use crate::store::BatchCounts;
use crate::value::{encode_blob, format_timestamp};
use std::io::{self, BufWriter, Read, Write};

/// Options for [`convert`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    /// Leave out properties holding `""`, `0`, `0.0` or `false`.
    pub skip_default: bool,
}

/// Decode a frame stream from `reader` and write one object-notation line per
/// entity to `writer`.
///
/// # Errors
/// Read and decode errors as in [`run_import`]; write failures as
/// [`TransferError::Io`](crate::TransferError::Io).
pub fn convert<R, W>(
    reader: R,
    writer: W,
    opts: ConvertOptions,
    cfg: &TransferConfig,
) -> Result<ImportSummary>
where
    R: Read,
    W: Write + Send,
{
    let capacity = cfg.normalized().write_buffer;
    run_import(reader, cfg, move |entities| {
        let mut out = BufWriter::with_capacity(capacity, writer);
        let mut counts = BatchCounts::default();
        for entity in entities {
            write_entity(&mut out, &entity, opts)?;
            counts.items += 1;
        }
        out.flush()?;
        Ok(counts)
    })
}

/// Write one entity line, terminator included.
pub fn write_entity<W: Write>(out: &mut W, entity: &Entity, opts: ConvertOptions) -> io::Result<()> {
    out.write_all(b"{")?;
    let mut first = true;
    for p in &entity.properties {
        if opts.skip_default && p.value.is_zero() {
            continue;
        }
        if !first {
            out.write_all(b",")?;
        }
        first = false;
        write!(out, "{}:", p.name)?;
        match &p.value {
            Value::Bool(b) => write!(out, "{b}")?,
            Value::Int(i) => write!(out, "{i}")?,
            Value::Float(f) => write!(out, "{f}")?,
            Value::String(s) => write!(out, "{}", serde_json::Value::from(s.as_str()))?,
            Value::Timestamp(ts) => write!(out, "\"{}\"", format_timestamp(ts))?,
            Value::Bytes(b) => write!(out, "\"{}\"", encode_blob(b))?,
        }
    }
    out.write_all(b"},\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Key, Property};
    use chrono::{TimeZone, Utc};

    fn line(e: &Entity, skip_default: bool) -> String {
        let mut out = Vec::new();
        write_entity(&mut out, e, ConvertOptions { skip_default }).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn renders_every_value_kind() {
        let e = Entity::new(Key::id("K", 1))
            .with("Name", "Ada \"A\"")
            .with("Age", 31i64)
            .with("Score", 1.5)
            .with("Ok", true)
            .with("At", Utc.timestamp_millis_opt(1_136_214_245_012).unwrap())
            .with_property(Property::unindexed("Bin", vec![1u8, 2, 3]));
        assert_eq!(
            line(&e, false),
            "{Name:\"Ada \\\"A\\\"\",Age:31,Score:1.5,Ok:true,At:\"2006-01-02T15:04:05.012Z\",Bin:\"AQID\"},\n"
        );
    }

    #[test]
    fn skip_default_drops_zero_values() {
        let e = Entity::new(Key::id("K", 1))
            .with("A", "")
            .with("B", 0i64)
            .with("C", 0.0)
            .with("D", false)
            .with("E", "x");
        assert_eq!(line(&e, true), "{E:\"x\"},\n");
        assert_eq!(line(&e, false), "{A:\"\",B:0,C:0,D:false,E:\"x\"},\n");
    }
}
