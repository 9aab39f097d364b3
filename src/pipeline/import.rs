use super::{ErrorSlot, first_error, join, push, report};
use crate::config::TransferConfig;
use crate::error::{Result, TransferError};
use crate::frame::FrameDecoder;
use crate::model::{Entity, Key};
use crate::store::{BatchCounts, BatchSink, EntityStore};
use crossbeam_channel::{Receiver, Sender, bounded};
use std::io::{self, BufRead, BufReader, Read};
use std::thread;
use tracing::{debug, info};

/// Counters of a finished import, delete or convert run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    /// Non-blank lines read.
    pub lines: u64,
    /// Entities decoded and handed to the consumer.
    pub entities: u64,
    /// Batches flushed by the consumer.
    pub batches: u64,
    /// Columns registered by the stream's schema frames.
    pub columns: usize,
}

#[derive(Default)]
struct DecodeStats {
    entities: u64,
    columns: usize,
}

type Line = (usize, Vec<u8>);

/// Decode a frame stream and feed the entities to `consume`.
///
/// Lines are read on the calling thread, decoded on one worker thread and
/// consumed on another. `consume` runs until the receiver is exhausted or it
/// returns an error; returning early stops the whole pipeline.
///
/// Blank lines are skipped but still counted, so line numbers in errors match
/// the input.
///
/// # Errors
/// The first of: an I/O error or over-long line while reading, a decode error
/// (with its 1-based line number and raw content), an error from `consume`.
pub fn run_import<R, F>(reader: R, cfg: &TransferConfig, consume: F) -> Result<ImportSummary>
where
    R: Read,
    F: FnOnce(Receiver<Entity>) -> Result<BatchCounts> + Send,
{
    let cfg = cfg.normalized();
    let mut reader = BufReader::with_capacity(cfg.read_buffer, reader);
    let (line_tx, line_rx) = bounded::<Line>(cfg.queue_depth);
    let (entity_tx, entity_rx) = bounded::<Entity>(cfg.queue_depth);
    let (decode_err, mut decode_slot) = ErrorSlot::new("decoder");
    let (consume_err, mut consume_slot) = ErrorSlot::new("consumer");
    info!(queue_depth = cfg.queue_depth, "import started");

    thread::scope(|s| {
        let decoder = s.spawn(move || report(&decode_err, decode_stage(line_rx, entity_tx)));
        let consumer = s.spawn(move || report(&consume_err, consume(entity_rx)));

        let mut read_err = None;
        let mut line_no = 0usize;
        let mut lines = 0u64;
        loop {
            let mut line = Vec::new();
            match read_line(&mut reader, &mut line, cfg.max_line_bytes) {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) => {
                    read_err = Some(TransferError::Io(err));
                    break;
                }
            }
            line_no += 1;
            if line.len() > cfg.max_line_bytes {
                read_err = Some(TransferError::LineTooLong {
                    line: line_no,
                    limit: cfg.max_line_bytes,
                });
                break;
            }
            if line.iter().all(u8::is_ascii_whitespace) {
                continue;
            }
            if !push(&line_tx, (line_no, line), &mut decode_slot, &mut consume_slot) {
                debug!(line = line_no, "import input stopped early");
                break;
            }
            lines += 1;
        }
        drop(line_tx);

        let decoded = join(decoder, "decoder");
        let consumed = join(consumer, "consumer");
        first_error([read_err, decode_slot.into_error(), consume_slot.into_error()])?;
        let (decoded, consumed) = (decoded?, consumed?);

        let summary = ImportSummary {
            lines,
            entities: decoded.entities,
            batches: consumed.batches,
            columns: decoded.columns,
        };
        info!(
            lines = summary.lines,
            entities = summary.entities,
            batches = summary.batches,
            "import finished"
        );
        Ok(summary)
    })
}

/// Read one line without its terminator. Returns `false` at end of input.
///
/// At most `limit + 2` bytes are buffered, so an over-long line shows up as
/// `line.len() > limit` without reading the rest of it.
fn read_line<R: BufRead>(reader: &mut R, line: &mut Vec<u8>, limit: usize) -> io::Result<bool> {
    let cap = (limit as u64).saturating_add(2);
    let n = reader.take(cap).read_until(b'\n', line)?;
    if n == 0 {
        return Ok(false);
    }
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
    Ok(true)
}

fn decode_stage(lines: Receiver<Line>, entities: Sender<Entity>) -> Result<DecodeStats> {
    let mut decoder = FrameDecoder::new();
    let mut stats = DecodeStats::default();
    for (line, raw) in lines {
        let decoded = decoder
            .decode_line(&raw)
            .map_err(|source| TransferError::Line {
                line,
                content: String::from_utf8_lossy(&raw).into_owned(),
                source,
            })?;
        if let Some(entity) = decoded {
            if entities.send(entity).is_err() {
                break;
            }
            stats.entities += 1;
        }
    }
    stats.columns = decoder.columns().len();
    Ok(stats)
}

/// Import a frame stream into `store`, one `put_multi` call per batch.
///
/// # Errors
/// See [`run_import`]; store failures surface as [`TransferError::Sink`].
pub fn import<R, S>(reader: R, mut store: S, cfg: &TransferConfig) -> Result<ImportSummary>
where
    R: Read,
    S: EntityStore,
{
    let batch_size = cfg.normalized().batch_size;
    run_import(reader, cfg, move |entities| {
        let mut sink = BatchSink::new(batch_size, |batch: Vec<Entity>| store.put_multi(&batch));
        for entity in entities {
            sink.push(entity)?;
        }
        sink.finish()
    })
}

/// Delete every key found in a frame stream, one `delete_multi` call per
/// batch.
///
/// # Errors
/// See [`run_import`]; store failures surface as [`TransferError::Sink`].
pub fn delete<R, S>(reader: R, mut store: S, cfg: &TransferConfig) -> Result<ImportSummary>
where
    R: Read,
    S: EntityStore,
{
    let batch_size = cfg.normalized().batch_size;
    run_import(reader, cfg, move |entities| {
        let mut sink = BatchSink::new(batch_size, |keys: Vec<Key>| store.delete_multi(&keys));
        for entity in entities {
            sink.push(entity.key)?;
        }
        sink.finish()
    })
}
