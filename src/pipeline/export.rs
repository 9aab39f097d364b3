use super::{ErrorSlot, first_error, join, push, report};
use crate::config::TransferConfig;
use crate::error::{Result, TransferError};
use crate::frame::FrameEncoder;
use crate::model::Entity;
use crate::store::EntitySource;
use crossbeam_channel::{Receiver, Sender, bounded};
use std::io::{BufWriter, Write};
use std::thread;
use tracing::{debug, info};

/// Counters of a finished export.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    pub entities: u64,
    /// Frames written, schema frames included.
    pub frames: u64,
    pub schema_frames: u64,
    /// Columns in the stream dictionary at the end.
    pub columns: usize,
    pub bytes: u64,
}

#[derive(Default)]
struct EncodeStats {
    entities: u64,
    schema_frames: u64,
    columns: usize,
}

#[derive(Default)]
struct WriteStats {
    frames: u64,
    bytes: u64,
}

/// Stream every entity of `source` into `writer` as newline-delimited frames.
///
/// The source is pulled on the calling thread; encoding and writing run on
/// two worker threads. Output is flushed at the end but not rolled back on
/// failure: frames already written stay written.
///
/// # Errors
/// The first of: a source error, an encode error, an I/O error on `writer`.
///
/// # Examples
/// ```
/// use entline::{Entity, Key, TransferConfig, export};
///
/// let people = vec![Ok::<_, std::io::Error>(Entity::new(Key::id("Person", 1)).with("Name", "Ada"))];
/// let mut out = Vec::new();
/// let summary = export(people.into_iter(), &mut out, &TransferConfig::default()).unwrap();
/// assert_eq!(summary.frames, 2);
/// ```
pub fn export<S, W>(mut source: S, writer: W, cfg: &TransferConfig) -> Result<ExportSummary>
where
    S: EntitySource,
    W: Write + Send,
{
    let cfg = cfg.normalized();
    let (entity_tx, entity_rx) = bounded::<Entity>(cfg.queue_depth);
    let (frame_tx, frame_rx) = bounded::<Vec<u8>>(cfg.queue_depth);
    let (encode_err, mut encode_slot) = ErrorSlot::new("encoder");
    let (write_err, mut write_slot) = ErrorSlot::new("writer");
    info!(queue_depth = cfg.queue_depth, "export started");

    thread::scope(|s| {
        let encoder = s.spawn(move || report(&encode_err, encode_stage(entity_rx, frame_tx)));
        let write_buffer = cfg.write_buffer;
        let sink =
            s.spawn(move || report(&write_err, write_stage(frame_rx, writer, write_buffer)));

        let mut source_err = None;
        while let Some(next) = source.next_entity() {
            match next {
                Ok(entity) => {
                    if !push(&entity_tx, entity, &mut encode_slot, &mut write_slot) {
                        debug!("export input stopped early");
                        break;
                    }
                }
                Err(err) => {
                    source_err = Some(TransferError::Source(err));
                    break;
                }
            }
        }
        drop(entity_tx);

        let encoded = join(encoder, "encoder");
        let written = join(sink, "writer");
        first_error([source_err, encode_slot.into_error(), write_slot.into_error()])?;
        let (encoded, written) = (encoded?, written?);

        let summary = ExportSummary {
            entities: encoded.entities,
            frames: written.frames,
            schema_frames: encoded.schema_frames,
            columns: encoded.columns,
            bytes: written.bytes,
        };
        info!(
            entities = summary.entities,
            frames = summary.frames,
            columns = summary.columns,
            "export finished"
        );
        Ok(summary)
    })
}

fn encode_stage(entities: Receiver<Entity>, frames: Sender<Vec<u8>>) -> Result<EncodeStats> {
    let mut encoder = FrameEncoder::new();
    let mut stats = EncodeStats::default();
    for entity in entities {
        let encoded = encoder.encode(entity)?;
        if encoded.schema.is_some() {
            stats.schema_frames += 1;
            debug!(columns = encoder.schema().len(), "schema grew");
        }
        for frame in encoded.into_frames() {
            if frames.send(frame).is_err() {
                return Ok(stats);
            }
        }
        stats.entities += 1;
    }
    stats.columns = encoder.schema().len();
    Ok(stats)
}

fn write_stage<W: Write>(frames: Receiver<Vec<u8>>, writer: W, capacity: usize) -> Result<WriteStats> {
    let mut out = BufWriter::with_capacity(capacity, writer);
    let mut stats = WriteStats::default();
    for frame in frames {
        out.write_all(&frame)?;
        out.write_all(b"\n")?;
        stats.frames += 1;
        stats.bytes += frame.len() as u64 + 1;
    }
    out.flush()?;
    Ok(stats)
}
