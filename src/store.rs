//! Collaborator seams: where entities come from on export and where
//! they go on import.
//!
//! The remote store's own retries and rate limiting live behind
//! [`EntityStore`]; nothing in this crate retries a failed call.

use crate::error::{BoxError, TransferError};
use crate::model::{Entity, Key};
use tracing::debug;

/// Pull-based entity iterator driven by the export pipeline.
///
/// Any `Iterator<Item = Result<Entity, E>>` is a source, so a query cursor, a
/// `Vec` of results or a generator closure all plug in directly.
pub trait EntitySource {
    /// Next entity, `None` at end of sequence.
    fn next_entity(&mut self) -> Option<Result<Entity, BoxError>>;
}

impl<I, E> EntitySource for I
where
    I: Iterator<Item = Result<Entity, E>>,
    E: Into<BoxError>,
{
    fn next_entity(&mut self) -> Option<Result<Entity, BoxError>> {
        self.next().map(|r| r.map_err(Into::into))
    }
}

/// Bulk write/delete target of the import and delete pipelines.
///
/// Each call receives one batch (at most `batch_size` items). Calls happen on
/// a pipeline worker thread, hence the `Send` bound.
pub trait EntityStore: Send {
    /// Write a batch of entities.
    ///
    /// # Errors
    /// Any failure aborts the pipeline with [`TransferError::Sink`].
    fn put_multi(&mut self, entities: &[Entity]) -> Result<(), BoxError>;

    /// Delete a batch of keys.
    ///
    /// # Errors
    /// Any failure aborts the pipeline with [`TransferError::Sink`].
    fn delete_multi(&mut self, keys: &[Key]) -> Result<(), BoxError>;
}

impl<S: EntityStore + ?Sized> EntityStore for &mut S {
    fn put_multi(&mut self, entities: &[Entity]) -> Result<(), BoxError> {
        (**self).put_multi(entities)
    }

    fn delete_multi(&mut self, keys: &[Key]) -> Result<(), BoxError> {
        (**self).delete_multi(keys)
    }
}

impl<S: EntityStore + ?Sized> EntityStore for Box<S> {
    fn put_multi(&mut self, entities: &[Entity]) -> Result<(), BoxError> {
        (**self).put_multi(entities)
    }

    fn delete_multi(&mut self, keys: &[Key]) -> Result<(), BoxError> {
        (**self).delete_multi(keys)
    }
}

/// Items and flushes seen by a [`BatchSink`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchCounts {
    pub items: u64,
    pub batches: u64,
}

/// Accumulates items into fixed-size batches and hands each full batch, plus
/// the final partial one, to `flush`.
pub struct BatchSink<T, F> {
    batch: Vec<T>,
    size: usize,
    flush: F,
    counts: BatchCounts,
}

impl<T, F> BatchSink<T, F>
where
    F: FnMut(Vec<T>) -> Result<(), BoxError>,
{
    pub fn new(size: usize, flush: F) -> Self {
        let size = size.max(1);
        Self {
            batch: Vec::with_capacity(size),
            size,
            flush,
            counts: BatchCounts::default(),
        }
    }

    /// Add one item, flushing when the batch is full.
    ///
    /// # Errors
    /// [`TransferError::Sink`] when the flush callback fails.
    pub fn push(&mut self, item: T) -> Result<(), TransferError> {
        self.batch.push(item);
        self.counts.items += 1;
        if self.batch.len() >= self.size {
            self.flush_batch()?;
        }
        Ok(())
    }

    /// Flush any remaining items and return the totals.
    ///
    /// # Errors
    /// [`TransferError::Sink`] when the final flush fails.
    pub fn finish(mut self) -> Result<BatchCounts, TransferError> {
        if !self.batch.is_empty() {
            self.flush_batch()?;
        }
        Ok(self.counts)
    }

    fn flush_batch(&mut self) -> Result<(), TransferError> {
        let batch = std::mem::replace(&mut self.batch, Vec::with_capacity(self.size));
        let n = batch.len();
        (self.flush)(batch).map_err(TransferError::Sink)?;
        self.counts.batches += 1;
        debug!(batch = self.counts.batches, items = n, "flushed batch");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_and_partial_batches() {
        let mut seen = Vec::new();
        let mut sink = BatchSink::new(3, |b: Vec<u32>| {
            seen.push(b);
            Ok(())
        });
        for i in 0..7 {
            sink.push(i).unwrap();
        }
        let counts = sink.finish().unwrap();
        assert_eq!(counts, BatchCounts { items: 7, batches: 3 });
        assert_eq!(seen, vec![vec![0, 1, 2], vec![3, 4, 5], vec![6]]);
    }

    #[test]
    fn exact_multiple_has_no_empty_tail() {
        let mut calls = 0;
        let mut sink = BatchSink::new(2, |_: Vec<u32>| {
            calls += 1;
            Ok(())
        });
        for i in 0..4 {
            sink.push(i).unwrap();
        }
        assert_eq!(sink.finish().unwrap().batches, 2);
        assert_eq!(calls, 2);
    }

    #[test]
    fn flush_error_is_a_sink_error() {
        let mut sink = BatchSink::new(1, |_: Vec<u32>| Err("store down".into()));
        let err = sink.push(1).unwrap_err();
        assert!(matches!(err, TransferError::Sink(_)));
        assert!(err.to_string().contains("store down"));
    }

    #[test]
    fn iterators_are_sources() {
        let mut src = vec![
            Ok(Entity::new(Key::id("A", 1))),
            Err(std::io::Error::other("cursor lost")),
        ]
        .into_iter();
        assert!(src.next_entity().unwrap().is_ok());
        assert!(src.next_entity().unwrap().is_err());
        assert!(src.next_entity().is_none());
    }
}
