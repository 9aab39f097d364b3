//! Streaming export/import pipelines.
//!
//! Both directions are three stages connected by bounded queues:
//!
//! ```text
//! export:  source ──▶ [entities] ──▶ encoder ──▶ [frames] ──▶ writer
//! import:  reader ──▶ [lines]    ──▶ decoder ──▶ [entities] ──▶ consumer
//! ```
//!
//! The first stage runs on the caller's thread; the other two are scoped
//! worker threads. Every worker owns a one-slot error channel. The driver
//! pushes each item with a `select!` against both error channels, so a failed
//! worker stops it even while the queue is full.
//!
//! When a worker exits it drops its receiving end, which wakes any upstream
//! sender blocked on it; upstream stages treat a closed downstream queue as a
//! silent stop. After all workers are joined the result is the first error by
//! stage position: driver, middle stage, last stage.

mod export;
mod import;

pub use export::{ExportSummary, export};
pub use import::{ImportSummary, delete, import, run_import};

use crate::error::{Result, TransferError};
use crossbeam_channel::{Receiver, RecvError, Sender, bounded, select};
use std::thread::ScopedJoinHandle;
use tracing::debug;

/// Receiving side of a worker's one-slot error channel.
pub(crate) struct ErrorSlot {
    stage: &'static str,
    rx: Receiver<TransferError>,
    seen: Option<TransferError>,
}

impl ErrorSlot {
    pub(crate) fn new(stage: &'static str) -> (Sender<TransferError>, Self) {
        let (tx, rx) = bounded(1);
        (
            tx,
            Self {
                stage,
                rx,
                seen: None,
            },
        )
    }

    fn observe(&mut self, msg: std::result::Result<TransferError, RecvError>) {
        if let Ok(err) = msg {
            debug!(stage = self.stage, error = %err, "stage failed");
            self.seen.get_or_insert(err);
        }
    }

    /// The error this worker reported, if any. Call after the worker is joined.
    pub(crate) fn into_error(self) -> Option<TransferError> {
        self.seen.or_else(|| self.rx.try_recv().ok())
    }
}

/// Push `item` downstream unless either worker has stopped first.
///
/// Returns `false` when the pipeline should stop feeding input.
pub(crate) fn push<T>(
    tx: &Sender<T>,
    item: T,
    middle: &mut ErrorSlot,
    last: &mut ErrorSlot,
) -> bool {
    let outcome = select! {
        send(tx, item) -> res => Pushed::Sent(res.is_ok()),
        recv(middle.rx) -> msg => Pushed::MiddleStopped(msg),
        recv(last.rx) -> msg => Pushed::LastStopped(msg),
    };
    match outcome {
        Pushed::Sent(ok) => ok,
        Pushed::MiddleStopped(msg) => {
            middle.observe(msg);
            false
        }
        Pushed::LastStopped(msg) => {
            last.observe(msg);
            false
        }
    }
}

enum Pushed {
    Sent(bool),
    MiddleStopped(std::result::Result<TransferError, RecvError>),
    LastStopped(std::result::Result<TransferError, RecvError>),
}

/// Record a worker's failure in its slot; stats fall back to the default.
pub(crate) fn report<T: Default>(errors: &Sender<TransferError>, result: Result<T>) -> T {
    result.unwrap_or_else(|err| {
        // one slot; a second error from the same worker cannot happen
        let _ = errors.try_send(err);
        T::default()
    })
}

pub(crate) fn join<T>(handle: ScopedJoinHandle<'_, T>, stage: &'static str) -> Result<T> {
    handle
        .join()
        .map_err(|_| TransferError::WorkerPanic(stage))
}

/// First error by stage position, or `Ok(())`.
pub(crate) fn first_error(errors: [Option<TransferError>; 3]) -> Result<()> {
    match errors.into_iter().flatten().next() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}
