use std::{
    io::{ErrorKind, Read, Write},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use log::trace;
use serde::Serialize;
use tokio::sync::Notify;

use crate::errors::{Result, StreamSide, TransferError};

/// What a finished copy moved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CopyReport {
    pub bytes: u64,
    pub chunks: u64,
    pub elapsed: Duration,
}

/// Shared flag a copy checks between chunks.
///
/// Async waiters can also be woken by it through [`CancelFlag::cancelled`],
/// which does not depend on the copy reaching a chunk boundary.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<CancelState>);

#[derive(Debug, Default)]
struct CancelState {
    raised: AtomicBool,
    notify: Notify,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.raised.store(true, Ordering::Release);
        self.0.notify.notify_waiters();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.raised.load(Ordering::Acquire)
    }

    /// Resolves once the flag is raised.
    pub async fn cancelled(&self) {
        let notified = self.0.notify.notified();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

/// Moves everything `reader` yields into `writer`, `chunk_size` bytes at a
/// time, then flushes `writer`.
///
/// Stops with [`TransferError::Cancelled`] at the first chunk boundary after
/// `cancel` is raised. Streams are borrowed; releasing them is up to the
/// caller.
pub fn copy_stream<R, W>(
    reader: &mut R,
    writer: &mut W,
    chunk_size: usize,
    cancel: &CancelFlag,
) -> Result<CopyReport>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
{
    if chunk_size == 0 {
        return Err(TransferError::Config(
            "chunk_size must be greater than zero".into(),
        ));
    }

    let started = Instant::now();
    let mut buffer = vec![0u8; chunk_size];
    let mut bytes: u64 = 0;
    let mut chunks: u64 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(TransferError::Cancelled);
        }

        let length = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(length) => length,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(TransferError::Io(StreamSide::Source, e)),
        };

        writer
            .write_all(&buffer[..length])
            .map_err(|e| TransferError::Io(StreamSide::Destination, e))?;
        bytes += length as u64;
        chunks += 1;
    }

    writer
        .flush()
        .map_err(|e| TransferError::Io(StreamSide::Destination, e))?;

    trace!("{} bytes copied in {} chunks", bytes, chunks);
    Ok(CopyReport {
        bytes,
        chunks,
        elapsed: started.elapsed(),
    })
}
