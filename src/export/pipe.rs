//! Backpressured byte conduit between the export thread and the HTTP body.
//!
//! The writer half is a blocking [`std::io::Write`] meant for a
//! `spawn_blocking` thread; the reader half is an async [`Stream`] of chunks.
//! The channel holds at most `capacity` chunks, so the producer never runs
//! further ahead of the consumer than that.

use std::{
    fmt, io,
    pin::Pin,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    task::{Context, Poll},
};

use bytes::Bytes;
use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

/// The reader end went away before the archive was complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConsumerClosed;

impl fmt::Display for ConsumerClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("archive stream closed by consumer")
    }
}

impl std::error::Error for ConsumerClosed {}

/// True if `err` is the write failure caused by the reader closing.
pub fn is_consumer_closed(err: &io::Error) -> bool {
    err.get_ref().is_some_and(|inner| inner.is::<ConsumerClosed>())
}

fn consumer_closed() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, ConsumerClosed)
}

/// Creates a connected writer/reader pair holding at most `capacity` chunks.
pub fn pipe(capacity: usize) -> (PipeWriter, ArchiveStream) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let finished = Arc::new(AtomicBool::new(false));
    (
        PipeWriter { tx, finished: finished.clone(), bytes_written: 0 },
        ArchiveStream { inner: ReceiverStream::new(rx), finished, done: false },
    )
}

/// Producer half. Dropping it without [`PipeWriter::finish`] or
/// [`PipeWriter::close_with_error`] ends the stream with an error.
pub struct PipeWriter {
    tx: mpsc::Sender<io::Result<Bytes>>,
    finished: Arc<AtomicBool>,
    bytes_written: u64,
}

impl PipeWriter {
    /// Total bytes accepted by the consumer side so far.
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    /// Ends the stream cleanly; the reader sees end-of-stream after the last chunk.
    pub fn finish(self) {
        self.finished.store(true, Ordering::Release);
    }

    /// Ends the stream with `err` as the reader's final item.
    ///
    /// Blocks until the consumer has room for it, or returns at once if the
    /// consumer is already gone.
    pub fn close_with_error(self, err: io::Error) {
        let _ = self.tx.blocking_send(Err(err));
    }
}

impl io::Write for PipeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.tx.blocking_send(Ok(Bytes::copy_from_slice(buf))).map_err(|_| consumer_closed())?;
        self.bytes_written += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.tx.is_closed() {
            return Err(consumer_closed());
        }
        Ok(())
    }
}

/// Consumer half, an async stream of archive chunks.
///
/// The stream ends without error only if the producer finished the archive.
pub struct ArchiveStream {
    inner: ReceiverStream<io::Result<Bytes>>,
    finished: Arc<AtomicBool>,
    done: bool,
}

impl fmt::Debug for ArchiveStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArchiveStream")
            .field("finished", &self.finished.load(Ordering::Acquire))
            .field("done", &self.done)
            .finish_non_exhaustive()
    }
}

impl ArchiveStream {
    /// Stops accepting data. Pending and later producer writes fail with
    /// [`ConsumerClosed`]. Chunks already buffered can still be drained.
    pub fn close(&mut self) {
        self.inner.close();
    }
}

impl Stream for ArchiveStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }
        match Pin::new(&mut self.inner).poll_next(cx) {
            Poll::Ready(Some(Err(e))) => {
                self.done = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                self.done = true;
                if self.finished.load(Ordering::Acquire) {
                    Poll::Ready(None)
                } else {
                    Poll::Ready(Some(Err(io::Error::other("archive export terminated unexpectedly"))))
                }
            }
            other => other,
        }
    }
}
