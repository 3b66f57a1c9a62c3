//! Shared state behind every `StreamWriter`/`StreamReader` pair.
//!
//! A [`Stream`] is the kernel primitive the Data Hub is built from: one
//! [`crate::segment_log::SegmentedLog`] guarded by a lock, plus an
//! [`event_listener::Event`] used to wake blocked readers on every append
//! and on close. Readers never hold the lock across an `.await` point —
//! they take a short synchronous peek at the log, and only register a
//! listener (and await it) when there is genuinely nothing to read yet.

use std::sync::Arc;

use event_listener::{Event, IntoNotification};
use parking_lot::Mutex;

use crate::error::HubError;
use crate::segment_log::SegmentedLog;

struct StreamInner {
    log: SegmentedLog,
    writer_closed: bool,
    terminal_error: Option<Arc<HubError>>,
    active_readers: usize,
}

/// Outcome of a non-blocking peek at a stream's tail.
pub(crate) enum ReadOutcome {
    /// Bytes were available and copied into the caller's buffer.
    Data {
        copied: usize,
        next_segment_index: usize,
        next_byte_offset: usize,
    },
    /// The cursor is at the tail and the writer is still open: the caller
    /// must register a listener and wait.
    Pending,
    /// The cursor is at the tail and the writer has closed the stream,
    /// optionally with a terminal error.
    Closed { terminal_error: Option<Arc<HubError>> },
}

/// Shared, reference-counted stream state.
pub struct Stream {
    inner: Mutex<StreamInner>,
    ready: Event,
}

impl Stream {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: Mutex::new(StreamInner {
                log: SegmentedLog::new(),
                writer_closed: false,
                terminal_error: None,
                active_readers: 0,
            }),
            ready: Event::new(),
        })
    }

    /// Appends a chunk to the log. Fails if the writer has already closed
    /// the stream.
    pub(crate) fn append(&self, bytes: bytes::Bytes) -> Result<usize, HubError> {
        let n = {
            let mut inner = self.inner.lock();
            if inner.writer_closed {
                return Err(HubError::StreamClosedForWriting);
            }
            inner.log.append(bytes)
        };
        self.ready.notify(usize::MAX.additional());
        Ok(n)
    }

    /// Closes the stream, recording `error` as the terminal error delivered
    /// to readers after the last written byte. Returns an error if the
    /// stream was already closed.
    pub(crate) fn close(&self, error: Option<HubError>) -> Result<(), HubError> {
        {
            let mut inner = self.inner.lock();
            if inner.writer_closed {
                return Err(HubError::StreamAlreadyClosed);
            }
            inner.writer_closed = true;
            inner.terminal_error = error.map(Arc::new);
        }
        self.ready.notify(usize::MAX.additional());
        Ok(())
    }

    pub(crate) fn register_reader(&self) {
        self.inner.lock().active_readers += 1;
    }

    pub(crate) fn release_reader(&self) {
        let mut inner = self.inner.lock();
        inner.active_readers = inner.active_readers.saturating_sub(1);
    }

    #[must_use]
    pub(crate) fn is_discardable(&self) -> bool {
        let inner = self.inner.lock();
        crate::lifecycle::is_discardable(inner.writer_closed, inner.active_readers)
    }

    /// Non-blocking peek: returns `None` only when the caller must register
    /// a listener and wait (cursor at tail, writer still open).
    pub(crate) fn try_read_at(
        &self,
        segment_index: usize,
        byte_offset: usize,
        dst: &mut [u8],
    ) -> ReadOutcome {
        let inner = self.inner.lock();

        if segment_index < inner.log.segment_count() {
            let r = inner.log.read_at(segment_index, byte_offset, dst);
            return ReadOutcome::Data {
                copied: r.copied,
                next_segment_index: r.next_segment_index,
                next_byte_offset: r.next_byte_offset,
            };
        }

        if inner.writer_closed {
            ReadOutcome::Closed {
                terminal_error: inner.terminal_error.clone(),
            }
        } else {
            ReadOutcome::Pending
        }
    }

    /// Registers interest in the stream's `ready` event. Must be called
    /// *before* the caller gives up on a `Pending` result and awaits, to
    /// avoid missing a notification that fires between the peek and the
    /// listen call.
    pub(crate) fn listen(&self) -> event_listener::EventListener {
        self.ready.listen()
    }
}
