//! A single reader's cursor into a Data Hub stream.
//!
//! Any number of [`StreamReader`]s may exist for the same stream, each
//! tracking its own `(segment_index, byte_offset)` position. A reader that
//! outruns the writer blocks on the stream's wakeup event; a reader that
//! falls behind simply resumes from its own cursor, unaffected by peers.

use std::sync::Arc;

use crate::cancel::CancelToken;
use crate::error::{HubError, Result};
use crate::registry::HubRegistry;
use crate::stream::{ReadOutcome, Stream};

/// Read handle for a stream. Drop releases it automatically, but callers
/// that want the registry's retirement check to run promptly (rather than
/// whenever the value happens to be dropped) should call
/// [`StreamReader::release`] explicitly.
pub struct StreamReader {
    stream: Arc<Stream>,
    registry: Arc<HubRegistry>,
    key: Arc<str>,
    segment_index: usize,
    byte_offset: usize,
    /// Whether the stream's terminal error, if any, has already been
    /// surfaced to this specific reader. A terminal error is delivered
    /// exactly once per reader; subsequent reads past it report a clean
    /// end-of-stream (`Ok(0)`), mirroring how a normal `Ok(0)` is never
    /// repeated as an error either.
    terminal_delivered: bool,
    released: bool,
}

impl StreamReader {
    pub(crate) fn new(stream: Arc<Stream>, registry: Arc<HubRegistry>, key: Arc<str>) -> Self {
        stream.register_reader();
        Self {
            stream,
            registry,
            key,
            segment_index: 0,
            byte_offset: 0,
            terminal_delivered: false,
            released: false,
        }
    }

    /// Reads into `dst`, blocking if the cursor has caught up to the
    /// writer. Returns `Ok(0)` at a clean end-of-stream, or the stream's
    /// terminal error the first (and only the first) time this reader
    /// observes it.
    pub async fn read(&mut self, dst: &mut [u8]) -> Result<usize> {
        self.read_inner(dst, None).await
    }

    /// Like [`StreamReader::read`], but a blocked read also races against
    /// `cancel`: if `cancel` fires before data or closure arrives, this
    /// returns [`HubError::Cancelled`] without advancing the cursor, so a
    /// retried read with a fresh token resumes from the same position.
    pub async fn read_cancellable(&mut self, dst: &mut [u8], cancel: &CancelToken) -> Result<usize> {
        self.read_inner(dst, Some(cancel)).await
    }

    async fn read_inner(&mut self, dst: &mut [u8], cancel: Option<&CancelToken>) -> Result<usize> {
        loop {
            match self.stream.try_read_at(self.segment_index, self.byte_offset, dst) {
                ReadOutcome::Data {
                    copied,
                    next_segment_index,
                    next_byte_offset,
                } => {
                    self.segment_index = next_segment_index;
                    self.byte_offset = next_byte_offset;
                    return Ok(copied);
                }
                ReadOutcome::Closed { terminal_error } => {
                    return match terminal_error {
                        Some(err) if !self.terminal_delivered => {
                            self.terminal_delivered = true;
                            Err((*err).clone())
                        }
                        _ => Ok(0),
                    };
                }
                ReadOutcome::Pending => {
                    if let Some(cancel) = cancel {
                        if cancel.is_cancelled() {
                            return Err(HubError::Cancelled);
                        }
                    }

                    // Register before re-checking: a notification fired
                    // between the `try_read_at` above and `listen` here
                    // would otherwise be missed.
                    let listener = self.stream.listen();
                    if let ReadOutcome::Pending =
                        self.stream.try_read_at(self.segment_index, self.byte_offset, dst)
                    {
                        match cancel {
                            None => listener.await,
                            Some(cancel) => {
                                use futures::future::{select, Either};
                                match select(listener, Box::pin(cancel.cancelled())).await {
                                    Either::Left(_) => {}
                                    Either::Right(_) => return Err(HubError::Cancelled),
                                }
                            }
                        }
                    }
                }
            }
        }
    }

    /// Detaches this reader from the stream, allowing the registry to
    /// retire it once the writer has also closed. Idempotent.
    pub fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.stream.release_reader();
        self.registry.retire_if_discardable(&self.key);
    }
}

impl Drop for StreamReader {
    fn drop(&mut self) {
        self.release();
    }
}
