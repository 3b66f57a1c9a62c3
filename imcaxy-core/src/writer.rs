//! The single-writer half of a Data Hub stream.
//!
//! Exactly one [`StreamWriter`] exists per stream: it is handed back only
//! to the caller whose [`crate::registry::HubRegistry::get_or_create`] call
//! actually created the stream. There is no `Clone` impl — a second writer
//! for the same key is a logic error the type system should catch.

use std::sync::Arc;

use bytes::Bytes;
use compio::buf::BufResult;
use compio::io::{AsyncRead, AsyncReadExt};

use crate::error::{HubError, Result};
use crate::registry::HubRegistry;
use crate::stream::Stream;

/// Size of the staging buffer used by [`StreamWriter::read_from`].
const STAGING_SIZE: usize = 64 * 1024;

/// Write handle for a stream, held by the single task responsible for
/// feeding it bytes from an upstream source.
pub struct StreamWriter {
    stream: Arc<Stream>,
    registry: Arc<HubRegistry>,
    key: Arc<str>,
}

impl StreamWriter {
    pub(crate) fn new(stream: Arc<Stream>, registry: Arc<HubRegistry>, key: Arc<str>) -> Self {
        Self {
            stream,
            registry,
            key,
        }
    }

    /// Appends `bytes` to the stream. Every reader blocked at the tail is
    /// woken.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::StreamClosedForWriting`] if `close` was already
    /// called.
    pub fn write(&self, bytes: Bytes) -> Result<usize> {
        self.stream.append(bytes)
    }

    /// Pumps `source` into the stream until it reports clean end-of-stream
    /// (`Ok(0)`), returning the total number of bytes transferred.
    ///
    /// A read error (including a genuine `UnexpectedEof`, which — unlike a
    /// clean `Ok(0)` — is a real I/O error) is forwarded to the caller
    /// without being written to the stream; the caller decides whether to
    /// record it as the stream's terminal error via [`StreamWriter::close`].
    pub async fn read_from<R>(&self, mut source: R) -> Result<u64>
    where
        R: AsyncRead + Unpin,
    {
        let mut total = 0u64;
        loop {
            let buf = vec![0u8; STAGING_SIZE];
            let BufResult(res, buf) = source.read(buf).await;
            match res {
                Ok(0) => return Ok(total),
                Ok(n) => {
                    self.write(Bytes::copy_from_slice(&buf[..n]))?;
                    total += n as u64;
                }
                Err(e) => return Err(HubError::from(e)),
            }
        }
    }

    /// Closes the stream for writing. `error`, if given, becomes the
    /// terminal error delivered once to every reader that is still at the
    /// tail when it arrives.
    ///
    /// # Errors
    ///
    /// Returns [`HubError::StreamAlreadyClosed`] if called more than once.
    pub fn close(&self, error: Option<HubError>) -> Result<()> {
        self.stream.close(error)?;
        self.registry.retire_if_discardable(&self.key);
        Ok(())
    }
}
