//! Hub error types.
//!
//! Comprehensive error handling for all Data Hub operations.

use std::io;
use std::sync::Arc;
use thiserror::Error;

/// Main error type for Data Hub operations.
#[derive(Error, Debug, Clone)]
pub enum HubError {
    /// The writer attempted to close a stream that was already closed.
    #[error("stream already closed")]
    StreamAlreadyClosed,

    /// The writer attempted to append to a stream after it was closed.
    #[error("stream closed for writing")]
    StreamClosedForWriting,

    /// A blocked read was cancelled before data or closure arrived.
    #[error("read cancelled")]
    Cancelled,

    /// An I/O error occurred while pumping bytes from the upstream source.
    #[error("io error: {0}")]
    Io(Arc<io::Error>),

    /// An upstream-specific error was recorded as the stream's terminal error.
    #[error("upstream error: {0}")]
    Upstream(Arc<dyn std::error::Error + Send + Sync>),
}

/// Result type alias for Data Hub operations.
pub type Result<T> = std::result::Result<T, HubError>;

impl HubError {
    /// Wraps an arbitrary upstream error as a stream's terminal error.
    pub fn upstream(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Upstream(Arc::new(err))
    }

    /// Check if this error is recoverable by retrying the same read.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }

    /// Check if this is a terminal stream-lifecycle error (as opposed to an
    /// upstream-origin error recorded via [`HubError::upstream`]).
    #[must_use]
    pub const fn is_lifecycle_error(&self) -> bool {
        matches!(
            self,
            Self::StreamAlreadyClosed | Self::StreamClosedForWriting | Self::Cancelled
        )
    }
}

impl From<io::Error> for HubError {
    fn from(err: io::Error) -> Self {
        Self::Io(Arc::new(err))
    }
}
