//! Proxy-layer error types: request parsing and upstream-contract failures.

use thiserror::Error;

use imcaxy_core::error::HubError;

/// Errors raised by the request-shaping and upstream-driving layer.
#[derive(Error, Debug, Clone)]
pub enum ProxyError {
    /// The request path did not match any configured processing endpoint.
    #[error("unknown processing endpoint: {0}")]
    UnknownEndpoint(String),

    /// The request's query string carried no `url` parameter.
    #[error("missing source image url")]
    MissingSourceUrl,

    /// The upstream processor responded with a non-200 status.
    #[error("upstream responded with non-OK status: {0}")]
    ResponseStatusNotOk(u16),

    /// The upstream processor's response had no (or empty) `Content-Type`.
    #[error("upstream response is missing Content-Type")]
    UnknownContentType,

    /// The upstream processor's response had no parseable, positive
    /// `Content-Length`.
    #[error("upstream response is missing a valid Content-Length")]
    UnknownContentLength,

    /// No cached or in-flight artifact exists for this fingerprint.
    #[error("cache miss")]
    CacheMiss,

    /// A failure originating in the underlying Data Hub stream.
    #[error(transparent)]
    Hub(#[from] HubError),
}

/// Result type alias for proxy-layer operations.
pub type Result<T> = std::result::Result<T, ProxyError>;

impl ProxyError {
    /// Whether this error reflects a caller mistake made before any upstream
    /// work began (as opposed to an upstream or stream-lifecycle failure).
    #[must_use]
    pub const fn is_request_error(&self) -> bool {
        matches!(self, Self::UnknownEndpoint(_) | Self::MissingSourceUrl)
    }

    /// Whether this error reflects the upstream processor violating its
    /// response contract (checked before any bytes are forwarded).
    #[must_use]
    pub const fn is_upstream_contract_error(&self) -> bool {
        matches!(
            self,
            Self::ResponseStatusNotOk(_) | Self::UnknownContentType | Self::UnknownContentLength
        )
    }
}
