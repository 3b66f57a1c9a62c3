//! Upstream Processor: the boundary interface the Processor Driver drives
//! to obtain processed image bytes.
//!
//! The trait is deliberately narrower than `compio::io::AsyncRead` (whose
//! buffer-generic `read` is not object-safe) so a response body can be
//! boxed and handed to the driver regardless of which transport produced
//! it — this is the same "mock the transport, not the client" shape used
//! by the original Go test suite's `httpRequestFunc`.

use async_trait::async_trait;

use crate::error::{ProxyError, Result};

/// A narrow, object-safe async byte source. Exists so `UpstreamResponse`
/// can carry a boxed trait object body without depending on a
/// buffer-generic `AsyncRead` signature.
#[async_trait]
pub trait AsyncByteSource: Send {
    /// Reads into `buf`, returning the number of bytes read. `Ok(0)` means
    /// clean end-of-body.
    async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;
}

/// The response the driver checks against the upstream contract before
/// forwarding a single byte.
pub struct UpstreamResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub content_length: Option<u64>,
    pub body: Box<dyn AsyncByteSource>,
}

/// Drives an upstream processing service for one `(endpoint, params,
/// source_url)` request.
#[async_trait]
pub trait UpstreamProcessor: Send + Sync {
    async fn fetch(
        &self,
        endpoint: &str,
        params: &[(String, String)],
        source_url: &str,
    ) -> Result<UpstreamResponse>;
}

/// Validates an [`UpstreamResponse`] against the contract from §4.7: status
/// 200, non-empty `Content-Type`, positive parseable `Content-Length`. All
/// three checks happen before any bytes are forwarded.
pub fn check_contract(response: &UpstreamResponse) -> Result<()> {
    if response.status != 200 {
        return Err(ProxyError::ResponseStatusNotOk(response.status));
    }

    match &response.content_type {
        Some(ct) if !ct.is_empty() => {}
        _ => return Err(ProxyError::UnknownContentType),
    }

    match response.content_length {
        Some(len) if len > 0 => {}
        _ => return Err(ProxyError::UnknownContentLength),
    }

    Ok(())
}

#[cfg(feature = "http-upstream")]
pub mod http {
    use async_trait::async_trait;
    use bytes::Bytes;

    use super::{AsyncByteSource, UpstreamProcessor, UpstreamResponse};
    use crate::error::{ProxyError, Result};

    /// [`UpstreamProcessor`] backed by a real HTTP client.
    pub struct HttpUpstreamProcessor {
        client: reqwest::Client,
        base_url: String,
    }

    impl HttpUpstreamProcessor {
        #[must_use]
        pub fn new(base_url: impl Into<String>) -> Self {
            Self {
                client: reqwest::Client::new(),
                base_url: base_url.into(),
            }
        }
    }

    #[async_trait]
    impl UpstreamProcessor for HttpUpstreamProcessor {
        async fn fetch(
            &self,
            endpoint: &str,
            params: &[(String, String)],
            source_url: &str,
        ) -> Result<UpstreamResponse> {
            let mut url = url::Url::parse(&format!("{}{}", self.base_url, endpoint))
                .map_err(|_| ProxyError::UnknownEndpoint(endpoint.to_string()))?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("url", source_url);
                for (name, value) in params {
                    if name != "url" {
                        query.append_pair(name, value);
                    }
                }
            }

            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| ProxyError::Hub(imcaxy_core::error::HubError::upstream(HttpError(e))))?;

            let status = response.status().as_u16();
            let content_type = response
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let content_length = response.content_length();

            Ok(UpstreamResponse {
                status,
                content_type,
                content_length,
                body: Box::new(ReqwestBody {
                    response: Some(response),
                    leftover: Bytes::new(),
                }),
            })
        }
    }

    struct ReqwestBody {
        response: Option<reqwest::Response>,
        leftover: Bytes,
    }

    #[async_trait]
    impl AsyncByteSource for ReqwestBody {
        async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.leftover.is_empty() {
                let Some(response) = self.response.as_mut() else {
                    return Ok(0);
                };
                match response.chunk().await {
                    Ok(Some(chunk)) => self.leftover = chunk,
                    Ok(None) => {
                        self.response = None;
                        return Ok(0);
                    }
                    Err(e) => return Err(std::io::Error::other(e)),
                }
            }

            let n = self.leftover.len().min(buf.len());
            buf[..n].copy_from_slice(&self.leftover[..n]);
            self.leftover = self.leftover.slice(n..);
            Ok(n)
        }
    }

    #[derive(Debug)]
    struct HttpError(reqwest::Error);

    impl std::fmt::Display for HttpError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{}", self.0)
        }
    }

    impl std::error::Error for HttpError {}
}
