//! Processor Driver: fingerprints a request, resolves a cache hit or
//! spawns the upstream job that feeds a fresh hub stream, and hands back
//! exactly one [`StreamReader`] per caller.

use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use imcaxy_core::error::HubError;
use imcaxy_core::reader::StreamReader;
use imcaxy_core::registry::HubRegistry;
use imcaxy_core::writer::StreamWriter;
use tracing::{debug, warn};

use crate::cache::{CacheDescriptor, CacheIndex};
use crate::error::{ProxyError, Result};
use crate::fingerprint::{Fingerprinter, ParsedRequest};
use crate::upstream::{check_contract, AsyncByteSource, UpstreamProcessor};

/// Drives requests end to end: fingerprint → cache lookup → hub stream.
pub struct ProcessorDriver {
    registry: Arc<HubRegistry>,
    cache: Arc<dyn CacheIndex>,
    upstream: Arc<dyn UpstreamProcessor>,
    fingerprinter: Fingerprinter,
}

impl ProcessorDriver {
    #[must_use]
    pub fn new(
        registry: Arc<HubRegistry>,
        cache: Arc<dyn CacheIndex>,
        upstream: Arc<dyn UpstreamProcessor>,
        fingerprinter: Fingerprinter,
    ) -> Self {
        Self {
            registry,
            cache,
            upstream,
            fingerprinter,
        }
    }

    /// Resolves one request to a reader streaming the processed image.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::UnknownEndpoint`] or
    /// [`ProxyError::MissingSourceUrl`] if the request itself is malformed.
    /// Upstream-contract and stream-lifecycle errors surface later, through
    /// the returned reader, exactly as any other terminal stream error
    /// does.
    pub async fn process(&self, path_and_query: &str) -> Result<StreamReader> {
        let parsed = self.fingerprinter.parse_request(path_and_query)?;

        if let Some(descriptor) = self.cache.lookup(&parsed.fingerprint).await {
            debug!(fingerprint = %parsed.fingerprint, "cache hit");
            return Ok(self.open_cached(descriptor).await);
        }

        debug!(fingerprint = %parsed.fingerprint, "cache miss");
        let (reader, writer, created) = self.registry.get_or_create(parsed.fingerprint.clone());

        if created {
            let writer = writer.expect("creator always receives a writer");
            self.spawn_upstream_job(writer, parsed);
        }

        Ok(reader)
    }

    /// Re-exposes an already-cached artifact through the Hub Registry, so
    /// concurrent duplicate-in-flight reads of the same cached fingerprint
    /// coalesce onto one cache-store read (§4.7 Open Question a).
    async fn open_cached(&self, descriptor: CacheDescriptor) -> StreamReader {
        let (reader, writer, created) = self.registry.get_or_create(descriptor.fingerprint.clone());

        let Some(writer) = writer else {
            return reader;
        };
        if !created {
            return reader;
        }

        match self.cache.open(&descriptor.fingerprint).await {
            Some(mut source) => match pump_into_writer(&writer, source.as_mut()).await {
                Ok(_) => {
                    let _ = writer.close(None);
                }
                Err(e) => {
                    warn!(fingerprint = %descriptor.fingerprint, error = %e, "cached artifact read failed");
                    let _ = writer.close(Some(e));
                }
            },
            None => {
                warn!(fingerprint = %descriptor.fingerprint, "cache descriptor present but bytes are gone");
                let _ = writer.close(Some(HubError::from(std::io::Error::from(
                    std::io::ErrorKind::NotFound,
                ))));
            }
        }

        reader
    }

    /// Spawns the background task that drives the upstream processor into
    /// `writer` and, on success, publishes the result to the cache.
    fn spawn_upstream_job(&self, writer: StreamWriter, parsed: ParsedRequest) {
        let upstream = self.upstream.clone();
        let cache = self.cache.clone();
        let processor_identity = self.fingerprinter.processor_identity().to_string();

        compio::runtime::spawn(async move {
            run_upstream_job(writer, parsed, processor_identity, upstream, cache).await;
        })
        .detach();
    }
}

async fn run_upstream_job(
    writer: StreamWriter,
    parsed: ParsedRequest,
    processor_identity: String,
    upstream: Arc<dyn UpstreamProcessor>,
    cache: Arc<dyn CacheIndex>,
) {
    let response = match upstream
        .fetch(&parsed.endpoint, &parsed.params, &parsed.source_url)
        .await
    {
        Ok(response) => response,
        Err(e) => {
            warn!(fingerprint = %parsed.fingerprint, error = %e, "upstream fetch failed");
            let _ = writer.close(Some(HubError::upstream(ProxyErrorSource(e))));
            return;
        }
    };

    if let Err(e) = check_contract(&response) {
        warn!(fingerprint = %parsed.fingerprint, error = %e, "upstream violated response contract");
        let _ = writer.close(Some(HubError::upstream(ProxyErrorSource(e))));
        return;
    }

    let content_type = response.content_type.clone().unwrap_or_default();
    let mut body = response.body;

    match pump_into_writer(&writer, body.as_mut()).await {
        Ok(bytes) => {
            let _ = writer.close(None);
            let byte_length = bytes.len() as u64;
            cache
                .publish(
                    CacheDescriptor {
                        fingerprint: parsed.fingerprint.clone(),
                        source_url: parsed.source_url.clone(),
                        processor_identity,
                        content_type,
                        byte_length,
                        storage_locator: format!("mem://{}", parsed.fingerprint),
                    },
                    bytes,
                )
                .await;
        }
        Err(e) => {
            warn!(fingerprint = %parsed.fingerprint, error = %e, "upstream body read failed mid-stream");
            let _ = writer.close(Some(e));
        }
    }
}

/// Size of the staging buffer used while teeing a byte source into both a
/// hub stream and a local accumulator (for cache publication).
const STAGING_SIZE: usize = 64 * 1024;

/// Pumps `source` into `writer`, accumulating every chunk so the caller can
/// publish the complete bytes to the cache on success. Returns the
/// accumulated bytes on a clean end-of-source, or the first error
/// encountered (read or write).
async fn pump_into_writer(writer: &StreamWriter, source: &mut dyn AsyncByteSource) -> std::result::Result<Bytes, HubError> {
    let mut accumulated = BytesMut::new();
    let mut staging = vec![0u8; STAGING_SIZE];

    loop {
        let n = source.read(&mut staging).await.map_err(HubError::from)?;
        if n == 0 {
            return Ok(accumulated.freeze());
        }
        let chunk = Bytes::copy_from_slice(&staging[..n]);
        writer.write(chunk.clone())?;
        accumulated.extend_from_slice(&chunk);
    }
}

/// Adapts a [`ProxyError`] into a `std::error::Error` so it can travel as
/// a hub stream's terminal error, which is typed over the core's
/// `HubError` rather than the proxy layer's.
#[derive(Debug)]
struct ProxyErrorSource(ProxyError);

impl std::fmt::Display for ProxyErrorSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ProxyErrorSource {}
