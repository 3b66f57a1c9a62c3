//! Integration tests for the Processor Driver (spec scenarios 6-7): an
//! upstream-contract violation never creates a cache entry, and the
//! violation surfaces to the reader as the stream's terminal error.

use std::sync::Arc;

use async_trait::async_trait;
use imcaxy_proxy::cache::{CacheIndex, MemoryCacheIndex};
use imcaxy_proxy::driver::ProcessorDriver;
use imcaxy_proxy::fingerprint::Fingerprinter;
use imcaxy_proxy::upstream::{AsyncByteSource, UpstreamProcessor, UpstreamResponse};
use imcaxy_proxy::error::Result;

struct FixedUpstream {
    status: u16,
    content_type: Option<String>,
    content_length: Option<u64>,
    body: Vec<u8>,
}

struct VecBody {
    data: Vec<u8>,
    pos: usize,
}

#[async_trait]
impl AsyncByteSource for VecBody {
    async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let remaining = &self.data[self.pos..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }
}

#[async_trait]
impl UpstreamProcessor for FixedUpstream {
    async fn fetch(&self, _endpoint: &str, _params: &[(String, String)], _source_url: &str) -> Result<UpstreamResponse> {
        Ok(UpstreamResponse {
            status: self.status,
            content_type: self.content_type.clone(),
            content_length: self.content_length,
            body: Box::new(VecBody {
                data: self.body.clone(),
                pos: 0,
            }),
        })
    }
}

fn driver(upstream: FixedUpstream) -> (ProcessorDriver, Arc<MemoryCacheIndex>) {
    let registry = imcaxy_core::registry::HubRegistry::new();
    let cache = Arc::new(MemoryCacheIndex::new());
    let fingerprinter = Fingerprinter::new(vec!["/crop".to_string()], "imaginary");
    let driver = ProcessorDriver::new(registry, cache.clone(), Arc::new(upstream), fingerprinter);
    (driver, cache)
}

#[test]
fn non_ok_status_surfaces_as_terminal_error_and_publishes_nothing() {
    compio::runtime::Runtime::new().unwrap().block_on(async {
        let (driver, cache) = driver(FixedUpstream {
            status: 500,
            content_type: Some("text/plain".to_string()),
            content_length: Some(11),
            body: b"server died".to_vec(),
        });

        let mut reader = driver.process("/crop?url=http://x/i.jpg").await.unwrap();

        let mut buf = [0u8; 16];
        let err = reader.read(&mut buf).await.unwrap_err();
        assert!(err.to_string().contains("non-OK") || err.to_string().contains("500"));

        assert!(cache.lookup("anything").await.is_none());
        assert_eq!(cache.lookup_by_source("http://x/i.jpg").await.len(), 0);
    });
}

#[test]
fn missing_content_type_surfaces_before_any_bytes_forwarded() {
    compio::runtime::Runtime::new().unwrap().block_on(async {
        let (driver, cache) = driver(FixedUpstream {
            status: 200,
            content_type: None,
            content_length: Some(3),
            body: b"abc".to_vec(),
        });

        let mut reader = driver.process("/crop?url=http://x/i.jpg").await.unwrap();

        let mut buf = [0u8; 16];
        let err = reader.read(&mut buf).await.unwrap_err();
        assert!(err.to_string().contains("Content-Type"));

        assert_eq!(cache.lookup_by_source("http://x/i.jpg").await.len(), 0);
    });
}

#[test]
fn successful_fetch_reaches_every_coalesced_reader_and_publishes_once() {
    compio::runtime::Runtime::new().unwrap().block_on(async {
        let (driver, cache) = driver(FixedUpstream {
            status: 200,
            content_type: Some("image/jpeg".to_string()),
            content_length: Some(6),
            body: b"abcdef".to_vec(),
        });

        let mut reader_a = driver.process("/crop?url=http://x/i.jpg").await.unwrap();
        let mut reader_b = driver.process("/crop?url=http://x/i.jpg").await.unwrap();

        let mut buf = [0u8; 16];
        let n_a = reader_a.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n_a], b"abcdef");
        assert_eq!(reader_a.read(&mut buf).await.unwrap(), 0);

        let n_b = reader_b.read(&mut buf).await.unwrap();
        assert_eq!(&buf[..n_b], b"abcdef");

        let descriptors = cache.lookup_by_source("http://x/i.jpg").await;
        assert_eq!(descriptors.len(), 1);
    });
}
