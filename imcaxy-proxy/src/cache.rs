//! Cache Index: the boundary interface between the Processor Driver and
//! whatever persists finalized artifacts. The core does not assume a
//! specific backing store — `MemoryCacheIndex` is the in-process reference
//! implementation used by tests and as a default.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;

use crate::upstream::AsyncByteSource;

/// A descriptor of one cached, finalized artifact. `storage_locator` is
/// opaque to this crate — it is the object-storage adapter's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheDescriptor {
    pub fingerprint: String,
    pub source_url: String,
    pub processor_identity: String,
    pub content_type: String,
    pub byte_length: u64,
    pub storage_locator: String,
}

/// Mapping from request fingerprint to a descriptor of a cached artifact.
///
/// Implementations need not be durable; the Processor Driver treats a
/// `lookup` miss and a backend outage identically (both are "go fetch it").
#[async_trait]
pub trait CacheIndex: Send + Sync {
    /// Looks up the descriptor for an exact fingerprint match.
    async fn lookup(&self, fingerprint: &str) -> Option<CacheDescriptor>;

    /// Publishes a finalized descriptor together with its bytes. Called
    /// only after a stream has closed with no terminal error — never
    /// speculatively. The interface's materialized-`Bytes` shape (rather
    /// than a generic streaming sink) reflects that only the in-memory
    /// reference backend is provided here; a real object-storage adapter
    /// is out of scope (§1/§6).
    async fn publish(&self, descriptor: CacheDescriptor, bytes: Bytes);

    /// Opens a byte source for a previously published fingerprint, used to
    /// re-expose a cache hit through a hub stream (§4.7 Open Question a).
    /// Returns `None` if the descriptor is known but its bytes are no
    /// longer available.
    async fn open(&self, fingerprint: &str) -> Option<Box<dyn AsyncByteSource>>;

    /// Returns every descriptor derived from `source_url`, regardless of
    /// processing parameters. Supplements the original `lookup`/`publish`
    /// pair with the original system's `GetCachedImageInfosOfSource` query.
    async fn lookup_by_source(&self, source_url: &str) -> Vec<CacheDescriptor>;
}

/// In-memory `CacheIndex`, keyed by fingerprint, holding both the
/// descriptor and its bytes so reads never leave the process.
#[derive(Default)]
pub struct MemoryCacheIndex {
    entries: DashMap<String, (CacheDescriptor, Bytes)>,
}

impl MemoryCacheIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the bytes published for `fingerprint`, if any.
    #[must_use]
    pub fn bytes_of(&self, fingerprint: &str) -> Option<Bytes> {
        self.entries.get(fingerprint).map(|e| e.1.clone())
    }
}

#[async_trait]
impl CacheIndex for MemoryCacheIndex {
    async fn lookup(&self, fingerprint: &str) -> Option<CacheDescriptor> {
        self.entries.get(fingerprint).map(|e| e.0.clone())
    }

    async fn publish(&self, descriptor: CacheDescriptor, bytes: Bytes) {
        self.entries.insert(descriptor.fingerprint.clone(), (descriptor, bytes));
    }

    async fn open(&self, fingerprint: &str) -> Option<Box<dyn AsyncByteSource>> {
        let data = self.bytes_of(fingerprint)?;
        Some(Box::new(BytesSource { data, pos: 0 }))
    }

    async fn lookup_by_source(&self, source_url: &str) -> Vec<CacheDescriptor> {
        self.entries
            .iter()
            .filter(|e| e.value().0.source_url == source_url)
            .map(|e| e.value().0.clone())
            .collect()
    }
}

/// One-shot [`AsyncByteSource`] over an already-materialized buffer.
struct BytesSource {
    data: Bytes,
    pos: usize,
}

#[async_trait]
impl AsyncByteSource for BytesSource {
    async fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let remaining = &self.data[self.pos..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(fingerprint: &str, source_url: &str) -> CacheDescriptor {
        CacheDescriptor {
            fingerprint: fingerprint.to_string(),
            source_url: source_url.to_string(),
            processor_identity: "imaginary".to_string(),
            content_type: "image/jpeg".to_string(),
            byte_length: 3,
            storage_locator: format!("mem://{fingerprint}"),
        }
    }

    #[test]
    fn publish_then_lookup_round_trips() {
        compio::runtime::Runtime::new().unwrap().block_on(async {
            let cache = MemoryCacheIndex::new();
            assert!(cache.lookup("fp1").await.is_none());

            cache
                .publish(descriptor("fp1", "http://x/i.jpg"), Bytes::from_static(b"abc"))
                .await;

            let found = cache.lookup("fp1").await.unwrap();
            assert_eq!(found.fingerprint, "fp1");
            assert_eq!(cache.bytes_of("fp1").unwrap(), Bytes::from_static(b"abc"));
        });
    }

    #[test]
    fn lookup_by_source_returns_every_variant_of_one_source() {
        compio::runtime::Runtime::new().unwrap().block_on(async {
            let cache = MemoryCacheIndex::new();
            cache
                .publish(descriptor("fp-crop", "http://x/i.jpg"), Bytes::from_static(b"a"))
                .await;
            cache
                .publish(descriptor("fp-resize", "http://x/i.jpg"), Bytes::from_static(b"b"))
                .await;
            cache
                .publish(descriptor("fp-other", "http://y/i.jpg"), Bytes::from_static(b"c"))
                .await;

            let mut found: Vec<String> = cache
                .lookup_by_source("http://x/i.jpg")
                .await
                .into_iter()
                .map(|d| d.fingerprint)
                .collect();
            found.sort();

            assert_eq!(found, vec!["fp-crop".to_string(), "fp-resize".to_string()]);
        });
    }
}
