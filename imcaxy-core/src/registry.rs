//! Stream registry: the coalescing point of the Data Hub.
//!
//! Concurrent callers asking for the same key race to create the backing
//! [`crate::stream::Stream`]; `DashMap`'s `entry` API serializes access to
//! the shard holding that key, so exactly one caller observes
//! `created == true` and receives the [`crate::writer::StreamWriter`] —
//! every other concurrent (or later) caller just joins as a reader of the
//! stream the winner is about to fill in.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::reader::StreamReader;
use crate::stream::Stream;
use crate::writer::StreamWriter;

/// Shared registry of in-flight and recently-completed streams, keyed by
/// request fingerprint.
#[derive(Default)]
pub struct HubRegistry {
    streams: DashMap<Arc<str>, Arc<Stream>>,
}

impl HubRegistry {
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns a reader for `key`, creating the stream if it doesn't exist
    /// yet. The writer is returned only to the caller that actually
    /// created the stream (`created == true` in the returned tuple) —
    /// every concurrent joiner gets `None` and is expected to drive the
    /// stream purely by reading.
    pub fn get_or_create(
        self: &Arc<Self>,
        key: impl Into<Arc<str>>,
    ) -> (StreamReader, Option<StreamWriter>, bool) {
        let key: Arc<str> = key.into();

        let (stream, created) = match self.streams.entry(key.clone()) {
            Entry::Occupied(entry) => (entry.get().clone(), false),
            Entry::Vacant(entry) => {
                let stream = Stream::new();
                entry.insert(stream.clone());
                (stream, true)
            }
        };

        let reader = StreamReader::new(stream.clone(), self.clone(), key.clone());
        let writer = created.then(|| StreamWriter::new(stream, self.clone(), key));

        (reader, writer, created)
    }

    /// Looks up an existing stream's reader without creating one. Returns
    /// `None` if no stream is registered under `key`.
    pub fn get(self: &Arc<Self>, key: &str) -> Option<StreamReader> {
        let entry = self.streams.get(key)?;
        let stream = entry.clone();
        drop(entry);
        Some(StreamReader::new(stream, self.clone(), Arc::from(key)))
    }

    /// Removes `key` from the registry if its stream is closed and has no
    /// readers attached. Called after every writer close and reader
    /// release; a no-op otherwise.
    pub(crate) fn retire_if_discardable(&self, key: &str) {
        let Some(entry) = self.streams.get(key) else {
            return;
        };
        if !entry.is_discardable() {
            return;
        }
        drop(entry);
        self.streams.remove(key);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn first_caller_creates_and_later_callers_join() {
        let registry = HubRegistry::new();

        let (_reader1, writer1, created1) = registry.get_or_create("img-1");
        assert!(created1);
        assert!(writer1.is_some());

        let (_reader2, writer2, created2) = registry.get_or_create("img-1");
        assert!(!created2);
        assert!(writer2.is_none());

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn retiring_removes_a_fully_drained_closed_stream() {
        let registry = HubRegistry::new();

        let (mut reader, writer, _created) = registry.get_or_create("img-2");
        let writer = writer.expect("creator gets the writer");

        writer.write(Bytes::from_static(b"hi")).unwrap();
        writer.close(None).unwrap();

        let mut buf = [0u8; 8];
        compio::runtime::Runtime::new().unwrap().block_on(async {
            assert_eq!(reader.read(&mut buf).await.unwrap(), 2);
            assert_eq!(reader.read(&mut buf).await.unwrap(), 0);
        });

        assert_eq!(registry.len(), 1, "reader still attached until released");
        reader.release();
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn retiring_an_unknown_key_is_a_no_op_not_a_panic() {
        let registry = HubRegistry::new();
        registry.retire_if_discardable("no-such-key");
        assert_eq!(registry.len(), 0);
    }
}
