//! Stream retirement policy.
//!
//! A stream is safe to remove from the [`crate::registry::HubRegistry`] once
//! its writer has closed it and no reader still holds a handle to it. This
//! is intentionally a pure, synchronous predicate so both
//! [`crate::writer::StreamWriter::close`] and
//! [`crate::reader::StreamReader::release`] can call it without taking on
//! any async or locking concerns of their own.

/// Returns `true` once a stream may be removed from the registry: the
/// writer has closed it, and no reader is still attached.
#[must_use]
pub const fn is_discardable(writer_closed: bool, active_readers: usize) -> bool {
    writer_closed && active_readers == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_stream_is_never_discardable() {
        assert!(!is_discardable(false, 0));
    }

    #[test]
    fn closed_stream_with_readers_attached_is_kept() {
        assert!(!is_discardable(true, 1));
    }

    #[test]
    fn closed_stream_with_no_readers_is_discardable() {
        assert!(is_discardable(true, 0));
    }
}
