//! Runtime-agnostic cancellation signal for a blocked read.
//!
//! `compio` has no shared cancellation-token type at the version this
//! workspace vendors, so this mirrors `stream.rs`'s own wakeup primitive
//! (`event_listener::Event`) rather than pull in a second broadcast
//! mechanism for the same idea.

use std::sync::atomic::{AtomicBool, Ordering};

use event_listener::{Event, IntoNotification};

/// A cooperative cancellation signal. Cloning a `CancelToken` is not
/// supported — share it behind an `Arc` the way callers share a `Stream`.
#[derive(Default)]
pub struct CancelToken {
    cancelled: AtomicBool,
    event: Event,
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks this token cancelled and wakes every waiter. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.event.notify(usize::MAX.additional());
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`CancelToken::cancel`] has been called. Resolves
    /// immediately if it already has.
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        let listener = self.event.listen();
        if !self.is_cancelled() {
            listener.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_resolves_immediately_once_cancel_has_already_been_called() {
        compio::runtime::Runtime::new().unwrap().block_on(async {
            let token = CancelToken::new();
            token.cancel();
            assert!(token.is_cancelled());
            token.cancelled().await;
        });
    }

    #[test]
    fn cancel_is_idempotent() {
        let token = CancelToken::new();
        token.cancel();
        token.cancel();
        assert!(token.is_cancelled());
    }
}
