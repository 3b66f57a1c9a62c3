//! Imcaxy Core
//!
//! The Data Hub kernel: an in-memory, append-only, multi-reader byte log
//! with single-fetch semantics.
//!
//! - Append-only storage addressable by cursor (`segment_log`)
//! - Shared stream state + wakeup event (`stream`)
//! - Single-writer handle (`writer`)
//! - Any-number-of-readers handle (`reader`)
//! - Coalescing registry keyed by request fingerprint (`registry`)
//! - Retirement policy (`lifecycle`)
//! - Runtime-agnostic cancellation signal (`cancel`)
//! - Error types (`error`)

#![deny(unsafe_code)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]

pub mod cancel;
pub mod error;
pub mod lifecycle;
pub mod reader;
pub mod registry;
pub mod segment_log;
pub mod stream;
pub mod writer;

/// A small prelude to make downstream crates ergonomic.
pub mod prelude {
    pub use crate::cancel::CancelToken;
    pub use crate::error::{HubError, Result};
    pub use crate::reader::StreamReader;
    pub use crate::registry::HubRegistry;
    pub use crate::writer::StreamWriter;
}
