//! # Imcaxy
//!
//! An in-memory, multi-reader streaming image-processing proxy: many
//! concurrent requests for the same `(endpoint, params, source_url)` share
//! exactly one fetch from the upstream processing service, fan out to every
//! requester as bytes arrive, and the finished result is handed to a cache
//! index for later direct serving.
//!
//! ## Architecture
//!
//! - **`imcaxy-core`**: the Data Hub kernel — an append-only, multi-reader
//!   byte log with single-writer/many-reader coalescing.
//! - **`imcaxy-proxy`**: request fingerprinting, the Cache Index and
//!   Upstream Processor boundary interfaces, and the driver that resolves a
//!   request to a hub stream.
//! - **`imcaxy`** (this crate): wires the two together into a
//!   [`ProcessorDriver`] from a [`Config`], and optionally stands up a demo
//!   HTTP front end behind the `server` feature.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! # #[cfg(feature = "http-upstream")]
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use imcaxy::config::Config;
//!
//! let config = Config::default().with_upstream_base_url("http://processor.internal:9000");
//! let driver = imcaxy::build_driver(&config);
//!
//! let mut reader = driver.process("/crop?url=http://example.com/cat.jpg&w=200").await?;
//! let mut buf = [0u8; 4096];
//! loop {
//!     let n = reader.read(&mut buf).await?;
//!     if n == 0 {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::future_not_send)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]

// Re-export core types so downstream crates rarely need a direct
// dependency on `imcaxy-core`/`imcaxy-proxy`.
pub use bytes::Bytes;
pub use imcaxy_core::error::{HubError, Result as HubResult};
pub use imcaxy_core::reader::StreamReader;
pub use imcaxy_proxy::driver::ProcessorDriver;
pub use imcaxy_proxy::error::{ProxyError, Result};

pub mod config;

/// Development helpers (benches/tests).
pub mod dev_tracing;

#[cfg(feature = "server")]
pub mod server;

use std::sync::Arc;

use config::Config;
use imcaxy_core::registry::HubRegistry;
use imcaxy_proxy::cache::MemoryCacheIndex;
use imcaxy_proxy::fingerprint::Fingerprinter;

/// Builds a fully-wired [`ProcessorDriver`] from `config`: a fresh
/// [`HubRegistry`], an in-process [`MemoryCacheIndex`], and an HTTP-backed
/// upstream processor pointed at `config.upstream_base_url`.
///
/// Callers that need a different cache backend or upstream transport should
/// construct a `ProcessorDriver` directly from `imcaxy-proxy` instead — this
/// function is the convenient default wiring, not the only one.
#[cfg(feature = "http-upstream")]
#[must_use]
pub fn build_driver(config: &Config) -> ProcessorDriver {
    let registry: Arc<HubRegistry> = HubRegistry::new();
    let cache = Arc::new(MemoryCacheIndex::new());
    let upstream = Arc::new(imcaxy_proxy::upstream::http::HttpUpstreamProcessor::new(
        config.upstream_base_url.clone(),
    ));
    let fingerprinter = Fingerprinter::new(config.endpoint_whitelist.clone(), config.processor_identity.clone());

    ProcessorDriver::new(registry, cache, upstream, fingerprinter)
}
