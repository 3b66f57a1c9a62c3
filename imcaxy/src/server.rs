//! Demo HTTP front end, analogous to `imcaxy-server` in the original system:
//! a single catch-all route accepts a processing request path and returns
//! the resolved image bytes as the response body.
//!
//! Axum runs on tokio; the Data Hub's primitives are compio (`io_uring`)
//! native. Rather than mix reactors on one thread, [`HubHandle::spawn`]
//! starts a dedicated OS thread running its own compio runtime that owns
//! the [`ProcessorDriver`](imcaxy_proxy::driver::ProcessorDriver), and axum
//! handlers cross into it over a `tokio::sync` channel — the same shape any
//! two-runtime integration takes, since there is no way to `.await` a
//! compio future from a tokio task directly.

use std::thread;

use axum::extract::{RawQuery, State};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tokio::sync::{mpsc, oneshot};

use crate::config::Config;

type FetchResult = Result<Vec<u8>, String>;

struct HubRequest {
    path_and_query: String,
    reply: oneshot::Sender<FetchResult>,
}

/// Handle to the background compio runtime driving the Data Hub. Cheap to
/// clone; every clone shares the same worker thread and `ProcessorDriver`.
#[derive(Clone)]
pub struct HubHandle {
    tx: mpsc::Sender<HubRequest>,
}

impl HubHandle {
    /// Spawns the worker thread and returns a handle to it. `config` is
    /// consumed by the worker to build its `ProcessorDriver`.
    #[must_use]
    pub fn spawn(config: Config) -> Self {
        let (tx, rx) = mpsc::channel::<HubRequest>(256);

        thread::Builder::new()
            .name("imcaxy-hub".to_string())
            .spawn(move || run_worker(config, rx))
            .expect("failed to spawn imcaxy-hub worker thread");

        Self { tx }
    }

    async fn fetch(&self, path_and_query: String) -> FetchResult {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(HubRequest { path_and_query, reply }).await.is_err() {
            return Err("hub worker thread is gone".to_string());
        }
        rx.await.unwrap_or_else(|_| Err("hub worker dropped the reply".to_string()))
    }
}

fn run_worker(config: Config, mut rx: mpsc::Receiver<HubRequest>) {
    let driver = crate::build_driver(&config);
    let runtime = compio::runtime::Runtime::new().expect("failed to start compio runtime");

    runtime.block_on(async move {
        while let Some(req) = rx.recv().await {
            let result = read_to_end(&driver, &req.path_and_query).await;
            let _ = req.reply.send(result);
        }
    });
}

async fn read_to_end(driver: &imcaxy_proxy::driver::ProcessorDriver, path_and_query: &str) -> FetchResult {
    let mut reader = driver.process(path_and_query).await.map_err(|e| e.to_string())?;

    let mut out = Vec::new();
    let mut staging = vec![0u8; 64 * 1024];
    loop {
        let n = reader.read(&mut staging).await.map_err(|e| e.to_string())?;
        if n == 0 {
            return Ok(out);
        }
        out.extend_from_slice(&staging[..n]);
    }
}

async fn handle(State(hub): State<HubHandle>, uri: Uri, RawQuery(query): RawQuery) -> Response {
    let path_and_query = match query {
        Some(q) => format!("{}?{}", uri.path(), q),
        None => uri.path().to_string(),
    };

    match hub.fetch(path_and_query).await {
        Ok(bytes) => bytes.into_response(),
        Err(message) => (StatusCode::BAD_GATEWAY, message).into_response(),
    }
}

/// Builds the axum [`Router`] for the demo front end, forwarding every
/// request path (with its query string) straight through `hub`.
#[must_use]
pub fn router(hub: HubHandle) -> Router {
    Router::new().route("/*path", get(handle)).with_state(hub)
}
