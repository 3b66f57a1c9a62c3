//! Demo front end for the Data Hub, analogous to `imcaxy-server` in the
//! original system: binds an HTTP listener and forwards every request path
//! straight through the Processor Driver.
//!
//! Run with:
//!
//! ```sh
//! IMCAXY_UPSTREAM_BASE_URL=http://localhost:9000 cargo run -p imcaxy --example http_front_end --features server
//! ```

use imcaxy::config::Config;
use imcaxy::server::{router, HubHandle};

#[tokio::main]
async fn main() {
    imcaxy::dev_tracing::init_tracing();

    let config = Config::from_env();
    let bind_addr = config.bind_addr.clone();
    let hub = HubHandle::spawn(config);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {bind_addr}: {e}"));

    println!("imcaxy demo front end listening on {bind_addr}");
    axum::serve(listener, router(hub))
        .await
        .expect("server error");
}
