//! Smoke tests for the crate's default wiring (`imcaxy::build_driver`):
//! a `Config`-built `ProcessorDriver` enforces the same endpoint whitelist
//! and request-shape rules the proxy layer is tested against in isolation.

use imcaxy::config::Config;

#[test]
fn driver_rejects_an_endpoint_outside_the_configured_whitelist() {
    compio::runtime::Runtime::new().unwrap().block_on(async {
        let config = Config::new().with_endpoint_whitelist(vec!["/crop".to_string()]);
        let driver = imcaxy::build_driver(&config);

        let err = driver.process("/rotate?url=http://x/i.jpg").await.unwrap_err();
        assert!(err.to_string().contains("/rotate"));
    });
}

#[test]
fn driver_rejects_a_request_with_no_source_url() {
    compio::runtime::Runtime::new().unwrap().block_on(async {
        let config = Config::new().with_endpoint_whitelist(vec!["/crop".to_string()]);
        let driver = imcaxy::build_driver(&config);

        let err = driver.process("/crop?w=100").await.unwrap_err();
        assert!(err.to_string().contains("source"));
    });
}
