//! Process configuration.
//!
//! A minimal, env-based loader — not a layered configuration system, since
//! full configuration loading is explicitly named out of scope (the system
//! only needs enough to stand the proxy up, not to manage it in production).

/// Runtime configuration for the proxy.
///
/// # Examples
///
/// ```
/// use imcaxy::config::Config;
///
/// let config = Config::default()
///     .with_bind_addr("0.0.0.0:8080")
///     .with_endpoint_whitelist(vec!["/crop".to_string(), "/resize".to_string()]);
/// ```
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Config {
    /// Address the demo front-end binds to (only used by the `server`
    /// feature).
    pub bind_addr: String,

    /// Base URL of the upstream image-processing service, e.g.
    /// `http://processor.internal:9000`.
    pub upstream_base_url: String,

    /// Processing endpoints this instance accepts, e.g. `["/crop",
    /// "/resize"]`. Requests to any other path fail with
    /// `unknown-endpoint`.
    pub endpoint_whitelist: Vec<String>,

    /// Identity of the upstream processor, folded into every request
    /// fingerprint so distinct processor back ends never collide on the
    /// same cache key.
    pub processor_identity: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            upstream_base_url: "http://localhost:9000".to_string(),
            endpoint_whitelist: vec!["/crop".to_string(), "/resize".to_string()],
            processor_identity: "imaginary".to_string(),
        }
    }
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from the environment, falling back to
    /// [`Config::default`] for any variable that isn't set:
    ///
    /// - `IMCAXY_BIND_ADDR`
    /// - `IMCAXY_UPSTREAM_BASE_URL`
    /// - `IMCAXY_ENDPOINTS` (comma-separated)
    /// - `IMCAXY_PROCESSOR_IDENTITY`
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("IMCAXY_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Ok(url) = std::env::var("IMCAXY_UPSTREAM_BASE_URL") {
            config.upstream_base_url = url;
        }
        if let Ok(endpoints) = std::env::var("IMCAXY_ENDPOINTS") {
            config.endpoint_whitelist = endpoints.split(',').map(str::trim).map(str::to_string).collect();
        }
        if let Ok(identity) = std::env::var("IMCAXY_PROCESSOR_IDENTITY") {
            config.processor_identity = identity;
        }

        config
    }

    #[must_use]
    pub fn with_bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.bind_addr = addr.into();
        self
    }

    #[must_use]
    pub fn with_upstream_base_url(mut self, url: impl Into<String>) -> Self {
        self.upstream_base_url = url.into();
        self
    }

    #[must_use]
    pub fn with_endpoint_whitelist(mut self, endpoints: Vec<String>) -> Self {
        self.endpoint_whitelist = endpoints;
        self
    }

    #[must_use]
    pub fn with_processor_identity(mut self, identity: impl Into<String>) -> Self {
        self.processor_identity = identity.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_at_least_one_whitelisted_endpoint() {
        assert!(!Config::default().endpoint_whitelist.is_empty());
    }

    #[test]
    fn builder_methods_override_defaults() {
        let config = Config::new()
            .with_bind_addr("0.0.0.0:9999")
            .with_processor_identity("imaginary-v2");

        assert_eq!(config.bind_addr, "0.0.0.0:9999");
        assert_eq!(config.processor_identity, "imaginary-v2");
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = Config::new().with_bind_addr("0.0.0.0:9999");
        let json = serde_json::to_string(&config).unwrap();
        let restored: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.bind_addr, "0.0.0.0:9999");
    }
}
