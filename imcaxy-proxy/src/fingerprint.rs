//! Request Fingerprinter: canonicalizes a processing request into a stable,
//! order-independent cache key.
//!
//! Canonicalization sorts `(name, value)` pairs lexicographically — this
//! handles both "keys in any order" and "repeated keys with values in any
//! order" in one pass, since sorting by the full pair groups same-named
//! entries together before ordering their values. The sorted pairs are then
//! joined with delimiters that cannot occur in URL-encoded query components,
//! and the whole canonical string is digested with SHA-256: collision
//! resistance is the property being bought here, not secrecy.

use sha2::{Digest, Sha256};

use crate::error::{ProxyError, Result};

/// Field separator between a parameter's name and value.
const UNIT_SEPARATOR: u8 = 0x1f;
/// Separator between top-level fields and between parameter pairs.
const RECORD_SEPARATOR: u8 = 0x1e;

/// A request, fully parsed and fingerprinted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    pub endpoint: String,
    pub source_url: String,
    pub params: Vec<(String, String)>,
    pub fingerprint: String,
}

/// Canonicalizes requests for one processor identity against a whitelist of
/// known processing endpoints.
#[derive(Debug, Clone)]
pub struct Fingerprinter {
    whitelist: Vec<String>,
    processor_identity: String,
}

impl Fingerprinter {
    #[must_use]
    pub fn new(whitelist: Vec<String>, processor_identity: impl Into<String>) -> Self {
        Self {
            whitelist,
            processor_identity: processor_identity.into(),
        }
    }

    #[must_use]
    pub fn processor_identity(&self) -> &str {
        &self.processor_identity
    }

    /// Computes the stable fingerprint for `(endpoint, params, source_url)`
    /// against this fingerprinter's configured processor identity.
    #[must_use]
    pub fn fingerprint(&self, endpoint: &str, params: &[(String, String)], source_url: &str) -> String {
        let mut sorted: Vec<&(String, String)> = params.iter().collect();
        sorted.sort_by(|a, b| a.cmp(b));

        let mut hasher = Sha256::new();
        hasher.update(endpoint.as_bytes());
        hasher.update([RECORD_SEPARATOR]);
        hasher.update(source_url.as_bytes());
        hasher.update([RECORD_SEPARATOR]);
        hasher.update(self.processor_identity.as_bytes());

        for (name, value) in sorted {
            hasher.update([RECORD_SEPARATOR]);
            hasher.update(name.as_bytes());
            hasher.update([UNIT_SEPARATOR]);
            hasher.update(value.as_bytes());
        }

        hex::encode(hasher.finalize())
    }

    /// Parses `path_and_query` (e.g. `/crop?url=http%3A%2F%2Fx%2Fi.jpg&w=100`)
    /// into a [`ParsedRequest`], validating the endpoint against the
    /// whitelist and requiring a `url` parameter.
    ///
    /// # Errors
    ///
    /// Returns [`ProxyError::UnknownEndpoint`] if the path is not in the
    /// configured whitelist, or [`ProxyError::MissingSourceUrl`] if no `url`
    /// parameter is present.
    pub fn parse_request(&self, path_and_query: &str) -> Result<ParsedRequest> {
        let (path, query) = match path_and_query.split_once('?') {
            Some((p, q)) => (p, q),
            None => (path_and_query, ""),
        };

        if !self.whitelist.iter().any(|e| e == path) {
            return Err(ProxyError::UnknownEndpoint(path.to_string()));
        }

        let params: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
            .into_owned()
            .collect();

        let source_url = params
            .iter()
            .find(|(k, _)| k == "url")
            .map(|(_, v)| v.clone())
            .ok_or(ProxyError::MissingSourceUrl)?;

        let fingerprint = self.fingerprint(path, &params, &source_url);

        Ok(ParsedRequest {
            endpoint: path.to_string(),
            source_url,
            params,
            fingerprint,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fp() -> Fingerprinter {
        Fingerprinter::new(vec!["/crop".to_string(), "/resize".to_string()], "imaginary")
    }

    #[test]
    fn fingerprint_is_order_independent_across_keys() {
        let a = [
            ("abc".to_string(), "1".to_string()),
            ("def".to_string(), "2".to_string()),
        ];
        let b = [
            ("def".to_string(), "2".to_string()),
            ("abc".to_string(), "1".to_string()),
        ];

        let fingerprinter = fp();
        assert_eq!(
            fingerprinter.fingerprint("/crop", &a, "http://x/i.jpg"),
            fingerprinter.fingerprint("/crop", &b, "http://x/i.jpg"),
        );
    }

    #[test]
    fn fingerprint_is_order_independent_across_repeated_values() {
        let a = [
            ("tag".to_string(), "1".to_string()),
            ("tag".to_string(), "2".to_string()),
        ];
        let b = [
            ("tag".to_string(), "2".to_string()),
            ("tag".to_string(), "1".to_string()),
        ];

        let fingerprinter = fp();
        assert_eq!(
            fingerprinter.fingerprint("/crop", &a, "http://x/i.jpg"),
            fingerprinter.fingerprint("/crop", &b, "http://x/i.jpg"),
        );
    }

    #[test]
    fn distinct_endpoints_never_collide() {
        let fingerprinter = fp();
        let a = fingerprinter.fingerprint("/crop", &[], "http://x/i.jpg");
        let b = fingerprinter.fingerprint("/resize", &[], "http://x/i.jpg");
        assert_ne!(a, b);
    }

    #[test]
    fn parse_request_rejects_unknown_endpoint() {
        let err = fp().parse_request("/rotate?url=http://x/i.jpg").unwrap_err();
        assert!(matches!(err, ProxyError::UnknownEndpoint(ref p) if p == "/rotate"));
    }

    #[test]
    fn parse_request_rejects_missing_source_url() {
        let err = fp().parse_request("/crop?w=100").unwrap_err();
        assert!(matches!(err, ProxyError::MissingSourceUrl));
    }

    #[test]
    fn parse_request_extracts_fields() {
        let parsed = fp()
            .parse_request("/crop?url=http%3A%2F%2Fx%2Fi.jpg&w=100")
            .unwrap();
        assert_eq!(parsed.endpoint, "/crop");
        assert_eq!(parsed.source_url, "http://x/i.jpg");
        assert!(parsed.params.iter().any(|(k, v)| k == "w" && v == "100"));
    }
}
