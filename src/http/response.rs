//! Responses returned by the transport.
//!
//! # Responsibilities
//! - Carry status, headers and body of one exchange with the catalog service
//! - Case-insensitive header lookup that tolerates absent headers
//! - Decode JSON bodies on demand

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;

/// Status codes the resilience layer reasons about.
pub mod status {
    /// Transport failed before any status was received.
    pub const NO_CONNECTION: i32 = -1;
    /// Transport gave up waiting for the service.
    pub const TIMED_OUT: i32 = 0;
    pub const NO_CONTENT: i32 = 204;
    pub const UNAUTHORIZED: i32 = 401;
    pub const NOT_FOUND: i32 = 404;
    pub const INTERNAL_SERVER_ERROR: i32 = 500;
    pub const SERVICE_UNAVAILABLE: i32 = 503;
}

/// One HTTP exchange as seen by the resilience layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// HTTP status code (may be rewritten by classification).
    pub status: i32,
    /// Response headers, keys lowercased.
    pub headers: BTreeMap<String, String>,
    /// Raw response body.
    pub body: String,
}

impl Response {
    pub fn new(status: i32) -> Self {
        Self {
            status,
            headers: BTreeMap::new(),
            body: String::new(),
        }
    }

    /// Builder-style header insertion; the name is lowercased.
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Look up a header by name, ignoring case.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// True for 2xx and 3xx statuses.
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }

    /// True when the body is an HTML page rather than a structured service error.
    ///
    /// The catalog service never answers with HTML, so such a body comes from
    /// an intermediary (proxy, load balancer, web server).
    pub fn has_html_body(&self) -> bool {
        self.header("content-type")
            .map(|ct| ct.contains("html"))
            .unwrap_or(false)
    }

    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}
