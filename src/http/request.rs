//! Request construction.
//!
//! # Responsibilities
//! - Name the verbs the wrapped client exposes
//! - Describe one fully formed request handed to the transport
//! - Carry the per-call options that steer retry and auth handling

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use url::Url;

use crate::context::ContextHeader;

/// Request ID header attached to every dispatch.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Verbs supported by the wrapped client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Head,
    Delete,
    Post,
    Put,
    Patch,
}

impl Verb {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Head => "HEAD",
            Verb::Delete => "DELETE",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
        }
    }

    /// Whether the verb carries a request body.
    pub fn has_body(&self) -> bool {
        matches!(self, Verb::Post | Verb::Put | Verb::Patch)
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Verb {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Verb::Get),
            "HEAD" => Ok(Verb::Head),
            "DELETE" => Ok(Verb::Delete),
            "POST" => Ok(Verb::Post),
            "PUT" => Ok(Verb::Put),
            "PATCH" => Ok(Verb::Patch),
            other => Err(format!("unsupported verb '{}'", other)),
        }
    }
}

/// A request as handed to the transport for one attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub verb: Verb,
    pub url: Url,
    pub body: Option<serde_json::Value>,
    /// Outgoing headers, including the certified context header.
    pub headers: BTreeMap<String, String>,
}

impl Request {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Per-call configuration.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Extra headers sent with every attempt.
    pub headers: BTreeMap<String, String>,

    /// Diagnostic context for this call, merged with the client defaults.
    pub context: Option<ContextHeader>,

    /// Fail immediately on unauthorized instead of waiting for re-authentication.
    pub skip_auth_handling: bool,

    /// Do not retry when the service is unreachable or timed out.
    pub skip_retry_on_offline_codes: bool,

    /// Overrides the client's retry limit for this call.
    pub max_retries: Option<u32>,

    /// Overrides the client's initial backoff delay for this call.
    pub initial_delay: Option<Duration>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn context(mut self, context: ContextHeader) -> Self {
        self.context = Some(context);
        self
    }

    pub fn skip_auth_handling(mut self) -> Self {
        self.skip_auth_handling = true;
        self
    }

    pub fn skip_retry_on_offline_codes(mut self) -> Self {
        self.skip_retry_on_offline_codes = true;
        self
    }

    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verb_parsing() {
        assert_eq!("get".parse::<Verb>().unwrap(), Verb::Get);
        assert_eq!("Delete".parse::<Verb>().unwrap(), Verb::Delete);
        assert!("jsonp".parse::<Verb>().is_err());
    }

    #[test]
    fn test_body_verbs() {
        assert!(Verb::Post.has_body());
        assert!(Verb::Patch.has_body());
        assert!(!Verb::Delete.has_body());
    }

    #[test]
    fn test_request_header_lookup() {
        let mut headers = BTreeMap::new();
        headers.insert("X-Request-ID".to_string(), "abc".to_string());
        let req = Request {
            verb: Verb::Get,
            url: Url::parse("http://localhost/ermrest/catalog/1").unwrap(),
            body: None,
            headers,
        };
        assert_eq!(req.header(X_REQUEST_ID), Some("abc"));
    }
}
