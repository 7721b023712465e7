//! Transport boundary.
//!
//! # Responsibilities
//! - Define the seam between the resilience layer and the HTTP client
//! - Map client failures without a status onto offline kinds
//! - Provide the reqwest-backed production transport

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::TransportConfig;
use crate::http::request::{Request, Verb};
use crate::http::response::Response;

/// Failures that happen before a usable status is received.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Connection refused, reset, DNS failure or any error without a status.
    #[error("Connection failed: {0}")]
    NoConnection(String),

    /// The transport's own deadline expired.
    #[error("Timed out: {0}")]
    TimedOut(String),

    /// The request could not be built (bad header, bad body).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Issues one attempt of a request.
///
/// Every HTTP status, success or not, comes back as `Ok(Response)`; `Err` is
/// reserved for exchanges that produced no status.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &Request) -> Result<Response, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn send(&self, request: &Request) -> Result<Response, TransportError> {
        (**self).send(request).await
    }
}

/// Transport backed by a pooled `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &TransportConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        Ok(Self { client })
    }

    /// Wrap an already configured client.
    pub fn from_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn method(verb: Verb) -> reqwest::Method {
        match verb {
            Verb::Get => reqwest::Method::GET,
            Verb::Head => reqwest::Method::HEAD,
            Verb::Delete => reqwest::Method::DELETE,
            Verb::Post => reqwest::Method::POST,
            Verb::Put => reqwest::Method::PUT,
            Verb::Patch => reqwest::Method::PATCH,
        }
    }

    fn map_error(err: reqwest::Error) -> TransportError {
        if err.is_timeout() {
            TransportError::TimedOut(err.to_string())
        } else if err.is_builder() {
            TransportError::InvalidRequest(err.to_string())
        } else {
            TransportError::NoConnection(err.to_string())
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &Request) -> Result<Response, TransportError> {
        let mut builder = self
            .client
            .request(Self::method(request.verb), request.url.clone());

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let resp = builder.send().await.map_err(Self::map_error)?;

        let status = i32::from(resp.status().as_u16());
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(k, v)| {
                v.to_str()
                    .ok()
                    .map(|v| (k.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = resp.text().await.map_err(Self::map_error)?;

        Ok(Response {
            status,
            headers,
            body,
        })
    }
}
