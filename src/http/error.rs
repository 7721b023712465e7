//! Caller-visible errors.

use thiserror::Error;

use crate::auth::HandshakeError;
use crate::http::response::{status, Response};

/// Terminal failure of one logical call.
///
/// Transient failures only show up here once retries are exhausted, and then
/// as the last error observed.
#[derive(Debug, Error)]
pub enum CallError {
    /// The service could not be reached.
    #[error("No connection to catalog service: {0}")]
    NoConnection(String),

    /// The transport gave up waiting for the service.
    #[error("Request timed out: {0}")]
    TimedOut(String),

    /// The service (or an intermediary) answered with a failure status.
    #[error("Catalog service returned status {}", .0.status)]
    Service(Box<Response>),

    /// Credentials are stale and the call opted out of re-authentication,
    /// or no re-authentication handler is registered.
    #[error("Unauthorized")]
    Unauthorized(Box<Response>),

    /// Re-authentication completed for a different identity.
    #[error("Re-authentication switched to a different identity")]
    IdentityChanged(Box<Response>),

    /// The re-authentication handler failed.
    #[error("Re-authentication failed: {0}")]
    Handshake(#[source] HandshakeError),

    /// The request could not be issued at all.
    #[error("Invalid request: {0}")]
    Request(String),
}

/// Coarse error taxonomy used for retry policy and reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NoConnection,
    Timeout,
    ServerUnavailable,
    Unauthorized,
    Fatal,
}

impl CallError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CallError::NoConnection(_) => ErrorKind::NoConnection,
            CallError::TimedOut(_) => ErrorKind::Timeout,
            CallError::Service(resp) => match resp.status {
                status::NO_CONNECTION => ErrorKind::NoConnection,
                status::TIMED_OUT => ErrorKind::Timeout,
                status::INTERNAL_SERVER_ERROR | status::SERVICE_UNAVAILABLE => {
                    ErrorKind::ServerUnavailable
                }
                _ => ErrorKind::Fatal,
            },
            CallError::Unauthorized(_) | CallError::IdentityChanged(_) => ErrorKind::Unauthorized,
            CallError::Handshake(_) | CallError::Request(_) => ErrorKind::Fatal,
        }
    }

    /// Classified status: -1 for no connection, 0 for timeout, otherwise HTTP.
    pub fn status(&self) -> Option<i32> {
        match self {
            CallError::NoConnection(_) => Some(status::NO_CONNECTION),
            CallError::TimedOut(_) => Some(status::TIMED_OUT),
            CallError::Service(resp)
            | CallError::Unauthorized(resp)
            | CallError::IdentityChanged(resp) => Some(resp.status),
            CallError::Handshake(_) | CallError::Request(_) => None,
        }
    }

    pub fn response(&self) -> Option<&Response> {
        match self {
            CallError::Service(resp)
            | CallError::Unauthorized(resp)
            | CallError::IdentityChanged(resp) => Some(resp),
            _ => None,
        }
    }

    /// Offline codes (-1 or 0), raised by the transport or carried by a response.
    pub fn is_offline(&self) -> bool {
        matches!(self.status(), Some(status::NO_CONNECTION) | Some(status::TIMED_OUT))
    }
}

/// Named service failures, for callers that present errors to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceErrorKind {
    BadRequest,
    QueryTimeout,
    Unauthorized,
    Forbidden,
    NotFound,
    RequestTimeout,
    Conflict,
    PreconditionFailed,
    InternalServerError,
    BadGateway,
    ServiceUnavailable,
    Other(i32),
}

impl ServiceErrorKind {
    pub fn from_response(resp: &Response) -> Self {
        match resp.status {
            400 if resp.body.contains("Query run time limit exceeded") => Self::QueryTimeout,
            400 => Self::BadRequest,
            401 => Self::Unauthorized,
            403 => Self::Forbidden,
            404 => Self::NotFound,
            408 => Self::RequestTimeout,
            409 => Self::Conflict,
            412 => Self::PreconditionFailed,
            500 => Self::InternalServerError,
            502 => Self::BadGateway,
            503 => Self::ServiceUnavailable,
            other => Self::Other(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_status() {
        let err = CallError::NoConnection("refused".into());
        assert_eq!(err.kind(), ErrorKind::NoConnection);
        assert_eq!(err.status(), Some(-1));
        assert!(err.is_offline());

        let err = CallError::TimedOut("30s".into());
        assert_eq!(err.status(), Some(0));

        let err = CallError::Service(Box::new(Response::new(503)));
        assert_eq!(err.kind(), ErrorKind::ServerUnavailable);
        assert!(!err.is_offline());

        // Transports that report offline as a status instead of an error.
        let err = CallError::Service(Box::new(Response::new(0)));
        assert_eq!(err.kind(), ErrorKind::Timeout);
        assert!(err.is_offline());
        let err = CallError::Service(Box::new(Response::new(-1)));
        assert_eq!(err.kind(), ErrorKind::NoConnection);
        assert!(err.is_offline());

        let err = CallError::Service(Box::new(Response::new(409)));
        assert_eq!(err.kind(), ErrorKind::Fatal);
        assert_eq!(err.to_string(), "Catalog service returned status 409");
    }

    #[test]
    fn test_service_error_kinds() {
        let resp = Response::new(400).with_body("Query run time limit exceeded.");
        assert_eq!(ServiceErrorKind::from_response(&resp), ServiceErrorKind::QueryTimeout);
        assert_eq!(
            ServiceErrorKind::from_response(&Response::new(400)),
            ServiceErrorKind::BadRequest
        );
        assert_eq!(
            ServiceErrorKind::from_response(&Response::new(418)),
            ServiceErrorKind::Other(418)
        );
    }
}
