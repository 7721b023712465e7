//! Response classification.
//!
//! Maps the result of one transport attempt onto a closed set of outcomes the
//! retry engine acts on. Pure; no state.
//!
//! | result                              | outcome             |
//! |-------------------------------------|---------------------|
//! | 2xx / 3xx                           | `Success`           |
//! | no status, timeout, 500, 503        | `Retriable`         |
//! | DELETE + 404 (structured body)      | `DeleteAlreadyDone` |
//! | DELETE + 404 (HTML body)            | `Fatal` as 500      |
//! | 401                                 | `Unauthorized`      |
//! | anything else                       | `Fatal`             |
//!
//! Failures carrying an HTML body are reported as 500.

use crate::http::error::CallError;
use crate::http::request::Verb;
use crate::http::response::{status, Response};
use crate::http::transport::TransportError;

/// Statuses that usually clear up on their own.
pub const RETRIABLE_STATUSES: [i32; 4] = [
    status::NO_CONNECTION,
    status::TIMED_OUT,
    status::INTERNAL_SERVER_ERROR,
    status::SERVICE_UNAVAILABLE,
];

/// Classified result of one attempt.
#[derive(Debug)]
pub enum Outcome {
    Success(Response),
    /// Transient failure; the error is surfaced only if retries run out.
    Retriable(CallError),
    /// A delete answered with not-found; carries a synthesized 204.
    DeleteAlreadyDone(Response),
    Unauthorized(Response),
    Fatal(CallError),
}

impl Outcome {
    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success(_) => "success",
            Outcome::Retriable(_) => "retriable",
            Outcome::DeleteAlreadyDone(_) => "delete_already_done",
            Outcome::Unauthorized(_) => "unauthorized",
            Outcome::Fatal(_) => "fatal",
        }
    }
}

/// Classify the result of one transport attempt.
pub fn classify(verb: Verb, result: Result<Response, TransportError>) -> Outcome {
    let mut resp = match result {
        Ok(resp) => resp,
        Err(TransportError::NoConnection(msg)) => {
            return Outcome::Retriable(CallError::NoConnection(msg))
        }
        Err(TransportError::TimedOut(msg)) => return Outcome::Retriable(CallError::TimedOut(msg)),
        Err(TransportError::InvalidRequest(msg)) => return Outcome::Fatal(CallError::Request(msg)),
    };

    if resp.is_success() {
        return Outcome::Success(resp);
    }

    if RETRIABLE_STATUSES.contains(&resp.status) {
        reclassify_html(&mut resp);
        return Outcome::Retriable(CallError::Service(Box::new(resp)));
    }

    if verb == Verb::Delete && resp.status == status::NOT_FOUND {
        // A retried delete may already have gone through on an earlier attempt.
        if resp.has_html_body() {
            resp.status = status::INTERNAL_SERVER_ERROR;
            return Outcome::Fatal(CallError::Service(Box::new(resp)));
        }
        resp.status = status::NO_CONTENT;
        return Outcome::DeleteAlreadyDone(resp);
    }

    if resp.status == status::UNAUTHORIZED {
        return Outcome::Unauthorized(resp);
    }

    reclassify_html(&mut resp);
    Outcome::Fatal(CallError::Service(Box::new(resp)))
}

fn reclassify_html(resp: &mut Response) {
    if resp.has_html_body() {
        resp.status = status::INTERNAL_SERVER_ERROR;
    }
}
