//! HTTP subsystem: the wrapped verbs callers use.
//!
//! # Data Flow
//! ```text
//! caller → client.rs (get/post/put/patch/delete/head)
//!     → auth gate admission
//!     → context header merged and certified
//!     → transport.rs (one attempt)
//!     → resilience::classifier (five outcomes)
//!     → settle, back off and retry, or wait for re-authentication
//! ```

pub mod client;
pub mod error;
pub mod request;
pub mod response;
pub mod transport;

pub use client::CatalogClient;
pub use error::{CallError, ErrorKind, ServiceErrorKind};
pub use request::{Request, RequestOptions, Verb, X_REQUEST_ID};
pub use response::Response;
pub use transport::{ReqwestTransport, Transport, TransportError};
