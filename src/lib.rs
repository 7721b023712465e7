//! Resilience layer for catalog service clients.
//!
//! # Architecture Overview
//!
//! ```text
//!   caller
//!     │  get/head/delete/post/put/patch
//!     ▼
//!  ┌──────────────────────────────────────────────────────────┐
//!  │ http::CatalogClient (retry engine)                       │
//!  │   auth::AuthGate ──admit──▶ context::certify ──▶ send    │
//!  │        ▲                                          │      │
//!  │        │ unauthorized     resilience::classify ◀──┘      │
//!  │        └──────────────────────┤                          │
//!  │                   retriable → backoff → admit → send     │
//!  │                   success / fatal → lifecycle hooks      │
//!  └──────────────────────────────────────────────────────────┘
//!     │
//!     ▼
//!   http::Transport (reqwest) ──▶ catalog service
//! ```
//!
//! Cross-cutting: `config` (TOML, validation, hot reload of retry settings),
//! `observability` (tracing subscriber, Prometheus metrics).

pub mod auth;
pub mod config;
pub mod context;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;

pub use auth::{AuthGate, IdentityCheck, ReauthHandler};
pub use config::ClientConfig;
pub use context::ContextHeader;
pub use http::{CallError, CatalogClient, RequestOptions, Response};
