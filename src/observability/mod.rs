//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! gate, retry engine, certifier produce:
//!     → logging.rs (structured tracing events, one span per logical call)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → stdout via tracing-subscriber
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;
