//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Attempt result from transport:
//!     → classifier.rs (success / retriable / delete-already-done / unauthorized / fatal)
//!     → On retriable: retries.rs (budget check) + backoff.rs (delay)
//!     → On unauthorized: handed to auth::AuthGate
//! ```
//!
//! # Design Decisions
//! - Classification is a pure function over a closed enum
//! - Backoff is exact doubling; jitter is opt-in
//! - Retry state is owned by a single call

pub mod backoff;
pub mod classifier;
pub mod retries;

pub use classifier::{classify, Outcome};
pub use retries::{RetrySettings, RetryState};
