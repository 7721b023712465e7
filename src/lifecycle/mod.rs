//! Host lifecycle hooks.
//!
//! # Data Flow
//! ```text
//! successful exchange → hooks.rs SuccessHook (bookkeeping)
//! any settled call    → readiness.rs Readiness (host may defer delivery)
//! ```
//!
//! # Design Decisions
//! - Hooks are injected at client construction, never global
//! - Closures implement the traits directly

pub mod hooks;
pub mod readiness;

pub use hooks::SuccessHook;
pub use readiness::{AlwaysReady, Readiness, ReadinessGate};
