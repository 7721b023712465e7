//! Authentication coordination subsystem.
//!
//! # Data Flow
//! ```text
//! every dispatch      → gate.rs admit() (waits while a handshake runs)
//! unauthorized result → gate.rs report_unauthorized()
//!                         → first reporter invokes handler.rs ReauthHandler
//!                         → others queue until it settles
//! ```

pub mod gate;
pub mod handler;

pub use gate::{AuthGate, GateRejection};
pub use handler::{HandshakeError, IdentityCheck, ReauthHandler};
