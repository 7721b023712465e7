//! Diagnostic context header subsystem.
//!
//! # Data Flow
//! ```text
//! client defaults + per-call ContextHeader
//!     → header.rs (merge, stamp elapsed_ms)
//!     → certifier.rs (fit under byte budget, reducing if needed)
//!         → constraints.rs (constraint name → RID)
//!         → encoding.rs (JSON, header-safe escaping)
//!     → header value on every dispatch
//! ```

pub mod certifier;
pub mod constraints;
pub mod encoding;
pub mod header;

pub use certifier::{certify, CertifiedHeader, Reduction, EMPTY_HEADER};
pub use constraints::{ConstraintKind, ConstraintLookup, ConstraintRegistry, NoConstraints};
pub use header::{
    Collapsible, ConstraintRef, ContextHeader, FacetFilter, FilterSet, PathHop, SourceNode,
    SourcePath, StackFrame,
};

/// Header carrying the diagnostic context.
pub const CONTEXT_HEADER_NAME: &str = "Deriva-Client-Context";

/// Encoded context headers must stay strictly below this many bytes.
pub const CONTEXT_HEADER_BYTE_BUDGET: usize = 6500;
