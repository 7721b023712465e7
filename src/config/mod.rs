//! Client configuration subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ClientConfig (validated)
//!     → CatalogClient::new / ReqwestTransport::new
//!
//! On change:
//!     watcher.rs detects change
//!     → loader.rs loads and validates
//!     → CatalogClient::apply_config swaps retry settings
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Only retry settings are hot-swappable; header and transport settings
//!   are fixed at client construction

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{ClientConfig, ContextHeaderConfig, ObservabilityConfig, RetryConfig, TransportConfig};
pub use validation::{validate_config, ValidationError};
pub use watcher::ConfigWatcher;
