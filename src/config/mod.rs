//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → EdgeConfig (validated)
//!     → RoutingConfig::from_config (compiled, immutable)
//!     → shared via Arc to every request
//!
//! On file change (optional):
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of Arc<RoutingConfig>
//!     → new requests observe the new table
//! ```
//!
//! # Design Decisions
//! - A compiled table is never mutated; changes swap a whole new one
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    EdgeConfig, FetchConfig, FirewallConfig, ListenerConfig, ObservabilityConfig,
    RewriteConfig, SignalsConfig, TimeoutConfig, UpstreamConfig,
};
pub use validation::{validate_config, ValidationError};
