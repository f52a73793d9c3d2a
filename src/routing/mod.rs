//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (headers)
//!     → signals.rs (region, source address, User-Agent → ClientSignals)
//!     → classifier.rs (User-Agent → is_mobile)
//!     → selector.rs (is_mobile, region, table → base URL)
//!
//! Table Compilation (at startup / reload):
//!     EdgeConfig
//!     → table.rs (parse URLs, uppercase regions, parse IPs)
//!     → Freeze as immutable RoutingConfig
//! ```
//!
//! # Design Decisions
//! - Tables compiled up front, immutable at runtime
//! - Deterministic: same signals always select the same origin
//! - Selection is total; there is always a default upstream

pub mod classifier;
pub mod selector;
pub mod signals;
pub mod table;

pub use selector::{select_origin, OriginKind, SelectedOrigin};
pub use signals::ClientSignals;
pub use table::{RoutingConfig, SignalHeaders};
