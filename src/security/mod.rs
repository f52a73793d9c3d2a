//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → ClientSignals (region, source address)
//!     → access_control.rs (region denylist, then address denylist)
//!     → Allow: pass to origin selection
//!     → Deny*: 403, no upstream fetch
//! ```
//!
//! # Design Decisions
//! - Decisions are values, not errors
//! - Fail open on unparseable addresses: only listed IPs are refused

pub mod access_control;

pub use access_control::{evaluate, evaluate_signals, AccessDecision, Denial};
