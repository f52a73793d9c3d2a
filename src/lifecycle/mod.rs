//! Process lifecycle.
//!
//! ```text
//! startup.rs:  load config → logging, metrics → watcher → bind → serve
//! signals.rs:  SIGINT / SIGTERM
//!                 → shutdown.rs broadcast
//!                 → axum stops accepting, drains open connections
//! ```
//!
//! Any error before the listener is bound aborts the process.

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
