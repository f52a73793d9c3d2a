//! Logs and metrics.
//!
//! ```text
//! pipeline, server, config watcher
//!     → logging.rs   tracing events to stdout, filtered by RUST_LOG or log_level
//!     → metrics.rs   counters and latency histogram, scraped by Prometheus
//! ```

pub mod logging;
pub mod metrics;
