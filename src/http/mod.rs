//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request id, tracing, config snapshot)
//!     → pipeline.rs (signals → access → origin → rewrite, upstream deadline)
//!     → request.rs (outbound URI and request)
//!     → fetch.rs (upstream round trip, streamed)
//!     → response.rs (marker header rewrite)
//!     → Send to client
//! ```

pub mod fetch;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod server;

pub use fetch::{FetchError, Fetcher, OptimizationDirectives, ReqwestFetcher};
pub use pipeline::{process, EdgeError};
pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer, ServerError, Snapshot};
