//! Edge request-transformation layer.
//!
//! Sits between clients and a fixed set of upstream mirrors: rejects
//! denylisted regions and addresses, picks a mirror from client signals,
//! rewrites the request onto it, and maps the upstream's marker header back
//! onto the edge's own address space.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod security;

pub use config::EdgeConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::RoutingConfig;
