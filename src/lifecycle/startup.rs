//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize logging and metrics
//! - Start the optional config watcher
//! - Bind the listener and begin accepting traffic
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listener binds last (traffic only when ready)

use std::path::Path;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use crate::config::{load_config, validate_config, ConfigError, EdgeConfig};
use crate::config::watcher::ConfigWatcher;
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::observability::{logging, metrics};

/// Load configuration from `path`, or validate the built-in defaults.
pub fn load(path: Option<&Path>) -> Result<EdgeConfig, ConfigError> {
    match path {
        Some(path) => load_config(path),
        None => {
            let config = EdgeConfig::default();
            validate_config(&config).map_err(ConfigError::Validation)?;
            Ok(config)
        }
    }
}

/// Serve until SIGINT/SIGTERM. `watch` re-loads the file on change.
pub async fn serve(config: EdgeConfig, watch: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "edge-booster starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        default_upstream = %config.upstream.default,
        mobile_upstream = %config.upstream.mobile,
        region_routes = config.routes.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // The watcher stops when dropped, so it is held for the server's lifetime.
    let (_watcher, config_updates) = match watch {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path);
            (Some(watcher.run()?), updates)
        }
        None => (None, mpsc::unbounded_channel().1),
    };

    let server = HttpServer::new(config)?;
    let listener = TcpListener::bind(&server.config().listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();
    server.run(listener, config_updates, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
