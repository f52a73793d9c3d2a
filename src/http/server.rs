//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the edge handler on every path
//! - Wire up middleware (tracing, request ID)
//! - Bind server to listener
//! - Hand each request to the pipeline with the current snapshot
//! - Swap in reloaded configuration, rebuilding the upstream client when
//!   its settings change
//! - Observability (metrics, correlation IDs)

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{ConfigError, EdgeConfig, FetchConfig};
use crate::http::fetch::{FetchError, Fetcher, ReqwestFetcher};
use crate::http::pipeline;
use crate::http::request::{MakeRequestUuid, X_REQUEST_ID};
use crate::lifecycle::shutdown;
use crate::observability::metrics;
use crate::routing::RoutingConfig;

/// Failure to assemble the server or apply a configuration.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build upstream client: {0}")]
    Client(#[from] FetchError),
}

/// Settings the owned `reqwest` client was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ClientSettings {
    fetch: FetchConfig,
    connect_secs: u64,
}

impl ClientSettings {
    fn from_config(config: &EdgeConfig) -> Self {
        Self {
            fetch: config.fetch.clone(),
            connect_secs: config.timeouts.connect_secs,
        }
    }
}

/// Everything one request runs against. Swapped as a whole on reload.
pub struct Snapshot {
    pub routing: RoutingConfig,
    pub fetcher: Arc<dyn Fetcher>,
    /// `None` when the fetcher was supplied by the caller and is kept as is.
    client: Option<ClientSettings>,
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub current: Arc<ArcSwap<Snapshot>>,
}

/// HTTP server for the edge layer.
pub struct HttpServer {
    router: Router,
    config: EdgeConfig,
    state: AppState,
}

impl HttpServer {
    /// Create a server that fetches with its own `reqwest` client.
    pub fn new(config: EdgeConfig) -> Result<Self, ServerError> {
        let fetcher = ReqwestFetcher::new(&config.fetch, &config.timeouts)?;
        let client = Some(ClientSettings::from_config(&config));
        Self::build(config, Arc::new(fetcher), client)
    }

    /// Create a server with a custom fetch collaborator.
    pub fn with_fetcher(config: EdgeConfig, fetcher: Arc<dyn Fetcher>) -> Result<Self, ServerError> {
        Self::build(config, fetcher, None)
    }

    fn build(
        config: EdgeConfig,
        fetcher: Arc<dyn Fetcher>,
        client: Option<ClientSettings>,
    ) -> Result<Self, ServerError> {
        let routing = RoutingConfig::from_config(&config).map_err(ConfigError::Validation)?;

        let state = AppState {
            current: Arc::new(ArcSwap::from_pointee(Snapshot {
                routing,
                fetcher,
                client,
            })),
        };

        let router = Self::build_router(state.clone());
        Ok(Self {
            router,
            config,
            state,
        })
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// The upstream deadline is enforced by the pipeline from the current
    /// snapshot, so it follows reloads.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(edge_handler))
            .route("/{*path}", any(edge_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID)),
            )
    }

    /// The router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config the server was started with.
    pub fn config(&self) -> &EdgeConfig {
        &self.config
    }

    /// Compile and install a new configuration. In-flight requests keep
    /// the snapshot they started with.
    ///
    /// An owned upstream client is rebuilt when `[fetch]` or the connect
    /// timeout changed; a caller-supplied fetcher is always kept.
    pub fn apply_config(state: &AppState, config: &EdgeConfig) -> Result<(), ServerError> {
        let routing = RoutingConfig::from_config(config).map_err(ConfigError::Validation)?;
        let current = state.current.load();

        let next = ClientSettings::from_config(config);
        let (fetcher, client) = match &current.client {
            Some(settings) if *settings != next => {
                let fetcher: Arc<dyn Fetcher> = Arc::new(ReqwestFetcher::new(&config.fetch, &config.timeouts)?);
                tracing::info!("Upstream client settings changed, client rebuilt");
                (fetcher, Some(next))
            }
            client => (current.fetcher.clone(), client.clone()),
        };

        state.current.store(Arc::new(Snapshot {
            routing,
            fetcher,
            client,
        }));
        Ok(())
    }

    /// Run the server, accepting connections on the given listener until
    /// `shutdown` fires. Configurations received on `config_updates` replace
    /// the current snapshot.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<EdgeConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let state = self.state.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                match Self::apply_config(&state, &config) {
                    Ok(()) => {
                        metrics::record_config_reload("applied");
                        tracing::info!("Configuration reloaded");
                    }
                    Err(e) => {
                        metrics::record_config_reload("rejected");
                        tracing::error!(error = %e, "Rejected configuration update");
                    }
                }
            }
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown::wait_for(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Edge handler: one pipeline invocation per request.
async fn edge_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());

    let snapshot = state.current.load_full();
    let response = match pipeline::process(&snapshot.routing, snapshot.fetcher.as_ref(), request, peer).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    };

    metrics::record_request(&method, response.status().as_u16(), start);
    response
}
