//! Upstream fetch collaborator.
//!
//! # Responsibilities
//! - Send the rewritten request to the selected origin
//! - Stream request and response bodies without buffering them
//! - Carry the opaque optimization directives alongside the request
//!
//! # Design Decisions
//! - Object-safe trait so the pipeline can be driven by a stub in tests
//! - No retries and no fallback origin; failures surface to the caller
//! - Redirects are passed through to the client, never followed
//! - `Host` is derived from the outbound URL, every other header is copied

use std::time::Duration;

use axum::{
    body::{Body, HttpBody},
    http::{header, HeaderName, HeaderValue, Request, Response},
};
use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::config::{FetchConfig, TimeoutConfig};

/// Opaque performance and caching hints. Never interpreted by the edge.
pub type OptimizationDirectives = serde_json::Map<String, serde_json::Value>;

/// Failure to obtain a response from the origin.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The origin did not answer in time.
    #[error("upstream request timed out")]
    Timeout,

    /// Connection, TLS or protocol failure.
    #[error("upstream unreachable: {0}")]
    Transport(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The request could not be handed to the client.
    #[error("invalid upstream request: {0}")]
    InvalidRequest(String),
}

impl FetchError {
    /// Label used in logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout => "timeout",
            FetchError::Transport(_) => "transport",
            FetchError::InvalidRequest(_) => "invalid_request",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else if e.is_builder() {
            FetchError::InvalidRequest(e.to_string())
        } else {
            FetchError::Transport(Box::new(e))
        }
    }
}

/// The edge's only network egress.
pub trait Fetcher: Send + Sync {
    /// Forward `request` to the origin named by its URI.
    fn fetch<'a>(
        &'a self,
        request: Request<Body>,
        directives: &'a OptimizationDirectives,
    ) -> BoxFuture<'a, Result<Response<Body>, FetchError>>;
}

/// [`Fetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
    directives_header: Option<HeaderName>,
}

impl ReqwestFetcher {
    /// Build the client from configuration.
    pub fn new(fetch: &FetchConfig, timeouts: &TimeoutConfig) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(Duration::from_secs(timeouts.connect_secs));
        if !fetch.use_system_proxy {
            builder = builder.no_proxy();
        }
        let client = builder.build()?;

        let directives_header = fetch
            .directives_header
            .as_deref()
            .map(|name| {
                HeaderName::from_bytes(name.as_bytes())
                    .map_err(|e| FetchError::InvalidRequest(format!("directives header {name:?}: {e}")))
            })
            .transpose()?;

        Ok(Self {
            client,
            directives_header,
        })
    }
}

impl Fetcher for ReqwestFetcher {
    fn fetch<'a>(
        &'a self,
        request: Request<Body>,
        directives: &'a OptimizationDirectives,
    ) -> BoxFuture<'a, Result<Response<Body>, FetchError>> {
        Box::pin(async move {
            let (parts, body) = request.into_parts();

            let url = reqwest::Url::parse(&parts.uri.to_string())
                .map_err(|e| FetchError::InvalidRequest(format!("{}: {e}", parts.uri)))?;

            let mut headers = parts.headers;
            headers.remove(header::HOST);
            if let Some(name) = &self.directives_header {
                let encoded = serde_json::to_string(directives)
                    .map_err(|e| FetchError::InvalidRequest(e.to_string()))?;
                let value = HeaderValue::from_str(&encoded)
                    .map_err(|e| FetchError::InvalidRequest(e.to_string()))?;
                headers.insert(name.clone(), value);
            }

            let mut outbound = self.client.request(parts.method, url).headers(headers);
            // A bodiless request must not turn into an empty chunked upload.
            if !body.is_end_stream() {
                outbound = outbound.body(reqwest::Body::wrap_stream(body.into_data_stream()));
            }
            let response = outbound.send().await?;

            let mut builder = Response::builder().status(response.status());
            if let Some(out) = builder.headers_mut() {
                for (name, value) in response.headers() {
                    out.append(name.clone(), value.clone());
                }
            }

            builder
                .body(Body::from_stream(response.bytes_stream()))
                .map_err(|e| FetchError::InvalidRequest(e.to_string()))
        })
    }
}
