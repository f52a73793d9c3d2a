//! Per-request decision and rewrite pipeline.
//!
//! # Data Flow
//! ```text
//! Request
//!     → ClientSignals (read headers once)
//!     → access check ── Deny ──→ 403, no fetch
//!     → origin selection (mobile / region / default)
//!     → outbound URI + request
//!     → fetch ── Err / deadline ──→ EdgeError (502 / 504)
//!     → marker header rewrite
//!     → Response
//! ```
//!
//! Each invocation reads one `RoutingConfig` snapshot and shares nothing
//! mutable with other invocations. The fetch is the only await point.

use std::net::IpAddr;

use axum::{
    body::Body,
    http::{Request, Response, StatusCode},
    response::IntoResponse,
};
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::http::fetch::{FetchError, Fetcher};
use crate::http::request::{build_outbound_request, edge_url, request_id, UpstreamTarget};
use crate::http::response::{rewrite_response, MarkerRewrite};
use crate::observability::metrics;
use crate::routing::{select_origin, ClientSignals, RoutingConfig};
use crate::security::evaluate_signals;

/// Terminal failure of a pipeline invocation.
#[derive(Debug, Error)]
pub enum EdgeError {
    /// The outbound URI could not be assembled.
    #[error("failed to compose upstream URI: {0}")]
    InvalidTarget(#[from] axum::http::Error),

    /// The fetch collaborator failed.
    #[error(transparent)]
    Upstream(#[from] FetchError),
}

impl IntoResponse for EdgeError {
    fn into_response(self) -> axum::response::Response {
        match self {
            EdgeError::InvalidTarget(_) => (StatusCode::BAD_GATEWAY, "Invalid upstream target").into_response(),
            EdgeError::Upstream(FetchError::Timeout) => {
                (StatusCode::GATEWAY_TIMEOUT, "Upstream request timed out").into_response()
            }
            EdgeError::Upstream(_) => (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response(),
        }
    }
}

/// Everything decided about a request before anything is sent.
#[derive(Debug, Clone, Serialize)]
pub struct Decision {
    pub signals: ClientSignals,
    /// `allow`, `region` or `address`.
    pub access: &'static str,
    /// Rule that chose the origin; absent when access was denied.
    pub origin_kind: Option<String>,
    pub origin: Option<String>,
    pub outbound_uri: Option<String>,
}

/// Run the decision stages only: signals, access, origin, outbound URI.
///
/// No I/O. Used by the `explain` command.
pub fn decide(
    config: &RoutingConfig,
    request: &Request<Body>,
    peer: Option<IpAddr>,
) -> Result<Decision, EdgeError> {
    let signals = ClientSignals::from_headers(request.headers(), &config.signals, peer);
    let access = evaluate_signals(&signals, config);
    if !access.is_allowed() {
        return Ok(Decision {
            signals,
            access: access.reason(),
            origin_kind: None,
            origin: None,
            outbound_uri: None,
        });
    }

    let origin = select_origin(signals.is_mobile, signals.region.as_deref(), config);
    let target = UpstreamTarget::compose(origin.url, request.uri())?;
    Ok(Decision {
        access: access.reason(),
        origin_kind: Some(origin.kind.to_string()),
        origin: Some(origin.url.to_string()),
        outbound_uri: Some(target.uri.to_string()),
        signals,
    })
}

/// Process one request end to end.
pub async fn process(
    config: &RoutingConfig,
    fetcher: &dyn Fetcher,
    request: Request<Body>,
    peer: Option<IpAddr>,
) -> Result<Response<Body>, EdgeError> {
    let request_id = request_id(request.headers()).to_string();
    let signals = ClientSignals::from_headers(request.headers(), &config.signals, peer);

    if let Some(denial) = evaluate_signals(&signals, config).denial() {
        tracing::info!(
            request_id = %request_id,
            region = ?signals.region,
            source_address = ?signals.source_address,
            reason = denial.reason(),
            "Request denied"
        );
        metrics::record_denied(denial.reason());
        return Ok(denial.into_response());
    }

    let origin = select_origin(signals.is_mobile, signals.region.as_deref(), config);
    let (parts, body) = request.into_parts();
    let target = UpstreamTarget::compose(origin.url, &parts.uri)?;

    // Marker URLs are mapped onto the edge's own scheme and host, with the
    // outbound path as the prefix to strip.
    let reference = match edge_url(&parts.headers, &parts.uri, &config.public_scheme) {
        Some(mut url) => {
            url.set_path(target.uri.path());
            Some(url)
        }
        None => Url::parse(&target.uri.to_string()).ok(),
    };

    tracing::debug!(
        request_id = %request_id,
        region = ?signals.region,
        mobile = signals.is_mobile,
        origin = %origin.kind,
        upstream = %target.uri,
        "Forwarding request"
    );
    metrics::record_origin(origin.kind.label());

    let outbound = build_outbound_request(parts, body, &target);
    let fetched = tokio::time::timeout(
        config.request_timeout,
        fetcher.fetch(outbound, &config.optimization_directives),
    )
    .await
    .unwrap_or_else(|_| Err(FetchError::Timeout));
    let response = match fetched {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                upstream = %target.uri,
                error = %e,
                "Upstream error"
            );
            metrics::record_upstream_error(e.kind());
            return Err(e.into());
        }
    };

    let Some(reference) = reference else {
        return Ok(response);
    };
    let (response, marker) = rewrite_response(response, &reference, &config.marker_header);
    if marker != MarkerRewrite::Absent {
        metrics::record_marker_rewrite(marker.label());
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use axum::http::header;
    use futures_util::future::BoxFuture;

    use crate::config::EdgeConfig;
    use crate::http::fetch::OptimizationDirectives;
    use crate::security::access_control::{ADDRESS_DENIED_MESSAGE, REGION_DENIED_MESSAGE};

    /// Records outbound requests and answers with a fixed marker header.
    #[derive(Default)]
    struct StubFetcher {
        seen: Mutex<Vec<(String, String, Option<String>)>>,
        fail: bool,
        delay: Option<Duration>,
    }

    impl StubFetcher {
        fn calls(&self) -> Vec<(String, String, Option<String>)> {
            self.seen.lock().unwrap().clone()
        }
    }

    impl Fetcher for StubFetcher {
        fn fetch<'a>(
            &'a self,
            request: Request<Body>,
            directives: &'a OptimizationDirectives,
        ) -> BoxFuture<'a, Result<Response<Body>, FetchError>> {
            Box::pin(async move {
                let polish = directives.get("polish").and_then(|v| v.as_str()).map(String::from);
                self.seen
                    .lock()
                    .unwrap()
                    .push((request.method().to_string(), request.uri().to_string(), polish));
                if self.fail {
                    return Err(FetchError::Timeout);
                }
                if let Some(delay) = self.delay {
                    tokio::time::sleep(delay).await;
                }
                let marker = format!("https://upstream.example.org{}", request.uri().path());
                let body = axum::body::to_bytes(request.into_body(), usize::MAX).await.unwrap();
                Ok(Response::builder()
                    .status(StatusCode::OK)
                    .header("x-pjax-url", marker)
                    .header("x-upstream", "stub")
                    .body(Body::from(body))
                    .unwrap())
            })
        }
    }

    fn table() -> RoutingConfig {
        let mut config = EdgeConfig::default();
        config.upstream.default = "https://en.example.org/".into();
        config.upstream.mobile = "https://m.example.org/".into();
        config.routes.clear();
        config.routes.insert("TW".into(), "https://zh.example.org/".into());
        config.routes.insert("FR".into(), "https://fr.example.org/".into());
        config.firewall.blocked_regions = vec!["CN".into()];
        config.firewall.blocked_addresses = vec!["203.0.113.7".into()];
        config.optimization.insert("polish".into(), serde_json::json!("lossless"));
        RoutingConfig::from_config(&config).unwrap()
    }

    fn request(path: &str, headers: &[(&str, &str)]) -> Request<Body> {
        let mut builder = Request::builder().uri(path).header(header::HOST, "edge.example.org");
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn body_text(response: Response<Body>) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn blocked_region_never_fetches() {
        let table = table();
        let fetcher = StubFetcher::default();

        for region in ["CN", "cn"] {
            let response = process(&table, &fetcher, request("/Article", &[("cf-ipcountry", region)]), None)
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::FORBIDDEN);
            assert_eq!(body_text(response).await, REGION_DENIED_MESSAGE);
        }
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn blocked_address_never_fetches() {
        let table = table();
        let fetcher = StubFetcher::default();

        let response = process(
            &table,
            &fetcher,
            request("/", &[("cf-connecting-ip", "203.0.113.7")]),
            None,
        )
        .await
        .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(body_text(response).await, ADDRESS_DENIED_MESSAGE);
        assert!(fetcher.calls().is_empty());
    }

    #[tokio::test]
    async fn region_route_end_to_end() {
        let table = table();
        let fetcher = StubFetcher::default();

        let response = process(
            &table,
            &fetcher,
            request(
                "/Article?lang=zh",
                &[
                    ("cf-ipcountry", "TW"),
                    ("user-agent", "Mozilla/5.0 (Windows NT 10.0; Win64; x64)"),
                ],
            ),
            None,
        )
        .await
        .unwrap();

        assert_eq!(
            fetcher.calls(),
            vec![(
                "GET".to_string(),
                "https://zh.example.org//Article?lang=zh".to_string(),
                Some("lossless".to_string()),
            )]
        );
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-upstream"], "stub");
        // Upstream marker path equals the outbound path, so it collapses to the edge root.
        assert_eq!(response.headers()["x-pjax-url"], "http://edge.example.org/");
    }

    #[tokio::test]
    async fn mobile_client_ignores_region() {
        let table = table();
        let fetcher = StubFetcher::default();

        process(
            &table,
            &fetcher,
            request(
                "/Article",
                &[
                    ("cf-ipcountry", "FR"),
                    ("user-agent", "Mozilla/5.0 (Linux; Android 14; Pixel 8)"),
                ],
            ),
            None,
        )
        .await
        .unwrap();

        assert_eq!(fetcher.calls()[0].1, "https://m.example.org//Article");
    }

    #[tokio::test]
    async fn body_is_forwarded() {
        let table = table();
        let fetcher = StubFetcher::default();
        let request = Request::builder()
            .method("POST")
            .uri("/submit")
            .header(header::HOST, "edge.example.org")
            .body(Body::from("form=data"))
            .unwrap();

        let response = process(&table, &fetcher, request, None).await.unwrap();
        assert_eq!(fetcher.calls()[0].0, "POST");
        assert_eq!(body_text(response).await, "form=data");
    }

    #[tokio::test]
    async fn fetch_failure_is_terminal() {
        let table = table();
        let fetcher = StubFetcher {
            fail: true,
            ..Default::default()
        };

        let err = process(&table, &fetcher, request("/", &[]), None).await.unwrap_err();
        assert!(matches!(err, EdgeError::Upstream(FetchError::Timeout)));
        assert_eq!(err.into_response().status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(fetcher.calls().len(), 1);
    }

    #[tokio::test]
    async fn slow_upstream_hits_the_deadline() {
        let mut table = table();
        table.request_timeout = Duration::from_millis(50);
        let fetcher = StubFetcher {
            delay: Some(Duration::from_secs(2)),
            ..Default::default()
        };

        let err = process(&table, &fetcher, request("/Article", &[]), None).await.unwrap_err();
        assert!(matches!(err, EdgeError::Upstream(FetchError::Timeout)));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(body_text(response).await, "Upstream request timed out");
    }

    #[test]
    fn decide_reports_each_stage() {
        let table = table();

        let decision = decide(&table, &request("/Article", &[("cf-ipcountry", "tw")]), None).unwrap();
        assert_eq!(decision.access, "allow");
        assert_eq!(decision.origin_kind.as_deref(), Some("region:TW"));
        assert_eq!(decision.outbound_uri.as_deref(), Some("https://zh.example.org//Article"));

        let decision = decide(&table, &request("/", &[("cf-ipcountry", "CN")]), None).unwrap();
        assert_eq!(decision.access, "region");
        assert!(decision.origin.is_none());
    }
}
