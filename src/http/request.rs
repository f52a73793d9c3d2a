//! Request handling and transformation.
//!
//! # Responsibilities
//! - Generate unique request ID (UUID v4)
//! - Compose the outbound URI from the selected origin and the inbound URI
//! - Reconstruct the edge's own URL as the client addressed it
//! - Prepare request for forwarding to the origin
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Outbound path is the origin's path followed by the inbound path, joined
//!   as plain strings: `/` + `/Article` is `//Article`. Origins match on
//!   this exact string, so it is never normalized
//! - Method, headers and body move to the outbound request untouched

use axum::{
    body::Body,
    http::{header, request::Parts, HeaderMap, HeaderName, Request, Uri},
};
use tower_http::request_id::{MakeRequestId, RequestId};
use url::Url;
use uuid::Uuid;

/// Header carrying the per-request correlation id.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

const X_FORWARDED_PROTO: HeaderName = HeaderName::from_static("x-forwarded-proto");

/// Generates a UUID v4 for requests that arrive without an id.
#[derive(Debug, Clone, Copy, Default)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        Uuid::new_v4()
            .to_string()
            .parse()
            .ok()
            .map(RequestId::new)
    }
}

/// Request id of a request, or `"unknown"`.
pub fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
}

/// Where a request is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    /// Full outbound URI.
    pub uri: Uri,
}

impl UpstreamTarget {
    pub fn compose(base: &Url, inbound: &Uri) -> Result<Self, axum::http::Error> {
        Ok(Self {
            uri: compose_outbound_uri(base, inbound)?,
        })
    }
}

/// Put `inbound` onto `base`: scheme and host (with port) come from `base`,
/// the path is `base.path() + inbound.path()`, the query is the inbound one.
pub fn compose_outbound_uri(base: &Url, inbound: &Uri) -> Result<Uri, axum::http::Error> {
    let host = base.host_str().unwrap_or_default();
    let authority = match base.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    };

    let mut path_and_query = format!("{}{}", base.path(), inbound.path());
    if let Some(query) = inbound.query() {
        path_and_query.push('?');
        path_and_query.push_str(query);
    }

    Uri::builder()
        .scheme(base.scheme())
        .authority(authority.as_str())
        .path_and_query(path_and_query.as_str())
        .build()
}

/// The URL the client used to reach the edge.
///
/// Scheme comes from `x-forwarded-proto`, then the request URI, then
/// `public_scheme`; host from the `Host` header, then the request URI.
pub fn edge_url(headers: &HeaderMap, uri: &Uri, public_scheme: &str) -> Option<Url> {
    let scheme = headers
        .get(X_FORWARDED_PROTO)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| matches!(*v, "http" | "https"))
        .or_else(|| uri.scheme_str())
        .unwrap_or(public_scheme);

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .or_else(|| uri.authority().map(|a| a.as_str()))?;

    let mut url = Url::parse(&format!("{scheme}://{host}")).ok()?;
    url.set_path(uri.path());
    url.set_query(uri.query());
    Some(url)
}

/// Point an inbound request at `target`, keeping everything else.
pub fn build_outbound_request(mut parts: Parts, body: Body, target: &UpstreamTarget) -> Request<Body> {
    parts.uri = target.uri.clone();
    Request::from_parts(parts, body)
}
