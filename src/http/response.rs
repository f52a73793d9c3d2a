//! Response handling and transformation.
//!
//! # Responsibilities
//! - Map the marker header's URL back onto the edge's own address space
//! - Pass status, every other header and the body through untouched
//!
//! # Design Decisions
//! - Streaming responses avoid buffering entire body
//! - A marker value that is not a URL is left as it is (fail open)
//! - Only the first occurrence of the outbound path is replaced

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Response},
};
use url::Url;

/// What happened to the marker header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerRewrite {
    Absent,
    Rewritten,
    /// Present but not a parseable absolute URL; left unmodified.
    Malformed,
}

impl MarkerRewrite {
    /// Label used in logs and metrics.
    pub fn label(self) -> &'static str {
        match self {
            MarkerRewrite::Absent => "absent",
            MarkerRewrite::Rewritten => "rewritten",
            MarkerRewrite::Malformed => "malformed",
        }
    }
}

/// Rewrite one marker URL against `reference`.
///
/// Scheme, host and port are taken from `reference`; the first occurrence of
/// `reference`'s path inside the marker's path is replaced with `/`. Query and
/// fragment of the marker are kept. Returns `None` if `value` is not an
/// absolute URL that can carry `reference`'s scheme and host.
pub fn rewrite_marker_url(value: &str, reference: &Url) -> Option<String> {
    let mut marker = Url::parse(value).ok()?;
    marker.set_scheme(reference.scheme()).ok()?;
    marker.set_host(reference.host_str()).ok()?;
    marker.set_port(reference.port()).ok()?;

    let path = marker.path().replacen(reference.path(), "/", 1);
    marker.set_path(&path);

    Some(marker.into())
}

/// Rewrite the marker header of `response` in place, if present.
pub fn rewrite_response(
    mut response: Response<Body>,
    reference: &Url,
    marker_header: &HeaderName,
) -> (Response<Body>, MarkerRewrite) {
    let Some(current) = response.headers().get(marker_header) else {
        return (response, MarkerRewrite::Absent);
    };

    let rewritten = current
        .to_str()
        .ok()
        .and_then(|value| rewrite_marker_url(value, reference))
        .and_then(|value| HeaderValue::from_str(&value).ok());

    match rewritten {
        Some(value) => {
            response.headers_mut().insert(marker_header.clone(), value);
            (response, MarkerRewrite::Rewritten)
        }
        None => {
            tracing::warn!(
                header = %marker_header,
                value = ?current,
                "Marker header is not a valid URL, leaving it unmodified"
            );
            (response, MarkerRewrite::Malformed)
        }
    }
}
