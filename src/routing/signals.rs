//! Per-request client signals.
//!
//! Every header the pipeline cares about is read here, once, and handed to
//! later stages as plain data.

use std::net::IpAddr;

use axum::http::{header, HeaderMap};
use serde::Serialize;

use crate::routing::classifier;
use crate::routing::table::SignalHeaders;

/// What the pipeline knows about the client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClientSignals {
    /// Region code as sent by the hosting environment (not case-normalized).
    pub region: Option<String>,
    pub source_address: Option<String>,
    pub is_mobile: bool,
}

impl ClientSignals {
    /// Derive signals from request headers.
    ///
    /// Empty or non-UTF-8 region and address values count as absent. The
    /// User-Agent is classified even when it is not valid UTF-8. `peer` is
    /// only consulted when the address header is missing and the fallback is on.
    pub fn from_headers(headers: &HeaderMap, names: &SignalHeaders, peer: Option<IpAddr>) -> Self {
        let region = header_text(headers, &names.region);
        let source_address = header_text(headers, &names.address).or_else(|| {
            if names.peer_address_fallback {
                peer.map(|ip| ip.to_string())
            } else {
                None
            }
        });
        // Tokens are ASCII, so a lossy decode keeps every match.
        let user_agent = headers
            .get(header::USER_AGENT)
            .map(|v| String::from_utf8_lossy(v.as_bytes()))
            .unwrap_or_default();

        Self {
            region,
            source_address,
            is_mobile: classifier::is_mobile(&user_agent),
        }
    }
}

fn header_text(headers: &HeaderMap, name: &header::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
