//! Region and address denylist.
//!
//! Evaluation is a pure decision over client signals and the routing table.
//! A denial short-circuits the pipeline with a 403 before any upstream fetch.

use std::net::IpAddr;

use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};

use crate::routing::{ClientSignals, RoutingConfig};

pub const REGION_DENIED_MESSAGE: &str = "Access denied: this service is not available in your region.";
pub const ADDRESS_DENIED_MESSAGE: &str = "Access denied: your IP address is blocked.";

/// Why a client was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    Region,
    Address,
}

impl Denial {
    /// Label used in logs and metrics.
    pub fn reason(self) -> &'static str {
        match self {
            Denial::Region => "region",
            Denial::Address => "address",
        }
    }

    /// Text shown to the refused client.
    pub fn message(self) -> &'static str {
        match self {
            Denial::Region => REGION_DENIED_MESSAGE,
            Denial::Address => ADDRESS_DENIED_MESSAGE,
        }
    }
}

impl IntoResponse for Denial {
    fn into_response(self) -> Response {
        (
            StatusCode::FORBIDDEN,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.message(),
        )
            .into_response()
    }
}

/// Outcome of the access check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny(Denial),
}

impl AccessDecision {
    pub fn is_allowed(self) -> bool {
        self == AccessDecision::Allow
    }

    /// The denial, if the client was refused.
    pub fn denial(self) -> Option<Denial> {
        match self {
            AccessDecision::Allow => None,
            AccessDecision::Deny(denial) => Some(denial),
        }
    }

    /// Label used in logs and metrics.
    pub fn reason(self) -> &'static str {
        match self {
            AccessDecision::Allow => "allow",
            AccessDecision::Deny(denial) => denial.reason(),
        }
    }
}

/// Decide whether a client may proceed. Region is checked before address.
pub fn evaluate(region: Option<&str>, source_address: Option<&str>, config: &RoutingConfig) -> AccessDecision {
    if region.is_some_and(|r| !r.is_empty() && config.is_region_blocked(r)) {
        return AccessDecision::Deny(Denial::Region);
    }

    if let Some(address) = source_address.filter(|a| !a.is_empty()) {
        match address.parse::<IpAddr>() {
            Ok(ip) if config.blocked_addresses.contains(&ip) => return AccessDecision::Deny(Denial::Address),
            Ok(_) => {}
            Err(_) => tracing::debug!(address, "Source address is not an IP literal"),
        }
    }

    AccessDecision::Allow
}

/// [`evaluate`] over signals already extracted from the request.
pub fn evaluate_signals(signals: &ClientSignals, config: &RoutingConfig) -> AccessDecision {
    evaluate(signals.region.as_deref(), signals.source_address.as_deref(), config)
}
