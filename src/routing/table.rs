//! Compiled routing and firewall table.
//!
//! # Responsibilities
//! - Parse origin URLs once at startup
//! - Canonicalize region codes to uppercase
//! - Hold the address denylist as parsed IPs
//! - Resolve the header names signals are read from
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) region lookup via HashMap
//! - Scrape shield is folded into the directive bag here so the fetch
//!   collaborator only ever sees one opaque map

use std::collections::{HashMap, HashSet};
use std::net::IpAddr;
use std::time::Duration;

use axum::http::HeaderName;
use url::Url;

use crate::config::schema::EdgeConfig;
use crate::config::validation::{
    parse_address, parse_header_name, parse_origin, parse_region, ValidationError,
};
use crate::http::fetch::OptimizationDirectives;

/// Header names client signals are read from.
#[derive(Debug, Clone)]
pub struct SignalHeaders {
    pub region: HeaderName,
    pub address: HeaderName,
    pub peer_address_fallback: bool,
}

/// The immutable table every pipeline invocation reads.
#[derive(Debug, Clone)]
pub struct RoutingConfig {
    pub default_upstream: Url,
    pub mobile_upstream: Url,
    /// Keys are uppercase two-letter region codes.
    pub region_routes: HashMap<String, Url>,
    /// Uppercase two-letter region codes.
    pub blocked_regions: HashSet<String>,
    pub blocked_addresses: HashSet<IpAddr>,
    pub optimization_directives: OptimizationDirectives,
    pub signals: SignalHeaders,
    pub marker_header: HeaderName,
    /// Scheme assumed for the edge's own URL when the client does not say.
    pub public_scheme: String,
    /// Deadline for the upstream to answer with response headers.
    pub request_timeout: Duration,
}

fn keep<T>(errors: &mut Vec<ValidationError>, result: Result<T, ValidationError>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            errors.push(e);
            None
        }
    }
}

impl RoutingConfig {
    /// Compile a configuration, collecting every problem found.
    pub fn from_config(config: &EdgeConfig) -> Result<Self, Vec<ValidationError>> {
        let mut errors = Vec::new();

        let default_upstream = keep(&mut errors, parse_origin("upstream.default", &config.upstream.default));
        let mobile_upstream = keep(&mut errors, parse_origin("upstream.mobile", &config.upstream.mobile));

        let mut region_routes = HashMap::with_capacity(config.routes.len());
        let mut duplicates = Vec::new();
        for (region, origin) in &config.routes {
            let field = format!("routes.{region}");
            let code = keep(&mut errors, parse_region("routes", region));
            let url = keep(&mut errors, parse_origin(&field, origin));
            if let (Some(code), Some(url)) = (code, url) {
                if region_routes.insert(code.clone(), url).is_some() {
                    duplicates.push(code);
                }
            }
        }

        let blocked_regions: HashSet<String> = config
            .firewall
            .blocked_regions
            .iter()
            .filter_map(|r| keep(&mut errors, parse_region("firewall.blocked_regions", r)))
            .collect();

        let blocked_addresses: HashSet<IpAddr> = config
            .firewall
            .blocked_addresses
            .iter()
            .filter_map(|a| keep(&mut errors, parse_address("firewall.blocked_addresses", a)))
            .collect();

        let region_header = keep(&mut errors, parse_header_name("signals.region_header", &config.signals.region_header));
        let address_header = keep(&mut errors, parse_header_name("signals.address_header", &config.signals.address_header));
        let marker_header = keep(&mut errors, parse_header_name("rewrite.marker_header", &config.rewrite.marker_header));

        errors.extend(
            duplicates
                .into_iter()
                .map(|region| ValidationError::DuplicateRegion { region }),
        );

        match (default_upstream, mobile_upstream, region_header, address_header, marker_header) {
            (Some(default_upstream), Some(mobile_upstream), Some(region), Some(address), Some(marker_header))
                if errors.is_empty() =>
            {
                let mut optimization_directives = config.optimization.clone();
                optimization_directives.insert(
                    "scrape_shield".to_string(),
                    serde_json::Value::Bool(config.firewall.scrape_shield),
                );

                Ok(Self {
                    default_upstream,
                    mobile_upstream,
                    region_routes,
                    blocked_regions,
                    blocked_addresses,
                    optimization_directives,
                    signals: SignalHeaders {
                        region,
                        address,
                        peer_address_fallback: config.signals.peer_address_fallback,
                    },
                    marker_header,
                    public_scheme: config.listener.public_scheme.clone(),
                    request_timeout: Duration::from_secs(config.timeouts.request_secs),
                })
            }
            _ => Err(errors),
        }
    }

    /// Look up a region-specific mirror. `region` is matched case-insensitively.
    pub fn route_for(&self, region: &str) -> Option<&Url> {
        self.region_routes.get(&region.to_ascii_uppercase())
    }

    /// Whether a region is denylisted. `region` is matched case-insensitively.
    pub fn is_region_blocked(&self, region: &str) -> bool {
        self.blocked_regions.contains(&region.to_ascii_uppercase())
    }
}
