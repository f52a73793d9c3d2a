//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the edge layer.
//! All types derive Serde traits for deserialization from config files.
//! Values here are raw strings; `RoutingConfig::from_config` compiles them
//! into the parsed runtime table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the edge layer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EdgeConfig {
    /// Listener configuration (bind address, public scheme).
    pub listener: ListenerConfig,

    /// Default and mobile upstreams.
    pub upstream: UpstreamConfig,

    /// Region code to mirror URL.
    pub routes: BTreeMap<String, String>,

    /// Region and address denylists.
    pub firewall: FirewallConfig,

    /// Opaque directives handed to the fetch collaborator.
    pub optimization: serde_json::Map<String, serde_json::Value>,

    /// Names of the headers client signals are read from.
    pub signals: SignalsConfig,

    /// Response header rewriting.
    pub rewrite: RewriteConfig,

    /// Upstream client settings.
    pub fetch: FetchConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            upstream: UpstreamConfig::default(),
            routes: BTreeMap::from([
                ("TW".to_string(), "https://zh.wikipedia.org/".to_string()),
                ("HK".to_string(), "https://zh.wikipedia.org/".to_string()),
                ("FR".to_string(), "https://fr.wikipedia.org/".to_string()),
            ]),
            firewall: FirewallConfig::default(),
            optimization: serde_json::Map::new(),
            signals: SignalsConfig::default(),
            rewrite: RewriteConfig::default(),
            fetch: FetchConfig::default(),
            timeouts: TimeoutConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Scheme clients reach the edge with, used when no
    /// `x-forwarded-proto` header says otherwise.
    pub public_scheme: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            public_scheme: "http".to_string(),
        }
    }
}

/// Upstream origins that are not region-specific.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Origin used when nothing more specific matches.
    pub default: String,

    /// Origin for clients classified as mobile.
    pub mobile: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            default: "https://en.wikipedia.org/".to_string(),
            mobile: "https://en.m.wikipedia.org/".to_string(),
        }
    }
}

/// Region and address denylists.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FirewallConfig {
    /// Two-letter region codes that are refused (case-insensitive).
    pub blocked_regions: Vec<String>,

    /// IP literals that are refused.
    pub blocked_addresses: Vec<String>,

    /// Forwarded to the fetch collaborator as the `scrape_shield` directive.
    pub scrape_shield: bool,
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            blocked_regions: ["CN", "KP", "SY", "PK", "CU"]
                .into_iter()
                .map(String::from)
                .collect(),
            blocked_addresses: vec!["0.0.0.0".to_string(), "127.0.0.1".to_string()],
            scrape_shield: true,
        }
    }
}

/// Where per-request client signals come from.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SignalsConfig {
    /// Header carrying the two-letter region code.
    pub region_header: String,

    /// Header carrying the client IP address.
    pub address_header: String,

    /// Use the TCP peer address when the address header is missing.
    pub peer_address_fallback: bool,
}

impl Default for SignalsConfig {
    fn default() -> Self {
        Self {
            region_header: "cf-ipcountry".to_string(),
            address_header: "cf-connecting-ip".to_string(),
            peer_address_fallback: false,
        }
    }
}

/// Response header rewriting.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Response header whose URL value is mapped back onto the edge.
    pub marker_header: String,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            marker_header: "x-pjax-url".to_string(),
        }
    }
}

/// Upstream client settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct FetchConfig {
    /// When set, the directive bag is attached to outbound requests as JSON
    /// under this header name.
    pub directives_header: Option<String>,

    /// Honour `HTTP_PROXY`/`HTTPS_PROXY` for upstream requests.
    pub use_system_proxy: bool,
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Upstream connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
