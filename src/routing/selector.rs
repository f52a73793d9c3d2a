//! Origin selection.
//!
//! Priority: mobile clients go to the mobile upstream, then a region-specific
//! mirror if one is configured, then the default upstream. Total: always
//! returns an origin.

use std::fmt;

use url::Url;

use crate::routing::table::RoutingConfig;

/// Why an origin was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OriginKind {
    Mobile,
    /// Uppercase region code whose mirror was used.
    Region(String),
    Default,
}

impl OriginKind {
    /// Low-cardinality label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            OriginKind::Mobile => "mobile",
            OriginKind::Region(_) => "region",
            OriginKind::Default => "default",
        }
    }
}

impl fmt::Display for OriginKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OriginKind::Region(code) => write!(f, "region:{code}"),
            other => f.write_str(other.label()),
        }
    }
}

/// The chosen base URL and the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedOrigin<'a> {
    pub url: &'a Url,
    pub kind: OriginKind,
}

/// Choose the upstream base URL for a request.
pub fn select_origin<'a>(
    is_mobile: bool,
    region: Option<&str>,
    config: &'a RoutingConfig,
) -> SelectedOrigin<'a> {
    if is_mobile {
        return SelectedOrigin {
            url: &config.mobile_upstream,
            kind: OriginKind::Mobile,
        };
    }

    if let Some(region) = region {
        if let Some(url) = config.route_for(region) {
            return SelectedOrigin {
                url,
                kind: OriginKind::Region(region.to_ascii_uppercase()),
            };
        }
    }

    SelectedOrigin {
        url: &config.default_upstream,
        kind: OriginKind::Default,
    }
}
