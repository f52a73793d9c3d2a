//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Origin URLs are absolute http(s) URLs with a host
//! - Region codes are two ASCII letters, unique case-insensitively
//! - Denylisted addresses are IP literals
//! - Header names and listener settings are usable
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EdgeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderName;
use thiserror::Error;
use url::Url;

use crate::config::schema::EdgeConfig;
use crate::routing::RoutingConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid URL {value:?}: {reason}")]
    InvalidUrl {
        field: String,
        value: String,
        reason: String,
    },

    #[error("{field}: {value:?} is not a two-letter region code")]
    InvalidRegion { field: String, value: String },

    #[error("routes: region {region} is listed more than once")]
    DuplicateRegion { region: String },

    #[error("{field}: {value:?} is not an IP address")]
    InvalidAddress { field: String, value: String },

    #[error("{field}: {value:?} is not a valid header name")]
    InvalidHeaderName { field: String, value: String },

    #[error("listener.bind_address: {value:?} is not a socket address")]
    InvalidBindAddress { value: String },

    #[error("listener.public_scheme: {value:?} must be \"http\" or \"https\"")]
    InvalidScheme { value: String },

    #[error("{field} must be greater than zero")]
    ZeroTimeout { field: &'static str },
}

/// Validate a full configuration, collecting every error.
pub fn validate_config(config: &EdgeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress {
            value: config.listener.bind_address.clone(),
        });
    }
    if !matches!(config.listener.public_scheme.as_str(), "http" | "https") {
        errors.push(ValidationError::InvalidScheme {
            value: config.listener.public_scheme.clone(),
        });
    }
    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::ZeroTimeout {
            field: "timeouts.connect_secs",
        });
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout {
            field: "timeouts.request_secs",
        });
    }
    if let Some(name) = &config.fetch.directives_header {
        if let Err(e) = parse_header_name("fetch.directives_header", name) {
            errors.push(e);
        }
    }

    if let Err(routing_errors) = RoutingConfig::from_config(config) {
        errors.extend(routing_errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Parse an origin URL. It must be absolute, http(s), and carry a host.
pub fn parse_origin(field: &str, value: &str) -> Result<Url, ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidUrl {
        field: field.to_string(),
        value: value.to_string(),
        reason,
    };

    let url = Url::parse(value).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
    }
    if !url.has_host() {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

/// Parse a region code into its canonical uppercase form.
pub fn parse_region(field: &str, value: &str) -> Result<String, ValidationError> {
    if value.len() == 2 && value.bytes().all(|b| b.is_ascii_alphabetic()) {
        Ok(value.to_ascii_uppercase())
    } else {
        Err(ValidationError::InvalidRegion {
            field: field.to_string(),
            value: value.to_string(),
        })
    }
}

/// Parse an IP literal.
pub fn parse_address(field: &str, value: &str) -> Result<IpAddr, ValidationError> {
    value.trim().parse().map_err(|_| ValidationError::InvalidAddress {
        field: field.to_string(),
        value: value.to_string(),
    })
}

/// Parse a header name.
pub fn parse_header_name(field: &str, value: &str) -> Result<HeaderName, ValidationError> {
    HeaderName::from_bytes(value.as_bytes()).map_err(|_| ValidationError::InvalidHeaderName {
        field: field.to_string(),
        value: value.to_string(),
    })
}
