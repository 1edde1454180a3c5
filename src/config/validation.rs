//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check backend table integrity (unique ids, well-formed base URLs)
//! - Validate value ranges (TTL and timeouts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system; a rejected config is a
//!   startup-time fatal, never a per-request error

use std::collections::HashSet;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic violation found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A backend entry has an empty id.
    EmptyBackendId,
    /// Two backend entries share the same id.
    DuplicateBackendId(String),
    /// A backend entry has an empty base URL.
    EmptyBaseUrl(String),
    /// A backend base URL failed to parse.
    InvalidBaseUrl { id: String, reason: String },
    /// A backend base URL uses a scheme other than http/https.
    UnsupportedScheme { id: String, scheme: String },
    /// The cache TTL is zero.
    ZeroCacheTtl,
    /// The upstream timeout is zero.
    ZeroUpstreamTimeout,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::EmptyBackendId => write!(f, "backend id must not be empty"),
            ValidationError::DuplicateBackendId(id) => {
                write!(f, "duplicate backend id '{}'", id)
            }
            ValidationError::EmptyBaseUrl(id) => {
                write!(f, "backend '{}' has an empty base URL", id)
            }
            ValidationError::InvalidBaseUrl { id, reason } => {
                write!(f, "backend '{}' has an invalid base URL: {}", id, reason)
            }
            ValidationError::UnsupportedScheme { id, scheme } => {
                write!(f, "backend '{}' uses unsupported scheme '{}'", id, scheme)
            }
            ValidationError::ZeroCacheTtl => write!(f, "cache.ttl_secs must be greater than zero"),
            ValidationError::ZeroUpstreamTimeout => {
                write!(f, "timeouts.upstream_secs must be greater than zero")
            }
        }
    }
}

/// Validate semantic constraints on a parsed configuration.
///
/// Collects every violation instead of stopping at the first one.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let mut seen_ids = HashSet::new();

    for backend in &config.backends {
        if backend.id.is_empty() {
            errors.push(ValidationError::EmptyBackendId);
        } else if !seen_ids.insert(backend.id.as_str()) {
            errors.push(ValidationError::DuplicateBackendId(backend.id.clone()));
        }

        if backend.base_url.is_empty() {
            errors.push(ValidationError::EmptyBaseUrl(backend.id.clone()));
            continue;
        }
        match Url::parse(&backend.base_url) {
            Ok(url) if url.scheme() != "http" && url.scheme() != "https" => {
                errors.push(ValidationError::UnsupportedScheme {
                    id: backend.id.clone(),
                    scheme: url.scheme().to_string(),
                });
            }
            Ok(_) => {}
            Err(e) => {
                errors.push(ValidationError::InvalidBaseUrl {
                    id: backend.id.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    if config.cache.ttl_secs == 0 {
        errors.push(ValidationError::ZeroCacheTtl);
    }
    if config.timeouts.upstream_secs == 0 {
        errors.push(ValidationError::ZeroUpstreamTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
