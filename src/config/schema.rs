//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Backend definitions mapping university ids to base URLs.
    #[serde(default = "default_backends")]
    pub backends: Vec<BackendConfig>,

    /// Response cache settings.
    pub cache: CacheConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            backends: default_backends(),
            cache: CacheConfig::default(),
            timeouts: TimeoutConfig::default(),
            limits: LimitsConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Universities proxied when no config file overrides the table.
fn default_backends() -> Vec<BackendConfig> {
    vec![
        BackendConfig {
            id: "nuzp".to_string(),
            base_url: "https://api.zp.edu.ua".to_string(),
        },
        BackendConfig {
            id: "knu".to_string(),
            base_url: "https://api.knu.ua".to_string(),
        },
        BackendConfig {
            id: "lpnu".to_string(),
            base_url: "https://api.lpnu.ua".to_string(),
        },
    ]
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Backend definition.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
    /// Unique university identifier, matched case-sensitively against the
    /// first path segment after `/api/proxy/`.
    pub id: String,

    /// Base URL of the backend API (e.g., "https://api.zp.edu.ua").
    pub base_url: String,
}

/// Response cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Backing store for cached responses.
    pub backing: CacheBacking,

    /// Directory for the disk store. Ignored by the memory store.
    pub dir: String,

    /// Time-to-live applied to every cached entry, in seconds.
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backing: CacheBacking::Memory,
            dir: "cache".to_string(),
            ttl_secs: 3600,
        }
    }
}

/// Selects the cache backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CacheBacking {
    /// Process-local concurrent map. Entries are lost on restart.
    #[default]
    Memory,
    /// One file per entry under `cache.dir`. Entries survive restarts.
    Disk,
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Timeout for a single upstream call, in seconds.
    pub upstream_secs: u64,

    /// Total request timeout (inbound connection), in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            upstream_secs: 15,
            request_secs: 30,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum inbound body size in bytes. Larger bodies are rejected with 413.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
