//! Backend lookup by university id.
//!
//! # Responsibilities
//! - Store the configured id → base URL table
//! - Look up the backend for a request's `uni_id` path segment
//! - Return matched base URL or explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(1) id lookup via HashMap
//! - Ids are case-sensitive (they come from the URL path, not a header)
//! - Explicit `None` rather than silent default backend

use std::collections::HashMap;

use crate::config::BackendConfig;

/// Static mapping from university id to backend base URL.
#[derive(Debug, Default)]
pub struct BackendRegistry {
    backends: HashMap<String, String>,
}

impl BackendRegistry {
    /// Build the registry from validated configuration.
    ///
    /// Base URLs are normalized to have no trailing slash so that joining
    /// with the request path never produces `//`.
    pub fn from_config(backends: &[BackendConfig]) -> Self {
        let backends = backends
            .iter()
            .map(|b| {
                (
                    b.id.clone(),
                    b.base_url.trim_end_matches('/').to_string(),
                )
            })
            .collect();
        Self { backends }
    }

    /// Resolve a university id to its backend base URL.
    pub fn resolve(&self, id: &str) -> Option<&str> {
        self.backends.get(id).map(String::as_str)
    }

    /// Number of configured backends.
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    /// True when no backends are configured.
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> BackendRegistry {
        BackendRegistry::from_config(&[
            BackendConfig {
                id: "nuzp".to_string(),
                base_url: "https://api.zp.edu.ua".to_string(),
            },
            BackendConfig {
                id: "knu".to_string(),
                base_url: "https://api.knu.ua/".to_string(),
            },
        ])
    }

    #[test]
    fn test_resolve_known_ids() {
        let registry = registry();
        assert_eq!(registry.resolve("nuzp"), Some("https://api.zp.edu.ua"));
        // Trailing slash is normalized away.
        assert_eq!(registry.resolve("knu"), Some("https://api.knu.ua"));
    }

    #[test]
    fn test_resolve_unknown_id() {
        let registry = registry();
        assert_eq!(registry.resolve("unknown-uni"), None);
    }

    #[test]
    fn test_resolve_is_case_sensitive() {
        let registry = registry();
        assert_eq!(registry.resolve("NUZP"), None);
        assert_eq!(registry.resolve("Nuzp"), None);
    }

    #[test]
    fn test_len() {
        assert_eq!(registry().len(), 2);
        assert!(BackendRegistry::from_config(&[]).is_empty());
    }
}
