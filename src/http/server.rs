//! HTTP server setup and the proxy request pipeline.
//!
//! # Responsibilities
//! - Create the Axum router and middleware stack (trace, timeout, CORS,
//!   request ID)
//! - Resolve the backend for `/api/proxy/{uni_id}/...`
//! - Decide cache hit/miss for GET/POST and annotate `X-Proxy-Cache`
//! - Forward misses upstream with filtered headers
//! - Store eligible 200 responses in the cache before responding

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{Path, State},
    http::{HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::any,
    Json, Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::cache::{derive_key, CacheStore, CachedEntry};
use crate::config::GatewayConfig;
use crate::http::headers::{filter_inbound, filter_outbound};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer, X_REQUEST_ID};
use crate::observability::metrics;
use crate::routing::BackendRegistry;
use crate::upstream::UpstreamClient;

/// Diagnostic header naming the cache outcome for a proxied response.
pub const X_PROXY_CACHE: &str = "x-proxy-cache";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<BackendRegistry>,
    pub cache: Arc<dyn CacheStore>,
    pub upstream: UpstreamClient,
    pub cache_ttl: Duration,
    pub max_body_bytes: usize,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    /// Create a new HTTP server from validated configuration and an injected
    /// cache store.
    pub fn new(
        config: GatewayConfig,
        cache: Arc<dyn CacheStore>,
    ) -> Result<Self, reqwest::Error> {
        let registry = Arc::new(BackendRegistry::from_config(&config.backends));
        let upstream = UpstreamClient::new(Duration::from_secs(config.timeouts.upstream_secs))?;

        let state = AppState {
            registry,
            cache,
            upstream,
            cache_ttl: Duration::from_secs(config.cache.ttl_secs),
            max_body_bytes: config.limits.max_body_bytes,
        };

        Ok(Self {
            router: Self::build_router(&config, state),
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/api/proxy/{uni_id}", any(proxy_root_handler))
            .route("/api/proxy/{uni_id}/{*path}", any(proxy_handler))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(
                config.timeouts.request_secs,
            )))
            .layer(
                CorsLayer::new()
                    .allow_origin(Any)
                    .allow_methods(Any)
                    .allow_headers(Any),
            )
            .layer(propagate_request_id_layer())
            .layer(TraceLayer::new_for_http())
            .layer(set_request_id_layer())
    }

    /// Run the server, accepting connections on the given listener until the
    /// shutdown channel fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn proxy_root_handler(
    State(state): State<AppState>,
    Path(uni_id): Path<String>,
    request: Request<Body>,
) -> Response {
    proxy_pipeline(state, uni_id, String::new(), request).await
}

async fn proxy_handler(
    State(state): State<AppState>,
    Path((uni_id, path)): Path<(String, String)>,
    request: Request<Body>,
) -> Response {
    proxy_pipeline(state, uni_id, path, request).await
}

/// The proxy pipeline: resolve backend, consult cache, forward, store, respond.
async fn proxy_pipeline(
    state: AppState,
    uni_id: String,
    path: String,
    request: Request<Body>,
) -> Response {
    let start = Instant::now();
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let method = request.method().clone();
    let method_str = method.to_string();

    // Preflight needs no backend: answer before resolution.
    if method == Method::OPTIONS {
        metrics::record_request(&method_str, 200, "none", start);
        return StatusCode::OK.into_response();
    }

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        uni_id = %uni_id,
        path = %path,
        "Proxying request"
    );

    // 1. Resolve backend
    let Some(base_url) = state.registry.resolve(&uni_id) else {
        tracing::warn!(request_id = %request_id, uni_id = %uni_id, "Unknown university id");
        metrics::record_request(&method_str, 404, "none", start);
        return error_response(
            StatusCode::NOT_FOUND,
            format!("University '{uni_id}' not supported"),
        );
    };

    // 2. Target URL: base + path + original query string
    let query = request
        .uri()
        .query()
        .map(|q| format!("?{q}"))
        .unwrap_or_default();
    let target_url = format!("{base_url}/{path}{query}");

    // 3. Buffer the body; the cache key and the forwarded request both need it
    let (parts, body) = request.into_parts();
    let body_bytes = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Failed to buffer request body");
            metrics::record_request(&method_str, 413, &uni_id, start);
            return error_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                "request body too large".to_string(),
            );
        }
    };

    // 4. Cache lookup, GET/POST only
    let cacheable = method == Method::GET || method == Method::POST;
    let cache_key = cacheable.then(|| derive_key(&method, &target_url, &body_bytes));
    if let Some(key) = &cache_key {
        if let Some(entry) = state.cache.get(key) {
            tracing::debug!(request_id = %request_id, key = %key, "Cache hit");
            metrics::record_cache_event("hit");
            metrics::record_request(&method_str, entry.status, &uni_id, start);
            return cached_response(entry);
        }
        metrics::record_cache_event("miss");
    }

    // 5. Forward with filtered headers
    let outbound_headers = filter_inbound(&parts.headers);
    let upstream_response = match state
        .upstream
        .forward(method.clone(), &target_url, outbound_headers, body_bytes.to_vec())
        .await
    {
        Ok(response) => response,
        Err(e) => {
            let status = e.status();
            tracing::error!(
                request_id = %request_id,
                target = %target_url,
                error = ?e,
                "Upstream request failed"
            );
            metrics::record_request(&method_str, status.as_u16(), &uni_id, start);
            return error_response(status, e.to_string());
        }
    };

    // 6. Store eligible responses before responding
    let response_headers = filter_outbound(&upstream_response.headers);
    if let Some(key) = &cache_key {
        if upstream_response.status == StatusCode::OK {
            let entry = CachedEntry {
                status: upstream_response.status.as_u16(),
                headers: header_pairs(&response_headers),
                body: upstream_response.body.clone(),
            };
            state.cache.set(key, entry, state.cache_ttl);
            metrics::record_cache_event("store");
        }
    }

    tracing::debug!(
        request_id = %request_id,
        status = %upstream_response.status,
        backend = %uni_id,
        "Proxied request"
    );
    metrics::record_request(
        &method_str,
        upstream_response.status.as_u16(),
        &uni_id,
        start,
    );
    build_response(
        upstream_response.status,
        response_headers,
        upstream_response.body,
        "MISS",
    )
}

/// JSON error body in the shape `{"error": <message>}`.
fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Rebuild a response from a cache entry. Headers were filtered at store time.
fn cached_response(entry: CachedEntry) -> Response {
    let mut headers = HeaderMap::with_capacity(entry.headers.len());
    for (name, value) in &entry.headers {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            headers.append(name, value);
        }
    }
    let status = StatusCode::from_u16(entry.status).unwrap_or(StatusCode::OK);
    build_response(status, headers, entry.body, "HIT")
}

fn build_response(
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    cache_status: &'static str,
) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response.headers_mut().insert(
        HeaderName::from_static(X_PROXY_CACHE),
        HeaderValue::from_static(cache_status),
    );
    response
}

fn header_pairs(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}
