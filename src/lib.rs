//! Caching reverse-proxy gateway for university schedule APIs.
//!
//! Requests to `/api/proxy/{uni_id}/{*path}` are forwarded to the backend
//! registered for `uni_id`; successful GET/POST responses are cached with a
//! TTL and replayed with an `X-Proxy-Cache: HIT` annotation.

pub mod cache;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod routing;
pub mod upstream;

pub use config::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
