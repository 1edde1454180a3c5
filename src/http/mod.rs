//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → request.rs (request ID)
//!     → [registry resolves backend]
//!     → [cache consulted for GET/POST]
//!     → headers.rs (filter forwarded/returned headers)
//!     → [upstream forwarder on miss]
//!     → Send to client with X-Proxy-Cache annotation
//! ```

pub mod headers;
pub mod request;
pub mod server;

pub use request::X_REQUEST_ID;
pub use server::{HttpServer, X_PROXY_CACHE};
