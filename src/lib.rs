//! caching-proxy - Forward caching proxy for a single HTTP origin
//!
//! Accepts client connections on a configured port, relays GET requests to
//! the configured origin, and caches full origin responses so repeated
//! identical requests are served from the store with an `X-Cache: HIT`
//! header instead of contacting the origin again.

pub mod cache;
pub mod cache_key;
pub mod config;
pub mod error;
pub mod logging;
pub mod origin;
pub mod request;
pub mod response;
pub mod server;
pub mod session;
pub mod shutdown;

pub use error::{ProxyError, Result};
