//! Session Module
//!
//! Drives one accepted client connection end to end: read the request,
//! parse it, consult the cache, fetch from the origin on a miss, stamp the
//! cache status header, and write the response back. Every failure is
//! contained to the session; nothing here may take down the accept loop.

use crate::cache::CacheStore;
use crate::cache_key::CacheKey;
use crate::config::ProxyConfig;
use crate::origin::OriginForwarder;
use crate::request::RequestLine;
use crate::response::{self, CacheStatus};
use crate::{ProxyError, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::{debug, warn};

const CLIENT_READ_BUFFER: usize = 4096;

const BAD_REQUEST: &[u8] =
    b"HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";
const BAD_GATEWAY: &[u8] =
    b"HTTP/1.1 502 Bad Gateway\r\nContent-Length: 0\r\nConnection: close\r\n\r\n";

/// Serve one client connection to completion.
///
/// The stored cache value is always the pristine origin bytes; header
/// rewriting produces a fresh buffer for the client only.
pub async fn handle_session(
    mut stream: TcpStream,
    client_addr: SocketAddr,
    config: Arc<ProxyConfig>,
    cache: Arc<dyn CacheStore>,
) -> Result<()> {
    let mut buf = vec![0u8; CLIENT_READ_BUFFER];
    let bytes_read = match tokio::time::timeout(config.read_timeout, stream.read(&mut buf)).await
    {
        Ok(Ok(n)) => n,
        Ok(Err(e)) => {
            return Err(ProxyError::IoError(format!(
                "failed to read request from {}: {}",
                client_addr, e
            )))
        }
        Err(_) => {
            abort(&mut stream, BAD_REQUEST).await;
            return Err(ProxyError::TimeoutError(format!(
                "timed out reading request from {}",
                client_addr
            )));
        }
    };
    if bytes_read == 0 {
        debug!("Client {} disconnected before sending a request", client_addr);
        return Ok(());
    }

    let request = match RequestLine::parse(&buf[..bytes_read]) {
        Ok(request) => request,
        Err(e) => {
            abort(&mut stream, BAD_REQUEST).await;
            return Err(e);
        }
    };
    // Only GET is proxied; anything else is refused without touching the origin
    if !request.is_get() {
        abort(&mut stream, BAD_REQUEST).await;
        return Err(ProxyError::MalformedRequest(format!(
            "unsupported method {:?} from {}",
            request.method, client_addr
        )));
    }

    let key = CacheKey::for_get(&request.path, &config.origin_host);

    // A store outage degrades to a forced miss
    let cached = match cache.lookup(&key).await {
        Ok(entry) => entry,
        Err(e) => {
            warn!("Cache lookup failed for {}: {}", request.path, e);
            None
        }
    };

    let (raw_response, status) = match cached {
        Some(bytes) => (bytes, CacheStatus::Hit),
        None => {
            let forwarder = OriginForwarder::from_config(&config);
            let fetched = match forwarder.fetch(key.request_bytes()).await {
                Ok(bytes) => bytes,
                Err(e) => {
                    abort(&mut stream, BAD_GATEWAY).await;
                    return Err(e);
                }
            };
            // Write failures must not cost the client its response
            if let Err(e) = cache.store(&key, fetched.clone()).await {
                warn!("Failed to cache response for {}: {}", request.path, e);
            }
            (fetched, CacheStatus::Miss)
        }
    };

    // A response we cannot split passes through unmodified
    let response_bytes = match response::rewrite_cache_status(&raw_response, status) {
        Ok(rewritten) => rewritten,
        Err(e) => {
            warn!(
                "Forwarding origin response for {} unmodified: {}",
                request.path, e
            );
            raw_response.to_vec()
        }
    };

    stream.write_all(&response_bytes).await?;
    stream.flush().await?;
    let _ = stream.shutdown().await;

    debug!(
        "{} {} from {} -> {} ({} bytes)",
        request.method,
        request.path,
        client_addr,
        status,
        response_bytes.len()
    );
    Ok(())
}

/// Best-effort error indication; the socket may already be gone and no
/// internal diagnostic detail is ever included.
async fn abort(stream: &mut TcpStream, response: &[u8]) {
    let _ = stream.write_all(response).await;
    let _ = stream.shutdown().await;
}
